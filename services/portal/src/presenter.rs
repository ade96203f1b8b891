//! services/portal/src/presenter.rs
//!
//! Turns derived state into plain view models for whatever renders the portal.
//! The renderer only reads these structs; all gating decisions are already made.

use student_portal_core::derive::{
    attendance_percentage, compute_attendance_status, compute_course_action,
    compute_overall_attendance, user_initials, AttendanceTier, CourseAction, OverallAttendance,
};
use student_portal_core::domain::{
    AttendanceRecord, Course, CourseId, EnrolledCourse, FinanceSummary, Instructor, Profile,
};

const DEFAULT_COURSE_ICON: &str = "📘";
const DEFAULT_ENROLLED_ICON: &str = "📚";
const PLACEHOLDER: &str = "—";

#[derive(Debug, Clone, PartialEq)]
pub struct CourseCard {
    pub course_id: CourseId,
    pub name: String,
    pub code: String,
    pub instructor: String,
    pub description: String,
    pub icon: String,
    pub badge: &'static str,
    pub action: CourseAction,
    pub button_label: &'static str,
    pub disabled: bool,
    pub hint: Option<&'static str>,
}

pub fn course_card(course: &Course, fee_pending: bool) -> CourseCard {
    let action = compute_course_action(course, fee_pending);
    let (button_label, hint) = match action {
        CourseAction::Blocked => ("Fees Pending", Some("Clear pending fees to manage courses")),
        CourseAction::Drop => ("Drop", None),
        CourseAction::Enroll => ("Enroll", None),
    };

    CourseCard {
        course_id: course.course_id,
        name: course.course_name.clone(),
        code: course.course_code.clone(),
        instructor: course
            .instructor_name
            .clone()
            .unwrap_or_else(|| "TBA".to_string()),
        description: course
            .description
            .clone()
            .unwrap_or_else(|| "No description available".to_string()),
        icon: course
            .icon
            .clone()
            .unwrap_or_else(|| DEFAULT_COURSE_ICON.to_string()),
        badge: if course.enrolled { "ENROLLED" } else { "AVAILABLE" },
        action,
        button_label,
        disabled: action == CourseAction::Blocked,
        hint,
    }
}

pub fn course_cards(courses: &[Course], fee_pending: bool) -> Vec<CourseCard> {
    courses.iter().map(|c| course_card(c, fee_pending)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinanceView {
    pub total_amount: f64,
    pub paid_amount: f64,
    pub overdue_amount: f64,
    pub fee_pending: bool,
}

pub fn finance_view(finance: &FinanceSummary, fee_pending: bool) -> FinanceView {
    FinanceView {
        total_amount: finance.total_amount,
        paid_amount: finance.paid_amount,
        overdue_amount: finance.overdue_amount,
        fee_pending,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrolledCard {
    pub course_id: CourseId,
    pub name: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub student_name: String,
    pub initials: String,
    pub finance: Option<FinanceView>,
    pub enrolled: Vec<EnrolledCard>,
    pub instructors: Vec<Instructor>,
}

pub fn dashboard_view(
    student_name: &str,
    finance: Option<(&FinanceSummary, bool)>,
    enrolled: &[EnrolledCourse],
    instructors: &[Instructor],
) -> DashboardView {
    DashboardView {
        student_name: student_name.to_string(),
        initials: user_initials(student_name),
        finance: finance.map(|(f, pending)| finance_view(f, pending)),
        enrolled: enrolled
            .iter()
            .map(|c| EnrolledCard {
                course_id: c.course_id,
                name: c.course_name.clone(),
                icon: c
                    .icon
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ENROLLED_ICON.to_string()),
            })
            .collect(),
        instructors: instructors.to_vec(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRow {
    pub course_id: CourseId,
    pub course_name: String,
    pub attended: u32,
    pub total: u32,
    pub absent: u32,
    pub percentage: f64,
    pub tier: AttendanceTier,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceView {
    pub rows: Vec<AttendanceRow>,
    pub overall: OverallAttendance,
    pub overall_tier: AttendanceTier,
    pub overall_label: &'static str,
}

pub fn attendance_view(records: &[AttendanceRecord]) -> AttendanceView {
    let rows = records
        .iter()
        .map(|r| {
            let percentage = attendance_percentage(r);
            let status = compute_attendance_status(percentage);
            AttendanceRow {
                course_id: r.course_id,
                course_name: r.course_name.clone(),
                attended: r.attended_classes,
                total: r.total_classes,
                absent: r.absent_classes(),
                percentage,
                tier: status.tier,
                label: status.label,
            }
        })
        .collect();

    let overall = compute_overall_attendance(records);
    let status = compute_attendance_status(overall.percentage);
    AttendanceView {
        rows,
        overall,
        overall_tier: status.tier,
        overall_label: status.label,
    }
}

/// Profile header and form values, with placeholders for missing fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileView {
    pub name: String,
    pub initials: String,
    pub registration_no: String,
    pub phone: String,
    pub department: String,
    pub year: String,
    pub cgpa: String,
}

pub fn profile_view(profile: &Profile) -> ProfileView {
    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| PLACEHOLDER.to_string());
    let name = profile.name.clone().unwrap_or_else(|| "Student".to_string());
    ProfileView {
        initials: user_initials(&name),
        name,
        registration_no: field(&profile.registration_no),
        phone: field(&profile.phone),
        department: field(&profile.department),
        year: field(&profile.year),
        cgpa: field(&profile.cgpa),
    }
}
