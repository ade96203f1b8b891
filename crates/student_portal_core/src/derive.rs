//! crates/student_portal_core/src/derive.rs
//!
//! The derivation engine: pure functions that turn fetched server data into
//! the flags and classifications the views are gated on. Nothing here touches
//! the network or holds state, so every derived value must be recomputed by the
//! caller whenever its inputs are refreshed.

use crate::domain::{AttendanceRecord, Course, FinanceSummary, ReportedFinance};

/// Lowest percentage that is no longer critical.
pub const WARNING_THRESHOLD: f64 = 75.0;
/// Lowest percentage that counts as good standing.
pub const GOOD_THRESHOLD: f64 = 85.0;

//=========================================================================================
// Data Issues
//=========================================================================================

/// Problems found in fetched data. None of these are fatal: the engine always
/// substitutes a defined value, and the issue is only reported for logging.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataIssue {
    #[error("Invalid finance data: {field} was missing, negative or not a number")]
    InvalidFinanceData { field: &'static str },
    #[error("No attendance records; overall percentage is 0")]
    EmptyAttendanceSet,
}

/// Converts a reported finance payload into a usable summary.
/// Missing, negative or non-finite amounts become 0 and are reported.
pub fn sanitize_finance(reported: ReportedFinance) -> (FinanceSummary, Vec<DataIssue>) {
    let mut issues = Vec::new();
    let mut amount = |value: Option<f64>, field: &'static str| match value {
        Some(v) if v.is_finite() && v >= 0.0 => v,
        _ => {
            issues.push(DataIssue::InvalidFinanceData { field });
            0.0
        }
    };

    let summary = FinanceSummary {
        total_amount: amount(reported.total_amount, "total_amount"),
        paid_amount: amount(reported.paid_amount, "paid_amount"),
        overdue_amount: amount(reported.overdue_amount, "overdue_amount"),
    };
    (summary, issues)
}

//=========================================================================================
// Finance
//=========================================================================================

/// True when the student has overdue fees. An invalid overdue amount counts as 0.
pub fn compute_fee_pending(finance: &FinanceSummary) -> bool {
    finance.overdue_amount.is_finite() && finance.overdue_amount > 0.0
}

/// What is left to pay: `total - paid`, never negative, rounded to cents.
pub fn remaining_balance(finance: &FinanceSummary) -> f64 {
    from_cents(remaining_cents(finance))
}

fn remaining_cents(finance: &FinanceSummary) -> i64 {
    match (to_cents(finance.total_amount), to_cents(finance.paid_amount)) {
        (Some(total), Some(paid)) => total.saturating_sub(paid).max(0),
        _ => 0,
    }
}

/// Money is compared in whole cents so that decimal amounts such as 0.30 - 0.10
/// do not leave a binary remainder.
fn to_cents(amount: f64) -> Option<i64> {
    let cents = (amount * 100.0).round();
    (cents.is_finite() && cents.abs() < i64::MAX as f64).then_some(cents as i64)
}

fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PaymentRejection {
    #[error("Enter a valid amount")]
    InvalidAmount,
    #[error("Amount exceeds remaining balance of {remaining}")]
    ExceedsBalance { remaining: f64 },
}

/// Checks a payment amount before it is sent. The server repeats this check.
pub fn validate_payment(finance: &FinanceSummary, amount: f64) -> Result<(), PaymentRejection> {
    let cents = match to_cents(amount) {
        Some(cents) if cents > 0 => cents,
        _ => return Err(PaymentRejection::InvalidAmount),
    };
    let remaining = remaining_cents(finance);
    if cents > remaining {
        return Err(PaymentRejection::ExceedsBalance {
            remaining: from_cents(remaining),
        });
    }
    Ok(())
}

//=========================================================================================
// Attendance
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttendanceTier {
    Good,
    Warning,
    Critical,
}

impl AttendanceTier {
    pub fn label(self) -> &'static str {
        match self {
            AttendanceTier::Good => "Good",
            AttendanceTier::Warning => "Warning",
            AttendanceTier::Critical => "Critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceStatus {
    pub tier: AttendanceTier,
    pub label: &'static str,
}

/// Attended share of one course's classes, in percent. 0 when no classes were held.
pub fn attendance_percentage(record: &AttendanceRecord) -> f64 {
    percentage_of(record.attended_classes as u64, record.total_classes as u64)
}

/// Classifies a percentage. Each band includes its lower bound: 75 is a
/// warning and 85 is good. A course with no classes yields 0 and so is critical.
pub fn compute_attendance_status(percentage: f64) -> AttendanceStatus {
    // NaN falls through to critical.
    let tier = if percentage >= GOOD_THRESHOLD {
        AttendanceTier::Good
    } else if percentage >= WARNING_THRESHOLD {
        AttendanceTier::Warning
    } else {
        AttendanceTier::Critical
    };
    AttendanceStatus {
        tier,
        label: tier.label(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OverallAttendance {
    pub total_classes: u64,
    pub total_attended: u64,
    pub total_absent: u64,
    pub percentage: f64,
}

/// Totals across all courses. The percentage is taken over the summed counts,
/// not averaged over per-course percentages.
pub fn compute_overall_attendance(records: &[AttendanceRecord]) -> OverallAttendance {
    let (total_classes, total_attended) = records
        .iter()
        .fold((0u64, 0u64), |(total, attended), r| {
            (
                total + r.total_classes as u64,
                attended + r.attended_classes.min(r.total_classes) as u64,
            )
        });

    OverallAttendance {
        total_classes,
        total_attended,
        total_absent: total_classes - total_attended,
        percentage: percentage_of(total_attended, total_classes),
    }
}

fn percentage_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    // Multiply first so whole-number results stay exact.
    (part as f64 * 100.0) / whole as f64
}

//=========================================================================================
// Courses
//=========================================================================================

/// The single action a course card offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CourseAction {
    Blocked,
    Drop,
    Enroll,
}

/// Pending fees block every course action, whatever the enrollment state.
pub fn compute_course_action(course: &Course, fee_pending: bool) -> CourseAction {
    if fee_pending {
        CourseAction::Blocked
    } else if course.enrolled {
        CourseAction::Drop
    } else {
        CourseAction::Enroll
    }
}

/// Case-insensitive search over name, code, instructor and description.
/// A blank term keeps every course; relative order is always preserved.
pub fn filter_courses_by_term(courses: &[Course], term: &str) -> Vec<Course> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return courses.to_vec();
    }

    courses
        .iter()
        .filter(|course| search_text(course).contains(&needle))
        .cloned()
        .collect()
}

fn search_text(course: &Course) -> String {
    [
        course.course_name.as_str(),
        course.course_code.as_str(),
        course.instructor_name.as_deref().unwrap_or_default(),
        course.description.as_deref().unwrap_or_default(),
    ]
    .join(" ")
    .to_lowercase()
}

//=========================================================================================
// Display helpers
//=========================================================================================

/// Upper-cased first letter of each word in `name`; "S" for a blank name.
pub fn user_initials(name: &str) -> String {
    let initials: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect();

    if initials.is_empty() {
        "S".to_string()
    } else {
        initials
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CourseId;

    fn finance(total: f64, paid: f64, overdue: f64) -> FinanceSummary {
        FinanceSummary {
            total_amount: total,
            paid_amount: paid,
            overdue_amount: overdue,
        }
    }

    fn course(id: i64, name: &str, code: &str, enrolled: bool) -> Course {
        Course {
            course_id: CourseId(id),
            course_name: name.to_string(),
            course_code: code.to_string(),
            instructor_name: None,
            description: None,
            icon: None,
            enrolled,
        }
    }

    fn record(total: u32, attended: u32) -> AttendanceRecord {
        AttendanceRecord::new(CourseId(1), "Course", total, attended)
    }

    #[test]
    fn fee_pending_follows_overdue_amount() {
        assert!(compute_fee_pending(&finance(1000.0, 200.0, 0.01)));
        assert!(compute_fee_pending(&finance(1000.0, 200.0, 800.0)));
        assert!(!compute_fee_pending(&finance(1000.0, 1000.0, 0.0)));
        assert!(!compute_fee_pending(&finance(0.0, 0.0, f64::NAN)));
    }

    #[test]
    fn sanitize_replaces_bad_amounts_with_zero() {
        let (summary, issues) = sanitize_finance(ReportedFinance {
            total_amount: Some(5000.0),
            paid_amount: None,
            overdue_amount: Some(-20.0),
        });

        assert_eq!(summary, finance(5000.0, 0.0, 0.0));
        assert_eq!(
            issues,
            vec![
                DataIssue::InvalidFinanceData { field: "paid_amount" },
                DataIssue::InvalidFinanceData { field: "overdue_amount" },
            ]
        );
        assert!(!compute_fee_pending(&summary));
    }

    #[test]
    fn sanitize_keeps_valid_amounts() {
        let (summary, issues) = sanitize_finance(ReportedFinance {
            total_amount: Some(5000.0),
            paid_amount: Some(3000.0),
            overdue_amount: Some(2000.0),
        });
        assert_eq!(summary, finance(5000.0, 3000.0, 2000.0));
        assert!(issues.is_empty());
    }

    #[test]
    fn payment_validation() {
        let f = finance(5000.0, 3000.0, 2000.0);
        assert_eq!(validate_payment(&f, 0.0), Err(PaymentRejection::InvalidAmount));
        assert_eq!(validate_payment(&f, -5.0), Err(PaymentRejection::InvalidAmount));
        assert_eq!(validate_payment(&f, f64::NAN), Err(PaymentRejection::InvalidAmount));
        assert_eq!(
            validate_payment(&f, 2500.0),
            Err(PaymentRejection::ExceedsBalance { remaining: 2000.0 })
        );
        assert_eq!(validate_payment(&f, 2000.0), Ok(()));
        assert_eq!(validate_payment(&f, 150.5), Ok(()));
    }

    #[test]
    fn exact_cents_balance_can_be_paid_off() {
        let f = finance(0.30, 0.10, 0.20);
        assert_eq!(remaining_balance(&f), 0.2);
        assert_eq!(validate_payment(&f, 0.20), Ok(()));
        let err = validate_payment(&f, 0.21).unwrap_err();
        assert_eq!(err, PaymentRejection::ExceedsBalance { remaining: 0.2 });
        assert_eq!(err.to_string(), "Amount exceeds remaining balance of 0.2");
    }

    #[test]
    fn sub_cent_amounts_are_invalid() {
        let f = finance(10.0, 0.0, 10.0);
        assert_eq!(validate_payment(&f, 0.004), Err(PaymentRejection::InvalidAmount));
        assert_eq!(validate_payment(&f, f64::INFINITY), Err(PaymentRejection::InvalidAmount));
    }

    #[test]
    fn remaining_balance_never_negative() {
        assert_eq!(remaining_balance(&finance(100.0, 150.0, 0.0)), 0.0);
        assert_eq!(remaining_balance(&finance(100.0, 40.0, 60.0)), 60.0);
    }

    #[test]
    fn attendance_tiers_and_boundaries() {
        for p in [0.0, 10.0, 74.0, 74.999] {
            assert_eq!(compute_attendance_status(p).tier, AttendanceTier::Critical, "{p}");
        }
        for p in [75.0, 80.0, 84.99] {
            assert_eq!(compute_attendance_status(p).tier, AttendanceTier::Warning, "{p}");
        }
        for p in [85.0, 90.0, 100.0] {
            assert_eq!(compute_attendance_status(p).tier, AttendanceTier::Good, "{p}");
        }
        assert_eq!(compute_attendance_status(75.0).label, "Warning");
        assert_eq!(compute_attendance_status(85.0).label, "Good");
        assert_eq!(compute_attendance_status(f64::NAN).tier, AttendanceTier::Critical);
    }

    #[test]
    fn course_without_classes_is_critical() {
        let r = record(0, 0);
        assert_eq!(attendance_percentage(&r), 0.0);
        assert_eq!(
            compute_attendance_status(attendance_percentage(&r)).tier,
            AttendanceTier::Critical
        );
    }

    #[test]
    fn record_clamps_attended_to_total() {
        let r = record(10, 14);
        assert_eq!(r.attended_classes, 10);
        assert_eq!(r.absent_classes(), 0);
        assert_eq!(attendance_percentage(&r), 100.0);
    }

    #[test]
    fn overall_attendance_of_empty_set_is_zero() {
        assert_eq!(
            compute_overall_attendance(&[]),
            OverallAttendance {
                total_classes: 0,
                total_attended: 0,
                total_absent: 0,
                percentage: 0.0,
            }
        );
    }

    #[test]
    fn overall_attendance_sums_before_dividing() {
        let overall = compute_overall_attendance(&[record(100, 80), record(50, 40)]);
        assert_eq!(
            overall,
            OverallAttendance {
                total_classes: 150,
                total_attended: 120,
                total_absent: 30,
                percentage: 80.0,
            }
        );

        // Averaging per-course percentages would give 55 here.
        let skewed = compute_overall_attendance(&[record(10, 10), record(90, 9)]);
        assert_eq!(skewed.percentage, 19.0);
    }

    #[test]
    fn fees_block_every_course_action() {
        let enrolled = course(1, "A", "A1", true);
        let available = course(1, "A", "A1", false);
        assert_eq!(compute_course_action(&enrolled, true), CourseAction::Blocked);
        assert_eq!(compute_course_action(&available, true), CourseAction::Blocked);
        assert_eq!(compute_course_action(&available, false), CourseAction::Enroll);
        assert_eq!(compute_course_action(&enrolled, false), CourseAction::Drop);
    }

    #[test]
    fn filter_with_empty_term_returns_all_in_order() {
        let courses = vec![
            course(3, "Databases", "CS301", false),
            course(1, "Algorithms", "CS201", true),
            course(2, "Networks", "CS302", false),
        ];
        assert_eq!(filter_courses_by_term(&courses, ""), courses);
        assert_eq!(filter_courses_by_term(&courses, "   "), courses);
    }

    #[test]
    fn filter_is_case_insensitive_and_stable() {
        let mut algo = course(1, "Algorithms", "CS201", true);
        algo.description = Some("Sorting and graphs".to_string());
        let mut nets = course(2, "Networks", "CS302", false);
        nets.instructor_name = Some("Dr. Graham".to_string());
        let db = course(3, "Databases", "CS301", false);
        let courses = vec![algo.clone(), nets.clone(), db.clone()];

        let found = filter_courses_by_term(&courses, "ALGO");
        assert_eq!(found, vec![algo.clone()]);

        let graph = filter_courses_by_term(&courses, "grap");
        assert_eq!(graph, vec![algo, nets]);

        let code = filter_courses_by_term(&courses, "cs30");
        assert_eq!(code.iter().map(|c| c.course_id.0).collect::<Vec<_>>(), vec![2, 3]);

        assert!(filter_courses_by_term(&courses, "chemistry").is_empty());
    }

    #[test]
    fn initials_from_name() {
        assert_eq!(user_initials("Ada Lovelace"), "AL");
        assert_eq!(user_initials("  grace   brewster hopper "), "GBH");
        assert_eq!(user_initials(""), "S");
    }
}
