//! crates/student_portal_core/src/domain.rs
//!
//! Defines the pure, core data structures of the student portal.
//! These structs are independent of any wire or serialization format; the
//! service adapters convert their own records into them.

use std::fmt;

/// Server-assigned identifier of a student account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CourseId(pub i64);

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//=========================================================================================
// Replies
//=========================================================================================

/// A parsed server reply: the success flag and optional message every portal
/// endpoint returns, plus the endpoint-specific payload when there is one.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Reply<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

impl Reply<()> {
    /// A successful reply that carries no payload (payments, enrollment, ...).
    pub fn done() -> Self {
        Self::ok(())
    }
}

//=========================================================================================
// Users and Sessions
//=========================================================================================

/// The authenticated student. Owned by the active session.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Option<String>,
    pub registration_no: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub year: Option<String>,
    pub cgpa: Option<String>,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: None,
            registration_no: None,
            phone: None,
            department: None,
            year: None,
            cgpa: None,
        }
    }
}

/// The user object of a login reply, exactly as the server sent it.
/// Nothing is guaranteed present; the session gate decides whether it is usable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginPayload {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub email: Option<String>,
}

// Only used for login - contains the plaintext password
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// A new account request.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Student profile as returned by the profile endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub name: Option<String>,
    pub registration_no: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub year: Option<String>,
    pub cgpa: Option<String>,
}

/// The editable profile fields sent on save.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: String,
    pub registration_no: String,
    pub phone: String,
    pub department: String,
    pub year: String,
    pub cgpa: String,
}

//=========================================================================================
// Finance
//=========================================================================================

/// Fee totals for the current student. All amounts are non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FinanceSummary {
    pub total_amount: f64,
    pub paid_amount: f64,
    pub overdue_amount: f64,
}

/// The finance object as reported by the server, before sanitising.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReportedFinance {
    pub total_amount: Option<f64>,
    pub paid_amount: Option<f64>,
    pub overdue_amount: Option<f64>,
}

//=========================================================================================
// Courses
//=========================================================================================

/// A course from the full catalogue, flagged relative to the current user.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub course_id: CourseId,
    pub course_name: String,
    pub course_code: String,
    pub instructor_name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub enrolled: bool,
}

/// A course the user is actively enrolled in (dashboard list).
#[derive(Debug, Clone, PartialEq)]
pub struct EnrolledCourse {
    pub course_id: CourseId,
    pub course_name: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instructor {
    pub instructor_id: i64,
    pub name: String,
    pub initials: String,
    pub avatar_color: Option<String>,
}

//=========================================================================================
// Attendance
//=========================================================================================

/// Class counts for one course. `attended_classes` never exceeds `total_classes`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRecord {
    pub course_id: CourseId,
    pub course_name: String,
    pub total_classes: u32,
    pub attended_classes: u32,
}

impl AttendanceRecord {
    /// Builds a record, clamping `attended` into `[0, total]`.
    pub fn new(
        course_id: CourseId,
        course_name: impl Into<String>,
        total: u32,
        attended: u32,
    ) -> Self {
        Self {
            course_id,
            course_name: course_name.into(),
            total_classes: total,
            attended_classes: attended.min(total),
        }
    }

    pub fn absent_classes(&self) -> u32 {
        self.total_classes.saturating_sub(self.attended_classes)
    }
}
