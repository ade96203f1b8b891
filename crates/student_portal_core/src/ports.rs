//! crates/student_portal_core/src/ports.rs
//!
//! Defines the service contract (trait) for the portal's remote API.
//! The core never performs I/O itself; the service crate provides an
//! implementation of this port, and tests provide in-memory fakes.

use async_trait::async_trait;

use crate::domain::{
    AttendanceRecord, Course, CourseId, Credentials, EnrolledCourse, Instructor, LoginPayload,
    Profile, ProfileUpdate, Registration, Reply, ReportedFinance, UserId,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// Application-level failures (`success: false`) are not errors; they arrive
/// as a `Reply` with its message. This type covers everything that kept a
/// reply from arriving at all.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Could not decode server reply: {0}")]
    Decode(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Port (Trait)
//=========================================================================================

#[async_trait]
pub trait PortalApi: Send + Sync {
    // --- Accounts ---
    async fn register(&self, registration: &Registration) -> PortResult<Reply<()>>;

    async fn login(&self, credentials: &Credentials) -> PortResult<Reply<LoginPayload>>;

    // --- Finance ---
    async fn fetch_finance(&self, user_id: UserId) -> PortResult<Reply<ReportedFinance>>;

    async fn pay(&self, user_id: UserId, amount: f64) -> PortResult<Reply<()>>;

    // --- Courses ---
    async fn fetch_enrolled_courses(&self, user_id: UserId)
        -> PortResult<Reply<Vec<EnrolledCourse>>>;

    async fn fetch_all_courses(&self, user_id: UserId) -> PortResult<Reply<Vec<Course>>>;

    async fn enroll(&self, user_id: UserId, course_id: CourseId) -> PortResult<Reply<()>>;

    async fn drop_course(&self, user_id: UserId, course_id: CourseId) -> PortResult<Reply<()>>;

    async fn fetch_instructors(&self) -> PortResult<Reply<Vec<Instructor>>>;

    // --- Profile ---
    async fn fetch_profile(&self, user_id: UserId) -> PortResult<Reply<Profile>>;

    async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> PortResult<Reply<()>>;

    // --- Attendance ---
    async fn fetch_attendance(&self, user_id: UserId) -> PortResult<Reply<Vec<AttendanceRecord>>>;
}
