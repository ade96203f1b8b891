pub mod derive;
pub mod domain;
pub mod ports;
pub mod session;

pub use derive::{
    AttendanceStatus, AttendanceTier, CourseAction, DataIssue, OverallAttendance,
    PaymentRejection,
};
pub use domain::{
    AttendanceRecord, Course, CourseId, Credentials, EnrolledCourse, FinanceSummary, Instructor,
    LoginPayload, Profile, ProfileUpdate, Registration, Reply, ReportedFinance, User, UserId,
};
pub use ports::{PortError, PortResult, PortalApi};
pub use session::{ActiveSession, GateError, SessionGate, SessionState};
