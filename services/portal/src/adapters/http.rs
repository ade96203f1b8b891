//! services/portal/src/adapters/http.rs
//!
//! This module contains the HTTP adapter, the concrete implementation of the
//! `PortalApi` port from the `core` crate. It speaks the portal's plain
//! REST/JSON routes using `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use student_portal_core::domain::{
    AttendanceRecord, Course, CourseId, Credentials, EnrolledCourse, Instructor, LoginPayload,
    Profile, ProfileUpdate, Registration, ReportedFinance, Reply, UserId,
};
use student_portal_core::ports::{PortError, PortResult, PortalApi};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `PortalApi` port over HTTP.
#[derive(Clone)]
pub struct HttpPortalAdapter {
    client: Client,
    base_url: String,
}

impl HttpPortalAdapter {
    /// Creates a new `HttpPortalAdapter` for the API rooted at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> PortResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> PortResult<T> {
        debug!(path, "GET");
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| PortError::Transport(e.to_string()))?;
        decode(path, response).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> PortResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!(path, "POST");
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| PortError::Transport(e.to_string()))?;
        decode(path, response).await
    }
}

/// Decodes a reply body. The portal answers most failures with a JSON body
/// and a 4xx status, so the status only matters when the body is unreadable.
async fn decode<T: DeserializeOwned>(path: &str, response: reqwest::Response) -> PortResult<T> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| PortError::Transport(e.to_string()))?;

    serde_json::from_slice(&body).map_err(|e| match status {
        StatusCode::NOT_FOUND => PortError::NotFound(path.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PortError::Unauthorized,
        _ => PortError::Decode(format!("{} ({}): {}", path, status, e)),
    })
}

//=========================================================================================
// Request Bodies
//=========================================================================================

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct PaymentRequest {
    user_id: i64,
    amount: f64,
}

#[derive(Serialize)]
struct CourseRequest {
    user_id: i64,
    course_id: i64,
}

#[derive(Serialize)]
struct ProfileRequest<'a> {
    user_id: i64,
    name: &'a str,
    registration_no: &'a str,
    phone: &'a str,
    department: &'a str,
    year: &'a str,
    cgpa: &'a str,
}

//=========================================================================================
// "Impure" Wire Record Structs
//=========================================================================================

/// The envelope every route answers with; `body` holds the route's own fields.
#[derive(Deserialize)]
struct ReplyRecord<B> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(flatten)]
    body: B,
}

impl<B> ReplyRecord<B> {
    fn to_domain<T>(self, payload: impl FnOnce(B) -> Option<T>) -> Reply<T> {
        Reply {
            success: self.success,
            message: self.message,
            data: payload(self.body),
        }
    }
}

#[derive(Deserialize)]
struct AckRecord {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}
impl AckRecord {
    fn to_domain(self) -> Reply<()> {
        Reply {
            success: self.success,
            message: self.message,
            data: self.success.then_some(()),
        }
    }
}

#[derive(Deserialize)]
struct LoginBody {
    #[serde(default)]
    user: Option<LoginUserRecord>,
}

#[derive(Deserialize)]
struct LoginUserRecord {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default, deserialize_with = "loose_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    email: Option<String>,
}
impl LoginUserRecord {
    fn to_domain(self) -> LoginPayload {
        LoginPayload {
            id: self.id.as_ref().and_then(value_as_i64),
            name: self.name,
            email: self.email,
        }
    }
}

#[derive(Deserialize)]
struct FinanceBody {
    #[serde(default)]
    finance: Option<FinanceRecord>,
}

#[derive(Deserialize)]
struct FinanceRecord {
    #[serde(default, deserialize_with = "loose_amount")]
    total_amount: Option<f64>,
    #[serde(default, deserialize_with = "loose_amount")]
    paid_amount: Option<f64>,
    #[serde(default, deserialize_with = "loose_amount")]
    overdue_amount: Option<f64>,
}
impl FinanceRecord {
    fn to_domain(self) -> ReportedFinance {
        ReportedFinance {
            total_amount: self.total_amount,
            paid_amount: self.paid_amount,
            overdue_amount: self.overdue_amount,
        }
    }
}

#[derive(Deserialize)]
struct CoursesBody<R> {
    #[serde(default = "Vec::new")]
    courses: Vec<R>,
}

#[derive(Deserialize)]
struct EnrolledCourseRecord {
    course_id: i64,
    course_name: String,
    #[serde(default)]
    course_icon: Option<String>,
}
impl EnrolledCourseRecord {
    fn to_domain(self) -> EnrolledCourse {
        EnrolledCourse {
            course_id: CourseId(self.course_id),
            course_name: self.course_name,
            icon: self.course_icon,
        }
    }
}

#[derive(Deserialize)]
struct CourseRecord {
    course_id: i64,
    course_name: String,
    #[serde(default, deserialize_with = "loose_string")]
    course_code: Option<String>,
    #[serde(default)]
    course_icon: Option<String>,
    #[serde(default)]
    instructor_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    enrolled: Option<bool>,
}
impl CourseRecord {
    fn to_domain(self) -> Course {
        Course {
            course_id: CourseId(self.course_id),
            course_name: self.course_name,
            course_code: self.course_code.unwrap_or_default(),
            instructor_name: self.instructor_name,
            description: self.description,
            icon: self.course_icon,
            enrolled: self.enrolled.unwrap_or(false),
        }
    }
}

#[derive(Deserialize)]
struct InstructorsBody {
    #[serde(default)]
    instructors: Vec<InstructorRecord>,
}

#[derive(Deserialize)]
struct InstructorRecord {
    instructor_id: i64,
    name: String,
    #[serde(default)]
    initials: Option<String>,
    #[serde(default)]
    avatar_color: Option<String>,
}
impl InstructorRecord {
    fn to_domain(self) -> Instructor {
        let initials = self
            .initials
            .filter(|i| !i.trim().is_empty())
            .unwrap_or_else(|| student_portal_core::derive::user_initials(&self.name));
        Instructor {
            instructor_id: self.instructor_id,
            name: self.name,
            initials,
            avatar_color: self.avatar_color,
        }
    }
}

#[derive(Deserialize)]
struct ProfileBody {
    #[serde(default)]
    user: Option<ProfileRecord>,
}

#[derive(Deserialize)]
struct ProfileRecord {
    #[serde(default, deserialize_with = "loose_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    registration_no: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    phone: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    department: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    year: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    cgpa: Option<String>,
}
impl ProfileRecord {
    fn to_domain(self) -> Profile {
        Profile {
            name: self.name,
            registration_no: self.registration_no,
            phone: self.phone,
            department: self.department,
            year: self.year,
            cgpa: self.cgpa,
        }
    }
}

#[derive(Deserialize)]
struct AttendanceBody {
    #[serde(default)]
    attendance: Vec<AttendanceRecordRow>,
}

#[derive(Deserialize)]
struct AttendanceRecordRow {
    course_id: i64,
    course_name: String,
    #[serde(default)]
    total_classes: i64,
    #[serde(default)]
    attended_classes: i64,
}
impl AttendanceRecordRow {
    fn to_domain(self) -> AttendanceRecord {
        AttendanceRecord::new(
            CourseId(self.course_id),
            self.course_name,
            clamp_count(self.total_classes),
            clamp_count(self.attended_classes),
        )
    }
}

fn clamp_count(n: i64) -> u32 {
    u32::try_from(n.max(0)).unwrap_or(u32::MAX)
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Amounts come from NUMERIC columns and may be serialized as numbers or as
/// decimal strings. Anything unreadable becomes `None`.
fn loose_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Accepts a string, a number or null; empty strings become `None`.
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

//=========================================================================================
// `PortalApi` Trait Implementation
//=========================================================================================

#[async_trait]
impl PortalApi for HttpPortalAdapter {
    async fn register(&self, registration: &Registration) -> PortResult<Reply<()>> {
        let body = RegisterRequest {
            name: &registration.name,
            email: &registration.email,
            password: &registration.password,
        };
        let record: AckRecord = self.post("/register", &body).await?;
        Ok(record.to_domain())
    }

    async fn login(&self, credentials: &Credentials) -> PortResult<Reply<LoginPayload>> {
        let body = LoginRequest {
            email: &credentials.email,
            password: &credentials.password,
        };
        let record: ReplyRecord<LoginBody> = self.post("/login", &body).await?;
        Ok(record.to_domain(|b| b.user.map(LoginUserRecord::to_domain)))
    }

    async fn fetch_finance(&self, user_id: UserId) -> PortResult<Reply<ReportedFinance>> {
        let record: ReplyRecord<FinanceBody> =
            self.get(&format!("/finance/{}", user_id)).await?;
        // A student without a finance row still gets a (fully invalid) report.
        Ok(record.to_domain(|b| {
            Some(b.finance.map(FinanceRecord::to_domain).unwrap_or_default())
        }))
    }

    async fn pay(&self, user_id: UserId, amount: f64) -> PortResult<Reply<()>> {
        let body = PaymentRequest {
            user_id: user_id.0,
            amount,
        };
        let record: AckRecord = self.post("/finance/update", &body).await?;
        Ok(record.to_domain())
    }

    async fn fetch_enrolled_courses(
        &self,
        user_id: UserId,
    ) -> PortResult<Reply<Vec<EnrolledCourse>>> {
        let record: ReplyRecord<CoursesBody<EnrolledCourseRecord>> =
            self.get(&format!("/courses/enrolled/{}", user_id)).await?;
        Ok(record.to_domain(|b| {
            Some(b.courses.into_iter().map(EnrolledCourseRecord::to_domain).collect())
        }))
    }

    async fn fetch_all_courses(&self, user_id: UserId) -> PortResult<Reply<Vec<Course>>> {
        let record: ReplyRecord<CoursesBody<CourseRecord>> =
            self.get(&format!("/courses/all/{}", user_id)).await?;
        Ok(record.to_domain(|b| {
            Some(b.courses.into_iter().map(CourseRecord::to_domain).collect())
        }))
    }

    async fn enroll(&self, user_id: UserId, course_id: CourseId) -> PortResult<Reply<()>> {
        let body = CourseRequest {
            user_id: user_id.0,
            course_id: course_id.0,
        };
        let record: AckRecord = self.post("/courses/enroll", &body).await?;
        Ok(record.to_domain())
    }

    async fn drop_course(&self, user_id: UserId, course_id: CourseId) -> PortResult<Reply<()>> {
        let body = CourseRequest {
            user_id: user_id.0,
            course_id: course_id.0,
        };
        let record: AckRecord = self.post("/courses/drop", &body).await?;
        Ok(record.to_domain())
    }

    async fn fetch_instructors(&self) -> PortResult<Reply<Vec<Instructor>>> {
        let record: ReplyRecord<InstructorsBody> = self.get("/instructors").await?;
        Ok(record.to_domain(|b| {
            Some(b.instructors.into_iter().map(InstructorRecord::to_domain).collect())
        }))
    }

    async fn fetch_profile(&self, user_id: UserId) -> PortResult<Reply<Profile>> {
        let record: ReplyRecord<ProfileBody> =
            self.get(&format!("/profile/{}", user_id)).await?;
        Ok(record.to_domain(|b| Some(b.user.map(ProfileRecord::to_domain).unwrap_or_default())))
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> PortResult<Reply<()>> {
        let body = ProfileRequest {
            user_id: user_id.0,
            name: &update.name,
            registration_no: &update.registration_no,
            phone: &update.phone,
            department: &update.department,
            year: &update.year,
            cgpa: &update.cgpa,
        };
        let record: AckRecord = self.post("/profile/update", &body).await?;
        Ok(record.to_domain())
    }

    async fn fetch_attendance(&self, user_id: UserId) -> PortResult<Reply<Vec<AttendanceRecord>>> {
        let record: ReplyRecord<AttendanceBody> =
            self.get(&format!("/attendance/{}", user_id)).await?;
        Ok(record.to_domain(|b| {
            Some(b.attendance.into_iter().map(AttendanceRecordRow::to_domain).collect())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse<T: DeserializeOwned>(json: &str) -> T {
        serde_json::from_str(json).expect("fixture should parse")
    }

    #[test]
    fn login_reply_maps_user() {
        let record: ReplyRecord<LoginBody> = parse(
            r#"{"success": true,
                "user": {"id": 12, "name": "Ada Lovelace", "email": "ada@example.edu"}}"#,
        );
        let reply = record.to_domain(|b| b.user.map(LoginUserRecord::to_domain));
        assert!(reply.success);
        assert_eq!(
            reply.data,
            Some(LoginPayload {
                id: Some(12),
                name: Some("Ada Lovelace".to_string()),
                email: Some("ada@example.edu".to_string()),
            })
        );
    }

    #[test]
    fn login_reply_with_bad_user_keeps_gaps() {
        let record: ReplyRecord<LoginBody> =
            parse(r#"{"success": true, "user": {"id": [1], "name": ""}}"#);
        let reply = record.to_domain(|b| b.user.map(LoginUserRecord::to_domain));
        assert_eq!(reply.data, Some(LoginPayload::default()));
    }

    #[test]
    fn failed_login_carries_message() {
        let record: ReplyRecord<LoginBody> =
            parse(r#"{"success": false, "message": "Invalid email or password"}"#);
        let reply = record.to_domain(|b| b.user.map(LoginUserRecord::to_domain));
        assert!(!reply.success);
        assert_eq!(reply.message.as_deref(), Some("Invalid email or password"));
        assert_eq!(reply.data, None);
    }

    #[test]
    fn finance_accepts_numbers_and_decimal_strings() {
        let record: ReplyRecord<FinanceBody> = parse(
            r#"{"success": true, "finance": {
                "total_amount": "50000.00", "paid_amount": 20000, "overdue_amount": "oops"}}"#,
        );
        let finance = record.body.finance.map(FinanceRecord::to_domain).unwrap();
        assert_eq!(finance.total_amount, Some(50000.0));
        assert_eq!(finance.paid_amount, Some(20000.0));
        assert_eq!(finance.overdue_amount, None);
    }

    #[test]
    fn missing_finance_row_is_null() {
        let record: ReplyRecord<FinanceBody> = parse(r#"{"success": true, "finance": null}"#);
        assert!(record.body.finance.is_none());
    }

    #[test]
    fn course_catalogue_defaults() {
        let record: ReplyRecord<CoursesBody<CourseRecord>> = parse(
            r#"{"success": true, "courses": [
                {"course_id": 1, "course_name": "Algorithms", "course_code": "CS201",
                 "enrolled": true, "instructor_name": "Dr. Knuth", "description": "Sorting",
                 "course_icon": "A"},
                {"course_id": 2, "course_name": "Networks", "course_code": null, "enrolled": null}
            ]}"#,
        );
        let courses: Vec<Course> = record
            .body
            .courses
            .into_iter()
            .map(CourseRecord::to_domain)
            .collect();
        assert_eq!(courses.len(), 2);
        assert!(courses[0].enrolled);
        assert_eq!(courses[0].instructor_name.as_deref(), Some("Dr. Knuth"));
        assert_eq!(courses[1].course_code, "");
        assert!(!courses[1].enrolled);
    }

    #[test]
    fn profile_fields_accept_numbers() {
        let record: ReplyRecord<ProfileBody> = parse(
            r#"{"success": true, "user": {
                "name": "Ada", "year": 3, "cgpa": 8.7, "phone": "", "department": null}}"#,
        );
        let profile = record.body.user.map(ProfileRecord::to_domain).unwrap();
        assert_eq!(profile.year.as_deref(), Some("3"));
        assert_eq!(profile.cgpa.as_deref(), Some("8.7"));
        assert_eq!(profile.phone, None);
        assert_eq!(profile.department, None);
    }

    #[test]
    fn attendance_counts_are_clamped() {
        let record: ReplyRecord<AttendanceBody> = parse(
            r#"{"success": true, "attendance": [
                {"course_id": 1, "course_name": "Algorithms",
                 "total_classes": 40, "attended_classes": 45},
                {"course_id": 2, "course_name": "Networks",
                 "total_classes": -3, "attended_classes": 2}
            ]}"#,
        );
        let rows: Vec<AttendanceRecord> = record
            .body
            .attendance
            .into_iter()
            .map(AttendanceRecordRow::to_domain)
            .collect();
        assert_eq!((rows[0].total_classes, rows[0].attended_classes), (40, 40));
        assert_eq!((rows[1].total_classes, rows[1].attended_classes), (0, 0));
    }

    #[test]
    fn instructor_initials_fall_back_to_name() {
        let record: ReplyRecord<InstructorsBody> = parse(
            r#"{"success": true, "instructors": [
                {"instructor_id": 4, "name": "Grace Hopper", "initials": null}]}"#,
        );
        let instructor = record
            .body
            .instructors
            .into_iter()
            .map(InstructorRecord::to_domain)
            .next()
            .unwrap();
        assert_eq!(instructor.initials, "GH");
    }

    #[test]
    fn ack_without_success_has_no_data() {
        let record: AckRecord =
            parse(r#"{"success": false, "message": "Amount exceeds remaining balance"}"#);
        let reply = record.to_domain();
        assert!(!reply.success);
        assert_eq!(reply.data, None);
        assert_eq!(reply.message.as_deref(), Some("Amount exceeds remaining balance"));
    }
}
