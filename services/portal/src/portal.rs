//! services/portal/src/portal.rs
//!
//! The portal controller. Each public method is one user event (login, pay,
//! enroll, ...). It asks the session gate for the user id, talks to the API
//! port, and re-derives gating flags from whatever data it just applied.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join3;
use student_portal_core::derive::{
    compute_course_action, compute_fee_pending, filter_courses_by_term, sanitize_finance,
    validate_payment, CourseAction, DataIssue, PaymentRejection,
};
use student_portal_core::domain::{
    Course, CourseId, Credentials, EnrolledCourse, FinanceSummary, Instructor, Profile,
    ProfileUpdate, Registration, Reply, User, UserId,
};
use student_portal_core::ports::{PortError, PortalApi};
use student_portal_core::session::{GateError, SessionGate};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{PortalError, PortalResult};
use crate::presenter::{
    attendance_view, course_cards, dashboard_view, finance_view, profile_view, AttendanceView,
    CourseCard, DashboardView, FinanceView, ProfileView,
};

//=========================================================================================
// Pages
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Login,
    Dashboard,
    Courses,
    Attendance,
    Profile,
}

/// What a page needs rendered after navigating to it.
#[derive(Debug, Clone, PartialEq)]
pub enum PageLoad {
    Dashboard(DashboardView),
    Courses(Vec<CourseCard>),
    Attendance(AttendanceView),
    Profile(ProfileView),
}

//=========================================================================================
// State
//=========================================================================================

#[derive(Debug)]
struct PortalState {
    gate: SessionGate,
    page: Page,
    /// Bumped on every login and logout so replies from an earlier session are dropped.
    epoch: u64,
    finance: Option<FinanceSummary>,
    fee_pending: bool,
    finance_issued: u64,
    finance_applied: u64,
    courses: Vec<Course>,
    enrolled: Vec<EnrolledCourse>,
    instructors: Vec<Instructor>,
}

impl PortalState {
    fn new() -> Self {
        Self {
            gate: SessionGate::new(),
            page: Page::Login,
            epoch: 0,
            finance: None,
            fee_pending: false,
            finance_issued: 0,
            finance_applied: 0,
            courses: Vec::new(),
            enrolled: Vec::new(),
            instructors: Vec::new(),
        }
    }

    /// Drops every cached and derived value and starts a new epoch.
    fn reset(&mut self, page: Page) {
        self.page = page;
        self.epoch += 1;
        self.finance = None;
        self.fee_pending = false;
        self.finance_applied = self.finance_issued;
        self.courses.clear();
        self.enrolled.clear();
        self.instructors.clear();
    }

    fn scope(&self) -> Result<(UserId, u64), GateError> {
        Ok((self.gate.require_user_id()?, self.epoch))
    }

    fn finance_view(&self) -> Option<FinanceView> {
        self.finance.as_ref().map(|f| finance_view(f, self.fee_pending))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnrollmentChange {
    Enroll,
    Drop,
}

impl EnrollmentChange {
    fn action(self) -> CourseAction {
        match self {
            EnrollmentChange::Enroll => CourseAction::Enroll,
            EnrollmentChange::Drop => CourseAction::Drop,
        }
    }
}

//=========================================================================================
// Reply helpers
//=========================================================================================

fn into_data<T>(reply: Reply<T>, fallback: &str) -> PortalResult<T> {
    if !reply.success {
        return Err(PortalError::Rejected(
            reply.message.unwrap_or_else(|| fallback.to_string()),
        ));
    }
    reply
        .data
        .ok_or_else(|| PortalError::Port(PortError::Decode(format!("{}: empty reply", fallback))))
}

fn into_ack(reply: Reply<()>, fallback: &str) -> PortalResult<()> {
    if reply.success {
        Ok(())
    } else {
        Err(PortalError::Rejected(
            reply.message.unwrap_or_else(|| fallback.to_string()),
        ))
    }
}

fn required(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

//=========================================================================================
// The Portal Controller
//=========================================================================================

pub struct Portal {
    api: Arc<dyn PortalApi>,
    state: Mutex<PortalState>,
}

impl Portal {
    pub fn new(api: Arc<dyn PortalApi>) -> Self {
        Self {
            api,
            state: Mutex::new(PortalState::new()),
        }
    }

    // --- Queries ---

    pub async fn is_navigation_allowed(&self) -> bool {
        self.state.lock().await.gate.is_navigation_allowed()
    }

    pub async fn current_page(&self) -> Page {
        self.state.lock().await.page
    }

    pub async fn current_user(&self) -> Option<User> {
        self.state.lock().await.gate.current_user().cloned()
    }

    pub async fn session_started_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.gate.authenticated_at()
    }

    /// The fee-pending flag derived from the most recently applied finance reply.
    pub async fn fee_pending(&self) -> bool {
        self.state.lock().await.fee_pending
    }

    pub async fn finance(&self) -> Option<FinanceView> {
        self.state.lock().await.finance_view()
    }

    // --- Accounts ---

    pub async fn register(&self, registration: Registration) -> PortalResult<()> {
        let (Some(name), Some(email), Some(password)) = (
            required(&registration.name),
            required(&registration.email),
            required(&registration.password),
        ) else {
            return Err(PortalError::Validation("All fields required".to_string()));
        };

        let reply = self
            .api
            .register(&Registration {
                name,
                email: email.clone(),
                password,
            })
            .await?;
        into_ack(reply, "Registration failed")?;
        info!(%email, "Registered new account");
        Ok(())
    }

    /// Logs in and loads the dashboard. Any failure leaves the session anonymous.
    pub async fn login(&self, credentials: Credentials) -> PortalResult<DashboardView> {
        let (Some(email), false) = (required(&credentials.email), credentials.password.is_empty())
        else {
            return Err(PortalError::Validation(
                "Please enter email and password".to_string(),
            ));
        };

        let reply = self
            .api
            .login(&Credentials {
                email,
                password: credentials.password,
            })
            .await
            .map_err(|e| {
                error!("Login request failed: {}", e);
                PortalError::Port(e)
            })?;

        {
            let mut state = self.state.lock().await;
            let outcome = state.gate.apply_login(reply).map(|user| user.id);
            match outcome {
                Ok(user_id) => {
                    state.reset(Page::Dashboard);
                    info!(%user_id, "Logged in");
                }
                Err(e) => {
                    state.reset(Page::Login);
                    warn!("Login refused: {}", e);
                    return Err(e.into());
                }
            }
        }

        self.load_dashboard().await
    }

    /// Leaves the session locally; no request is sent.
    pub async fn logout(&self) {
        let mut state = self.state.lock().await;
        if let Ok(user_id) = state.gate.require_user_id() {
            info!(%user_id, "Logged out");
        }
        state.gate.logout();
        state.reset(Page::Login);
    }

    // --- Navigation ---

    pub async fn navigate(&self, page: Page) -> PortalResult<PageLoad> {
        {
            let mut state = self.state.lock().await;
            if !state.gate.is_navigation_allowed() {
                return Err(GateError::NotAuthenticated.into());
            }
            if page != Page::Login {
                state.page = page;
            }
        }
        debug!(?page, "Navigating");

        match page {
            Page::Login => Err(PortalError::Validation(
                "Log out to return to the login page".to_string(),
            )),
            Page::Dashboard => Ok(PageLoad::Dashboard(self.load_dashboard().await?)),
            Page::Courses => Ok(PageLoad::Courses(self.load_courses().await?)),
            Page::Attendance => Ok(PageLoad::Attendance(self.load_attendance().await?)),
            Page::Profile => Ok(PageLoad::Profile(self.load_profile().await?)),
        }
    }

    // --- Dashboard ---

    /// Refreshes finance, enrolled courses and instructors concurrently.
    /// A failing section is logged and rendered empty rather than failing the page.
    pub async fn load_dashboard(&self) -> PortalResult<DashboardView> {
        {
            let state = self.state.lock().await;
            state.gate.require_user_id()?;
        }

        let (finance, enrolled, instructors) = join3(
            self.refresh_finance(),
            self.refresh_enrolled(),
            self.refresh_instructors(),
        )
        .await;
        for (section, result) in [
            ("finance", finance.map(|_| ())),
            ("enrolled courses", enrolled),
            ("instructors", instructors),
        ] {
            if let Err(e) = result {
                warn!(section, "Dashboard section failed to load: {}", e);
            }
        }

        let state = self.state.lock().await;
        let user = state.gate.current_user().ok_or(GateError::NotAuthenticated)?;
        Ok(dashboard_view(
            &user.name,
            state.finance.as_ref().map(|f| (f, state.fee_pending)),
            &state.enrolled,
            &state.instructors,
        ))
    }

    /// Fetches finance and re-derives the fee-pending flag.
    ///
    /// Each call takes a ticket before sending. A reply is applied only if its
    /// ticket is newer than the last applied one, so when refreshes overlap the
    /// most recently issued one wins.
    pub async fn refresh_finance(&self) -> PortalResult<Option<FinanceView>> {
        let (user_id, epoch, ticket) = {
            let mut state = self.state.lock().await;
            let (user_id, epoch) = state.scope()?;
            state.finance_issued += 1;
            (user_id, epoch, state.finance_issued)
        };

        let reply = self.api.fetch_finance(user_id).await?;
        let reported = into_data(reply, "Could not load finance")?;
        let (summary, issues) = sanitize_finance(reported);
        for issue in &issues {
            warn!(%user_id, "{}", issue);
        }

        let mut state = self.state.lock().await;
        if state.epoch != epoch || ticket <= state.finance_applied {
            debug!(ticket, applied = state.finance_applied, "Discarding stale finance reply");
            return Ok(state.finance_view());
        }
        state.finance_applied = ticket;
        state.finance = Some(summary);
        state.fee_pending = compute_fee_pending(&summary);
        debug!(fee_pending = state.fee_pending, "Finance refreshed");
        Ok(state.finance_view())
    }

    async fn refresh_enrolled(&self) -> PortalResult<()> {
        let (user_id, epoch) = self.state.lock().await.scope()?;
        let reply = self.api.fetch_enrolled_courses(user_id).await?;
        let enrolled = into_data(reply, "Could not load enrolled courses")?;

        let mut state = self.state.lock().await;
        if state.epoch == epoch {
            state.enrolled = enrolled;
        }
        Ok(())
    }

    async fn refresh_instructors(&self) -> PortalResult<()> {
        let (_, epoch) = self.state.lock().await.scope()?;
        let reply = self.api.fetch_instructors().await?;
        let instructors = into_data(reply, "Could not load instructors")?;

        let mut state = self.state.lock().await;
        if state.epoch == epoch {
            state.instructors = instructors;
        }
        Ok(())
    }

    // --- Payments ---

    /// Pays toward outstanding fees, then refreshes finance and returns to the dashboard.
    pub async fn pay(&self, amount: f64) -> PortalResult<Option<FinanceView>> {
        let user_id = {
            let state = self.state.lock().await;
            let user_id = state.gate.require_user_id()?;
            match &state.finance {
                Some(finance) => validate_payment(finance, amount)?,
                None if !amount.is_finite() || amount <= 0.0 => {
                    return Err(PaymentRejection::InvalidAmount.into())
                }
                None => {}
            }
            user_id
        };

        let reply = self.api.pay(user_id, amount).await?;
        into_ack(reply, "Payment failed")?;
        info!(%user_id, amount, "Payment accepted");

        let finance = self.refresh_finance().await?;
        let mut state = self.state.lock().await;
        if state.gate.is_navigation_allowed() {
            state.page = Page::Dashboard;
        }
        Ok(finance)
    }

    // --- Courses ---

    pub async fn load_courses(&self) -> PortalResult<Vec<CourseCard>> {
        let (user_id, epoch) = self.state.lock().await.scope()?;
        let reply = self.api.fetch_all_courses(user_id).await?;
        let courses = into_data(reply, "Failed to load courses")?;

        let mut state = self.state.lock().await;
        if state.epoch == epoch {
            state.courses = courses;
        }
        Ok(course_cards(&state.courses, state.fee_pending))
    }

    /// Case-insensitive search over the last loaded catalogue.
    pub async fn search_courses(&self, term: &str) -> PortalResult<Vec<CourseCard>> {
        let state = self.state.lock().await;
        state.gate.require_user_id()?;
        Ok(course_cards(
            &filter_courses_by_term(&state.courses, term),
            state.fee_pending,
        ))
    }

    pub async fn enroll(&self, course_id: CourseId) -> PortalResult<Vec<CourseCard>> {
        self.change_enrollment(course_id, EnrollmentChange::Enroll).await
    }

    pub async fn drop_course(&self, course_id: CourseId) -> PortalResult<Vec<CourseCard>> {
        self.change_enrollment(course_id, EnrollmentChange::Drop).await
    }

    /// Re-checks fees before acting so the decision never rests on a stale flag.
    /// The server is still expected to refuse changes while fees are overdue.
    async fn change_enrollment(
        &self,
        course_id: CourseId,
        change: EnrollmentChange,
    ) -> PortalResult<Vec<CourseCard>> {
        self.refresh_finance().await?;

        let user_id = {
            let state = self.state.lock().await;
            let user_id = state.gate.require_user_id()?;
            let course = state
                .courses
                .iter()
                .find(|c| c.course_id == course_id)
                .ok_or_else(|| PortalError::Validation(format!("Unknown course {}", course_id)))?;

            match compute_course_action(course, state.fee_pending) {
                CourseAction::Blocked => {
                    warn!(%user_id, %course_id, "Course change blocked by pending fees");
                    return Err(PortalError::FeesPending);
                }
                action if action != change.action() => {
                    return Err(PortalError::Validation(format!(
                        "Cannot {:?} course {}: available action is {:?}",
                        change, course_id, action
                    )));
                }
                _ => user_id,
            }
        };

        let reply = match change {
            EnrollmentChange::Enroll => self.api.enroll(user_id, course_id).await?,
            EnrollmentChange::Drop => self.api.drop_course(user_id, course_id).await?,
        };
        into_ack(reply, "Course update failed")?;
        info!(%user_id, %course_id, ?change, "Enrollment changed");

        let (cards, enrolled) = futures::join!(self.load_courses(), self.refresh_enrolled());
        enrolled?;
        cards
    }

    // --- Profile ---

    pub async fn load_profile(&self) -> PortalResult<ProfileView> {
        let (user_id, epoch) = self.state.lock().await.scope()?;
        let reply = self.api.fetch_profile(user_id).await?;
        let profile = into_data(reply, "Failed to load profile")?;

        let mut state = self.state.lock().await;
        if state.epoch != epoch {
            debug!(%user_id, "Dropping profile from a previous session");
            return Err(GateError::NotAuthenticated.into());
        }
        state.gate.apply_profile(&profile)?;
        Ok(profile_view(&profile))
    }

    /// Saves the profile; the session user picks up the new values.
    pub async fn save_profile(&self, update: ProfileUpdate) -> PortalResult<ProfileView> {
        let Some(name) = required(&update.name) else {
            return Err(PortalError::Validation("Name is required".to_string()));
        };
        let update = ProfileUpdate { name, ..update };

        let (user_id, epoch) = self.state.lock().await.scope()?;
        let reply = self.api.update_profile(user_id, &update).await?;
        into_ack(reply, "Failed to save details")?;
        info!(%user_id, "Profile saved");

        let saved = Profile {
            name: Some(update.name.clone()),
            registration_no: required(&update.registration_no),
            phone: required(&update.phone),
            department: required(&update.department),
            year: required(&update.year),
            cgpa: required(&update.cgpa),
        };
        let mut state = self.state.lock().await;
        if state.epoch != epoch {
            debug!(%user_id, "Session ended while the profile was saving");
            return Err(GateError::NotAuthenticated.into());
        }
        state.gate.apply_profile(&saved)?;
        Ok(profile_view(&saved))
    }

    // --- Attendance ---

    pub async fn load_attendance(&self) -> PortalResult<AttendanceView> {
        let (user_id, epoch) = self.state.lock().await.scope()?;
        let reply = self.api.fetch_attendance(user_id).await?;
        let records = into_data(reply, "Failed to load attendance")?;
        if self.state.lock().await.epoch != epoch {
            debug!(%user_id, "Dropping attendance from a previous session");
            return Err(GateError::NotAuthenticated.into());
        }
        if records.is_empty() {
            debug!(%user_id, "{}", DataIssue::EmptyAttendanceSet);
        }
        Ok(attendance_view(&records))
    }
}
