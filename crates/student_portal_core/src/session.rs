//! crates/student_portal_core/src/session.rs
//!
//! The session gate: the single owner of "who is logged in". Navigation and
//! every user-scoped API call ask the gate first, so no caller has to re-check
//! authentication on its own.

use chrono::{DateTime, Utc};

use crate::domain::{LoginPayload, Profile, Reply, User, UserId};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GateError {
    #[error("Not logged in")]
    NotAuthenticated,
    #[error("{0}")]
    LoginRejected(String),
    #[error("Malformed user in login reply: {0}")]
    MalformedUser(String),
}

/// A browser login session: the user plus when it began.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub user: User,
    pub authenticated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(ActiveSession),
}

#[derive(Debug, Default)]
pub struct SessionGate {
    state: SessionState,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// True only while a user is logged in.
    pub fn is_navigation_allowed(&self) -> bool {
        matches!(self.state, SessionState::Authenticated(_))
    }

    pub fn current_user(&self) -> Option<&User> {
        match &self.state {
            SessionState::Authenticated(session) => Some(&session.user),
            SessionState::Anonymous => None,
        }
    }

    pub fn authenticated_at(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            SessionState::Authenticated(session) => Some(session.authenticated_at),
            SessionState::Anonymous => None,
        }
    }

    /// The id to parameterize user-scoped requests with.
    /// Fails while anonymous so that such requests are never sent.
    pub fn require_user_id(&self) -> Result<UserId, GateError> {
        self.current_user()
            .map(|user| user.id)
            .ok_or(GateError::NotAuthenticated)
    }

    /// Applies a login reply. Only a successful reply whose user has both an id
    /// and a non-blank name authenticates; anything else leaves the gate
    /// anonymous and reports why.
    pub fn apply_login(&mut self, reply: Reply<LoginPayload>) -> Result<&User, GateError> {
        let user = match Self::user_from_reply(reply) {
            Ok(user) => user,
            Err(e) => {
                self.state = SessionState::Anonymous;
                return Err(e);
            }
        };

        self.state = SessionState::Authenticated(ActiveSession {
            user,
            authenticated_at: Utc::now(),
        });
        self.current_user().ok_or(GateError::NotAuthenticated)
    }

    /// Leaves the session. No server call is involved.
    pub fn logout(&mut self) {
        self.state = SessionState::Anonymous;
    }

    /// Copies loaded or saved profile fields into the session-owned user.
    /// A blank name never replaces the one the session was opened with.
    pub fn apply_profile(&mut self, profile: &Profile) -> Result<(), GateError> {
        let SessionState::Authenticated(session) = &self.state else {
            return Err(GateError::NotAuthenticated);
        };
        let mut next = session.clone();
        if let Some(name) = profile.name.as_deref().filter(|n| !n.trim().is_empty()) {
            next.user.name = name.trim().to_string();
        }
        next.user.registration_no = profile.registration_no.clone();
        next.user.phone = profile.phone.clone();
        next.user.department = profile.department.clone();
        next.user.year = profile.year.clone();
        next.user.cgpa = profile.cgpa.clone();
        self.state = SessionState::Authenticated(next);
        Ok(())
    }

    fn user_from_reply(reply: Reply<LoginPayload>) -> Result<User, GateError> {
        if !reply.success {
            return Err(GateError::LoginRejected(
                reply
                    .message
                    .unwrap_or_else(|| "Invalid email or password".to_string()),
            ));
        }

        let payload = reply
            .data
            .ok_or_else(|| GateError::MalformedUser("reply has no user".to_string()))?;
        let id = payload
            .id
            .ok_or_else(|| GateError::MalformedUser("missing id".to_string()))?;
        let name = payload
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| GateError::MalformedUser("missing name".to_string()))?;

        let mut user = User::new(UserId(id), name);
        user.email = payload.email;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(id: Option<i64>, name: Option<&str>) -> LoginPayload {
        LoginPayload {
            id,
            name: name.map(str::to_string),
            email: Some("ada@example.edu".to_string()),
        }
    }

    #[test]
    fn anonymous_before_any_login() {
        let gate = SessionGate::new();
        assert!(!gate.is_navigation_allowed());
        assert_eq!(gate.require_user_id(), Err(GateError::NotAuthenticated));
        assert!(gate.current_user().is_none());
    }

    #[test]
    fn successful_login_then_logout() {
        let mut gate = SessionGate::new();
        let user = gate
            .apply_login(Reply::ok(payload(Some(7), Some("Ada Lovelace"))))
            .expect("login should succeed")
            .clone();
        assert_eq!(user.id, UserId(7));
        assert_eq!(user.name, "Ada Lovelace");
        assert_eq!(user.email.as_deref(), Some("ada@example.edu"));
        assert!(gate.is_navigation_allowed());
        assert_eq!(gate.require_user_id(), Ok(UserId(7)));
        assert!(gate.authenticated_at().is_some());

        gate.logout();
        assert!(!gate.is_navigation_allowed());
        assert_eq!(gate.state(), &SessionState::Anonymous);
        assert_eq!(gate.require_user_id(), Err(GateError::NotAuthenticated));
    }

    #[test]
    fn rejected_login_stays_anonymous() {
        let mut gate = SessionGate::new();
        let err = gate
            .apply_login(Reply::failed("Invalid email or password"))
            .unwrap_err();
        assert_eq!(err, GateError::LoginRejected("Invalid email or password".to_string()));
        assert!(!gate.is_navigation_allowed());
    }

    #[test]
    fn malformed_payloads_are_failed_logins() {
        let mut gate = SessionGate::new();
        for reply in [
            Reply::ok(payload(None, Some("Ada"))),
            Reply::ok(payload(Some(1), None)),
            Reply::ok(payload(Some(1), Some("   "))),
            Reply {
                success: true,
                message: None,
                data: None,
            },
        ] {
            assert!(matches!(gate.apply_login(reply), Err(GateError::MalformedUser(_))));
            assert!(!gate.is_navigation_allowed());
        }
    }

    #[test]
    fn failed_login_replaces_existing_session() {
        let mut gate = SessionGate::new();
        gate.apply_login(Reply::ok(payload(Some(1), Some("Ada")))).unwrap();
        assert!(gate.apply_login(Reply::failed("nope")).is_err());
        assert!(!gate.is_navigation_allowed());
    }

    #[test]
    fn profile_updates_require_session() {
        let mut gate = SessionGate::new();
        let profile = Profile {
            name: Some("Grace Hopper".to_string()),
            department: Some("Navy".to_string()),
            ..Profile::default()
        };
        assert_eq!(gate.apply_profile(&profile), Err(GateError::NotAuthenticated));

        gate.apply_login(Reply::ok(payload(Some(1), Some("Ada")))).unwrap();
        gate.apply_profile(&profile).unwrap();
        let user = gate.current_user().unwrap();
        assert_eq!(user.name, "Grace Hopper");
        assert_eq!(user.department.as_deref(), Some("Navy"));
        assert_eq!(gate.require_user_id(), Ok(UserId(1)));
    }

    #[test]
    fn blank_profile_name_keeps_session_name() {
        let mut gate = SessionGate::new();
        gate.apply_login(Reply::ok(payload(Some(1), Some("Ada")))).unwrap();
        gate.apply_profile(&Profile::default()).unwrap();
        assert_eq!(gate.current_user().map(|u| u.name.as_str()), Some("Ada"));
    }
}
