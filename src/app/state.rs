//! App state - pure data structure with no I/O logic

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::admin::AdminState;
use crate::config::Config;
use crate::dashboard::DeviceBoard;
use crate::messages::render::{AlertKind, AlertView, LoginView};
use crate::messages::ui_events::{LoginField, Screen};
use crate::messages::RenderState;
use crate::models::PlugAction;
use crate::session::ClientSession;
use crate::storage::TokenStore;

/// Transient message with its own expiry
#[derive(Clone, Debug)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
    pub expires_at: Instant,
}

impl Alert {
    pub fn new(kind: AlertKind, message: impl Into<String>, now: Instant, ttl: Duration) -> Self {
        Alert {
            kind,
            message: message.into(),
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Clone, Debug, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub field: LoginField,
    pub error: Option<Alert>,
    /// Set when the previous session ended with a 401
    pub expired: bool,
    pub submitting: bool,
}

/// Fixed-delay poll schedule: the next cycle is planned only once the
/// current one has completed, so cycles never overlap.
#[derive(Clone, Debug)]
pub struct PollSchedule {
    interval: Duration,
    active: bool,
    in_flight: Option<u64>,
    next_poll_at: Option<Instant>,
}

impl PollSchedule {
    pub fn new(interval: Duration) -> Self {
        PollSchedule {
            interval,
            active: false,
            in_flight: None,
            next_poll_at: None,
        }
    }

    /// Start polling, first cycle due immediately
    pub fn start(&mut self, now: Instant) {
        self.active = true;
        self.in_flight = None;
        self.next_poll_at = Some(now);
    }

    pub fn stop(&mut self) {
        self.active = false;
        self.in_flight = None;
        self.next_poll_at = None;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn due(&self, now: Instant) -> bool {
        self.active && self.in_flight.is_none() && self.next_poll_at.is_some_and(|at| now >= at)
    }

    pub fn begin(&mut self, id: u64) {
        self.in_flight = Some(id);
        self.next_poll_at = None;
    }

    /// Plan the next cycle `interval` after completion
    pub fn finish(&mut self, id: u64, now: Instant) {
        if self.in_flight == Some(id) {
            self.in_flight = None;
            if self.active {
                self.next_poll_at = Some(now + self.interval);
            }
        }
    }

    pub fn next_poll_at(&self) -> Option<Instant> {
        self.next_poll_at
    }
}

/// What a request id was issued for
#[derive(Clone, Debug, PartialEq)]
pub enum PendingCall {
    Poll,
    Refresh,
    Toggle { name: String, action: PlugAction },
    Login,
    Logout,
    Users,
    CreateUser { username: String },
    ResetPassword,
    DeleteUser,
    Permissions,
    SetPermission { user_id: i64, plug_name: String, grant: bool },
    SyncPermissions { username: String },
}

/// Main application state - pure data, no I/O except the token store
pub struct AppState {
    pub config: Config,
    pub store: Box<dyn TokenStore>,
    pub session: Option<ClientSession>,
    pub screen: Screen,

    // Login
    pub login: LoginForm,

    // Dashboard
    pub board: DeviceBoard,
    pub selected_row: usize,
    pub poll: PollSchedule,

    // Admin console
    pub admin: AdminState,

    // Requests
    pub next_request_id: u64,
    pub pending: HashMap<u64, PendingCall>,

    // Popups
    pub alert: Option<Alert>,
    pub show_help: bool,
}

impl AppState {
    pub fn new(config: Config, store: Box<dyn TokenStore>) -> Self {
        let poll = PollSchedule::new(config.poll_interval());
        AppState {
            config,
            store,
            session: None,
            screen: Screen::Login,
            login: LoginForm::default(),
            board: DeviceBoard::new(),
            selected_row: 0,
            poll,
            admin: AdminState::default(),
            next_request_id: 1,
            pending: HashMap::new(),
            alert: None,
            show_help: false,
        }
    }

    /// Generate a unique request ID
    pub fn next_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    pub fn identity(&self) -> &str {
        self.session.as_ref().map(|s| s.identity.as_str()).unwrap_or("")
    }

    /// Name of the plug under the dashboard cursor
    pub fn selected_plug(&self) -> Option<String> {
        self.board
            .records()
            .get(self.selected_row)
            .map(|r| r.name.clone())
    }

    /// Convert state to RenderState for UI
    pub fn to_render_state(&self) -> RenderState {
        RenderState {
            screen: self.screen,
            base_url: self.config.base_url.clone(),
            identity: self.session.as_ref().map(|s| s.identity.clone()),
            login: LoginView {
                username: self.login.username.clone(),
                password_len: self.login.password.chars().count(),
                field: self.login.field,
                error: self.login.error.as_ref().map(|a| a.message.clone()),
                expired: self.login.expired,
                submitting: self.login.submitting,
            },
            rows: self.board.rows(self.identity()),
            loaded: self.board.is_loaded(),
            selected_row: self.selected_row,
            admin: self.admin.clone(),
            alert: self.alert.as_ref().map(|a| AlertView {
                kind: a.kind,
                message: a.message.clone(),
            }),
            show_help: self.show_help,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_schedule_never_overlaps() {
        let t0 = Instant::now();
        let mut poll = PollSchedule::new(Duration::from_secs(15));
        assert!(!poll.due(t0));

        poll.start(t0);
        assert!(poll.due(t0));
        poll.begin(7);

        // Long after the interval, still busy
        assert!(!poll.due(t0 + Duration::from_secs(60)));

        let done = t0 + Duration::from_secs(61);
        poll.finish(7, done);
        assert!(!poll.due(done + Duration::from_secs(14)));
        assert!(poll.due(done + Duration::from_secs(15)));
    }

    #[test]
    fn test_poll_schedule_ignores_foreign_ids() {
        let t0 = Instant::now();
        let mut poll = PollSchedule::new(Duration::from_secs(15));
        poll.start(t0);
        poll.begin(1);
        poll.finish(2, t0);
        assert!(poll.next_poll_at().is_none());
        assert!(!poll.due(t0 + Duration::from_secs(60)));
    }

    #[test]
    fn test_stopped_schedule_is_never_due() {
        let t0 = Instant::now();
        let mut poll = PollSchedule::new(Duration::from_secs(1));
        poll.start(t0);
        poll.begin(1);
        poll.stop();
        poll.finish(1, t0);
        assert!(!poll.due(t0 + Duration::from_secs(10)));
    }

    #[test]
    fn test_alert_expiry() {
        let t0 = Instant::now();
        let alert = Alert::new(AlertKind::Error, "boom", t0, Duration::from_secs(4));
        assert!(!alert.is_expired(t0 + Duration::from_secs(3)));
        assert!(alert.is_expired(t0 + Duration::from_secs(4)));
    }
}
