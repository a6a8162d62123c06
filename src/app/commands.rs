//! Command handlers - business logic for processing UI events and network responses

use std::time::{Duration, Instant};

use crate::admin::{
    self, AdminPanel, AdminPopup, CreateUserForm, PermissionEditor, PermissionMatrix, ResetField,
    ResetPasswordForm,
};
use crate::app::state::{Alert, LoginForm, PendingCall};
use crate::app::AppState;
use crate::constants::LOGIN_ERROR_SECS;
use crate::error::{ApiError, ValidationError};
use crate::messages::render::AlertKind;
use crate::messages::ui_events::{LoginField, Screen};
use crate::messages::{ApiCall, ApiPayload, NetworkCommand, NetworkResponse};
use crate::models::{PlugAction, Role};
use crate::session::ClientSession;

const POLL_FAILED: &str = "Failed to load plug information.";
const ADMIN_REQUIRED: &str = "Administrator privileges required.";
const INVALID_CREDENTIALS: &str = "Invalid username or password.";
const CHECK_INPUT: &str = "Please check your input.";
const NO_TOKEN: &str = "No token in response.";

impl AppState {
    // ========================
    // Session lifecycle
    // ========================

    /// Resume a stored session, or show the login screen
    pub fn start(&mut self, now: Instant) -> Vec<NetworkCommand> {
        match self.store.get() {
            Some(token) => {
                self.open_session(token, now);
                self.tick(now)
            }
            None => {
                self.enter_login(false);
                Vec::new()
            }
        }
    }

    fn open_session(&mut self, token: String, now: Instant) {
        let session = ClientSession::resolve(token, self.config.username.as_deref());
        tracing::info!(identity = %session.identity, "Session opened");
        self.session = Some(session);
        self.screen = Screen::Dashboard;
        self.board.reset();
        self.selected_row = 0;
        self.poll.start(now);
    }

    /// Drop the session and everything in flight, then show the login form
    fn enter_login(&mut self, expired: bool) {
        self.store.clear();
        self.session = None;
        self.screen = Screen::Login;
        self.login = LoginForm {
            expired,
            ..LoginForm::default()
        };
        self.board.reset();
        self.selected_row = 0;
        self.admin = Default::default();
        self.pending.clear();
        self.poll.stop();
        self.alert = None;
        self.show_help = false;
    }

    fn expire_session(&mut self) {
        tracing::warn!(identity = %self.identity(), "Session expired");
        self.enter_login(true);
    }

    pub fn logout(&mut self) -> Option<NetworkCommand> {
        let session = self.session.take()?;
        tracing::info!(identity = %session.identity, "Logging out");
        let id = self.next_id();
        let credentials = session.credentials(self.store.cookie_header());
        self.enter_login(false);
        self.pending.insert(id, PendingCall::Logout);
        Some(NetworkCommand::Execute {
            id,
            call: ApiCall::Logout,
            credentials: Some(credentials),
        })
    }

    // ========================
    // Requests and alerts
    // ========================

    fn issue(&mut self, call: ApiCall, pending: PendingCall) -> (u64, NetworkCommand) {
        let id = self.next_id();
        self.pending.insert(id, pending);
        let cookie = self.store.cookie_header();
        let credentials = self.session.as_ref().map(|s| s.credentials(cookie));
        (id, NetworkCommand::Execute { id, call, credentials })
    }

    fn request(&mut self, call: ApiCall, pending: PendingCall) -> NetworkCommand {
        self.issue(call, pending).1
    }

    fn notify(&mut self, kind: AlertKind, message: impl Into<String>, now: Instant) {
        self.alert = Some(Alert::new(kind, message, now, self.config.alert_duration()));
    }

    fn notify_error(&mut self, message: impl Into<String>, now: Instant) {
        self.notify(AlertKind::Error, message, now);
    }

    fn notify_success(&mut self, message: impl Into<String>, now: Instant) {
        self.notify(AlertKind::Success, message, now);
    }

    /// Housekeeping: expire alerts and start a poll cycle when due
    pub fn tick(&mut self, now: Instant) -> Vec<NetworkCommand> {
        if self.alert.as_ref().is_some_and(|a| a.is_expired(now)) {
            self.alert = None;
        }
        if self.login.error.as_ref().is_some_and(|a| a.is_expired(now)) {
            self.login.error = None;
        }

        let mut commands = Vec::new();
        if self.session.is_some() && self.poll.due(now) {
            let (id, cmd) = self.issue(ApiCall::ListPlugs, PendingCall::Poll);
            tracing::debug!(id, "Poll cycle started");
            self.poll.begin(id);
            commands.push(cmd);
        }
        commands
    }

    // ========================
    // Login form
    // ========================

    pub fn login_char(&mut self, c: char) {
        if self.login.submitting {
            return;
        }
        match self.login.field {
            LoginField::Username => self.login.username.push(c),
            LoginField::Password => self.login.password.push(c),
        }
    }

    pub fn login_backspace(&mut self) {
        match self.login.field {
            LoginField::Username => self.login.username.pop(),
            LoginField::Password => self.login.password.pop(),
        };
    }

    pub fn login_next_field(&mut self) {
        self.login.field = match self.login.field {
            LoginField::Username => LoginField::Password,
            LoginField::Password => LoginField::Username,
        };
    }

    pub fn submit_login(&mut self, now: Instant) -> Option<NetworkCommand> {
        if self.login.submitting {
            return None;
        }
        let username = self.login.username.trim().to_string();
        if username.is_empty() || self.login.password.is_empty() {
            self.login_error(ValidationError::MissingCredentials.to_string(), now);
            return None;
        }
        self.login.submitting = true;
        self.login.error = None;
        let call = ApiCall::Login {
            username,
            password: self.login.password.clone(),
        };
        Some(self.request(call, PendingCall::Login))
    }

    fn login_error(&mut self, message: impl Into<String>, now: Instant) {
        self.login.error = Some(Alert::new(
            AlertKind::Error,
            message,
            now,
            Duration::from_secs(LOGIN_ERROR_SECS),
        ));
    }

    fn finish_login(&mut self, result: Result<ApiPayload, ApiError>, now: Instant) -> Vec<NetworkCommand> {
        self.login.submitting = false;
        match result {
            Ok(ApiPayload::LoggedIn(response)) => {
                match response.access_token.filter(|t| !t.trim().is_empty()) {
                    Some(token) => {
                        self.store.save(&token);
                        self.login = LoginForm::default();
                        self.open_session(token, now);
                        self.tick(now)
                    }
                    None => {
                        self.login_error(NO_TOKEN, now);
                        Vec::new()
                    }
                }
            }
            Ok(other) => {
                tracing::warn!(payload = ?other, "Unexpected login payload");
                self.login_error(NO_TOKEN, now);
                Vec::new()
            }
            Err(e) => {
                self.login_error(login_failure_message(&e), now);
                Vec::new()
            }
        }
    }

    // ========================
    // Dashboard
    // ========================

    pub fn select_prev(&mut self) {
        self.selected_row = self.selected_row.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        if self.selected_row + 1 < self.board.len() {
            self.selected_row += 1;
        }
    }

    pub fn use_selected(&mut self) -> Option<NetworkCommand> {
        self.dispatch(PlugAction::On)
    }

    pub fn leave_selected(&mut self) -> Option<NetworkCommand> {
        self.dispatch(PlugAction::Off)
    }

    /// Activate/deactivate the selected plug unless that control is
    /// disabled or already busy
    fn dispatch(&mut self, action: PlugAction) -> Option<NetworkCommand> {
        if self.screen != Screen::Dashboard {
            return None;
        }
        let name = self.selected_plug()?;
        let identity = self.identity().to_string();
        if !self.board.begin_action(&name, action, &identity) {
            tracing::debug!(plug = %name, action = action.as_str(), "Control disabled or busy");
            return None;
        }
        let call = ApiCall::TogglePlug {
            name: name.clone(),
            action,
        };
        Some(self.request(call, PendingCall::Toggle { name, action }))
    }

    /// Out-of-band full refresh; does not move the poll schedule
    pub fn refresh(&mut self) -> Option<NetworkCommand> {
        if self.session.is_none() || self.screen != Screen::Dashboard {
            return None;
        }
        Some(self.request(ApiCall::ListPlugs, PendingCall::Refresh))
    }

    fn apply_snapshot(&mut self, result: Result<ApiPayload, ApiError>, now: Instant) {
        match result {
            Ok(ApiPayload::Plugs(records)) => {
                self.board.apply_snapshot(records);
                if self.selected_row >= self.board.len() {
                    self.selected_row = self.board.len().saturating_sub(1);
                }
            }
            Ok(other) => {
                tracing::warn!(payload = ?other, "Unexpected plug list payload");
                self.notify_error(POLL_FAILED, now);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Plug list fetch failed");
                self.notify_error(POLL_FAILED, now);
            }
        }
    }

    // ========================
    // Admin console
    // ========================

    pub fn open_admin(&mut self) -> Vec<NetworkCommand> {
        if self.session.is_none() {
            return Vec::new();
        }
        self.poll.stop();
        self.abandon(|p| {
            matches!(p, PendingCall::Poll | PendingCall::Refresh | PendingCall::Toggle { .. })
        });
        self.screen = Screen::Admin;
        self.admin = Default::default();
        self.admin_reload()
    }

    pub fn back_to_dashboard(&mut self, now: Instant) -> Vec<NetworkCommand> {
        if self.session.is_none() {
            return Vec::new();
        }
        self.abandon(|p| {
            !matches!(
                p,
                PendingCall::Poll | PendingCall::Refresh | PendingCall::Toggle { .. } | PendingCall::Logout
            )
        });
        self.admin = Default::default();
        self.screen = Screen::Dashboard;
        self.board.reset();
        self.selected_row = 0;
        self.poll.start(now);
        self.tick(now)
    }

    /// Forget in-flight requests of a screen being left
    fn abandon(&mut self, filter: impl Fn(&PendingCall) -> bool) {
        self.pending.retain(|_, p| !filter(p));
    }

    pub fn admin_reload(&mut self) -> Vec<NetworkCommand> {
        vec![
            self.request(ApiCall::ListUsers, PendingCall::Users),
            self.request(ApiCall::LoadPermissions, PendingCall::Permissions),
        ]
    }

    fn reload_permissions(&mut self) -> NetworkCommand {
        self.request(ApiCall::LoadPermissions, PendingCall::Permissions)
    }

    pub fn admin_new_user(&mut self) {
        if self.admin.popup.is_none() {
            self.admin.popup = Some(AdminPopup::CreateUser(CreateUserForm::default()));
        }
    }

    pub fn admin_reset_password(&mut self) {
        if self.admin.popup.is_some() || self.admin.panel != AdminPanel::Users {
            return;
        }
        if let Some(user) = self.admin.selected() {
            self.admin.popup = Some(AdminPopup::ResetPassword(ResetPasswordForm {
                user_id: user.id,
                username: user.username.clone(),
                new_password: String::new(),
                confirm: String::new(),
                field: ResetField::NewPassword,
            }));
        }
    }

    pub fn admin_delete_user(&mut self, now: Instant) {
        if self.admin.popup.is_some() || self.admin.panel != AdminPanel::Users {
            return;
        }
        let Some(user) = self.admin.selected().cloned() else {
            return;
        };
        match admin::check_deletable(&user.username, self.identity()) {
            Ok(()) => {
                self.admin.popup = Some(AdminPopup::ConfirmDelete {
                    user_id: user.id,
                    username: user.username,
                });
            }
            Err(e) => self.notify_error(e.to_string(), now),
        }
    }

    /// Checkbox popup for the user under the cursor
    pub fn admin_edit_permissions(&mut self, now: Instant) {
        if self.admin.popup.is_some() || !self.admin.matrix_loaded {
            return;
        }
        let target = match self.admin.panel {
            AdminPanel::Users => self
                .admin
                .selected()
                .map(|u| (u.id, u.username.clone(), u.role)),
            AdminPanel::Permissions => self
                .admin
                .matrix
                .rows
                .get(self.admin.matrix_row)
                .map(|u| (u.id, u.username.clone(), u.role)),
        };
        let Some((user_id, username, role)) = target else {
            return;
        };
        if role == Role::Admin {
            self.notify_error("Administrators can already use every plug.", now);
            return;
        }
        let allowed = self.admin.matrix.allowed_for(user_id);
        let editor = PermissionEditor::new(user_id, username, &self.admin.matrix.plugs, &allowed);
        self.admin.popup = Some(AdminPopup::EditPermissions(editor));
    }

    /// Flip the matrix cell optimistically and send grant or revoke
    pub fn admin_toggle_permission(&mut self) -> Option<NetworkCommand> {
        if self.admin.popup.is_some() || self.admin.panel != AdminPanel::Permissions {
            return None;
        }
        let (user_id, plug_name) = self.admin.matrix_cell()?;
        let grant = !self.admin.matrix.is_checked(user_id, &plug_name);
        self.admin.matrix.set(user_id, &plug_name, grant);
        let call = ApiCall::SetPermission {
            user_id,
            plug_name: plug_name.clone(),
            grant,
        };
        Some(self.request(
            call,
            PendingCall::SetPermission {
                user_id,
                plug_name,
                grant,
            },
        ))
    }

    pub fn popup_cancel(&mut self) {
        self.admin.popup = None;
    }

    pub fn popup_submit(&mut self, now: Instant) -> Option<NetworkCommand> {
        match self.admin.popup.clone()? {
            AdminPopup::CreateUser(form) => {
                match admin::validate_new_user(&form.username, &form.password, form.role) {
                    Ok(user) => {
                        self.admin.popup = None;
                        let username = user.username.clone();
                        Some(self.request(ApiCall::CreateUser(user), PendingCall::CreateUser { username }))
                    }
                    Err(e) => {
                        self.notify_error(e.to_string(), now);
                        None
                    }
                }
            }
            AdminPopup::ResetPassword(form) => {
                match admin::validate_password_reset(&form.new_password, &form.confirm) {
                    Ok(new_password) => {
                        self.admin.popup = None;
                        let call = ApiCall::ResetPassword {
                            user_id: form.user_id,
                            new_password,
                        };
                        Some(self.request(call, PendingCall::ResetPassword))
                    }
                    Err(e) => {
                        self.notify_error(e.to_string(), now);
                        None
                    }
                }
            }
            AdminPopup::EditPermissions(editor) => {
                self.admin.popup = None;
                let call = ApiCall::SyncPermissions {
                    user_id: editor.user_id,
                    selected: editor.selected(),
                };
                Some(self.request(
                    call,
                    PendingCall::SyncPermissions {
                        username: editor.username,
                    },
                ))
            }
            AdminPopup::ConfirmDelete { .. } => self.confirm_delete(),
        }
    }

    pub fn confirm_delete(&mut self) -> Option<NetworkCommand> {
        match self.admin.popup.take() {
            Some(AdminPopup::ConfirmDelete { user_id, username }) => {
                tracing::info!(user_id, username = %username, "Deleting user");
                Some(self.request(ApiCall::DeleteUser { user_id }, PendingCall::DeleteUser))
            }
            other => {
                self.admin.popup = other;
                None
            }
        }
    }

    /// Back to the dashboard when the backend refuses admin access
    fn admin_forbidden(&mut self, now: Instant) -> Vec<NetworkCommand> {
        let commands = self.back_to_dashboard(now);
        self.notify_error(ADMIN_REQUIRED, now);
        commands
    }

    // ========================
    // Popups
    // ========================

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn close_help(&mut self) {
        self.show_help = false;
    }

    // ========================
    // Network responses
    // ========================

    /// Apply a finished request. Returns follow-up requests.
    pub fn handle_response(&mut self, response: NetworkResponse, now: Instant) -> Vec<NetworkCommand> {
        let NetworkResponse { id, result, time_ms } = response;
        let Some(pending) = self.pending.remove(&id) else {
            tracing::debug!(id, "Dropping response for abandoned request");
            return Vec::new();
        };
        tracing::debug!(id, time_ms, call = ?pending, ok = result.is_ok(), "Response received");

        match pending {
            PendingCall::Login => return self.finish_login(result, now),
            PendingCall::Logout => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "Logout request failed");
                }
                return Vec::new();
            }
            _ => {}
        }

        if result.as_ref().is_err_and(ApiError::is_auth_expired) {
            self.expire_session();
            return Vec::new();
        }

        let mut commands = Vec::new();
        match pending {
            PendingCall::Poll => {
                self.apply_snapshot(result, now);
                self.poll.finish(id, now);
            }
            PendingCall::Refresh => self.apply_snapshot(result, now),
            PendingCall::Toggle { name, action } => {
                match result {
                    Ok(ApiPayload::Toggled(status)) => {
                        let identity = self.identity().to_string();
                        self.board.complete_action(&name, action, &status, &identity);
                    }
                    Ok(other) => {
                        tracing::warn!(payload = ?other, "Unexpected toggle payload");
                        self.board.fail_action(&name, action);
                        self.notify_error(
                            format!("Unexpected response to {} on '{}'.", action.label(), name),
                            now,
                        );
                    }
                    Err(e) => {
                        self.board.fail_action(&name, action);
                        self.notify_error(e.to_string(), now);
                    }
                }
                commands.extend(self.refresh());
            }
            PendingCall::Users => match result {
                Ok(ApiPayload::Users(users)) => self.admin.set_users(users),
                Ok(other) => {
                    tracing::warn!(payload = ?other, "Unexpected user list payload");
                    self.notify_error("Failed to load users.", now);
                }
                Err(e) if e.status() == Some(403) => return self.admin_forbidden(now),
                Err(e) => self.notify_error(
                    rejection_or(&e, |status| format!("Failed to load users (HTTP {}).", status)),
                    now,
                ),
            },
            PendingCall::Permissions => match result {
                Ok(ApiPayload::Permissions { users, plugs }) => {
                    self.admin.set_matrix(PermissionMatrix::new(users, plugs));
                }
                Ok(other) => {
                    tracing::warn!(payload = ?other, "Unexpected permissions payload");
                    self.notify_error("Failed to load permissions.", now);
                }
                Err(e) if e.status() == Some(403) => return self.admin_forbidden(now),
                Err(e) => self.notify_error(format!("Failed to load permissions: {}", e), now),
            },
            PendingCall::CreateUser { username } => match result {
                Ok(_) => {
                    self.notify_success(format!("User '{}' was created.", username), now);
                    commands.extend(self.admin_reload());
                }
                Err(e) => self.notify_error(
                    rejection_or(&e, |status| format!("Failed to create user (HTTP {})", status)),
                    now,
                ),
            },
            PendingCall::ResetPassword => match result {
                Ok(ApiPayload::Message(msg)) => self.notify_success(msg, now),
                Ok(_) => self.notify_success("Password was reset.", now),
                Err(e) => self.notify_error(rejection_or(&e, |_| "Failed to reset the password.".into()), now),
            },
            PendingCall::DeleteUser => {
                match result {
                    Ok(ApiPayload::Message(msg)) => self.notify_success(msg, now),
                    Ok(_) => self.notify_success("User was deleted.", now),
                    Err(e) => self.notify_error(rejection_or(&e, |_| "Failed to delete the user.".into()), now),
                }
                commands.extend(self.admin_reload());
            }
            PendingCall::SetPermission {
                user_id,
                plug_name,
                grant,
            } => match result {
                Ok(payload) => {
                    if let ApiPayload::Message(msg) = payload {
                        self.notify_success(msg, now);
                    }
                    commands.push(self.reload_permissions());
                }
                Err(e) => {
                    self.admin.matrix.set(user_id, &plug_name, !grant);
                    let verb = if grant { "grant" } else { "revoke" };
                    self.notify_error(
                        rejection_or(&e, |_| format!("Failed to {} the permission.", verb)),
                        now,
                    );
                }
            },
            PendingCall::SyncPermissions { username } => {
                match result {
                    Ok(ApiPayload::Synced(report)) if report.failures.is_empty() => {
                        self.notify_success(
                            format!("Plug permissions of user {} were updated.", username),
                            now,
                        );
                    }
                    Ok(ApiPayload::Synced(report)) => {
                        tracing::warn!(failures = ?report.failures, "Permission sync partially failed");
                        self.notify_error(
                            format!(
                                "Some permission updates failed. Succeeded: {}, failed: {}",
                                report.succeeded,
                                report.failures.len()
                            ),
                            now,
                        );
                    }
                    Ok(other) => {
                        tracing::warn!(payload = ?other, "Unexpected sync payload");
                        self.notify_error("Failed to save permissions.", now);
                    }
                    Err(e) => self.notify_error(format!("Failed to save permissions: {}", e), now),
                }
                commands.push(self.reload_permissions());
            }
            PendingCall::Login | PendingCall::Logout => {}
        }
        commands
    }
}

fn login_failure_message(e: &ApiError) -> String {
    match e {
        ApiError::AuthExpired | ApiError::ServerRejected { status: 401, .. } => INVALID_CREDENTIALS.into(),
        ApiError::ServerRejected { status: 422, .. } => CHECK_INPUT.into(),
        ApiError::ServerRejected { detail, .. } => detail.clone(),
        ApiError::Transport(_) | ApiError::MalformedResponse(_) => format!("Login failed: {}", e),
    }
}

/// The server's detail when it sent one, otherwise a screen-specific fallback
fn rejection_or(e: &ApiError, fallback: impl FnOnce(u16) -> String) -> String {
    match e {
        ApiError::ServerRejected { status, detail } if *detail == format!("HTTP {}", status) => {
            fallback(*status)
        }
        other => other.to_string(),
    }
}
