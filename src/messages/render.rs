//! Render state - data structure sent from App layer to UI for rendering

use crate::admin::AdminState;
use crate::dashboard::TableRow;
use crate::messages::ui_events::{LoginField, PopupKind, Screen};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertKind {
    Success,
    Error,
}

/// Transient message as the UI shows it
#[derive(Clone, Debug, PartialEq)]
pub struct AlertView {
    pub kind: AlertKind,
    pub message: String,
}

#[derive(Clone, Debug, Default)]
pub struct LoginView {
    pub username: String,
    /// Only the length is rendered, as bullets
    pub password_len: usize,
    pub field: LoginField,
    pub error: Option<String>,
    pub expired: bool,
    pub submitting: bool,
}

/// Complete state needed by the UI to render
#[derive(Debug, Clone, Default)]
pub struct RenderState {
    pub screen: Screen,
    pub base_url: String,
    pub identity: Option<String>,

    // Login
    pub login: LoginView,

    // Dashboard
    pub rows: Vec<TableRow>,
    pub loaded: bool,
    pub selected_row: usize,

    // Admin console
    pub admin: AdminState,

    // Popups
    pub alert: Option<AlertView>,
    pub show_help: bool,
}

impl RenderState {
    /// Popup that currently captures keys, if any
    pub fn popup_kind(&self) -> Option<PopupKind> {
        use crate::admin::AdminPopup;

        if self.screen != Screen::Admin {
            return None;
        }
        self.admin.popup.as_ref().map(|popup| match popup {
            AdminPopup::CreateUser(_) | AdminPopup::ResetPassword(_) => PopupKind::Form,
            AdminPopup::ConfirmDelete { .. } => PopupKind::Confirm,
            AdminPopup::EditPermissions(_) => PopupKind::Checklist,
        })
    }
}
