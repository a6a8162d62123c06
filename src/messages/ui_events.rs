//! UI events - messages from UI layer to App layer

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Top-level screens
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Screen {
    #[default]
    Login,
    Dashboard,
    Admin,
}

/// What kind of popup is open, for key mapping
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PopupKind {
    /// Text fields (create user, reset password)
    Form,
    /// y/n question
    Confirm,
    /// Checkbox list (per-user permissions)
    Checklist,
}

/// Login form focus
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum LoginField {
    #[default]
    Username,
    Password,
}

/// Events generated from user input in the UI layer
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    // Login
    LoginChar(char),
    LoginBackspace,
    LoginNextField,
    SubmitLogin,

    // Dashboard
    SelectPrev,
    SelectNext,
    UsePlug,
    LeavePlug,
    Refresh,
    OpenAdmin,
    Logout,

    // Admin console
    AdminSwitchPanel,
    AdminUp,
    AdminDown,
    AdminLeft,
    AdminRight,
    AdminNewUser,
    AdminResetPassword,
    AdminDeleteUser,
    AdminEditPermissions,
    AdminTogglePermission,
    AdminReload,
    BackToDashboard,

    // Popups
    PopupChar(char),
    PopupBackspace,
    PopupNextField,
    PopupSubmit,
    PopupCancel,
    ConfirmYes,
    ConfirmNo,
    ToggleHelp,
    CloseHelp,

    // System
    Quit,
}

/// Convert a key event to a UiEvent based on current UI context
pub fn key_to_ui_event(
    key: KeyEvent,
    screen: Screen,
    popup: Option<PopupKind>,
    show_help: bool,
) -> Option<UiEvent> {
    use crossterm::event::KeyEventKind;

    if key.kind != KeyEventKind::Press {
        return None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(UiEvent::Quit);
    }

    if show_help {
        return Some(UiEvent::CloseHelp);
    }

    if let Some(kind) = popup {
        return handle_popup_keys(key, kind);
    }

    match screen {
        Screen::Login => handle_login_keys(key),
        Screen::Dashboard => handle_dashboard_keys(key),
        Screen::Admin => handle_admin_keys(key),
    }
}

/// The login form is always in editing mode
fn handle_login_keys(key: KeyEvent) -> Option<UiEvent> {
    match key.code {
        KeyCode::Esc => Some(UiEvent::Quit),
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => Some(UiEvent::LoginNextField),
        KeyCode::Enter => Some(UiEvent::SubmitLogin),
        KeyCode::Backspace => Some(UiEvent::LoginBackspace),
        KeyCode::Char(c) => Some(UiEvent::LoginChar(c)),
        _ => None,
    }
}

fn handle_dashboard_keys(key: KeyEvent) -> Option<UiEvent> {
    match key.code {
        KeyCode::Char('q') => Some(UiEvent::Quit),
        KeyCode::Char('?') => Some(UiEvent::ToggleHelp),
        KeyCode::Up | KeyCode::Char('k') => Some(UiEvent::SelectPrev),
        KeyCode::Down | KeyCode::Char('j') => Some(UiEvent::SelectNext),
        KeyCode::Char('u') | KeyCode::Enter => Some(UiEvent::UsePlug),
        KeyCode::Char('l') => Some(UiEvent::LeavePlug),
        KeyCode::Char('r') => Some(UiEvent::Refresh),
        KeyCode::Char('a') => Some(UiEvent::OpenAdmin),
        KeyCode::Char('o') => Some(UiEvent::Logout),
        _ => None,
    }
}

fn handle_admin_keys(key: KeyEvent) -> Option<UiEvent> {
    match key.code {
        KeyCode::Char('q') => Some(UiEvent::Quit),
        KeyCode::Char('?') => Some(UiEvent::ToggleHelp),
        KeyCode::Esc | KeyCode::Char('b') => Some(UiEvent::BackToDashboard),
        KeyCode::Tab | KeyCode::BackTab => Some(UiEvent::AdminSwitchPanel),
        KeyCode::Up | KeyCode::Char('k') => Some(UiEvent::AdminUp),
        KeyCode::Down | KeyCode::Char('j') => Some(UiEvent::AdminDown),
        KeyCode::Left | KeyCode::Char('h') => Some(UiEvent::AdminLeft),
        KeyCode::Right => Some(UiEvent::AdminRight),
        KeyCode::Char('n') => Some(UiEvent::AdminNewUser),
        KeyCode::Char('p') => Some(UiEvent::AdminResetPassword),
        KeyCode::Char('d') => Some(UiEvent::AdminDeleteUser),
        KeyCode::Char('e') => Some(UiEvent::AdminEditPermissions),
        KeyCode::Char(' ') | KeyCode::Enter => Some(UiEvent::AdminTogglePermission),
        KeyCode::Char('r') => Some(UiEvent::AdminReload),
        KeyCode::Char('o') => Some(UiEvent::Logout),
        _ => None,
    }
}

fn handle_popup_keys(key: KeyEvent, kind: PopupKind) -> Option<UiEvent> {
    match kind {
        PopupKind::Form => match key.code {
            KeyCode::Esc => Some(UiEvent::PopupCancel),
            KeyCode::Enter => Some(UiEvent::PopupSubmit),
            KeyCode::Tab | KeyCode::BackTab => Some(UiEvent::PopupNextField),
            KeyCode::Backspace => Some(UiEvent::PopupBackspace),
            KeyCode::Char(c) => Some(UiEvent::PopupChar(c)),
            _ => None,
        },
        PopupKind::Confirm => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(UiEvent::ConfirmYes),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(UiEvent::ConfirmNo),
            _ => None,
        },
        PopupKind::Checklist => match key.code {
            KeyCode::Esc => Some(UiEvent::PopupCancel),
            KeyCode::Enter => Some(UiEvent::PopupSubmit),
            KeyCode::Up | KeyCode::Char('k') => Some(UiEvent::AdminUp),
            KeyCode::Down | KeyCode::Char('j') => Some(UiEvent::AdminDown),
            KeyCode::Char(' ') => Some(UiEvent::PopupChar(' ')),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_login_keys_type_into_form() {
        assert_eq!(
            key_to_ui_event(press(KeyCode::Char('q')), Screen::Login, None, false),
            Some(UiEvent::LoginChar('q'))
        );
        assert_eq!(
            key_to_ui_event(press(KeyCode::Enter), Screen::Login, None, false),
            Some(UiEvent::SubmitLogin)
        );
    }

    #[test]
    fn test_dashboard_keys() {
        assert_eq!(
            key_to_ui_event(press(KeyCode::Char('u')), Screen::Dashboard, None, false),
            Some(UiEvent::UsePlug)
        );
        assert_eq!(
            key_to_ui_event(press(KeyCode::Char('l')), Screen::Dashboard, None, false),
            Some(UiEvent::LeavePlug)
        );
    }

    #[test]
    fn test_popup_captures_keys() {
        assert_eq!(
            key_to_ui_event(press(KeyCode::Char('q')), Screen::Admin, Some(PopupKind::Form), false),
            Some(UiEvent::PopupChar('q'))
        );
        assert_eq!(
            key_to_ui_event(press(KeyCode::Char('y')), Screen::Admin, Some(PopupKind::Confirm), false),
            Some(UiEvent::ConfirmYes)
        );
    }

    #[test]
    fn test_ctrl_c_always_quits() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(
            key_to_ui_event(key, Screen::Login, Some(PopupKind::Form), true),
            Some(UiEvent::Quit)
        );
    }
}
