//! Admin console state: users, forms and the permission matrix
//!
//! Pure data and validation. Requests are built by the app layer from the
//! values these checks hand back, so an invalid form never produces one.

use crate::constants::{MIN_PASSWORD_LEN, MIN_USERNAME_LEN};
use crate::error::ValidationError;
use crate::models::{AdminUser, GrantablePlug, NewUser, Role, UserPermissions};

/// Check a create-user form. The username is trimmed, the password is not.
pub fn validate_new_user(username: &str, password: &str, role: Role) -> Result<NewUser, ValidationError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(ValidationError::MissingCredentials);
    }
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(ValidationError::UsernameTooShort);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(NewUser {
        username: username.to_string(),
        password: password.to_string(),
        role,
    })
}

pub fn validate_password_reset(new_password: &str, confirm: &str) -> Result<String, ValidationError> {
    if new_password.is_empty() {
        return Err(ValidationError::MissingPassword);
    }
    if new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    if new_password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(new_password.to_string())
}

pub fn check_deletable(target: &str, identity: &str) -> Result<(), ValidationError> {
    if !identity.trim().is_empty() && target.trim() == identity.trim() {
        return Err(ValidationError::SelfDeletion);
    }
    Ok(())
}

/// Plugs to grant and to revoke to move `current` to `selected`
pub fn permission_diff(current: &[String], selected: &[String]) -> (Vec<String>, Vec<String>) {
    let to_grant = selected
        .iter()
        .filter(|p| !current.contains(p))
        .cloned()
        .collect();
    let to_revoke = current
        .iter()
        .filter(|p| !selected.contains(p))
        .cloned()
        .collect();
    (to_grant, to_revoke)
}

/// Users x grantable plugs. Admins can reach every plug and are listed
/// separately instead of getting a row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PermissionMatrix {
    pub rows: Vec<UserPermissions>,
    pub admins: Vec<String>,
    pub plugs: Vec<GrantablePlug>,
}

impl PermissionMatrix {
    pub fn new(users: Vec<UserPermissions>, plugs: Vec<GrantablePlug>) -> Self {
        let (admins, rows): (Vec<_>, Vec<_>) = users.into_iter().partition(|u| u.role == Role::Admin);
        PermissionMatrix {
            rows,
            admins: admins.into_iter().map(|u| u.username).collect(),
            plugs,
        }
    }

    pub fn is_checked(&self, user_id: i64, plug: &str) -> bool {
        self.rows
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.allowed_plugs.iter().any(|p| p == plug))
            .unwrap_or(false)
    }

    pub fn set(&mut self, user_id: i64, plug: &str, checked: bool) {
        if let Some(user) = self.rows.iter_mut().find(|u| u.id == user_id) {
            let has = user.allowed_plugs.iter().any(|p| p == plug);
            if checked && !has {
                user.allowed_plugs.push(plug.to_string());
            } else if !checked && has {
                user.allowed_plugs.retain(|p| p != plug);
            }
        }
    }

    pub fn allowed_for(&self, user_id: i64) -> Vec<String> {
        self.rows
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.allowed_plugs.clone())
            .unwrap_or_default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminPanel {
    Users,
    Permissions,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateUserField {
    Username,
    Password,
    Role,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateUserForm {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub field: CreateUserField,
}

impl Default for CreateUserForm {
    fn default() -> Self {
        CreateUserForm {
            username: String::new(),
            password: String::new(),
            role: Role::User,
            field: CreateUserField::Username,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetField {
    NewPassword,
    Confirm,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResetPasswordForm {
    pub user_id: i64,
    pub username: String,
    pub new_password: String,
    pub confirm: String,
    pub field: ResetField,
}

/// Checkbox list for one user's plugs
#[derive(Clone, Debug, PartialEq)]
pub struct PermissionEditor {
    pub user_id: i64,
    pub username: String,
    pub entries: Vec<(String, bool)>,
    pub cursor: usize,
}

impl PermissionEditor {
    pub fn new(user_id: i64, username: String, plugs: &[GrantablePlug], allowed: &[String]) -> Self {
        let entries = plugs
            .iter()
            .map(|p| (p.name.clone(), allowed.contains(&p.name)))
            .collect();
        PermissionEditor {
            user_id,
            username,
            entries,
            cursor: 0,
        }
    }

    pub fn toggle_current(&mut self) {
        if let Some(entry) = self.entries.get_mut(self.cursor) {
            entry.1 = !entry.1;
        }
    }

    pub fn selected(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, checked)| *checked)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AdminPopup {
    CreateUser(CreateUserForm),
    ResetPassword(ResetPasswordForm),
    ConfirmDelete { user_id: i64, username: String },
    EditPermissions(PermissionEditor),
}

#[derive(Clone, Debug)]
pub struct AdminState {
    pub users: Vec<AdminUser>,
    pub users_loaded: bool,
    pub matrix: PermissionMatrix,
    pub matrix_loaded: bool,
    pub panel: AdminPanel,
    pub selected_user: usize,
    pub matrix_row: usize,
    pub matrix_col: usize,
    pub popup: Option<AdminPopup>,
}

impl Default for AdminState {
    fn default() -> Self {
        AdminState {
            users: Vec::new(),
            users_loaded: false,
            matrix: PermissionMatrix::default(),
            matrix_loaded: false,
            panel: AdminPanel::Users,
            selected_user: 0,
            matrix_row: 0,
            matrix_col: 0,
            popup: None,
        }
    }
}

impl AdminState {
    pub fn set_users(&mut self, users: Vec<AdminUser>) {
        self.users = users;
        self.users_loaded = true;
        if self.selected_user >= self.users.len() {
            self.selected_user = self.users.len().saturating_sub(1);
        }
    }

    pub fn set_matrix(&mut self, matrix: PermissionMatrix) {
        self.matrix = matrix;
        self.matrix_loaded = true;
        self.matrix_row = self.matrix_row.min(self.matrix.rows.len().saturating_sub(1));
        self.matrix_col = self.matrix_col.min(self.matrix.plugs.len().saturating_sub(1));
    }

    pub fn selected(&self) -> Option<&AdminUser> {
        self.users.get(self.selected_user)
    }

    /// (user id, plug name) under the matrix cursor
    pub fn matrix_cell(&self) -> Option<(i64, String)> {
        let user = self.matrix.rows.get(self.matrix_row)?;
        let plug = self.matrix.plugs.get(self.matrix_col)?;
        Some((user.id, plug.name.clone()))
    }

    pub fn switch_panel(&mut self) {
        self.panel = match self.panel {
            AdminPanel::Users => AdminPanel::Permissions,
            AdminPanel::Permissions => AdminPanel::Users,
        };
    }

    pub fn move_up(&mut self) {
        match &mut self.popup {
            Some(AdminPopup::EditPermissions(editor)) => {
                editor.cursor = editor.cursor.saturating_sub(1);
            }
            Some(_) => {}
            None => match self.panel {
                AdminPanel::Users => self.selected_user = self.selected_user.saturating_sub(1),
                AdminPanel::Permissions => self.matrix_row = self.matrix_row.saturating_sub(1),
            },
        }
    }

    pub fn move_down(&mut self) {
        match &mut self.popup {
            Some(AdminPopup::EditPermissions(editor)) => {
                if editor.cursor + 1 < editor.entries.len() {
                    editor.cursor += 1;
                }
            }
            Some(_) => {}
            None => match self.panel {
                AdminPanel::Users => {
                    if self.selected_user + 1 < self.users.len() {
                        self.selected_user += 1;
                    }
                }
                AdminPanel::Permissions => {
                    if self.matrix_row + 1 < self.matrix.rows.len() {
                        self.matrix_row += 1;
                    }
                }
            },
        }
    }

    pub fn move_left(&mut self) {
        if self.popup.is_none() && self.panel == AdminPanel::Permissions {
            self.matrix_col = self.matrix_col.saturating_sub(1);
        }
    }

    pub fn move_right(&mut self) {
        if self.popup.is_none()
            && self.panel == AdminPanel::Permissions
            && self.matrix_col + 1 < self.matrix.plugs.len()
        {
            self.matrix_col += 1;
        }
    }

    /// Text fields of the open popup
    pub fn input_char(&mut self, c: char) {
        match &mut self.popup {
            Some(AdminPopup::CreateUser(form)) => match form.field {
                CreateUserField::Username => form.username.push(c),
                CreateUserField::Password => form.password.push(c),
                CreateUserField::Role => {
                    if c == ' ' {
                        form.role = form.role.toggle();
                    }
                }
            },
            Some(AdminPopup::ResetPassword(form)) => match form.field {
                ResetField::NewPassword => form.new_password.push(c),
                ResetField::Confirm => form.confirm.push(c),
            },
            Some(AdminPopup::EditPermissions(editor)) => {
                if c == ' ' {
                    editor.toggle_current();
                }
            }
            _ => {}
        }
    }

    pub fn backspace(&mut self) {
        match &mut self.popup {
            Some(AdminPopup::CreateUser(form)) => match form.field {
                CreateUserField::Username => {
                    form.username.pop();
                }
                CreateUserField::Password => {
                    form.password.pop();
                }
                CreateUserField::Role => {}
            },
            Some(AdminPopup::ResetPassword(form)) => match form.field {
                ResetField::NewPassword => {
                    form.new_password.pop();
                }
                ResetField::Confirm => {
                    form.confirm.pop();
                }
            },
            _ => {}
        }
    }

    pub fn next_field(&mut self) {
        match &mut self.popup {
            Some(AdminPopup::CreateUser(form)) => {
                form.field = match form.field {
                    CreateUserField::Username => CreateUserField::Password,
                    CreateUserField::Password => CreateUserField::Role,
                    CreateUserField::Role => CreateUserField::Username,
                };
            }
            Some(AdminPopup::ResetPassword(form)) => {
                form.field = match form.field {
                    ResetField::NewPassword => ResetField::Confirm,
                    ResetField::Confirm => ResetField::NewPassword,
                };
            }
            _ => {}
        }
    }
}
