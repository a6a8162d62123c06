use serde::{Deserialize, Serialize};

/// Use/leave action on a plug, also the last path segment of the toggle call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlugAction {
    On,
    Off,
}

impl PlugAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlugAction::On => "on",
            PlugAction::Off => "off",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlugAction::On => "Use",
            PlugAction::Off => "Leave",
        }
    }
}

/// Tri-state power status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceStatus {
    On,
    Off,
    Unknown,
}

impl From<Option<bool>> for DeviceStatus {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => DeviceStatus::On,
            Some(false) => DeviceStatus::Off,
            None => DeviceStatus::Unknown,
        }
    }
}

/// One plug as reported by `GET /plugs/`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// `null` when the backend could not reach the plug
    #[serde(default)]
    pub status: Option<bool>,
    #[serde(default, rename = "active_users")]
    pub active_user_count: u32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub users: Vec<String>,
}

impl DeviceRecord {
    pub fn device_status(&self) -> DeviceStatus {
        DeviceStatus::from(self.status)
    }
}

/// Authoritative result of `POST /plugs/{name}/{on|off}`. Only the user
/// list and count are guaranteed; `status` is absent on some backends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlugStatus {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Option<bool>,
    #[serde(default, rename = "active_users")]
    pub active_user_count: u32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub users: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// `{msg}` body returned by admin mutations
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub msg: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "Administrator",
            Role::User => "User",
        }
    }

    pub fn toggle(&self) -> Role {
        match self {
            Role::Admin => Role::User,
            Role::User => Role::Admin,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct UserList {
    #[serde(default)]
    pub users: Vec<AdminUser>,
}

/// Request body of `POST /auth/admin/users`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: Role,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserPermissions {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub allowed_plugs: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PermissionList {
    #[serde(default)]
    pub users: Vec<UserPermissions>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrantablePlug {
    pub name: String,
    #[serde(default)]
    pub ip: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GrantablePlugList {
    #[serde(default)]
    pub plugs: Vec<GrantablePlug>,
}

/// Body of grant/revoke calls
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PermissionChange {
    pub user_id: i64,
    pub plug_name: String,
}

/// Outcome of a per-user bulk permission save
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyncReport {
    pub succeeded: usize,
    pub failures: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
