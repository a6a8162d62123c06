//! Network messages - communication between App and Network layers

use crate::error::ApiError;
use crate::models::{
    AdminUser, DeviceRecord, GrantablePlug, LoginResponse, NewUser, PlugAction, PlugStatus,
    SyncReport, UserPermissions,
};
use crate::session::Credentials;

/// One backend operation
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    ListPlugs,
    TogglePlug { name: String, action: PlugAction },
    Login { username: String, password: String },
    Logout,
    ListUsers,
    CreateUser(NewUser),
    ResetPassword { user_id: i64, new_password: String },
    DeleteUser { user_id: i64 },
    /// Permissions and grantable plugs, fetched together
    LoadPermissions,
    SetPermission { user_id: i64, plug_name: String, grant: bool },
    /// Re-read a user's permissions and grant/revoke towards `selected`
    SyncPermissions { user_id: i64, selected: Vec<String> },
}

impl ApiCall {
    /// Method and path, for logs
    pub fn describe(&self) -> String {
        match self {
            ApiCall::ListPlugs => "GET /plugs/".into(),
            ApiCall::TogglePlug { name, action } => format!("POST /plugs/{}/{}", name, action.as_str()),
            ApiCall::Login { .. } => "POST /auth/login".into(),
            ApiCall::Logout => "POST /auth/logout".into(),
            ApiCall::ListUsers => "GET /auth/admin/users".into(),
            ApiCall::CreateUser(_) => "POST /auth/admin/users".into(),
            ApiCall::ResetPassword { user_id, .. } => format!("PUT /auth/admin/users/{}/password", user_id),
            ApiCall::DeleteUser { user_id } => format!("DELETE /auth/admin/users/{}", user_id),
            ApiCall::LoadPermissions => "GET /auth/admin/users/permissions + /auth/admin/plugs".into(),
            ApiCall::SetPermission { grant: true, .. } => "POST /auth/admin/permissions/grant".into(),
            ApiCall::SetPermission { grant: false, .. } => "DELETE /auth/admin/permissions/revoke".into(),
            ApiCall::SyncPermissions { user_id, .. } => format!("SYNC permissions of user {}", user_id),
        }
    }
}

/// Decoded success body of an [`ApiCall`]
#[derive(Debug, Clone, PartialEq)]
pub enum ApiPayload {
    Plugs(Vec<DeviceRecord>),
    Toggled(PlugStatus),
    LoggedIn(LoginResponse),
    LoggedOut,
    Users(Vec<AdminUser>),
    UserCreated(AdminUser),
    Permissions {
        users: Vec<UserPermissions>,
        plugs: Vec<GrantablePlug>,
    },
    /// `{msg}` of an admin mutation
    Message(String),
    Synced(SyncReport),
}

/// Commands sent from App layer to Network layer
#[derive(Debug, Clone)]
pub enum NetworkCommand {
    Execute {
        id: u64,
        call: ApiCall,
        credentials: Option<Credentials>,
    },
    /// Shutdown the network actor
    Shutdown,
}

/// Responses sent from Network layer to App layer
#[derive(Debug, Clone)]
pub struct NetworkResponse {
    pub id: u64,
    pub result: Result<ApiPayload, ApiError>,
    pub time_ms: u64,
}
