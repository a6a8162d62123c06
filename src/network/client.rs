//! HTTP client wrapper - builds backend calls and classifies responses

use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::admin::permission_diff;
use crate::config::Config;
use crate::error::ApiError;
use crate::messages::network::{ApiCall, ApiPayload};
use crate::models::{
    AdminUser, DeviceRecord, GrantablePlugList, LoginResponse, MessageResponse, NewUser,
    PermissionChange, PermissionList, PlugAction, PlugStatus, SyncReport, UserList,
};
use crate::session::Credentials;

const JSON: &str = "application/json";

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

/// Turn status, content type and body into a typed result.
///
/// 401 wins over everything else. Other failures carry the server's
/// `detail` (or `message`) string when there is one.
pub fn interpret<T: DeserializeOwned>(
    status: u16,
    content_type: Option<&str>,
    body: &str,
) -> Result<T, ApiError> {
    if status == 401 {
        return Err(ApiError::AuthExpired);
    }
    if !(200..300).contains(&status) {
        return Err(ApiError::ServerRejected {
            status,
            detail: error_detail(body).unwrap_or_else(|| format!("HTTP {}", status)),
        });
    }
    let content_type = content_type.unwrap_or("");
    if !content_type.contains(JSON) {
        return Err(ApiError::MalformedResponse(format!(
            "Invalid content-type: {}",
            content_type
        )));
    }
    serde_json::from_str(body).map_err(|e| ApiError::MalformedResponse(e.to_string()))
}

fn error_detail(body: &str) -> Option<String> {
    let payload: ErrorPayload = serde_json::from_str(body).ok()?;
    match payload.detail {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        _ => payload.message.filter(|m| !m.is_empty()),
    }
}

/// Typed client for the plug backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("base_url cannot carry a path: {}", config.base_url);
        }
        Ok(ApiClient {
            base_url,
            client: create_client(config),
        })
    }

    /// Base URL extended by percent-escaped path segments
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn execute(&self, call: ApiCall, credentials: Option<&Credentials>) -> Result<ApiPayload, ApiError> {
        match call {
            ApiCall::ListPlugs => self.list_plugs(credentials).await.map(ApiPayload::Plugs),
            ApiCall::TogglePlug { name, action } => self
                .toggle_plug(&name, action, credentials)
                .await
                .map(ApiPayload::Toggled),
            ApiCall::Login { username, password } => {
                self.login(&username, &password).await.map(ApiPayload::LoggedIn)
            }
            ApiCall::Logout => self.logout(credentials).await.map(|_| ApiPayload::LoggedOut),
            ApiCall::ListUsers => self.list_users(credentials).await.map(ApiPayload::Users),
            ApiCall::CreateUser(user) => self
                .create_user(&user, credentials)
                .await
                .map(ApiPayload::UserCreated),
            ApiCall::ResetPassword { user_id, new_password } => self
                .reset_password(user_id, &new_password, credentials)
                .await
                .map(ApiPayload::Message),
            ApiCall::DeleteUser { user_id } => self
                .delete_user(user_id, credentials)
                .await
                .map(ApiPayload::Message),
            ApiCall::LoadPermissions => {
                let (users, plugs) = futures_util::future::try_join(
                    self.send_json::<PermissionList, ()>(
                        Method::GET,
                        &["auth", "admin", "users", "permissions"],
                        None,
                        credentials,
                    ),
                    self.send_json::<GrantablePlugList, ()>(
                        Method::GET,
                        &["auth", "admin", "plugs"],
                        None,
                        credentials,
                    ),
                )
                .await?;
                Ok(ApiPayload::Permissions {
                    users: users.users,
                    plugs: plugs.plugs,
                })
            }
            ApiCall::SetPermission { user_id, plug_name, grant } => self
                .set_permission(user_id, &plug_name, grant, credentials)
                .await
                .map(ApiPayload::Message),
            ApiCall::SyncPermissions { user_id, selected } => self
                .sync_permissions(user_id, &selected, credentials)
                .await
                .map(ApiPayload::Synced),
        }
    }

    pub async fn list_plugs(&self, credentials: Option<&Credentials>) -> Result<Vec<DeviceRecord>, ApiError> {
        self.send_json::<_, ()>(Method::GET, &["plugs", ""], None, credentials)
            .await
    }

    pub async fn toggle_plug(
        &self,
        name: &str,
        action: PlugAction,
        credentials: Option<&Credentials>,
    ) -> Result<PlugStatus, ApiError> {
        self.send_json::<_, ()>(Method::POST, &["plugs", name, action.as_str()], None, credentials)
            .await
    }

    /// Form-encoded credentials; no bearer header
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let builder = self
            .client
            .post(self.endpoint(&["auth", "login"]))
            .header(ACCEPT, JSON)
            .form(&[("username", username), ("password", password)]);
        read_response(builder).await
    }

    pub async fn logout(&self, credentials: Option<&Credentials>) -> Result<(), ApiError> {
        self.send_json::<serde_json::Value, ()>(Method::POST, &["auth", "logout"], None, credentials)
            .await
            .map(|_| ())
    }

    pub async fn list_users(&self, credentials: Option<&Credentials>) -> Result<Vec<AdminUser>, ApiError> {
        self.send_json::<UserList, ()>(Method::GET, &["auth", "admin", "users"], None, credentials)
            .await
            .map(|list| list.users)
    }

    pub async fn create_user(&self, user: &NewUser, credentials: Option<&Credentials>) -> Result<AdminUser, ApiError> {
        self.send_json(Method::POST, &["auth", "admin", "users"], Some(user), credentials)
            .await
    }

    pub async fn reset_password(
        &self,
        user_id: i64,
        new_password: &str,
        credentials: Option<&Credentials>,
    ) -> Result<String, ApiError> {
        let id = user_id.to_string();
        let body = serde_json::json!({ "new_password": new_password });
        self.send_json::<MessageResponse, _>(
            Method::PUT,
            &["auth", "admin", "users", id.as_str(), "password"],
            Some(&body),
            credentials,
        )
        .await
        .map(|m| m.msg)
    }

    pub async fn delete_user(&self, user_id: i64, credentials: Option<&Credentials>) -> Result<String, ApiError> {
        let id = user_id.to_string();
        self.send_json::<MessageResponse, ()>(Method::DELETE, &["auth", "admin", "users", id.as_str()], None, credentials)
            .await
            .map(|m| m.msg)
    }

    pub async fn set_permission(
        &self,
        user_id: i64,
        plug_name: &str,
        grant: bool,
        credentials: Option<&Credentials>,
    ) -> Result<String, ApiError> {
        let (method, leaf) = if grant {
            (Method::POST, "grant")
        } else {
            (Method::DELETE, "revoke")
        };
        let body = PermissionChange {
            user_id,
            plug_name: plug_name.to_string(),
        };
        self.send_json::<MessageResponse, _>(method, &["auth", "admin", "permissions", leaf], Some(&body), credentials)
            .await
            .map(|m| m.msg)
    }

    /// Sequential grants then revokes; individual failures are collected
    /// unless the session expired, which aborts the whole sync.
    pub async fn sync_permissions(
        &self,
        user_id: i64,
        selected: &[String],
        credentials: Option<&Credentials>,
    ) -> Result<SyncReport, ApiError> {
        let current: PermissionList = self
            .send_json::<_, ()>(Method::GET, &["auth", "admin", "users", "permissions"], None, credentials)
            .await?;
        let current = current
            .users
            .into_iter()
            .find(|u| u.id == user_id)
            .map(|u| u.allowed_plugs)
            .unwrap_or_default();
        let (to_grant, to_revoke) = permission_diff(&current, selected);
        tracing::info!(user_id, grant = ?to_grant, revoke = ?to_revoke, "Syncing permissions");

        let mut report = SyncReport::default();
        let changes = to_grant
            .into_iter()
            .map(|p| (p, true))
            .chain(to_revoke.into_iter().map(|p| (p, false)));
        for (plug, grant) in changes {
            match self.set_permission(user_id, &plug, grant, credentials).await {
                Ok(_) => report.succeeded += 1,
                Err(ApiError::AuthExpired) => return Err(ApiError::AuthExpired),
                Err(e) => {
                    let verb = if grant { "grant" } else { "revoke" };
                    report.failures.push(format!("{} {} failed: {}", plug, verb, e));
                }
            }
        }
        Ok(report)
    }

    async fn send_json<T, B>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
        credentials: Option<&Credentials>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let mut builder = self
            .client
            .request(method, self.endpoint(segments))
            .header(ACCEPT, JSON);
        if let Some(creds) = credentials {
            builder = builder.bearer_auth(&creds.token);
            if let Some(cookie) = &creds.cookie {
                builder = builder.header(COOKIE, cookie);
            }
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        read_response(builder).await
    }
}

async fn read_response<T: DeserializeOwned>(builder: reqwest::RequestBuilder) -> Result<T, ApiError> {
    let response = builder.send().await?;
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await?;
    interpret(status, content_type.as_deref(), &body)
}

/// Create an HTTP client; no timeout unless configured
pub fn create_client(config: &Config) -> reqwest::Client {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = config.request_timeout() {
        builder = builder.timeout(timeout);
    }
    builder.build().unwrap_or_else(|_| reqwest::Client::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn client_for(base_url: &str) -> ApiClient {
        ApiClient::new(&Config {
            base_url: base_url.to_string(),
            ..Config::default()
        })
        .unwrap()
    }

    #[test]
    fn test_401_is_auth_expired() {
        let result = interpret::<serde_json::Value>(401, Some(JSON), r#"{"detail":"Invalid token"}"#);
        assert_eq!(result, Err(ApiError::AuthExpired));
    }

    #[test]
    fn test_rejection_uses_detail() {
        let result = interpret::<serde_json::Value>(409, Some(JSON), r#"{"detail":"already granted"}"#);
        assert_eq!(
            result,
            Err(ApiError::ServerRejected {
                status: 409,
                detail: "already granted".into()
            })
        );
    }

    #[test]
    fn test_rejection_without_detail_is_generic() {
        let result = interpret::<serde_json::Value>(503, Some("text/html"), "<h1>down</h1>");
        assert_eq!(
            result,
            Err(ApiError::ServerRejected {
                status: 503,
                detail: "HTTP 503".into()
            })
        );

        // Validation errors carry a list, not a message
        let result = interpret::<serde_json::Value>(422, Some(JSON), r#"{"detail":[{"loc":["body"]}]}"#);
        assert_eq!(result.unwrap_err().to_string(), "HTTP 422");
    }

    #[test]
    fn test_wrong_content_type_is_malformed() {
        let result = interpret::<Vec<DeviceRecord>>(200, Some("text/html; charset=utf-8"), "[]");
        assert!(matches!(result, Err(ApiError::MalformedResponse(_))));
        let result = interpret::<Vec<DeviceRecord>>(200, None, "[]");
        assert!(matches!(result, Err(ApiError::MalformedResponse(_))));
    }

    #[test]
    fn test_undecodable_json_is_malformed() {
        let result = interpret::<Vec<DeviceRecord>>(200, Some(JSON), r#"{"not":"a list"}"#);
        assert!(matches!(result, Err(ApiError::MalformedResponse(_))));
    }

    #[test]
    fn test_success_decodes() {
        let plugs: Vec<DeviceRecord> = interpret(
            200,
            Some("application/json; charset=utf-8"),
            r#"[{"name":"lamp1","status":true,"active_users":1,"users":["alice"]}]"#,
        )
        .unwrap();
        assert_eq!(plugs.len(), 1);
        assert_eq!(plugs[0].users, vec!["alice"]);
    }

    #[test]
    fn test_endpoint_escapes_device_name() {
        let client = client_for("http://localhost:5005");
        assert_eq!(
            client.endpoint(&["plugs", "lamp 1", "on"]).as_str(),
            "http://localhost:5005/plugs/lamp%201/on"
        );
        assert_eq!(
            client.endpoint(&["plugs", "a/b", "off"]).as_str(),
            "http://localhost:5005/plugs/a%2Fb/off"
        );
        assert_eq!(client.endpoint(&["plugs", ""]).as_str(), "http://localhost:5005/plugs/");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = client_for("http://example.com/api/");
        assert_eq!(
            client.endpoint(&["auth", "login"]).as_str(),
            "http://example.com/api/auth/login"
        );
    }

    #[test]
    fn test_rejects_non_base_url() {
        let config = Config {
            base_url: "mailto:someone@example.com".into(),
            ..Config::default()
        };
        assert!(ApiClient::new(&config).is_err());
    }

    /// Serve one canned response and hand back the raw request
    async fn serve_once(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let mut request = Vec::new();
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://{}", addr), handle)
    }

    #[tokio::test]
    async fn test_toggle_sends_credentials_and_decodes() {
        let (base, server) = serve_once(
            "HTTP/1.1 201 Created\r\nContent-Type: application/json\r\nContent-Length: 65\r\nConnection: close\r\n\r\n{\"name\":\"lamp1\",\"status\":true,\"active_users\":1,\"users\":[\"alice\"]}",
        )
        .await;
        let client = client_for(&base);
        let creds = Credentials {
            token: "tok".into(),
            cookie: Some("access_token=tok".into()),
        };

        let status = client
            .toggle_plug("lamp1", PlugAction::On, Some(&creds))
            .await
            .unwrap();
        assert_eq!(status.users, vec!["alice"]);
        assert_eq!(status.active_user_count, 1);

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("post /plugs/lamp1/on "));
        assert!(request.contains("authorization: bearer tok"));
        assert!(request.contains("cookie: access_token=tok"));
    }

    #[tokio::test]
    async fn test_401_from_server() {
        let (base, server) = serve_once(
            "HTTP/1.1 401 Unauthorized\r\nContent-Type: application/json\r\nContent-Length: 27\r\nConnection: close\r\n\r\n{\"detail\":\"Not authorized\"}",
        )
        .await;
        let client = client_for(&base);
        let result = client.list_plugs(None).await;
        assert_eq!(result, Err(ApiError::AuthExpired));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(&format!("http://{}", addr));
        let result = client.list_plugs(None).await;
        assert!(matches!(result, Err(ApiError::Transport(_))));
    }
}
