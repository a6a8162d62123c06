//! Client-local token storage with a cookie mirror

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::constants::{COOKIE_FILE, TOKEN_COOKIE_MAX_AGE_SECS, TOKEN_COOKIE_NAME, TOKEN_FILE};

/// Holder of the bearer token. Writes are best-effort: failures are
/// logged and otherwise ignored.
pub trait TokenStore: Send {
    fn get(&self) -> Option<String>;
    fn save(&mut self, token: &str);
    /// Removes the token and its cookie mirror
    fn clear(&mut self);
    /// `name=value` for a `Cookie` header, while the mirror is unexpired
    fn cookie_header(&self) -> Option<String>;
}

/// Mirror of the token as the backend would see it in a cookie
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenCookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub max_age_secs: i64,
    pub same_site: String,
    pub saved_at: DateTime<Utc>,
}

impl TokenCookie {
    pub fn new(token: &str, now: DateTime<Utc>) -> Self {
        TokenCookie {
            name: String::from(TOKEN_COOKIE_NAME),
            value: token.to_string(),
            path: String::from("/"),
            max_age_secs: TOKEN_COOKIE_MAX_AGE_SECS,
            same_site: String::from("Strict"),
            saved_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.saved_at + Duration::seconds(self.max_age_secs)
    }

    pub fn header_value(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

/// Token and cookie files inside the data directory
pub struct FileTokenStore {
    dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: PathBuf) -> Self {
        FileTokenStore { dir }
    }

    fn token_path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }

    fn cookie_path(&self) -> PathBuf {
        self.dir.join(COOKIE_FILE)
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        Ok(())
    }

    fn write_all(&self, token: &str) -> Result<()> {
        self.ensure_dir()?;
        fs::write(self.token_path(), token)?;
        let cookie = TokenCookie::new(token, Utc::now());
        fs::write(self.cookie_path(), serde_json::to_string_pretty(&cookie)?)?;
        Ok(())
    }

    fn read_cookie(&self) -> Option<TokenCookie> {
        let content = fs::read_to_string(self.cookie_path()).ok()?;
        serde_json::from_str(&content).ok()
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        let token = fs::read_to_string(self.token_path()).ok()?;
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }

    fn save(&mut self, token: &str) {
        if let Err(e) = self.write_all(token) {
            tracing::warn!(error = %e, dir = %self.dir.display(), "Failed to persist token");
        }
    }

    fn clear(&mut self) {
        for path in [self.token_path(), self.cookie_path()] {
            if path.exists() {
                if let Err(e) = fs::remove_file(&path) {
                    tracing::warn!(error = %e, path = %path.display(), "Failed to remove session file");
                }
            }
        }
    }

    fn cookie_header(&self) -> Option<String> {
        self.read_cookie()
            .filter(|c| !c.is_expired(Utc::now()))
            .map(|c| c.header_value())
    }
}

/// In-process holder, used when no data directory is wanted
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Option<String>,
    cookie: Option<TokenCookie>,
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.token.clone()
    }

    fn save(&mut self, token: &str) {
        self.token = Some(token.to_string());
        self.cookie = Some(TokenCookie::new(token, Utc::now()));
    }

    fn clear(&mut self) {
        self.token = None;
        self.cookie = None;
    }

    fn cookie_header(&self) -> Option<String> {
        self.cookie
            .as_ref()
            .filter(|c| !c.is_expired(Utc::now()))
            .map(|c| c.header_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileTokenStore::new(dir.path().join("data"));
        assert_eq!(store.get(), None);
        assert_eq!(store.cookie_header(), None);

        store.save("abc.def.ghi");
        assert_eq!(store.get().as_deref(), Some("abc.def.ghi"));
        assert_eq!(store.cookie_header().as_deref(), Some("access_token=abc.def.ghi"));

        store.clear();
        assert_eq!(store.get(), None);
        assert_eq!(store.cookie_header(), None);
        assert!(!dir.path().join("data").join(COOKIE_FILE).exists());
    }

    #[test]
    fn test_clear_without_files_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileTokenStore::new(dir.path().to_path_buf());
        store.clear();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_cookie_attributes_and_expiry() {
        let saved = Utc::now();
        let cookie = TokenCookie::new("tok", saved);
        assert_eq!(cookie.header_value(), "access_token=tok");
        assert_eq!(cookie.path, "/");
        assert_eq!(cookie.max_age_secs, 86400);
        assert_eq!(cookie.same_site, "Strict");
        assert!(!cookie.is_expired(saved + Duration::hours(23)));
        assert!(cookie.is_expired(saved + Duration::hours(24)));
    }

    #[test]
    fn test_expired_cookie_not_sent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileTokenStore::new(dir.path().to_path_buf());
        store.save("tok");

        let stale = TokenCookie::new("tok", Utc::now() - Duration::days(2));
        fs::write(
            dir.path().join(COOKIE_FILE),
            serde_json::to_string(&stale).unwrap(),
        )
        .unwrap();

        assert_eq!(store.get().as_deref(), Some("tok"));
        assert_eq!(store.cookie_header(), None);
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryTokenStore::default();
        store.save("t1");
        assert_eq!(store.get().as_deref(), Some("t1"));
        assert!(store.cookie_header().is_some());
        store.clear();
        assert_eq!(store.get(), None);
        assert_eq!(store.cookie_header(), None);
    }
}
