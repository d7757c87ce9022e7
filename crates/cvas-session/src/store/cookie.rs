// CVAS Session
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Cookie jars holding the session token

use super::write_owner_only;
use crate::error::{SessionError, SessionResult};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Same-site policy of a cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// A cookie with the attributes the session layer cares about
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub secure: bool,
    pub same_site: SameSite,
}

impl Cookie {
    /// Secure, strict same-site cookie expiring after `ttl`
    pub fn session(name: impl Into<String>, value: impl Into<String>, ttl: Duration) -> SessionResult<Self> {
        let name = name.into();
        let expires_at = Utc::now().checked_add_signed(ttl).ok_or_else(|| SessionError::Config {
            message: format!("Lifetime of cookie '{}' is out of range", name),
        })?;

        Ok(Self {
            name,
            value: value.into(),
            expires_at,
            secure: true,
            same_site: SameSite::Strict,
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cookie")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("secure", &self.secure)
            .field("same_site", &self.same_site)
            .finish()
    }
}

/// Storage for cookies.
///
/// `get` never returns an expired cookie; implementations drop it on read.
pub trait CookieJar: Send + Sync {
    fn get(&self, name: &str) -> SessionResult<Option<Cookie>>;

    fn set(&self, cookie: Cookie) -> SessionResult<()>;

    /// Removing a cookie that is not there is not an error
    fn remove(&self, name: &str) -> SessionResult<()>;
}

/// In-memory cookie jar
pub struct MemoryCookieJar {
    cookies: Mutex<HashMap<String, Cookie>>,
    secure_context: bool,
}

impl MemoryCookieJar {
    /// Jar for a secure (https) context
    pub fn new() -> Self {
        Self::with_secure_context(true)
    }

    /// Jar for a plain http context, which refuses secure cookies
    pub fn insecure() -> Self {
        Self::with_secure_context(false)
    }

    pub fn with_secure_context(secure_context: bool) -> Self {
        Self {
            cookies: Mutex::new(HashMap::new()),
            secure_context,
        }
    }

    /// Number of cookies currently held, expired ones included
    pub fn len(&self) -> usize {
        self.cookies.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieJar for MemoryCookieJar {
    fn get(&self, name: &str) -> SessionResult<Option<Cookie>> {
        let mut cookies = self.cookies.lock();
        match cookies.get(name) {
            Some(cookie) if cookie.is_expired() => {
                debug!(cookie = %name, "Dropping expired cookie");
                cookies.remove(name);
                Ok(None)
            }
            other => Ok(other.cloned()),
        }
    }

    fn set(&self, cookie: Cookie) -> SessionResult<()> {
        if cookie.secure && !self.secure_context {
            return Err(SessionError::InsecureContext { name: cookie.name });
        }
        self.cookies.lock().insert(cookie.name.clone(), cookie);
        Ok(())
    }

    fn remove(&self, name: &str) -> SessionResult<()> {
        self.cookies.lock().remove(name);
        Ok(())
    }
}

/// Cookie jar persisted as a JSON file, so cookies outlive the process
pub struct FileCookieJar {
    path: PathBuf,
    lock: Mutex<()>,
    secure_context: bool,
}

impl FileCookieJar {
    /// Jar for a secure context
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_secure_context(path, true)
    }

    pub fn with_secure_context(path: impl Into<PathBuf>, secure_context: bool) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            secure_context,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> SessionResult<HashMap<String, Cookie>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&content) {
            Ok(cookies) => Ok(cookies),
            Err(e) => {
                // An unreadable jar holds nothing usable; the next write replaces it.
                warn!(path = %self.path.display(), error = %e, "Ignoring corrupt cookie jar");
                Ok(HashMap::new())
            }
        }
    }

    fn write_all(&self, cookies: &HashMap<String, Cookie>) -> SessionResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(cookies)?;
        write_owner_only(&self.path, content.as_bytes())
    }
}

impl CookieJar for FileCookieJar {
    fn get(&self, name: &str) -> SessionResult<Option<Cookie>> {
        let _guard = self.lock.lock();
        let mut cookies = self.read_all()?;
        match cookies.get(name) {
            Some(cookie) if cookie.is_expired() => {
                debug!(cookie = %name, "Dropping expired cookie");
                cookies.remove(name);
                self.write_all(&cookies)?;
                Ok(None)
            }
            other => Ok(other.cloned()),
        }
    }

    fn set(&self, cookie: Cookie) -> SessionResult<()> {
        if cookie.secure && !self.secure_context {
            return Err(SessionError::InsecureContext { name: cookie.name });
        }
        let _guard = self.lock.lock();
        let mut cookies = self.read_all()?;
        cookies.insert(cookie.name.clone(), cookie);
        self.write_all(&cookies)
    }

    fn remove(&self, name: &str) -> SessionResult<()> {
        let _guard = self.lock.lock();
        let mut cookies = self.read_all()?;
        if cookies.remove(name).is_some() {
            self.write_all(&cookies)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = Cookie::session("cvas_token", "abc", Duration::days(7)).unwrap();
        assert!(cookie.secure);
        assert_eq!(cookie.same_site, SameSite::Strict);
        assert!(!cookie.is_expired());
        assert!(cookie.is_expired_at(Utc::now() + Duration::days(8)));
        assert!(!format!("{:?}", cookie).contains("abc"));
    }

    #[test]
    fn test_memory_jar_drops_expired_cookie() {
        let jar = MemoryCookieJar::new();
        jar.set(Cookie::session("cvas_token", "abc", Duration::seconds(-1)).unwrap()).unwrap();
        assert_eq!(jar.len(), 1);

        assert!(jar.get("cvas_token").unwrap().is_none());
        assert!(jar.is_empty());
    }

    #[test]
    fn test_insecure_jar_refuses_secure_cookie() {
        let jar = MemoryCookieJar::insecure();
        let result = jar.set(Cookie::session("cvas_token", "abc", Duration::days(7)).unwrap());
        assert!(matches!(result, Err(SessionError::InsecureContext { .. })));
        assert!(jar.is_empty());
    }

    #[test]
    fn test_file_jar_persists_between_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");

        FileCookieJar::new(&path).set(Cookie::session("cvas_token", "abc", Duration::days(7)).unwrap()).unwrap();

        let reopened = FileCookieJar::new(&path);
        let cookie = reopened.get("cvas_token").unwrap().unwrap();
        assert_eq!(cookie.value, "abc");

        reopened.remove("cvas_token").unwrap();
        reopened.remove("cvas_token").unwrap();
        assert!(FileCookieJar::new(&path).get("cvas_token").unwrap().is_none());
    }

    #[test]
    fn test_file_jar_drops_expired_cookie() {
        let dir = tempfile::tempdir().unwrap();
        let jar = FileCookieJar::new(dir.path().join("cookies.json"));
        jar.set(Cookie::session("cvas_token", "abc", Duration::seconds(-1)).unwrap()).unwrap();

        assert!(jar.get("cvas_token").unwrap().is_none());
        let raw = std::fs::read_to_string(jar.path()).unwrap();
        assert!(!raw.contains("cvas_token"));
    }

    #[test]
    fn test_session_cookie_with_out_of_range_lifetime() {
        let result = Cookie::session("cvas_token", "abc", Duration::days(100_000_000));
        assert!(matches!(result, Err(SessionError::Config { .. })));
    }

    #[test]
    fn test_insecure_file_jar_refuses_secure_cookie() {
        let dir = tempfile::tempdir().unwrap();
        let jar = FileCookieJar::with_secure_context(dir.path().join("cookies.json"), false);
        let result = jar.set(Cookie::session("cvas_token", "abc", Duration::days(7)).unwrap());
        assert!(matches!(result, Err(SessionError::InsecureContext { .. })));
        assert!(!jar.path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_jar_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let jar = FileCookieJar::new(dir.path().join("cookies.json"));
        jar.set(Cookie::session("cvas_token", "abc", Duration::days(7)).unwrap()).unwrap();

        let mode = std::fs::metadata(jar.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_jar_tolerates_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, "{ not json").unwrap();

        let jar = FileCookieJar::new(&path);
        assert!(jar.get("cvas_token").unwrap().is_none());
        jar.set(Cookie::session("cvas_token", "abc", Duration::days(1)).unwrap()).unwrap();
        assert!(jar.get("cvas_token").unwrap().is_some());
    }
}
