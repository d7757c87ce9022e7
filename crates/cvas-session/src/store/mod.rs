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

//! Session persistence
//!
//! A session is two halves kept in two places:
//! - the bearer token, in the `cvas_token` cookie
//! - the serialized identity, in the `cvas_user` durable record
//!
//! The halves are written and cleared together. A load that finds only one
//! half, or an identity that does not parse, clears both and reports no
//! session.

pub mod cookie;
pub mod durable;

pub use cookie::*;
pub use durable::*;

use crate::config::{Config, TOKEN_COOKIE, USER_KEY};
use crate::error::{SessionError, SessionResult};
use crate::models::{Session, SessionToken, User};
use chrono::Duration;
use metrics::counter;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Why a stored session was thrown away on load
#[derive(Debug)]
enum Discard {
    MissingUser,
    MissingToken,
    CorruptUser(serde_json::Error),
    Unreadable(SessionError),
}

impl Discard {
    fn tag(&self) -> &'static str {
        match self {
            Discard::MissingUser => "missing_user",
            Discard::MissingToken => "missing_token",
            Discard::CorruptUser(_) => "corrupt_user",
            Discard::Unreadable(_) => "unreadable",
        }
    }
}

impl fmt::Display for Discard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discard::MissingUser => f.write_str("token without identity"),
            Discard::MissingToken => f.write_str("identity without live token"),
            Discard::CorruptUser(e) => write!(f, "identity does not parse: {}", e),
            Discard::Unreadable(e) => write!(f, "storage unreadable: {}", e),
        }
    }
}

/// Write `contents` to `path` through a sibling tmp file and a rename.
///
/// On unix the file is readable by its owner only.
pub(crate) fn write_owner_only(path: &Path, contents: &[u8]) -> SessionResult<()> {
    let tmp = path.with_extension("tmp");

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(&tmp)?;
    // A tmp file left over from an earlier run keeps its old mode.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Owner of the persisted session
pub struct SessionStore {
    cookies: Arc<dyn CookieJar>,
    durable: Arc<dyn DurableStore>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(cookies: Arc<dyn CookieJar>, durable: Arc<dyn DurableStore>, ttl: Duration) -> Self {
        Self { cookies, durable, ttl }
    }

    /// Store backed by files in `dir`, surviving process restarts
    pub fn on_disk(dir: &Path, config: &Config) -> Self {
        Self::new(
            Arc::new(FileCookieJar::with_secure_context(dir.join("cookies.json"), config.secure_context)),
            Arc::new(FileStore::new(dir)),
            config.session_ttl(),
        )
    }

    /// Persist a session as one logical write.
    ///
    /// If either half cannot be written, whatever was stored before is put
    /// back and the error is returned.
    pub fn save(&self, token: &SessionToken, user: &User) -> SessionResult<()> {
        let payload = serde_json::to_string(user)?;

        let previous_cookie = self.cookies.get(TOKEN_COOKIE).ok().flatten();

        self.cookies.set(Cookie::session(TOKEN_COOKIE, token.as_str(), self.ttl)?)?;

        if let Err(e) = self.durable.set_item(USER_KEY, &payload) {
            error!(error = %e, error_type = e.error_type(), "Failed to persist identity, rolling back token");
            self.restore_previous(previous_cookie);
            return Err(e);
        }

        debug!(service_number = %user.service_number, "Session saved");
        Ok(())
    }

    /// Read the stored session, self-healing anything partial or corrupt
    pub fn load(&self) -> Option<Session> {
        match self.read_halves() {
            Ok(session) => session,
            Err(reason) => {
                warn!(reason = %reason, "Discarding stored session");
                counter!("cvas_session_discarded", 1, "reason" => reason.tag());
                self.clear();
                None
            }
        }
    }

    /// Remove both halves. Safe to call on an empty store.
    pub fn clear(&self) {
        if let Err(e) = self.cookies.remove(TOKEN_COOKIE) {
            error!(error = %e, error_type = e.error_type(), "Failed to remove session cookie");
        }
        if let Err(e) = self.durable.remove_item(USER_KEY) {
            error!(error = %e, error_type = e.error_type(), "Failed to remove stored identity");
        }
    }

    fn read_halves(&self) -> Result<Option<Session>, Discard> {
        let token = self
            .cookies
            .get(TOKEN_COOKIE)
            .map_err(Discard::Unreadable)?
            .map(|cookie| SessionToken::new(cookie.value))
            .filter(|token| !token.is_empty());
        let raw_user = self.durable.get_item(USER_KEY).map_err(Discard::Unreadable)?;

        match (token, raw_user) {
            (None, None) => Ok(None),
            (Some(_), None) => Err(Discard::MissingUser),
            (None, Some(_)) => Err(Discard::MissingToken),
            (Some(token), Some(raw)) => {
                let user = serde_json::from_str::<User>(&raw).map_err(Discard::CorruptUser)?;
                Ok(Some(Session { token, user }))
            }
        }
    }

    fn restore_previous(&self, cookie: Option<Cookie>) {
        // The identity write is atomic, so only the token needs putting back.
        let result = match cookie {
            Some(cookie) => self.cookies.set(cookie),
            None => self.cookies.remove(TOKEN_COOKIE),
        };

        if let Err(e) = result {
            error!(error = %e, "Rollback incomplete, clearing session");
            self.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    /// Durable store whose writes always fail
    struct ReadOnlyStore {
        inner: MemoryStore,
    }

    impl DurableStore for ReadOnlyStore {
        fn get_item(&self, key: &str) -> SessionResult<Option<String>> {
            self.inner.get_item(key)
        }

        fn set_item(&self, _key: &str, _value: &str) -> SessionResult<()> {
            Err(SessionError::storage("quota exceeded"))
        }

        fn remove_item(&self, key: &str) -> SessionResult<()> {
            self.inner.remove_item(key)
        }
    }

    fn user(role: Role, checkpoint: Option<&str>) -> User {
        User {
            name: "Alex Morgan".to_string(),
            rank: "Lieutenant".to_string(),
            service_number: "SN001".to_string(),
            role,
            checkpoint: checkpoint.map(str::to_string),
            unit: None,
        }
    }

    fn memory_store() -> (SessionStore, Arc<MemoryCookieJar>, Arc<MemoryStore>) {
        let jar = Arc::new(MemoryCookieJar::new());
        let durable = Arc::new(MemoryStore::new());
        let store = SessionStore::new(jar.clone(), durable.clone(), Duration::days(7));
        (store, jar, durable)
    }

    #[test]
    fn test_round_trip_every_identity_shape() {
        for role in Role::KNOWN {
            for checkpoint in [None, Some("Checkpoint Alpha")] {
                let (store, _, _) = memory_store();
                let original = user(role.clone(), checkpoint);
                store.save(&SessionToken::new("tok-1"), &original).unwrap();

                let session = store.load().unwrap();
                assert_eq!(session.user, original);
                assert_eq!(session.token.as_str(), "tok-1");
            }
        }
    }

    #[test]
    fn test_saved_cookie_attributes() {
        let (store, jar, _) = memory_store();
        store.save(&SessionToken::new("tok-1"), &user(Role::Worker, None)).unwrap();

        let cookie = jar.get(TOKEN_COOKIE).unwrap().unwrap();
        assert!(cookie.secure);
        assert_eq!(cookie.same_site, SameSite::Strict);
        let remaining = cookie.expires_at - chrono::Utc::now();
        assert!(remaining > Duration::days(6) && remaining <= Duration::days(7));
    }

    #[test]
    fn test_empty_store_loads_nothing() {
        let (store, _, _) = memory_store();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_malformed_combinations_self_heal() {
        type Setup = fn(&MemoryCookieJar, &MemoryStore);
        let cases: [(&str, Setup); 4] = [
            ("missing user", |jar, _| {
                jar.set(Cookie::session(TOKEN_COOKIE, "tok", Duration::days(1)).unwrap()).unwrap();
            }),
            ("unparsable user", |jar, durable| {
                jar.set(Cookie::session(TOKEN_COOKIE, "tok", Duration::days(1)).unwrap()).unwrap();
                durable.set_item(USER_KEY, "{ definitely not json").unwrap();
            }),
            ("missing token", |_, durable| {
                durable.set_item(USER_KEY, r#"{"name":"A","serviceNumber":"SN1","role":"WORKER"}"#).unwrap();
            }),
            ("expired token", |jar, durable| {
                jar.set(Cookie::session(TOKEN_COOKIE, "tok", Duration::seconds(-5)).unwrap()).unwrap();
                durable.set_item(USER_KEY, r#"{"name":"A","serviceNumber":"SN1","role":"WORKER"}"#).unwrap();
            }),
        ];

        for (name, setup) in cases {
            let (store, jar, durable) = memory_store();
            setup(&jar, &durable);

            assert!(store.load().is_none(), "{} should load as absent", name);
            store.clear();
            assert!(jar.is_empty(), "{} left a cookie behind", name);
            assert!(durable.is_empty(), "{} left an identity behind", name);
        }
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (store, jar, durable) = memory_store();
        store.clear();
        store.save(&SessionToken::new("tok"), &user(Role::SuperAdmin, None)).unwrap();
        store.clear();
        store.clear();
        assert!(jar.is_empty());
        assert!(durable.is_empty());
    }

    #[test]
    fn test_save_overwrites_previous_session() {
        let (store, jar, durable) = memory_store();
        store.save(&SessionToken::new("first"), &user(Role::Worker, None)).unwrap();
        store.save(&SessionToken::new("second"), &user(Role::Worker, Some("Gate 2"))).unwrap();

        assert_eq!(jar.len(), 1);
        assert_eq!(durable.len(), 1);
        let session = store.load().unwrap();
        assert_eq!(session.token.as_str(), "second");
        assert_eq!(session.user.checkpoint.as_deref(), Some("Gate 2"));
    }

    #[test]
    fn test_failed_identity_write_rolls_back_token() {
        let jar = Arc::new(MemoryCookieJar::new());
        let durable = Arc::new(ReadOnlyStore { inner: MemoryStore::new() });
        let store = SessionStore::new(jar.clone(), durable, Duration::days(7));

        let result = store.save(&SessionToken::new("tok"), &user(Role::Worker, None));
        assert!(matches!(result, Err(SessionError::Storage { .. })));
        assert!(jar.is_empty());
        assert!(store.load().is_none());
    }

    #[test]
    fn test_failed_save_keeps_previous_session() {
        let jar = Arc::new(MemoryCookieJar::new());
        let inner = MemoryStore::new();
        inner.set_item(USER_KEY, &serde_json::to_string(&user(Role::CheckpointAdmin, Some("East"))).unwrap()).unwrap();
        jar.set(Cookie::session(TOKEN_COOKIE, "old", Duration::days(1)).unwrap()).unwrap();
        let store = SessionStore::new(jar.clone(), Arc::new(ReadOnlyStore { inner }), Duration::days(7));

        assert!(store.save(&SessionToken::new("new"), &user(Role::Worker, None)).is_err());

        let session = store.load().unwrap();
        assert_eq!(session.token.as_str(), "old");
        assert_eq!(session.user.role, Role::CheckpointAdmin);
    }

    #[test]
    fn test_insecure_context_fails_whole_save() {
        let durable = Arc::new(MemoryStore::new());
        let store = SessionStore::new(Arc::new(MemoryCookieJar::insecure()), durable.clone(), Duration::days(7));

        let result = store.save(&SessionToken::new("tok"), &user(Role::Worker, None));
        assert!(matches!(result, Err(SessionError::InsecureContext { .. })));
        assert!(durable.is_empty());
    }

    #[test]
    fn test_oversized_lifetime_fails_save_without_panicking() {
        let jar = Arc::new(MemoryCookieJar::new());
        let durable = Arc::new(MemoryStore::new());
        let store = SessionStore::new(jar.clone(), durable.clone(), Duration::days(100_000_000));

        let result = store.save(&SessionToken::new("tok"), &user(Role::Worker, None));
        assert!(matches!(result, Err(SessionError::Config { .. })));
        assert!(jar.is_empty());
        assert!(durable.is_empty());
    }

    #[test]
    fn test_on_disk_store_honours_insecure_context() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            secure_context: false,
            ..Config::default()
        };
        let store = SessionStore::on_disk(dir.path(), &config);

        let result = store.save(&SessionToken::new("tok"), &user(Role::Worker, None));
        assert!(matches!(result, Err(SessionError::InsecureContext { .. })));
        assert!(!dir.path().join("cookies.json").exists());
        assert!(!dir.path().join("cvas_user.json").exists());
        assert!(store.load().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_on_disk_session_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        SessionStore::on_disk(dir.path(), &Config::default())
            .save(&SessionToken::new("tok"), &user(Role::Worker, None))
            .unwrap();

        for name in ["cookies.json", "cvas_user.json"] {
            let mode = std::fs::metadata(dir.path().join(name)).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600, "{}", name);
        }
    }

    #[test]
    fn test_on_disk_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let original = user(Role::Worker, Some("Checkpoint Alpha"));

        SessionStore::on_disk(dir.path(), &config).save(&SessionToken::new("tok"), &original).unwrap();

        let reopened = SessionStore::on_disk(dir.path(), &config);
        assert_eq!(reopened.load().unwrap().user, original);
        reopened.clear();
        assert!(SessionStore::on_disk(dir.path(), &config).load().is_none());
    }
}
