//! Credential Record persistence
//!
//! The only writer of the `token` and `username` cookies. Both are written
//! and removed together in one transaction.

use chrono::{DateTime, Duration, Utc};

use mathtutor_storage::{
    delete_cookies, delete_item, write_item, Cookie, CookieJar, Database, LocalStorage,
};

use crate::Result;

pub const TOKEN_COOKIE: &str = "token";
pub const USERNAME_COOKIE: &str = "username";

/// Last notification-read timestamp, dropped on sign-out.
pub const LAST_READ_TIME_KEY: &str = "lastReadTime";
/// Epoch millis of the most recent sign-out.
pub const USER_SIGN_OUT_KEY: &str = "userSignOut";

const SESSION_DAYS: i64 = 1;
const REMEMBER_ME_DAYS: i64 = 30;

/// Expiry policy chosen at write time.
pub fn expiry_for(remember_me: bool, now: DateTime<Utc>) -> DateTime<Utc> {
    let days = if remember_me {
        REMEMBER_ME_DAYS
    } else {
        SESSION_DAYS
    };
    now + Duration::days(days)
}

pub struct CredentialStore {
    db: Database,
    cookies: CookieJar,
    local: LocalStorage,
}

impl CredentialStore {
    pub fn new(db: Database) -> Self {
        Self {
            cookies: CookieJar::new(db.clone()),
            local: LocalStorage::new(db.clone()),
            db,
        }
    }

    pub fn token(&self) -> Result<Option<String>> {
        Ok(self.cookies.value(TOKEN_COOKIE)?)
    }

    /// The stored display name, URL-decoded. An empty name counts as absent.
    pub fn username(&self) -> Result<Option<String>> {
        let encoded = match self.cookies.value(USERNAME_COOKIE)? {
            Some(value) => value,
            None => return Ok(None),
        };

        let username = match urlencoding::decode(&encoded) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => encoded,
        };
        Ok(Some(username).filter(|name| !name.is_empty()))
    }

    /// When the stored credentials lapse, if any are stored.
    pub fn expires_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.cookies.get(TOKEN_COOKIE)?.map(|c| c.expires_at))
    }

    pub fn save(&self, token: &str, username: &str, remember_me: bool) -> Result<DateTime<Utc>> {
        let expires_at = expiry_for(remember_me, Utc::now());
        let encoded = urlencoding::encode(username);

        self.cookies.set_all(&[
            Cookie::new(TOKEN_COOKIE, token, expires_at),
            Cookie::new(USERNAME_COOKIE, encoded.into_owned(), expires_at),
        ])?;

        Ok(expires_at)
    }

    /// Remove the record and update the sign-out markers in one
    /// transaction. Idempotent.
    pub fn clear(&self) -> Result<()> {
        let signed_out_at = Utc::now().timestamp_millis().to_string();

        self.db.transaction(|conn| {
            delete_cookies(conn, &[TOKEN_COOKIE, USERNAME_COOKIE])?;
            delete_item(conn, LAST_READ_TIME_KEY)?;
            write_item(conn, USER_SIGN_OUT_KEY, &signed_out_at)
        })?;
        Ok(())
    }

    pub fn local_storage(&self) -> &LocalStorage {
        &self.local
    }
}

impl Clone for CredentialStore {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            cookies: self.cookies.clone(),
            local: self.local.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CredentialStore {
        CredentialStore::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn test_save_and_read_back() {
        let store = store();
        store.save("a.b.c", "Ada Lovelace", false).unwrap();

        assert_eq!(store.token().unwrap().as_deref(), Some("a.b.c"));
        assert_eq!(store.username().unwrap().as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn test_username_is_url_encoded_at_rest() {
        let db = Database::open_in_memory().unwrap();
        let store = CredentialStore::new(db.clone());
        store.save("a.b.c", "Zoë & co", false).unwrap();

        let raw = CookieJar::new(db).value(USERNAME_COOKIE).unwrap().unwrap();
        assert_eq!(raw, "Zo%C3%AB%20%26%20co");
        assert_eq!(store.username().unwrap().as_deref(), Some("Zoë & co"));
    }

    #[test]
    fn test_expiry_policies_differ() {
        let now = Utc::now();
        assert_eq!(expiry_for(false, now) - now, Duration::days(1));
        assert_eq!(expiry_for(true, now) - now, Duration::days(30));

        let store = store();
        store.save("a.b.c", "Ada", true).unwrap();
        let remembered = store.expires_at().unwrap().unwrap();
        assert!(remembered > Utc::now() + Duration::days(29));

        store.save("a.b.c", "Ada", false).unwrap();
        let short = store.expires_at().unwrap().unwrap();
        assert!(short < Utc::now() + Duration::days(2));
        assert!(short > Utc::now() + Duration::hours(23));
    }

    #[test]
    fn test_clear_is_idempotent_and_updates_markers() {
        let store = store();
        store
            .local_storage()
            .set_item(LAST_READ_TIME_KEY, "2024-01-01T00:00:00Z")
            .unwrap();
        store.save("a.b.c", "Ada", false).unwrap();

        store.clear().unwrap();
        store.clear().unwrap();

        assert!(store.token().unwrap().is_none());
        assert!(store.username().unwrap().is_none());
        assert!(store.expires_at().unwrap().is_none());
        assert!(store
            .local_storage()
            .get_item(LAST_READ_TIME_KEY)
            .unwrap()
            .is_none());

        let signed_out: i64 = store
            .local_storage()
            .get_item(USER_SIGN_OUT_KEY)
            .unwrap()
            .unwrap()
            .parse()
            .unwrap();
        assert!(signed_out > 0);
    }

    #[test]
    fn test_empty_username_counts_as_absent() {
        let store = store();
        store.save("a.b.c", "", false).unwrap();

        assert!(store.token().unwrap().is_some());
        assert!(store.username().unwrap().is_none());
    }

    #[test]
    fn test_failed_clear_leaves_record_intact() {
        let db = Database::open_in_memory().unwrap();
        let store = CredentialStore::new(db.clone());
        store.save("a.b.c", "Ada", false).unwrap();

        db.with_connection(|conn| {
            conn.execute_batch("DROP TABLE local_storage")?;
            Ok(())
        })
        .unwrap();

        assert!(store.clear().is_err());
        assert_eq!(store.token().unwrap().as_deref(), Some("a.b.c"));
        assert_eq!(store.username().unwrap().as_deref(), Some("Ada"));
    }
}
