use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::storage::keys::{ACCESS_TOKEN, REFRESH_TOKEN, SESSION_KEYS, USER_ID};
use crate::storage::{KeyValueStore, StorageError};

/// Credentials of the signed-in user.
///
/// Tokens are secrets: `Debug` prints them as `[REDACTED]`.
#[derive(Debug, Clone)]
pub struct Session {
    access_token: SecretString,
    refresh_token: SecretString,
    user_id: i64,
}

/// Token grant returned by `POST /api/login`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenGrant {
    access_token: String,
    refresh_token: String,
    user_id: i64,
}

impl From<TokenGrant> for Session {
    fn from(grant: TokenGrant) -> Self {
        Session::new(grant.access_token, grant.refresh_token, grant.user_id)
    }
}

impl Session {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>, user_id: i64) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: SecretString::from(refresh_token.into()),
            user_id,
        }
    }

    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &SecretString {
        &self.refresh_token
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Read the stored session.
    ///
    /// Returns `None` unless all three entries are present and the user id is
    /// an integer; a partial session is never handed out.
    pub async fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<Option<Self>, StorageError> {
        let access = store.get(ACCESS_TOKEN).await?;
        let refresh = store.get(REFRESH_TOKEN).await?;
        let user_id = store.get(USER_ID).await?;

        let (Some(access), Some(refresh), Some(user_id)) = (access, refresh, user_id) else {
            return Ok(None);
        };

        match user_id.trim().parse::<i64>() {
            Ok(user_id) => Ok(Some(Self::new(access, refresh, user_id))),
            Err(_) => {
                tracing::warn!(user_id = %user_id, "Stored user id is not an integer; ignoring session");
                Ok(None)
            }
        }
    }

    /// Persist all three entries as a unit, overwriting any previous session.
    pub async fn save<S: KeyValueStore + ?Sized>(&self, store: &S) -> Result<(), StorageError> {
        let user_id = self.user_id.to_string();
        store
            .set_all(&[
                (ACCESS_TOKEN, self.access_token.expose_secret()),
                (REFRESH_TOKEN, self.refresh_token.expose_secret()),
                (USER_ID, &user_id),
            ])
            .await
    }

    /// Tear down the stored session: access token, refresh token and user id
    /// are removed as a unit.
    pub async fn clear<S: KeyValueStore + ?Sized>(store: &S) -> Result<(), StorageError> {
        store.remove_all(&SESSION_KEYS).await?;
        tracing::info!("Session cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_save_then_load() {
        let store = MemoryStore::new();
        Session::new("acc", "ref", 42).save(&store).await.unwrap();

        let session = Session::load(&store).await.unwrap().unwrap();
        assert_eq!(session.access_token().expose_secret(), "acc");
        assert_eq!(session.refresh_token().expose_secret(), "ref");
        assert_eq!(session.user_id(), 42);
    }

    #[tokio::test]
    async fn test_partial_session_is_absent() {
        let store = MemoryStore::with_entries([(ACCESS_TOKEN, "acc"), (USER_ID, "1")]);
        assert!(Session::load(&store).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_non_numeric_user_id_is_absent() {
        let store = MemoryStore::with_entries([
            (ACCESS_TOKEN, "acc"),
            (REFRESH_TOKEN, "ref"),
            (USER_ID, "null"),
        ]);
        assert!(Session::load(&store).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_removes_all_three_only() {
        let store = MemoryStore::new();
        Session::new("acc", "ref", 3).save(&store).await.unwrap();
        store.set("discoverData", "{}").await.unwrap();

        Session::clear(&store).await.unwrap();

        for key in SESSION_KEYS {
            assert!(!store.contains(key));
        }
        assert!(store.contains("discoverData"));
    }

    /// Fails every write after the first one, whether single or batched.
    struct FlakyStore {
        inner: MemoryStore,
        writes: AtomicUsize,
    }

    impl FlakyStore {
        fn write_allowed(&self) -> Result<(), StorageError> {
            if self.writes.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(())
            } else {
                Err(StorageError::Migration("disk full".to_string()))
            }
        }
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key).await
        }
        async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.write_allowed()?;
            self.inner.set(key, value).await
        }
        async fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
            self.write_allowed()?;
            self.inner.set_all(entries).await
        }
        async fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key).await
        }
        async fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError> {
            self.inner.remove_all(keys).await
        }
    }

    #[tokio::test]
    async fn test_save_writes_tokens_together() {
        let store = FlakyStore {
            inner: MemoryStore::new(),
            writes: AtomicUsize::new(0),
        };

        Session::new("acc", "ref", 4).save(&store).await.unwrap();

        let saved = Session::load(&store).await.unwrap().unwrap();
        assert_eq!(saved.refresh_token().expose_secret(), "ref");
        assert_eq!(saved.user_id(), 4);
    }

    #[tokio::test]
    async fn test_failed_save_leaves_no_partial_session() {
        let store = FlakyStore {
            inner: MemoryStore::with_entries([("other", "x")]),
            writes: AtomicUsize::new(1),
        };

        assert!(Session::new("acc", "ref", 4).save(&store).await.is_err());

        for key in SESSION_KEYS {
            assert!(!store.inner.contains(key));
        }
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let session = Session::new("super-secret-access", "super-secret-refresh", 9);
        let debug_output = format!("{:?}", session);
        assert!(!debug_output.contains("super-secret-access"));
        assert!(!debug_output.contains("super-secret-refresh"));
        assert!(debug_output.contains("9"));
    }

    #[test]
    fn test_token_grant_deserializes_camel_case() {
        let grant: TokenGrant =
            serde_json::from_str(r#"{"accessToken":"a","refreshToken":"r","userId":5}"#).unwrap();
        let session = Session::from(grant);
        assert_eq!(session.user_id(), 5);
        assert_eq!(session.access_token().expose_secret(), "a");
    }
}
