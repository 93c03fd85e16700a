use std::sync::Arc;

use serde_json::Value;

use crate::models::Session;
use crate::storage::{KeyValueStore, SESSION_KEY};

/// Validated persistence of the session record. Never fails outward:
/// anything unreadable is cleared and reported as absent.
#[derive(Clone)]
pub struct SessionStorage {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn read(&self) -> Option<Session> {
        let raw = match self.store.get(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored session");
                self.clear();
                return None;
            }
        };

        match Self::parse(&raw) {
            Ok(session) => Some(session),
            Err(reason) => {
                tracing::warn!(reason = %reason, "Discarding invalid stored session");
                self.clear();
                None
            }
        }
    }

    pub fn write(&self, session: &Session) {
        let raw = match serde_json::to_string(session) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize session");
                return;
            }
        };
        if let Err(e) = self.store.set(SESSION_KEY, &raw) {
            tracing::warn!(error = %e, "Failed to persist session");
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.remove(SESSION_KEY) {
            tracing::warn!(error = %e, "Failed to clear stored session");
        }
    }

    fn parse(raw: &str) -> Result<Session, String> {
        let value: Value = serde_json::from_str(raw).map_err(|e| format!("malformed JSON: {}", e))?;
        validate_shape(&value)?;
        serde_json::from_value(value).map_err(|e| format!("schema mismatch: {}", e))
    }
}

fn validate_shape(value: &Value) -> Result<(), String> {
    let required = [
        ("/user/id", "user.id"),
        ("/user/email", "user.email"),
        ("/tokens/accessToken", "tokens.accessToken"),
        ("/expiresAt", "expiresAt"),
    ];
    for (pointer, name) in required {
        if !value.pointer(pointer).is_some_and(Value::is_string) {
            return Err(format!("{} must be a string", name));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::testing::fixtures;

    fn storage() -> (SessionStorage, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (SessionStorage::new(store.clone()), store)
    }

    #[test]
    fn test_round_trip() {
        let (storage, _) = storage();
        let session = fixtures::session_with_memberships(vec![
            fixtures::membership("t1", "stmarys", &["teacher"]),
        ]);

        storage.write(&session);
        assert_eq!(storage.read(), Some(session));
    }

    #[test]
    fn test_malformed_json_is_cleared() {
        let (storage, store) = storage();
        store.set(SESSION_KEY, "{oops").unwrap();

        assert_eq!(storage.read(), None);
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn test_failed_validation_is_cleared() {
        let (storage, store) = storage();
        let bad = serde_json::json!({
            "user": {"id": 42, "email": "a@b.com"},
            "tokens": {"accessToken": "t"},
            "expiresAt": "2030-01-01T00:00:00Z"
        });
        store.set(SESSION_KEY, &bad.to_string()).unwrap();

        assert_eq!(storage.read(), None);
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn test_unparseable_timestamp_is_cleared() {
        let (storage, store) = storage();
        let bad = serde_json::json!({
            "user": {"id": "u1", "email": "a@b.com"},
            "tokens": {"accessToken": "t"},
            "expiresAt": "tomorrow"
        });
        store.set(SESSION_KEY, &bad.to_string()).unwrap();

        assert_eq!(storage.read(), None);
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn test_clear_removes_entry() {
        let (storage, store) = storage();
        storage.write(&fixtures::session());
        storage.clear();
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
        assert_eq!(storage.read(), None);
    }
}
