pub mod claims;
pub mod context;
pub mod roles;
pub mod store;
pub mod user;

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;

use crate::error::SessionError;
use claims::{decode_claims, Claims};
use store::TokenStore;
use user::CurrentUser;

pub use context::SessionContext;
pub use roles::{compute_role_set, normalize, RoleCatalog, RoleSet};
pub use store::{FileTokenStore, MemoryTokenStore};

/// Broadcast whenever the stored token is written or cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    SignedOut,
}

/// Token lifecycle on top of a [`TokenStore`]
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn TokenStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self { store, events }
    }

    pub fn store(&self) -> Arc<dyn TokenStore> {
        self.store.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Persist `token`, or clear the store for `None`/blank, then notify
    pub fn save(&self, token: Option<&str>) -> Result<(), SessionError> {
        let event = match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => {
                self.store.store(token)?;
                SessionEvent::SignedIn
            }
            None => {
                self.store.clear()?;
                SessionEvent::SignedOut
            }
        };

        tracing::info!(?event, "session changed");
        // No subscribers is fine
        let _ = self.events.send(event);
        Ok(())
    }

    pub fn token(&self) -> Option<String> {
        self.store.current()
    }

    pub fn logout(&self) -> Result<(), SessionError> {
        self.save(None)
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(Utc::now().timestamp())
    }

    /// Absent token: false. Undecodable token or no `exp`: true.
    /// Otherwise `exp` must lie after `now` (seconds).
    pub fn is_authenticated_at(&self, now: i64) -> bool {
        let Some(token) = self.token() else {
            return false;
        };
        match decode_claims(&token) {
            Some(claims) => claims.is_live_at(now),
            None => true,
        }
    }

    pub fn claims(&self) -> Option<Claims> {
        self.token().and_then(|t| decode_claims(&t))
    }

    /// User view derived from the token alone
    pub fn current_user(&self) -> Option<CurrentUser> {
        self.claims().map(|c| CurrentUser::from_claims(&c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64ct::{Base64UrlUnpadded, Encoding};
    use serde_json::{json, Value};

    fn token_with(payload: Value) -> String {
        let header = Base64UrlUnpadded::encode_string(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = Base64UrlUnpadded::encode_string(payload.to_string().as_bytes());
        format!("{header}.{body}.sig")
    }

    fn session() -> Session {
        Session::new(Arc::new(MemoryTokenStore::default()))
    }

    #[test]
    fn test_expiry_drives_authentication() {
        let now = 1_700_000_000;
        let session = session();
        assert!(!session.is_authenticated_at(now));

        session.save(Some(&token_with(json!({ "exp": now - 60 })))).unwrap();
        assert!(!session.is_authenticated_at(now));

        session.save(Some(&token_with(json!({ "exp": now + 60 })))).unwrap();
        assert!(session.is_authenticated_at(now));

        session.save(Some(&token_with(json!({ "sub": "alice" })))).unwrap();
        assert!(session.is_authenticated_at(now));
    }

    #[test]
    fn test_string_expiry_drives_authentication() {
        let now = 1_700_000_000;
        let session = session();

        session.save(Some(&token_with(json!({ "exp": "1600000000" })))).unwrap();
        assert!(!session.is_authenticated_at(now));

        session.save(Some(&token_with(json!({ "exp": "1800000000" })))).unwrap();
        assert!(session.is_authenticated_at(now));

        session.save(Some(&token_with(json!({ "exp": "soon" })))).unwrap();
        assert!(!session.is_authenticated_at(now));
    }

    #[test]
    fn test_malformed_token_counts_as_non_expiring() {
        let session = session();
        session.save(Some("not-a-jwt")).unwrap();
        assert!(session.claims().is_none());
        assert!(session.is_authenticated());

        session.save(Some("a.%%%.c")).unwrap();
        assert!(session.claims().is_none());
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_save_none_clears_and_notifies() {
        let session = session();
        let mut events = session.subscribe();

        session.save(Some("abc")).unwrap();
        assert_eq!(session.token().as_deref(), Some("abc"));
        assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedIn);

        session.logout().unwrap();
        assert_eq!(session.token(), None);
        assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedOut);

        session.save(Some("   ")).unwrap();
        assert_eq!(session.token(), None);
        assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedOut);
    }

    #[test]
    fn test_current_user_from_token() {
        let session = session();
        assert!(session.current_user().is_none());

        session
            .save(Some(&token_with(json!({ "sub": "bob", "user_id": 5, "role": "teacher" }))))
            .unwrap();
        let user = session.current_user().unwrap();
        assert_eq!(user.username.as_deref(), Some("bob"));
        assert_eq!(user.numeric_id(), Some(5));
        assert_eq!(user.role_names, vec!["teacher".to_string()]);
    }
}
