//! # Session Identity
//!
//! In-process holder of the logged-in user. The host application calls
//! [`SessionIdentity::login`] after authenticating and
//! [`SessionIdentity::logout`] when the session ends.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::traits::{CurrentUser, IdentityProvider};

#[derive(Debug, Default)]
pub struct SessionIdentity {
    current: RwLock<Option<CurrentUser>>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new session for `user_id` and returns it.
    ///
    /// Every login gets a fresh session id, even for the same user.
    pub async fn login(&self, user_id: impl Into<String>, email: Option<String>) -> CurrentUser {
        let user = CurrentUser {
            id: user_id.into(),
            email,
            session_id: Uuid::new_v4().to_string(),
        };
        info!(user_id = %user.id, session_id = %user.session_id, "Session started");

        *self.current.write().await = Some(user.clone());
        user
    }

    pub async fn logout(&self) {
        if let Some(user) = self.current.write().await.take() {
            info!(user_id = %user.id, session_id = %user.session_id, "Session ended");
        }
    }
}

#[async_trait]
impl IdentityProvider for SessionIdentity {
    async fn current_user(&self) -> Option<CurrentUser> {
        self.current.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_login_logout() {
        let identity = SessionIdentity::new();
        assert!(identity.current_user().await.is_none());

        let user = identity.login("user-1", Some("a@b.com".to_string())).await;
        assert_eq!(identity.current_user().await, Some(user));

        identity.logout().await;
        assert!(identity.current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_each_login_is_a_new_session() {
        let identity = SessionIdentity::new();
        let first = identity.login("user-1", None).await;
        let second = identity.login("user-1", None).await;

        assert_eq!(first.id, second.id);
        assert_ne!(first.session_id, second.session_id);
    }
}
