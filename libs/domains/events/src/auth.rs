//! Identity provider seam and client-side session tracking.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::{BackendError, EventError, EventResult};
use crate::models::{Actor, AuthUser, Session};

/// Session and identity operations of the hosted auth service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve the user behind an access token
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError>;

    /// Revoke the token. Revoking an unknown token is not an error.
    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;
}

#[derive(Debug, Clone)]
struct Credentials {
    password: String,
    user: AuthUser,
}

/// Credential and token store for development and tests.
///
/// Passwords are kept in plain text; never point this at real users.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAuthProvider {
    users: Arc<RwLock<HashMap<String, Credentials>>>,
    sessions: Arc<RwLock<HashMap<String, AuthUser>>>,
}

impl InMemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the account, or reset its password if the email is known
    pub async fn register(&self, email: &str, password: &str) -> AuthUser {
        let mut users = self.users.write().await;
        let key = email.trim().to_lowercase();
        let user = users
            .get(&key)
            .map(|c| c.user.clone())
            .unwrap_or_else(|| AuthUser {
                id: Uuid::new_v4(),
                email: Some(key.clone()),
            });

        users.insert(
            key,
            Credentials {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuthProvider {
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        self.sessions
            .read()
            .await
            .get(access_token)
            .cloned()
            .ok_or_else(|| BackendError::Status {
                status: 401,
                message: "Invalid token".to_string(),
            })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let user = {
            let users = self.users.read().await;
            match users.get(&email.trim().to_lowercase()) {
                Some(c) if c.password == password => c.user.clone(),
                _ => {
                    return Err(BackendError::Status {
                        status: 400,
                        message: "Invalid login credentials".to_string(),
                    });
                }
            }
        };

        let access_token = Uuid::new_v4().simple().to_string();
        self.sessions
            .write()
            .await
            .insert(access_token.clone(), user.clone());

        Ok(Session { access_token, user })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        self.sessions.write().await.remove(access_token);
        Ok(())
    }
}

/// Tracks the signed-in session of one client and broadcasts changes.
///
/// The current [`Actor`] is read from here and passed explicitly to the
/// services; nothing else holds a "current user".
pub struct SessionHandle<A: AuthProvider> {
    provider: Arc<A>,
    tx: watch::Sender<Option<Session>>,
}

impl<A: AuthProvider> SessionHandle<A> {
    pub fn new(provider: Arc<A>) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { provider, tx }
    }

    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> EventResult<Session> {
        let session = self
            .provider
            .sign_in(email, password)
            .await
            .map_err(|e| EventError::Auth(e.message()))?;

        debug!(user_id = %session.user.id, "Session started");
        self.tx.send_replace(Some(session.clone()));
        Ok(session)
    }

    /// Clears the local session even when the provider call fails.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> EventResult<()> {
        let Some(previous) = self.tx.send_replace(None) else {
            return Ok(());
        };

        self.provider
            .sign_out(&previous.access_token)
            .await
            .map_err(|e| {
                warn!(error = %e, "Provider sign-out failed");
                EventError::Auth(e.message())
            })
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    pub fn actor(&self) -> Actor {
        self.tx
            .borrow()
            .as_ref()
            .map(|s| Actor::Authenticated(s.user.clone()))
            .unwrap_or_default()
    }
}
