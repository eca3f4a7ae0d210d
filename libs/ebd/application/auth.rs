//! Registration, login and token checks

use super::error::{ServiceError, ServiceResult};
use crate::domain::{Credentials, User, ValidationError};
use crate::infrastructure::{
    Claims, DatabaseError, PasswordHasher, Store, TokenError, TokenIssuer,
};
use std::sync::Arc;
use tracing::{info, warn};

pub const MSG_USERNAME_TAKEN: &str = "Username já existe";
pub const MSG_INVALID_CREDENTIALS: &str = "Credenciais inválidas";

pub struct AuthService {
    store: Arc<dyn Store>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, hasher: PasswordHasher, tokens: TokenIssuer) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    /// Create a user account
    pub async fn register(&self, credentials: Credentials) -> ServiceResult<User> {
        let (username, password) = credentials.require()?;

        if self.store.find_user_by_username(&username).await?.is_some() {
            return Err(ValidationError::new(MSG_USERNAME_TAKEN).into());
        }

        let hasher = self.hasher.clone();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        match self.store.create_user(&username, &password_hash).await {
            Ok(user) => {
                info!(user_id = user.id, username = %user.username, "User registered");
                Ok(user)
            }
            // Lost a race against a concurrent registration
            Err(DatabaseError::UniqueViolation(_)) => {
                Err(ValidationError::new(MSG_USERNAME_TAKEN).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Exchange credentials for an access token
    pub async fn login(&self, credentials: Credentials) -> ServiceResult<String> {
        let (username, password) = credentials.require()?;

        let Some(user) = self.store.find_user_by_username(&username).await? else {
            warn!(username = %username, "Login attempt for unknown user");
            return Err(ServiceError::Unauthorized(MSG_INVALID_CREDENTIALS.to_string()));
        };

        let hasher = self.hasher.clone();
        let stored = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || hasher.verify(&stored, &password))
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        if !valid {
            warn!(user_id = user.id, "Login attempt with wrong password");
            return Err(ServiceError::Unauthorized(MSG_INVALID_CREDENTIALS.to_string()));
        }

        self.tokens
            .issue(user.id)
            .map_err(|e| ServiceError::Internal(e.to_string()))
    }

    /// Verify a bearer token
    pub fn authenticate(&self, token: &str) -> Result<Claims, TokenError> {
        self.tokens.verify(token)
    }
}
