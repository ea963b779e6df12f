//! Caller identity
//!
//! Credentials are issued elsewhere. The service only maps an opaque bearer
//! token to an [`Actor`] and passes that actor into every operation.

use crate::config::AuthConfig;
use crate::core::Actor;
use crate::error::{FixhubError, Result};
use std::collections::HashMap;

/// Maps a bearer token to the calling actor
pub trait IdentityResolver: Send + Sync {
    /// Returns `None` for unknown tokens
    fn resolve(&self, token: &str) -> Option<Actor>;

    /// Resolve the raw value of an `Authorization` header
    fn authenticate(&self, header: Option<&str>) -> Result<Actor> {
        let token = header
            .and_then(bearer_token)
            .ok_or(FixhubError::Unauthenticated)?;
        self.resolve(token).ok_or(FixhubError::Unauthenticated)
    }
}

/// Extract the token from `Bearer <token>`; the scheme is case-insensitive
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Fixed token table loaded from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticTokenResolver {
    tokens: HashMap<String, Actor>,
}

impl StaticTokenResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        let tokens = config
            .tokens
            .iter()
            .map(|grant| (grant.token.clone(), grant.to_actor()))
            .collect();
        Self { tokens }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, actor: Actor) -> Self {
        self.tokens.insert(token.into(), actor);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl IdentityResolver for StaticTokenResolver {
    fn resolve(&self, token: &str) -> Option<Actor> {
        self.tokens.get(token).cloned()
    }
}
