// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0
//! Auth providers backed by configuration.
//!
//! [`TokenAuthProvider`] resolves bearer tokens from `spec.auth.tokens` and is
//! what the HTTP API uses. [`StaticAuthProvider`] always answers with one
//! fixed identity and backs the CLI, which acts as the configured operator.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::auth::{AuthContext, AuthProvider, Credentials};
use crate::domain::config::{resolve_secret, AuthConfig};

#[derive(Debug, Clone, Default)]
pub struct TokenAuthProvider {
    tokens: HashMap<String, AuthContext>,
}

impl TokenAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        let tokens = config
            .tokens
            .iter()
            .filter_map(|t| Some((resolve_secret(&t.token)?, t.identity.to_auth_context())))
            .collect();
        Self { tokens }
    }

    pub fn with_token(mut self, token: impl Into<String>, context: AuthContext) -> Self {
        self.tokens.insert(token.into(), context);
        self
    }
}

#[async_trait]
impl AuthProvider for TokenAuthProvider {
    async fn get_auth_context(&self, credentials: &Credentials) -> Option<AuthContext> {
        credentials
            .token
            .as_ref()
            .and_then(|token| self.tokens.get(token))
            .cloned()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticAuthProvider {
    context: Option<AuthContext>,
}

impl StaticAuthProvider {
    pub fn new(context: Option<AuthContext>) -> Self {
        Self { context }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.operator.as_ref().map(|operator| operator.to_auth_context()))
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn get_auth_context(&self, _credentials: &Credentials) -> Option<AuthContext> {
        self.context.clone()
    }
}
