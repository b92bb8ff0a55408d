// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0
//! Caller identity as seen by the actions facade.
//!
//! Session handling lives outside this crate; the facade only needs a user
//! id and, when the user belongs to one, an organization.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::governance::OrganizationId;

/// Login route used when an unauthenticated caller reaches the agents page.
pub const AGENTS_LOGIN_REDIRECT: &str = "/login?next=/agents";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: String,
    pub organization_id: Option<OrganizationId>,
}

impl AuthContext {
    pub fn new(user_id: impl Into<String>, organization_id: Option<OrganizationId>) -> Self {
        Self {
            user_id: user_id.into(),
            organization_id,
        }
    }
}

/// Opaque credentials presented with a request (bearer token or similar).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub token: Option<String>,
}

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolves the caller, `None` when nobody is signed in.
    async fn get_auth_context(&self, credentials: &Credentials) -> Option<AuthContext>;
}
