// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Registry Types
//!
//! An agent is static [`AgentMeta`] plus an [`AgentHandler`] that turns a run
//! input into an output. Handlers compute; they never persist or call out.
//! Everything with side effects happens in the bus and the actions facade.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use crate::domain::agent::{AgentKey, AgentMeta, AgentRunInput, AgentRunOutput};

#[async_trait]
pub trait AgentHandler: Send + Sync {
    async fn run(&self, input: AgentRunInput) -> anyhow::Result<AgentRunOutput>;
}

/// Adapts an async closure into an [`AgentHandler`].
pub struct FnHandler<F>(F);

impl<F> FnHandler<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> AgentHandler for FnHandler<F>
where
    F: Fn(AgentRunInput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<AgentRunOutput>> + Send + 'static,
{
    async fn run(&self, input: AgentRunInput) -> anyhow::Result<AgentRunOutput> {
        (self.0)(input).await
    }
}

#[derive(Clone)]
pub struct RegisteredAgent {
    pub meta: AgentMeta,
    pub handler: Arc<dyn AgentHandler>,
    pub sample_payload: Option<serde_json::Value>,
}

impl RegisteredAgent {
    pub fn new(meta: AgentMeta, handler: Arc<dyn AgentHandler>) -> Self {
        Self {
            meta,
            handler,
            sample_payload: None,
        }
    }

    /// Builds an agent from an async closure.
    pub fn from_fn<F, Fut>(meta: AgentMeta, f: F) -> Self
    where
        F: Fn(AgentRunInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<AgentRunOutput>> + Send + 'static,
    {
        Self::new(meta, Arc::new(FnHandler::new(f)))
    }

    pub fn with_sample_payload(mut self, payload: serde_json::Value) -> Self {
        self.sample_payload = Some(payload);
        self
    }

    pub fn key(&self) -> &AgentKey {
        &self.meta.key
    }
}

impl std::fmt::Debug for RegisteredAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredAgent")
            .field("meta", &self.meta)
            .field("sample_payload", &self.sample_payload)
            .finish_non_exhaustive()
    }
}
