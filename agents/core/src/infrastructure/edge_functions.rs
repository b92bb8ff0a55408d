// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0

//! Hosted Function Client
//!
//! HTTP client for the Supabase edge functions the console calls after a run.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Implements [`RemoteAgentRunner`] and [`AnalyticsSink`]
//! - **Integration:** console → `POST {base_url}/{function}` with bearer service key
//!
//! Non-2xx responses become [`RemoteError::Status`]; a 2xx body with
//! `ok: false` becomes [`RemoteError::Rejected`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::domain::config::FunctionsConfig;
use crate::domain::remote::{
    AnalyticsEvent, AnalyticsSink, RemoteAgentRunner, RemoteError, RemoteRunRequest, RemoteRunResponse,
    AGENT_RUN_FUNCTION, ANALYTICS_FUNCTION,
};

pub struct EdgeFunctionsClient {
    base_url: String,
    service_key: Option<String>,
    client: Client,
}

impl EdgeFunctionsClient {
    pub fn new(base_url: impl Into<String>, service_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key,
            client,
        })
    }

    pub fn from_config(config: &FunctionsConfig) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            config.resolved_service_key(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: Serialize + ?Sized>(&self, function: &str, body: &T) -> Result<String, RemoteError> {
        let url = format!("{}/{}", self.base_url, function);
        debug!(function, "Invoking hosted function");

        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.service_key {
            request = request.bearer_auth(key).header("apikey", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(RemoteError::Status {
                function: function.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

#[async_trait]
impl RemoteAgentRunner for EdgeFunctionsClient {
    async fn invoke_agent_run(&self, request: &RemoteRunRequest) -> Result<RemoteRunResponse, RemoteError> {
        let text = self.post(AGENT_RUN_FUNCTION, request).await?;
        let response: RemoteRunResponse =
            serde_json::from_str(&text).map_err(|e| RemoteError::Decode(e.to_string()))?;

        if !response.ok {
            return Err(RemoteError::Rejected {
                function: AGENT_RUN_FUNCTION.to_string(),
                reason: response.error.unwrap_or_else(|| "unknown".to_string()),
            });
        }
        Ok(response)
    }
}

#[derive(Serialize)]
struct AnalyticsBody<'a> {
    organization_id: Option<&'a str>,
    user_id: &'a str,
    event_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    entity: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entity_id: Option<&'a str>,
    payload: serde_json::Value,
}

/// Copies `payload` and stamps `emitted_at`. Non-object payloads are kept
/// under `value`.
fn stamp_payload(payload: &serde_json::Value, emitted_at: &str) -> serde_json::Value {
    let mut map = match payload {
        serde_json::Value::Object(map) => map.clone(),
        serde_json::Value::Null => serde_json::Map::new(),
        other => {
            let mut map = serde_json::Map::new();
            map.insert("value".to_string(), other.clone());
            map
        }
    };
    map.insert("emitted_at".to_string(), serde_json::Value::String(emitted_at.to_string()));
    serde_json::Value::Object(map)
}

#[async_trait]
impl AnalyticsSink for EdgeFunctionsClient {
    async fn emit(&self, event: AnalyticsEvent) -> Result<(), RemoteError> {
        let body = AnalyticsBody {
            organization_id: event.organization_id.as_ref().map(|o| o.as_str()),
            user_id: &event.user_id,
            event_key: &event.event_key,
            entity: event.entity.as_deref(),
            entity_id: event.entity_id.as_deref(),
            payload: stamp_payload(&event.payload, &chrono::Utc::now().to_rfc3339()),
        };
        self.post(ANALYTICS_FUNCTION, &body).await?;
        Ok(())
    }
}
