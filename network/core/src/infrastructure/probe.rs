// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP liveness probe
//!
//! An agent is live when `GET http://<addr>/health` answers with a 2xx status
//! within the probe timeout.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::application::registry::{LivenessProbe, ProbeError};

pub struct HttpLivenessProbe {
    client: reqwest::Client,
}

impl HttpLivenessProbe {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    fn health_url(addr: &str) -> String {
        if addr.starts_with("http://") || addr.starts_with("https://") {
            format!("{}/health", addr.trim_end_matches('/'))
        } else {
            format!("http://{}/health", addr)
        }
    }
}

#[async_trait]
impl LivenessProbe for HttpLivenessProbe {
    async fn probe(&self, addr: &str) -> Result<(), ProbeError> {
        let url = Self::health_url(addr);
        debug!(url = %url, "Probing agent");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProbeError::Unreachable {
                addr: addr.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Unhealthy {
                addr: addr.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
