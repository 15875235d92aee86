// Copyright (c) 2026 The Attestation Runner Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Client for the append-only transparency log.
//!
//! The log accepts a signed envelope together with the verifying key that
//! anchors its trust chain. Payloads are small relative to artifact uploads
//! and are submitted whole in a single request; there is no chunking here.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use log::debug;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{Error, LogEntryLocation, LogPublisher, Result};

const ENTRIES_PATH: &str = "api/v1/log/entries";

/// Submits signed payloads to a configured transparency log endpoint and
/// returns the locator of the accepted entry.
pub struct TransparencyLogClient {
    server: String,
    endpoint: Url,
    client: reqwest::Client,
}

impl TransparencyLogClient {
    pub fn new(server: &str) -> Result<Self> {
        let base = Url::parse(server).map_err(|source| Error::InvalidEndpoint {
            endpoint: server.to_string(),
            source,
        })?;
        let endpoint = base
            .join(ENTRIES_PATH)
            .map_err(|source| Error::InvalidEndpoint {
                endpoint: server.to_string(),
                source,
            })?;

        Ok(Self {
            server: server.trim_end_matches('/').to_string(),
            endpoint,
            client: reqwest::Client::new(),
        })
    }
}

/// Body of a log submission: the envelope bytes and the verifying key,
/// base64-encoded inside an in-toto entry record.
fn entry_request(signed_payload: &[u8], verifying_key: &[u8]) -> serde_json::Value {
    serde_json::json!({
        "apiVersion": "0.0.1",
        "kind": "intoto",
        "spec": {
            "content": {
                "envelope": STANDARD.encode(signed_payload),
            },
            "publicKey": {
                "content": STANDARD.encode(verifying_key),
            },
        },
    })
}

/// A successful submission answers with a map keyed by the UUID the log
/// assigned to the new entry.
fn entry_path(body: &serde_json::Value) -> anyhow::Result<String> {
    let entries = body
        .as_object()
        .ok_or_else(|| anyhow!("log response is not an entry map"))?;
    let uuid = entries
        .keys()
        .next()
        .ok_or_else(|| anyhow!("log response contains no entry"))?;

    Ok(format!("/{ENTRIES_PATH}/{uuid}"))
}

#[async_trait]
impl LogPublisher for TransparencyLogClient {
    async fn submit(
        &self,
        signed_payload: &[u8],
        verifying_key: &[u8],
        cancel: &CancellationToken,
    ) -> Result<LogEntryLocation> {
        let request_body = entry_request(signed_payload, verifying_key);

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(Error::Cancelled { operation: "log submission" });
            }
            sent = self
                .client
                .post(self.endpoint.clone())
                .json(&request_body)
                .send() =>
            {
                sent.context("send log entry")
                    .map_err(|source| Error::LogSubmissionFailed { source })?
            }
        };

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::LogSubmissionFailed {
                source: anyhow!("log server returned {status}: {detail}"),
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("decode log response")
            .map_err(|source| Error::LogSubmissionFailed { source })?;
        let path = entry_path(&body).map_err(|source| Error::LogSubmissionFailed { source })?;

        debug!("transparency log accepted entry at {path}");
        Ok(LogEntryLocation {
            server: self.server.clone(),
            path,
        })
    }
}
