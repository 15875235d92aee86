// Copyright (c) 2026 The Attestation Runner Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Publisher seams consumed by the run pipeline.
//!
//! Each trust store is an independent publish destination. A publisher never
//! mutates the payload it is handed and never rolls anything back; it either
//! returns a locator for the anchored copy or a typed error naming which
//! destination failed. The cancellation token aborts in-flight network
//! operations; a cancelled publish is not resumable and must be retried from
//! the start.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::Result;

/// Locator for an entry accepted by the transparency log, combining the
/// configured server address with the server-assigned entry path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntryLocation {
    pub server: String,
    pub path: String,
}

impl std::fmt::Display for LogEntryLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.server, self.path)
    }
}

/// Content identifier assigned by the artifact store after a completed
/// chunked upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub gitoid: String,
}

#[async_trait]
pub trait LogPublisher: Send + Sync {
    /// Submit a signed payload together with its verifying key to the
    /// append-only log as a single request.
    async fn submit(
        &self,
        signed_payload: &[u8],
        verifying_key: &[u8],
        cancel: &CancellationToken,
    ) -> Result<LogEntryLocation>;
}

#[async_trait]
pub trait ArtifactPublisher: Send + Sync {
    /// Stream a payload to the content-addressable store and return the
    /// content identifier it was stored under.
    async fn upload(&self, payload: &[u8], cancel: &CancellationToken) -> Result<UploadResult>;
}
