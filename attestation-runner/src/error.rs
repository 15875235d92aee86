// Copyright (c) 2026 The Attestation Runner Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use thiserror::Error;

use crate::pipeline::RunReport;
use crate::signer::SourceFailure;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid run configuration: {0}")]
    InvalidConfig(String),

    #[error("no signer available from {attempted} configured source(s)")]
    NoSignerAvailable {
        attempted: usize,
        failures: Vec<SourceFailure>,
    },

    #[error("ambiguous signer selection: {count} candidates, exactly one signer is supported")]
    AmbiguousSigner { count: usize },

    #[error("attestation failed")]
    Attestation {
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to serialize envelope")]
    SerializeEnvelope(#[from] serde_json::Error),

    #[error("failed to write envelope to {sink}")]
    WriteOutput {
        sink: String,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "publishing failed for {} of {} attempted destination(s)",
        .report.failed(),
        .report.attempted()
    )]
    Publish { report: RunReport },

    #[error("run cancelled")]
    Cancelled,
}
