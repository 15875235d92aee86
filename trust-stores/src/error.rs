// Copyright (c) 2026 The Attestation Runner Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid trust store endpoint `{endpoint}`")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to open upload session with the artifact store")]
    StoreConnection {
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to submit entry to the transparency log")]
    LogSubmissionFailed {
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to transmit chunk {index} to the artifact store")]
    ChunkTransmissionFailed {
        index: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to finalize artifact upload")]
    UploadFinalizationFailed {
        #[source]
        source: anyhow::Error,
    },

    #[error("{operation} cancelled")]
    Cancelled { operation: &'static str },
}
