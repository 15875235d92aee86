// Copyright (c) 2026 The Attestation Runner Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Attestation run pipeline: resolve exactly one signer, execute an attested
//! command, sign the result into a portable envelope, write it durably, and
//! anchor it in the configured trust stores.

pub mod error;
pub use error::*;

pub mod config;
pub use config::*;

pub mod pipeline;
pub use pipeline::{AttestationRunPipeline, PublishOutcome, RunReport};

pub mod attestor;
pub mod envelope;
pub mod signer;
