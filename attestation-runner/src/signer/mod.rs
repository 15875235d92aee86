// Copyright (c) 2026 The Attestation Runner Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Signer construction and exactly-one-signer resolution.
//!
//! Every configured source is tried independently and every construction
//! failure is kept, so an operator can fix all misconfigured sources in one
//! pass. Exactly one surviving candidate is required per run; the envelope's
//! trust chain stays unambiguous that way.

use std::path::{Path, PathBuf};

use anyhow::Context;
use ring::signature::{Ed25519KeyPair, KeyPair};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// An identity able to produce detached signatures and expose its public
/// verifying material. Signing is CPU-bound and sync.
pub trait Signer: Send + Sync {
    /// Stable identifier of the key, recorded next to each signature.
    fn key_id(&self) -> String;

    /// Produce a detached signature over `message`.
    fn sign(&self, message: &[u8]) -> anyhow::Result<Vec<u8>>;

    /// Raw public key bytes handed to the transparency log.
    fn verifying_key(&self) -> anyhow::Result<Vec<u8>>;
}

/// Signer backed by a PKCS#8 Ed25519 private key file.
pub struct KeyFileSigner {
    key_pair: Ed25519KeyPair,
    key_id: String,
}

impl KeyFileSigner {
    pub fn from_pkcs8_file(path: &Path) -> anyhow::Result<Self> {
        let der = std::fs::read(path)
            .with_context(|| format!("read key file {}", path.display()))?;
        Self::from_pkcs8(&der)
    }

    pub fn from_pkcs8(der: &[u8]) -> anyhow::Result<Self> {
        let key_pair = Ed25519KeyPair::from_pkcs8(der)
            .map_err(|e| anyhow::anyhow!("parse PKCS#8 Ed25519 key: {e}"))?;
        let key_id = hex::encode(Sha256::digest(key_pair.public_key().as_ref()));

        Ok(Self { key_pair, key_id })
    }
}

impl Signer for KeyFileSigner {
    fn key_id(&self) -> String {
        self.key_id.clone()
    }

    fn sign(&self, message: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(self.key_pair.sign(message).as_ref().to_vec())
    }

    fn verifying_key(&self) -> anyhow::Result<Vec<u8>> {
        Ok(self.key_pair.public_key().as_ref().to_vec())
    }
}

/// The signer sources named in the run configuration. Currently key files
/// only; key-service references would slot in next to them.
#[derive(Clone, Debug, Default)]
pub struct SignerSources {
    pub key_paths: Vec<PathBuf>,
}

/// A source that failed to yield a signer, kept for aggregated reporting.
#[derive(Debug)]
pub struct SourceFailure {
    pub source: String,
    pub cause: anyhow::Error,
}

/// Outcome of a successful resolution: the single active signer plus the
/// failures of every other source, which are still surfaced to the caller.
pub struct Resolution {
    pub signer: Box<dyn Signer>,
    pub failures: Vec<SourceFailure>,
}

impl std::fmt::Debug for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolution")
            .field("signer", &self.signer.key_id())
            .field("failures", &self.failures)
            .finish()
    }
}

/// Construct a signer candidate from each configured source and enforce that
/// exactly one survives. No side effects beyond reading key material.
pub fn resolve(sources: &SignerSources) -> Result<Resolution> {
    let mut signers: Vec<Box<dyn Signer>> = Vec::new();
    let mut failures = Vec::new();

    for path in &sources.key_paths {
        match KeyFileSigner::from_pkcs8_file(path) {
            Ok(signer) => signers.push(Box::new(signer)),
            Err(cause) => failures.push(SourceFailure {
                source: path.display().to_string(),
                cause,
            }),
        }
    }

    match signers.len() {
        0 => Err(Error::NoSignerAvailable {
            attempted: sources.key_paths.len(),
            failures,
        }),
        1 => Ok(Resolution {
            signer: signers.remove(0),
            failures,
        }),
        count => Err(Error::AmbiguousSigner { count }),
    }
}
