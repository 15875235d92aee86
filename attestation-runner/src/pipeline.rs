// Copyright (c) 2026 The Attestation Runner Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! The attestation-run pipeline.
//!
//! Steps run strictly in sequence: ResolvingSigner, Executing, Serializing,
//! WritingOutput, then the optional publishing steps. The local write is the
//! primary durability layer; publishing to the trust stores is best-effort on
//! top of it. A publishing failure never reverts the write, but any attempted
//! publish that fails makes the overall run report failure.

use log::{error, info, warn};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use trust_stores::artifact::ChunkedUploader;
use trust_stores::transparency::TransparencyLogClient;
use trust_stores::{ArtifactPublisher, LogPublisher};

use crate::attestor::{AttestationSpec, Attestor, CommandAttestor};
use crate::signer;
use crate::{Error, Result, RunConfig};

const LOG_DESTINATION: &str = "transparency log";
const ARTIFACT_DESTINATION: &str = "artifact store";

/// Tagged result of one independent publish attempt.
#[derive(Debug)]
pub struct PublishOutcome {
    pub destination: &'static str,
    pub result: std::result::Result<String, trust_stores::Error>,
}

/// Outcomes of every attempted publish, in attempt order. The run's final
/// status is a reduction over this list plus the mandatory local write.
#[derive(Debug, Default)]
pub struct RunReport {
    pub publishes: Vec<PublishOutcome>,
}

impl RunReport {
    pub fn attempted(&self) -> usize {
        self.publishes.len()
    }

    pub fn failed(&self) -> usize {
        self.publishes
            .iter()
            .filter(|outcome| outcome.result.is_err())
            .count()
    }

    pub fn succeeded(&self) -> bool {
        self.failed() == 0
    }
}

pub struct AttestationRunPipeline {
    config: RunConfig,
    attestor: Box<dyn Attestor>,
    log_publisher: Option<Box<dyn LogPublisher>>,
    artifact_publisher: Option<Box<dyn ArtifactPublisher>>,
}

impl AttestationRunPipeline {
    /// Build a pipeline with the built-in collaborators. Endpoints are
    /// validated here, before any signer resolution or side effect.
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;

        let log_publisher: Option<Box<dyn LogPublisher>> = match &config.log_server {
            Some(server) => Some(Box::new(
                TransparencyLogClient::new(server)
                    .map_err(|e| Error::InvalidConfig(e.to_string()))?,
            )),
            None => None,
        };

        let artifact_publisher: Option<Box<dyn ArtifactPublisher>> = if config.artifact_store.enable
        {
            Some(Box::new(
                ChunkedUploader::new(&config.artifact_store.url)
                    .map_err(|e| Error::InvalidConfig(e.to_string()))?,
            ))
        } else {
            None
        };

        Ok(Self {
            config,
            attestor: Box::<CommandAttestor>::default(),
            log_publisher,
            artifact_publisher,
        })
    }

    /// Build a pipeline around caller-supplied collaborators.
    pub fn with_collaborators(
        config: RunConfig,
        attestor: Box<dyn Attestor>,
        log_publisher: Option<Box<dyn LogPublisher>>,
        artifact_publisher: Option<Box<dyn ArtifactPublisher>>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            attestor,
            log_publisher,
            artifact_publisher,
        })
    }

    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunReport> {
        // ResolvingSigner. A failure here aborts the run before the attestor
        // is invoked; no partial attestation exists without a signer.
        let resolution = signer::resolve(&self.config.signers)?;
        for failure in &resolution.failures {
            warn!("signer source {} skipped: {:#}", failure.source, failure.cause);
        }
        let signer = resolution.signer;

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        // Executing. Collaborator errors propagate unchanged.
        let spec = AttestationSpec {
            step_name: self.config.step_name.clone(),
            command: self.config.command.clone(),
            working_dir: self.config.working_dir.clone(),
            attestor_names: self.config.attestor_names.clone(),
            tracing: self.config.tracing,
        };
        let envelope = self
            .attestor
            .attest(signer.as_ref(), &spec)
            .await
            .map_err(|source| Error::Attestation { source })?;

        // Serializing. The envelope is the single source of truth from here
        // on; nothing downstream mutates it.
        let signed_bytes = envelope.to_bytes()?;

        // WritingOutput.
        self.write_output(&signed_bytes).await?;

        // Publishing: an ordered list of independent attempts. None of them
        // reverts the write above.
        let mut publishes = Vec::new();

        if let Some(publisher) = &self.log_publisher {
            let result = match signer.verifying_key() {
                Ok(key) => publisher.submit(&signed_bytes, &key, cancel).await,
                Err(source) => Err(trust_stores::Error::LogSubmissionFailed { source }),
            };
            let result = result.map(|location| location.to_string());
            match &result {
                Ok(location) => info!("transparency log entry added at {location}"),
                Err(e) => error!("publishing to the {LOG_DESTINATION} failed: {e}"),
            }
            publishes.push(PublishOutcome {
                destination: LOG_DESTINATION,
                result,
            });
        }

        if let Some(publisher) = &self.artifact_publisher {
            let result = publisher
                .upload(&signed_bytes, cancel)
                .await
                .map(|upload| upload.gitoid);
            match &result {
                Ok(gitoid) => info!("stored in artifact store as {gitoid}"),
                Err(e) => error!("publishing to the {ARTIFACT_DESTINATION} failed: {e}"),
            }
            publishes.push(PublishOutcome {
                destination: ARTIFACT_DESTINATION,
                result,
            });
        }

        let report = RunReport { publishes };
        if !report.succeeded() {
            return Err(Error::Publish { report });
        }

        Ok(report)
    }

    /// Write the serialized envelope to the configured sink. The sink is
    /// owned exclusively for the duration of the write and released on every
    /// exit path.
    async fn write_output(&self, signed_bytes: &[u8]) -> Result<()> {
        match &self.config.out_file {
            Some(path) => {
                let map_err = |source| Error::WriteOutput {
                    sink: path.display().to_string(),
                    source,
                };
                let mut file = tokio::fs::File::create(path).await.map_err(map_err)?;
                file.write_all(signed_bytes).await.map_err(map_err)?;
                file.flush().await.map_err(map_err)?;
            }
            None => {
                let map_err = |source| Error::WriteOutput {
                    sink: "stdout".to_string(),
                    source,
                };
                let mut out = tokio::io::stdout();
                out.write_all(signed_bytes).await.map_err(map_err)?;
                out.flush().await.map_err(map_err)?;
            }
        }

        Ok(())
    }
}
