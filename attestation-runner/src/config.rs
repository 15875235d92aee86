// Copyright (c) 2026 The Attestation Runner Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use std::path::PathBuf;

use url::Url;

use crate::attestor::{ENVIRONMENT_ATTESTOR, GIT_ATTESTOR};
use crate::signer::SignerSources;
use crate::{Error, Result};

/// Attestors recorded when the caller does not name any.
pub const DEFAULT_ATTESTORS: &[&str] = &[ENVIRONMENT_ATTESTOR, GIT_ATTESTOR];

pub const DEFAULT_ARTIFACT_STORE_URL: &str = "http://127.0.0.1:8082";

#[derive(Clone, Debug)]
pub struct ArtifactStoreOptions {
    pub enable: bool,
    pub url: String,
}

impl Default for ArtifactStoreOptions {
    fn default() -> Self {
        Self {
            enable: false,
            url: DEFAULT_ARTIFACT_STORE_URL.to_string(),
        }
    }
}

/// Configuration of a single attestation run. All endpoints and signer
/// sources are supplied externally and validated before signer resolution.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub step_name: String,
    pub command: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub attestor_names: Vec<String>,
    /// Destination for the serialized envelope. Standard output when unset.
    pub out_file: Option<PathBuf>,
    pub tracing: bool,
    pub log_server: Option<String>,
    pub artifact_store: ArtifactStoreOptions,
    pub signers: SignerSources,
}

impl RunConfig {
    pub fn new(step_name: &str, command: Vec<String>) -> Self {
        Self {
            step_name: step_name.to_string(),
            command,
            working_dir: None,
            attestor_names: DEFAULT_ATTESTORS.iter().map(|s| s.to_string()).collect(),
            out_file: None,
            tracing: false,
            log_server: None,
            artifact_store: ArtifactStoreOptions::default(),
            signers: SignerSources::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.command.is_empty() {
            return Err(Error::InvalidConfig("no command to attest".to_string()));
        }

        if let Some(server) = &self.log_server {
            Url::parse(server).map_err(|e| {
                Error::InvalidConfig(format!("invalid transparency log server `{server}`: {e}"))
            })?;
        }

        if self.artifact_store.enable {
            Url::parse(&self.artifact_store.url).map_err(|e| {
                Error::InvalidConfig(format!(
                    "invalid artifact store url `{}`: {e}",
                    self.artifact_store.url
                ))
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn base_config() -> RunConfig {
        RunConfig::new("build", vec!["true".to_string()])
    }

    #[test]
    fn default_attestors_are_environment_and_git() {
        let config = base_config();
        assert_eq!(config.attestor_names, vec!["environment", "git"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_command_is_rejected() {
        let config = RunConfig::new("build", vec![]);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[rstest]
    #[case("https://log.example.com", true)]
    #[case("http://127.0.0.1:3000", true)]
    #[case("not a url", false)]
    fn log_server_must_parse(#[case] server: &str, #[case] ok: bool) {
        let mut config = base_config();
        config.log_server = Some(server.to_string());
        assert_eq!(config.validate().is_ok(), ok);
    }

    #[test]
    fn artifact_store_url_checked_only_when_enabled() {
        let mut config = base_config();
        config.artifact_store.url = "not a url".to_string();
        assert!(config.validate().is_ok());

        config.artifact_store.enable = true;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
