// Copyright (c) 2026 The Attestation Runner Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! DSSE envelope around a signed attestation payload.
//!
//! The envelope is produced at most once per run and is immutable after
//! creation; its canonical serialization is the single artifact written to
//! the output sink and published downstream.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::signer::Signer;

pub const PAYLOAD_TYPE: &str = "application/vnd.in-toto+json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignedEnvelope {
    pub payload_type: String,
    /// base64-encoded payload bytes.
    pub payload: String,
    pub signatures: Vec<EnvelopeSignature>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeSignature {
    pub keyid: String,
    /// base64-encoded signature bytes.
    pub sig: String,
}

impl SignedEnvelope {
    /// Sign `payload` and wrap it. The signature covers the DSSE
    /// pre-authentication encoding, not the raw payload.
    pub fn sign(payload: &[u8], payload_type: &str, signer: &dyn Signer) -> anyhow::Result<Self> {
        let pae = pre_auth_encoding(payload_type, payload);
        let signature = signer.sign(&pae)?;

        Ok(Self {
            payload_type: payload_type.to_string(),
            payload: STANDARD.encode(payload),
            signatures: vec![EnvelopeSignature {
                keyid: signer.key_id(),
                sig: STANDARD.encode(signature),
            }],
        })
    }

    /// Canonical byte form written to the output sink and published to the
    /// trust stores.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// DSSE v1 PAE: `DSSEv1 <len(type)> <type> <len(payload)> <payload>`.
fn pre_auth_encoding(payload_type: &str, payload: &[u8]) -> Vec<u8> {
    let mut pae = format!(
        "DSSEv1 {} {} {} ",
        payload_type.len(),
        payload_type,
        payload.len()
    )
    .into_bytes();
    pae.extend_from_slice(payload);
    pae
}

#[cfg(test)]
mod tests {
    use ring::rand::SystemRandom;
    use ring::signature::{Ed25519KeyPair, UnparsedPublicKey, ED25519};

    use crate::signer::KeyFileSigner;

    use super::*;

    fn test_signer() -> KeyFileSigner {
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&SystemRandom::new()).unwrap();
        KeyFileSigner::from_pkcs8(pkcs8.as_ref()).unwrap()
    }

    #[test]
    fn pae_prefixes_type_and_payload_lengths() {
        let pae = pre_auth_encoding("application/json", b"hi");
        assert_eq!(pae, b"DSSEv1 16 application/json 2 hi");
    }

    #[test]
    fn signature_covers_the_pae() {
        let signer = test_signer();
        let envelope = SignedEnvelope::sign(b"payload", PAYLOAD_TYPE, &signer).unwrap();

        let signature = STANDARD.decode(&envelope.signatures[0].sig).unwrap();
        let public = signer.verifying_key().unwrap();
        UnparsedPublicKey::new(&ED25519, &public)
            .verify(&pre_auth_encoding(PAYLOAD_TYPE, b"payload"), &signature)
            .unwrap();
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let signer = test_signer();
        let envelope = SignedEnvelope::sign(b"payload", PAYLOAD_TYPE, &signer).unwrap();

        let json: serde_json::Value =
            serde_json::from_slice(&envelope.to_bytes().unwrap()).unwrap();
        assert_eq!(json["payloadType"], PAYLOAD_TYPE);
        assert_eq!(json["payload"], STANDARD.encode(b"payload"));
        assert_eq!(json["signatures"][0]["keyid"], signer.key_id());
    }

    #[test]
    fn round_trips_through_canonical_bytes() {
        let signer = test_signer();
        let envelope = SignedEnvelope::sign(b"payload", PAYLOAD_TYPE, &signer).unwrap();

        let decoded: SignedEnvelope =
            serde_json::from_slice(&envelope.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, envelope);
    }
}
