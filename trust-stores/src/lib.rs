// Copyright (c) 2026 The Attestation Runner Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Clients for the external trust stores a signed attestation envelope can be
//! anchored in: an append-only transparency log reached over HTTP and a
//! content-addressable artifact store fed by a client-streaming chunked
//! upload. Both are secondary durability layers; callers keep their local
//! copy of the envelope regardless of what happens here.

pub mod api;
pub use api::*;

pub mod error;
pub use error::*;

pub mod artifact;
pub mod transparency;
