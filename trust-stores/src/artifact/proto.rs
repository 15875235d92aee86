// Copyright (c) 2026 The Attestation Runner Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Wire types and client for the artifact store's `Collector` service.
//!
//! The service exposes a single client-streaming RPC: the client sends a
//! sequence of `Chunk` frames and the server answers with one `StoreResponse`
//! carrying the content identifier of the reassembled payload.

use prost::alloc::{string::String, vec::Vec};
use tonic::transport::{Channel, Endpoint};

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Chunk {
    #[prost(bytes = "vec", tag = "1")]
    pub chunk: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StoreResponse {
    #[prost(string, tag = "1")]
    pub gitoid: String,
}

#[derive(Debug, Clone)]
pub struct CollectorClient {
    inner: tonic::client::Grpc<Channel>,
}

impl CollectorClient {
    pub async fn connect(dst: String) -> std::result::Result<Self, tonic::transport::Error> {
        let channel = Endpoint::new(dst)?.connect().await?;
        Ok(Self {
            inner: tonic::client::Grpc::new(channel),
        })
    }

    /// Client-streaming upload. The whole frame stream is consumed before the
    /// single aggregate response is produced.
    pub async fn store(
        &mut self,
        request: impl tonic::IntoStreamingRequest<Message = Chunk>,
    ) -> std::result::Result<tonic::Response<StoreResponse>, tonic::Status> {
        self.inner
            .ready()
            .await
            .map_err(|e| tonic::Status::unknown(format!("service was not ready: {e}")))?;
        let codec = tonic::codec::ProstCodec::default();
        let path =
            tonic::codegen::http::uri::PathAndQuery::from_static("/archivista.v1.Collector/Store");
        self.inner
            .client_streaming(request.into_streaming_request(), path, codec)
            .await
    }
}
