// Copyright (c) 2026 The Attestation Runner Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Chunked uploads to the content-addressable artifact store.
//!
//! A payload is partitioned into consecutive frames of at most
//! [`MAX_FRAME_SIZE`] bytes and streamed in order over a single upload
//! session. The session is not resumable: the first failed send aborts the
//! whole upload and a retry starts over from the first frame.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use log::debug;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{ArtifactPublisher, Error, Result, UploadResult};

pub mod proto;
use proto::{Chunk, CollectorClient, StoreResponse};

/// Upper bound on the payload carried by a single frame.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

const FRAME_CHANNEL_DEPTH: usize = 16;

/// Partition a payload into consecutive frames of at most [`MAX_FRAME_SIZE`]
/// bytes, in original byte order, with no overlap and no gaps. The final
/// frame holds the remainder. An empty payload yields no frames.
pub fn frames(payload: &[u8]) -> impl Iterator<Item = &[u8]> {
    payload.chunks(MAX_FRAME_SIZE)
}

/// An open upload session. States progress `Open -> Sending -> Closing ->
/// Closed|Failed`; there is no partial resend.
#[async_trait]
pub trait UploadSession: Send {
    /// Send the next frame over the open stream.
    async fn send_frame(&mut self, frame: Vec<u8>) -> anyhow::Result<()>;

    /// Close the send side and await the single aggregate response, returning
    /// the content identifier assigned by the store.
    async fn finish(self: Box<Self>) -> anyhow::Result<String>;
}

/// Opens upload sessions against a configured artifact store.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn open(&self) -> anyhow::Result<Box<dyn UploadSession>>;
}

/// gRPC transport backed by the `Collector` client-streaming service.
struct GrpcUploadTransport {
    endpoint: String,
}

struct GrpcUploadSession {
    tx: mpsc::Sender<Chunk>,
    rpc: JoinHandle<std::result::Result<tonic::Response<StoreResponse>, tonic::Status>>,
}

#[async_trait]
impl UploadTransport for GrpcUploadTransport {
    async fn open(&self) -> anyhow::Result<Box<dyn UploadSession>> {
        let mut client = CollectorClient::connect(self.endpoint.clone())
            .await
            .context("connect to artifact store")?;

        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_DEPTH);
        let outbound = ReceiverStream::new(rx);
        let rpc = tokio::spawn(async move { client.store(outbound).await });

        Ok(Box::new(GrpcUploadSession { tx, rpc }))
    }
}

#[async_trait]
impl UploadSession for GrpcUploadSession {
    async fn send_frame(&mut self, frame: Vec<u8>) -> anyhow::Result<()> {
        if self.tx.send(Chunk { chunk: frame }).await.is_err() {
            // The receiver is only dropped once the call itself has ended;
            // surface the call's outcome as the send failure.
            return match (&mut self.rpc).await {
                Ok(Err(status)) => Err(anyhow!(status)),
                Ok(Ok(_)) => Err(anyhow!("store closed the stream before the upload completed")),
                Err(e) => Err(anyhow!(e)),
            };
        }

        Ok(())
    }

    async fn finish(self: Box<Self>) -> anyhow::Result<String> {
        // Dropping the sender closes the client side of the stream.
        drop(self.tx);
        let response = self.rpc.await.context("upload task failed")??;
        Ok(response.into_inner().gitoid)
    }
}

/// Splits a payload into fixed-size frames and drives a client-streaming
/// upload, returning the content identifier assigned by the store.
pub struct ChunkedUploader {
    transport: Box<dyn UploadTransport>,
}

impl ChunkedUploader {
    pub fn new(endpoint: &str) -> Result<Self> {
        Url::parse(endpoint).map_err(|source| Error::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            source,
        })?;

        Ok(Self {
            transport: Box::new(GrpcUploadTransport {
                endpoint: endpoint.to_string(),
            }),
        })
    }

    pub fn with_transport(transport: Box<dyn UploadTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ArtifactPublisher for ChunkedUploader {
    async fn upload(&self, payload: &[u8], cancel: &CancellationToken) -> Result<UploadResult> {
        let mut session = self
            .transport
            .open()
            .await
            .map_err(|source| Error::StoreConnection { source })?;

        for (index, frame) in frames(payload).enumerate() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(Error::Cancelled { operation: "artifact upload" });
                }
                sent = session.send_frame(frame.to_vec()) => {
                    sent.map_err(|source| Error::ChunkTransmissionFailed { index, source })?;
                }
            }
        }

        // An empty payload sends zero frames but still closes the session
        // cleanly and awaits the store's response.
        let gitoid = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(Error::Cancelled { operation: "artifact upload" });
            }
            finished = session.finish() => {
                finished.map_err(|source| Error::UploadFinalizationFailed { source })?
            }
        };

        debug!("artifact store accepted payload as {gitoid}");
        Ok(UploadResult { gitoid })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use anyhow::bail;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(11, 1)]
    #[case(MAX_FRAME_SIZE - 1, 1)]
    #[case(MAX_FRAME_SIZE, 1)]
    #[case(MAX_FRAME_SIZE + 1, 2)]
    #[case(2 * MAX_FRAME_SIZE, 2)]
    #[case(2 * MAX_FRAME_SIZE + 17, 3)]
    fn frame_count(#[case] len: usize, #[case] expected: usize) {
        let payload = vec![0xabu8; len];
        assert_eq!(frames(&payload).count(), expected);
    }

    #[rstest]
    #[case(0)]
    #[case(11)]
    #[case(MAX_FRAME_SIZE)]
    #[case(MAX_FRAME_SIZE + 1)]
    #[case(2 * MAX_FRAME_SIZE)]
    fn frames_reassemble_to_payload(#[case] len: usize) {
        let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();

        let mut reassembled = Vec::new();
        for frame in frames(&payload) {
            assert!(frame.len() <= MAX_FRAME_SIZE);
            reassembled.extend_from_slice(frame);
        }

        assert_eq!(reassembled, payload);
    }

    #[test]
    fn only_final_frame_is_short() {
        let payload = vec![0u8; MAX_FRAME_SIZE + MAX_FRAME_SIZE / 2];
        let sizes: Vec<usize> = frames(&payload).map(<[u8]>::len).collect();
        assert_eq!(sizes, vec![MAX_FRAME_SIZE, MAX_FRAME_SIZE / 2]);
    }

    #[derive(Default)]
    struct StoreState {
        received: Mutex<Vec<Vec<u8>>>,
        opened: AtomicUsize,
        finished: AtomicUsize,
    }

    /// Transport double that records every frame in arrival order.
    struct RecordingTransport {
        state: Arc<StoreState>,
        gitoid: String,
        fail_send_at: Option<usize>,
        fail_finish: bool,
    }

    impl RecordingTransport {
        fn new(gitoid: &str) -> (Self, Arc<StoreState>) {
            let state = Arc::new(StoreState::default());
            (
                Self {
                    state: state.clone(),
                    gitoid: gitoid.to_string(),
                    fail_send_at: None,
                    fail_finish: false,
                },
                state,
            )
        }
    }

    struct RecordingSession {
        state: Arc<StoreState>,
        gitoid: String,
        fail_send_at: Option<usize>,
        fail_finish: bool,
        sent: usize,
    }

    #[async_trait]
    impl UploadTransport for RecordingTransport {
        async fn open(&self) -> anyhow::Result<Box<dyn UploadSession>> {
            self.state.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(RecordingSession {
                state: self.state.clone(),
                gitoid: self.gitoid.clone(),
                fail_send_at: self.fail_send_at,
                fail_finish: self.fail_finish,
                sent: 0,
            }))
        }
    }

    #[async_trait]
    impl UploadSession for RecordingSession {
        async fn send_frame(&mut self, frame: Vec<u8>) -> anyhow::Result<()> {
            if Some(self.sent) == self.fail_send_at {
                bail!("stream reset by peer");
            }
            self.sent += 1;
            self.state.received.lock().unwrap().push(frame);
            Ok(())
        }

        async fn finish(self: Box<Self>) -> anyhow::Result<String> {
            self.state.finished.fetch_add(1, Ordering::SeqCst);
            if self.fail_finish {
                bail!("store rejected the payload");
            }
            Ok(self.gitoid)
        }
    }

    #[tokio::test]
    async fn upload_returns_store_identifier() {
        let (transport, state) = RecordingTransport::new("gitoid:sha256:abcd");
        let uploader = ChunkedUploader::with_transport(Box::new(transport));

        let result = uploader
            .upload(b"hello world", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.gitoid, "gitoid:sha256:abcd");
        let received = state.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0], b"hello world");
    }

    #[tokio::test]
    async fn upload_preserves_frame_order() {
        let payload: Vec<u8> = (0..2 * MAX_FRAME_SIZE + 5).map(|i| (i % 127) as u8).collect();
        let (transport, state) = RecordingTransport::new("gitoid:sha256:ffff");
        let uploader = ChunkedUploader::with_transport(Box::new(transport));

        uploader
            .upload(&payload, &CancellationToken::new())
            .await
            .unwrap();

        let received = state.received.lock().unwrap();
        assert_eq!(received.len(), 3);
        assert_eq!(received.concat(), payload);
    }

    #[tokio::test]
    async fn empty_payload_opens_and_closes_the_session() {
        let (transport, state) = RecordingTransport::new("gitoid:sha256:empty");
        let uploader = ChunkedUploader::with_transport(Box::new(transport));

        let result = uploader.upload(&[], &CancellationToken::new()).await.unwrap();

        assert_eq!(result.gitoid, "gitoid:sha256:empty");
        assert!(state.received.lock().unwrap().is_empty());
        assert_eq!(state.opened.load(Ordering::SeqCst), 1);
        assert_eq!(state.finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_send_aborts_without_finalizing() {
        let (mut transport, state) = RecordingTransport::new("gitoid:sha256:dead");
        transport.fail_send_at = Some(1);
        let uploader = ChunkedUploader::with_transport(Box::new(transport));
        let payload = vec![0u8; MAX_FRAME_SIZE + 1];

        let err = uploader
            .upload(&payload, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ChunkTransmissionFailed { index: 1, .. }));
        assert_eq!(state.received.lock().unwrap().len(), 1);
        assert_eq!(state.finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_finalization_is_reported_distinctly() {
        let (mut transport, _state) = RecordingTransport::new("gitoid:sha256:dead");
        transport.fail_finish = true;
        let uploader = ChunkedUploader::with_transport(Box::new(transport));

        let err = uploader
            .upload(b"payload", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UploadFinalizationFailed { .. }));
    }

    #[tokio::test]
    async fn cancelled_upload_is_aborted() {
        let (transport, _state) = RecordingTransport::new("gitoid:sha256:dead");
        let uploader = ChunkedUploader::with_transport(Box::new(transport));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = uploader.upload(b"payload", &cancel).await.unwrap_err();

        assert!(matches!(err, Error::Cancelled { .. }));
    }

    #[test]
    fn rejects_malformed_endpoint() {
        assert!(matches!(
            ChunkedUploader::new("not a url"),
            Err(Error::InvalidEndpoint { .. })
        ));
    }
}
