//! Scripted provider for tests.

use crate::error::{NovaError, Result};
use crate::image::{
    GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat, ImageProvider,
    ImageProviderKind,
};
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::Notify;

/// What the mock answers with.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Image(Vec<u8>),
    Fail(String),
    Panic(String),
}

/// Answers every request with the same reply and records what it was asked.
///
/// A gated mock blocks each call until [`MockProvider::release`] is called,
/// which keeps a request in flight for as long as a test needs.
pub(crate) struct MockProvider {
    reply: Mutex<Reply>,
    calls: Mutex<Vec<GenerationRequest>>,
    gate: Option<Notify>,
}

impl MockProvider {
    pub(crate) fn new(reply: Reply) -> Self {
        Self {
            reply: Mutex::new(reply),
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Succeeds with PNG bytes `[0, 0, 0]`, i.e. `data:image/png;base64,AAAA`.
    pub(crate) fn succeeding() -> Self {
        Self::new(Reply::Image(vec![0, 0, 0]))
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self::new(Reply::Fail(message.to_string()))
    }

    pub(crate) fn gated(mut self) -> Self {
        self.gate = Some(Notify::new());
        self
    }

    pub(crate) fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    /// Lets one blocked (or the next) call proceed.
    pub(crate) fn release(&self) {
        if let Some(ref gate) = self.gate {
            gate.notify_one();
        }
    }

    pub(crate) fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageProvider for MockProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(ref gate) = self.gate {
            gate.notified().await;
        }

        let reply = self.reply.lock().unwrap().clone();
        match reply {
            Reply::Image(data) => Ok(GeneratedImage::new(
                data,
                ImageFormat::Png,
                ImageProviderKind::Custom,
                GenerationMetadata::default(),
            )),
            Reply::Fail(message) => Err(NovaError::Generation(message)),
            Reply::Panic(message) => panic!("{message}"),
        }
    }

    fn kind(&self) -> ImageProviderKind {
        ImageProviderKind::Custom
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
