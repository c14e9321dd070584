// Build engine abstraction
// Injectable client handle for the container build engine: one unary
// request, one streaming decoded event response

pub mod docker;
pub mod runner;

use std::pin::Pin;

use async_trait::async_trait;
use thiserror::Error;
use tokio_stream::Stream;

pub use docker::DockerEngine;
pub use runner::{BuildError, BuildRunner};

/// One decoded event from the engine's build stream.
///
/// An event may carry a log text fragment, an error payload, or neither
/// (status-only events are ignored downstream).
#[derive(Debug, Clone, Default)]
pub struct BuildEvent {
    /// Log text fragment, forwarded verbatim
    pub stream: Option<String>,
    /// Error payload; its presence fails the build
    pub error: Option<String>,
}

impl BuildEvent {
    pub fn output(text: impl Into<String>) -> Self {
        Self {
            stream: Some(text.into()),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            stream: None,
            error: Some(message.into()),
        }
    }
}

/// Transport-level engine failures.
///
/// Distinct from a build reporting an error event: a transport failure means
/// the engine itself is unreachable or the connection died, and the run
/// should stop instead of retrying every remaining combination against a
/// dead engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot reach build engine: {0}")]
    Connect(String),

    #[error("build engine transport error: {0}")]
    Transport(String),
}

/// The engine's incremental event sequence for one build call
pub type BuildEventStream = Pin<Box<dyn Stream<Item = Result<BuildEvent, EngineError>> + Send>>;

/// A container build engine accepting a context archive and streaming back
/// decoded build events.
///
/// Constructed explicitly and injected, so tests can script event streams
/// without a real engine.
#[async_trait]
pub trait BuildEngine: Send + Sync {
    /// Submit one build: context archive bytes plus the target image tag
    async fn submit(&self, context: Vec<u8>, tag: &str) -> Result<BuildEventStream, EngineError>;
}
