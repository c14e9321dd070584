// Build Runner
// Submits one packed context and reduces the engine's event stream into an
// error-or-success outcome, forwarding log text as it arrives

use std::sync::Arc;

use thiserror::Error;
use tokio_stream::StreamExt;

use crate::engine::{BuildEngine, EngineError};
use crate::execution::events::{EventSender, ExecutionEvent, ProgressSender};

/// Failure of one build call
#[derive(Debug, Error)]
pub enum BuildError {
    /// The engine reported an error event for this build
    #[error("build failed: {0}")]
    Failed(String),

    /// The engine itself failed; likely fatal for the whole run
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Runs single builds against an injected engine.
///
/// One call is one blocking, sequential consumption of one event stream;
/// there is no cancellation once a build is submitted.
pub struct BuildRunner {
    engine: Arc<dyn BuildEngine>,
}

impl BuildRunner {
    pub fn new(engine: Arc<dyn BuildEngine>) -> Self {
        Self { engine }
    }

    /// Submit a context and consume the build's event stream.
    ///
    /// `stream` fragments are forwarded verbatim in arrival order. The first
    /// event carrying an error payload fails the call immediately; remaining
    /// events are not consumed. A stream that ends without an error event is
    /// a success.
    pub async fn build(
        &self,
        context: Vec<u8>,
        tag: &str,
        progress: &Option<ProgressSender>,
    ) -> Result<(), BuildError> {
        let mut stream = self.engine.submit(context, tag).await?;

        while let Some(event) = stream.next().await {
            let event = event?;
            if let Some(error) = event.error {
                return Err(BuildError::Failed(error));
            }
            if let Some(text) = event.stream {
                progress.send_event(ExecutionEvent::build_output(text));
            }
        }

        Ok(())
    }
}
