// Execution Events
// Progress reporting and event types for matrix runs

use std::time::Duration;

use tokio::sync::mpsc;

use crate::matrix::models::Combination;

/// Sender for execution progress events
pub type ProgressSender = mpsc::UnboundedSender<ExecutionEvent>;

/// Receiver for execution progress events
pub type ProgressReceiver = mpsc::UnboundedReceiver<ExecutionEvent>;

/// Create a new progress channel
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Events emitted while a matrix run executes
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    /// Expansion finished; the run is starting
    MatrixStarted {
        total_combinations: usize,
        blacklisted: usize,
    },

    /// A combination matched a blacklist entry and is skipped
    CombinationSkipped { combination: Combination },

    /// One combination's build was submitted
    BuildStarted {
        image: String,
        combination: Combination,
        index: usize,
        total: usize,
    },

    /// Verbatim build log fragment (no trailing newline added)
    BuildOutput { text: String },

    /// Terminal success line for one combination
    BuildSucceeded {
        image: String,
        combination: Combination,
    },

    /// Terminal failure line for one combination
    BuildFailed {
        image: String,
        combination: Combination,
        error: String,
    },

    /// The whole matrix has been attempted
    MatrixCompleted {
        succeeded: usize,
        failed: usize,
        duration: Duration,
    },
}

impl ExecutionEvent {
    pub fn matrix_started(total_combinations: usize, blacklisted: usize) -> Self {
        Self::MatrixStarted {
            total_combinations,
            blacklisted,
        }
    }

    pub fn combination_skipped(combination: Combination) -> Self {
        Self::CombinationSkipped { combination }
    }

    pub fn build_started(
        image: impl Into<String>,
        combination: Combination,
        index: usize,
        total: usize,
    ) -> Self {
        Self::BuildStarted {
            image: image.into(),
            combination,
            index,
            total,
        }
    }

    pub fn build_output(text: impl Into<String>) -> Self {
        Self::BuildOutput { text: text.into() }
    }

    pub fn build_succeeded(image: impl Into<String>, combination: Combination) -> Self {
        Self::BuildSucceeded {
            image: image.into(),
            combination,
        }
    }

    pub fn build_failed(
        image: impl Into<String>,
        combination: Combination,
        error: impl Into<String>,
    ) -> Self {
        Self::BuildFailed {
            image: image.into(),
            combination,
            error: error.into(),
        }
    }

    pub fn matrix_completed(succeeded: usize, failed: usize, duration: Duration) -> Self {
        Self::MatrixCompleted {
            succeeded,
            failed,
            duration,
        }
    }
}

/// Helper trait for sending events, ignoring errors (fire-and-forget)
pub trait EventSender {
    fn send_event(&self, event: ExecutionEvent);
}

impl EventSender for ProgressSender {
    fn send_event(&self, event: ExecutionEvent) {
        let _ = self.send(event);
    }
}

impl EventSender for Option<ProgressSender> {
    fn send_event(&self, event: ExecutionEvent) {
        if let Some(sender) = self {
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::models::{AxisValue, Combination};

    #[tokio::test]
    async fn test_progress_channel() {
        let (tx, mut rx) = progress_channel();

        tx.send_event(ExecutionEvent::matrix_started(4, 1));
        tx.send_event(ExecutionEvent::build_output("Step 1/3\n"));

        let event1 = rx.recv().await.unwrap();
        assert!(matches!(event1, ExecutionEvent::MatrixStarted { .. }));

        let event2 = rx.recv().await.unwrap();
        assert!(matches!(event2, ExecutionEvent::BuildOutput { .. }));
    }

    #[test]
    fn test_event_construction() {
        let combination = Combination::new(vec![("os".to_string(), AxisValue::from("jessie"))]);
        let event = ExecutionEvent::build_failed("proj:abc", combination, "exit 1");

        if let ExecutionEvent::BuildFailed {
            image,
            combination,
            error,
        } = event
        {
            assert_eq!(image, "proj:abc");
            assert_eq!(combination.to_string(), "{os=jessie}");
            assert_eq!(error, "exit 1");
        } else {
            panic!("wrong event type");
        }
    }

    #[test]
    fn test_optional_sender() {
        let sender: Option<ProgressSender> = None;
        // Should not panic
        sender.send_event(ExecutionEvent::matrix_started(0, 0));
    }
}
