// Execution module
// Progress events and the matrix executor

pub mod events;
pub mod executor;

pub use events::{
    progress_channel, EventSender, ExecutionEvent, ProgressReceiver, ProgressSender,
};
pub use executor::{BuildOutcome, CombinationOutcome, MatrixExecutor, RunReport};
