// Build Matrix Service Library
// Core service for matrix-driven container image builds

pub mod context;
pub mod engine;
pub mod error;
pub mod execution;
pub mod matrix;
pub mod template;

// Re-export commonly used types
pub use error::{ConfigError, ServiceError, ServiceResult};

// Re-export matrix types
pub use matrix::{
    Axis, AxisValue, BlacklistEntry, Combination, Expansion, Matrix, MatrixExpander, MatrixParser,
    OptionSpec, OptionValue, ResolvedOption,
};

// Re-export context types
pub use context::{
    normalize_patterns, ContextPacker, IgnoreSet, PackError, BUILD_DEFINITION_NAME,
    IGNORE_FILE_NAME, MAX_WILDCARD_DEPTH,
};

// Re-export engine types
pub use engine::{
    BuildEngine, BuildError, BuildEvent, BuildEventStream, BuildRunner, DockerEngine, EngineError,
};

// Re-export execution types
pub use execution::{
    progress_channel, BuildOutcome, CombinationOutcome, EventSender, ExecutionEvent,
    MatrixExecutor, ProgressReceiver, ProgressSender, RunReport,
};

// Re-export template rendering
pub use template::{render_build_definition, RenderError};
