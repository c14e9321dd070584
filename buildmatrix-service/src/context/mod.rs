// Build context module
// Ignore-pattern normalization and tar context packing

pub mod ignore;
pub mod packer;

pub use ignore::{load_patterns, normalize_patterns, IgnoreSet, MAX_WILDCARD_DEPTH};
pub use packer::{ContextPacker, PackError, BUILD_DEFINITION_NAME, IGNORE_FILE_NAME};
