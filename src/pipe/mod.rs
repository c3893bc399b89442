//! Pipe slots and the selection algorithm that fills them.

/// Pipe slot variants.
pub mod kinds;
/// State-to-pipe selection.
pub mod select;

pub use kinds::{ImagePipeKind, PipeKind, PipeSet, PipeSnapshot, TextPipeKind};
pub use select::validate_pipes;
