//! JavaScript code generation for lowered level descriptions.
//!
//! Every semantic decision is made during lowering. Emitting is a pure
//! `Module -> String` function whose output is byte-stable for a given
//! input.

pub mod javascript;
pub mod traits;

pub use javascript::{JAVASCRIPT_WRITER, JavaScriptWriter, JavaScriptWriterImpl};
pub use traits::Writer;
