//! Traits for output writers.

use levport_lower::Module;

/// A writer emits a lowered module as source code in a target language.
pub trait Writer: Send + Sync {
    /// Language identifier (e.g., "javascript").
    fn language(&self) -> &'static str;

    /// Default file extension for output (e.g., "js").
    fn extension(&self) -> &'static str;

    /// Emit the module as source code.
    fn write(&self, module: &Module) -> String;
}
