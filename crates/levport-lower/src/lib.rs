//! Semantic lowering of Lua level descriptions.
//!
//! This is where Lua meaning turns into JavaScript meaning. The lowering
//! pass walks the syntax tree from `levport-syntax` and builds a fresh
//! JavaScript-shaped IR, making every semantic decision on the way:
//!
//! - 1-based sequence indexes become 0-based
//! - `math.random` maps onto the engine's `rn2` / `rnd` / `d` primitives,
//!   one primitive call per source call
//! - standard-library calls go through the tables in [`library`]
//! - `nil` comparisons become loose `null` comparisons
//!
//! # Architecture
//!
//! ```text
//! Chunk ──> lower_chunk ──> Lowered { body, usage } ──> resolve_imports ──> Vec<Import>
//!               │
//!               └──> Diagnostics
//! ```

pub mod imports;
pub mod ir;
pub mod library;
pub mod lower;
pub mod random;
pub mod symbols;

// Re-exports: IR types
pub use ir::{
    BinaryOp, Binding, Expr, Function, Import, Module, ObjectKey, Stmt, UnaryOp, UpdateOp,
};

// Re-exports: lowering
pub use lower::{Lowered, VARARG_NAME, js_name, lower_chunk};

// Re-exports: symbols and imports
pub use imports::{ImportPaths, resolve_imports};
pub use symbols::{Helper, HelperGroup, SymbolUsage};
