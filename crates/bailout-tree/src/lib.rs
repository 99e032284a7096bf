//! Arena syntax tree for statement-oriented units.
//!
//! A `Unit` owns every function, statement, expression and statement list
//! of one translation unit in `cranelift-entity` arenas. Nodes refer to each
//! other by `Copy` index, so passes can splice statement lists and replace
//! expressions in place without aliasing hazards.

pub mod build;
pub mod location;
pub mod node;
pub mod printer;
pub mod refs;
pub mod symbol;
pub mod types;
pub mod unit;
pub mod walk;

pub use build::Builder;
pub use location::Span;
pub use node::*;
pub use refs::{BlockRef, ExprRef, FuncRef, StmtRef, TypeRef};
pub use symbol::Symbol;
pub use types::{TypeData, TypeInterner};
pub use unit::Unit;
pub use walk::WalkAction;

// Re-export smallvec for callers building node payloads
pub use smallvec;
