//! Short-circuit `unwrap()` desugaring for statement-oriented units.
//!
//! The host lowers its parsed, analyzed tree into a [`tree::Unit`], then
//! calls [`compile`]. The unit comes back free of marker calls, or the
//! diagnostics explain which marker calls could not be rewritten.

pub mod eval;
pub mod pipeline;

pub use bailout_core::{CompilationPhase, Diagnostic, DiagnosticSeverity, DiagnosticSink};
pub use bailout_passes::{
    Catalog, ContainerDescriptor, ContainerKind, DesugarConfig, DesugarError, DesugarFailure,
    DesugarOutcome, Desugarer, LocalAttributor, Reattribute, UNSUPPORTED_POSITION,
};
pub use bailout_tree as tree;
pub use pipeline::{CompileError, compile, compile_with};
