//! Shared compiler plumbing for the bailout pass.
pub mod diagnostic;

pub use diagnostic::{CompilationPhase, Diagnostic, DiagnosticSeverity, DiagnosticSink};
