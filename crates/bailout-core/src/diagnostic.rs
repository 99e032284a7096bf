//! Diagnostic messages emitted during compilation.

use bailout_tree::Span;
use serde::Serialize;

/// A diagnostic message (error, warning, or info) with source location.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub span: Span,
    pub severity: DiagnosticSeverity,
    pub phase: CompilationPhase,
}

impl Diagnostic {
    pub fn error(phase: CompilationPhase, span: Span, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span,
            severity: DiagnosticSeverity::Error,
            phase,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] at {}: {}",
            self.severity, self.phase, self.span, self.message
        )
    }
}

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
}

/// Compilation phase where a diagnostic was emitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, derive_more::Display)]
pub enum CompilationPhase {
    #[display("type checking")]
    TypeChecking,
    #[display("desugaring")]
    Desugaring,
}

impl std::fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticSeverity::Error => write!(f, "ERROR"),
            DiagnosticSeverity::Warning => write!(f, "WARNING"),
            DiagnosticSeverity::Info => write!(f, "INFO"),
        }
    }
}

/// Where diagnostics go. Hosts plug in their own reporter; a `Vec` collects.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);

    /// Convenience for the common `reportError(position, message)` shape.
    fn report_error(&mut self, phase: CompilationPhase, span: Span, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.report(Diagnostic::error(phase, span, message));
    }
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}
