//! Error types for catalog construction, configuration and desugaring.

use bailout_core::{CompilationPhase, Diagnostic};
use bailout_tree::{Span, Symbol};
use derive_more::{Display, Error, From};

/// Message attached to every orphaned marker call.
pub const UNSUPPORTED_POSITION: &str = "short-circuit marker used at unsupported position";

#[derive(Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// Two descriptors claim the same type; lookups would be ambiguous.
    #[display("container type `{_0}` is described more than once")]
    AmbiguousType(#[error(not(source))] Symbol),

    #[display("container catalog is empty")]
    Empty,
}

#[derive(Debug, Display, Error, From)]
pub enum ConfigError {
    #[display("invalid desugaring configuration: {_0}")]
    Parse(toml::de::Error),

    #[display("{_0}")]
    Catalog(CatalogError),
}

/// The single error kind this pass reports.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum DesugarError {
    #[display("{}", UNSUPPORTED_POSITION)]
    UnsupportedPosition { span: Span },
}

impl DesugarError {
    pub fn span(&self) -> Span {
        match self {
            DesugarError::UnsupportedPosition { span } => *span,
        }
    }
}

impl From<DesugarError> for Diagnostic {
    fn from(error: DesugarError) -> Self {
        Diagnostic::error(CompilationPhase::Desugaring, error.span(), error.to_string())
    }
}

/// A unit that could not be desugared. Always carries at least one diagnostic.
#[derive(Clone, Debug, Display, PartialEq)]
#[display("desugaring failed with {} error(s)", diagnostics.len())]
pub struct DesugarFailure {
    pub diagnostics: Vec<Diagnostic>,
}

impl std::error::Error for DesugarFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_position_diagnostic_uses_the_shared_message() {
        let error = DesugarError::UnsupportedPosition {
            span: Span::new(3, 9),
        };
        assert_eq!(error.to_string(), UNSUPPORTED_POSITION);

        let diagnostic = Diagnostic::from(error);
        assert_eq!(diagnostic.message, UNSUPPORTED_POSITION);
        assert_eq!(diagnostic.span, Span::new(3, 9));
        assert_eq!(diagnostic.phase, CompilationPhase::Desugaring);
    }
}
