//! Compilation pipeline for one unit.
//!
//! ```text
//! Unit (lowered by the host, untyped)
//!     │
//!     ▼
//! attribute ─► Unit (typed)
//!     │
//!     ▼
//! desugar ─► Unit (marker-free, re-attributed)
//! ```
//!
//! Every diagnostic produced along the way goes to the caller's sink,
//! whether or not the unit compiled.

use bailout_core::DiagnosticSink;
use bailout_passes::{
    DesugarConfig, DesugarFailure, DesugarOutcome, Desugarer, LocalAttributor, Reattribute,
};
use bailout_tree::Unit;
use derive_more::{Display, Error};
use tracing::debug;

#[derive(Debug, Display, Error)]
pub enum CompileError {
    /// The unit did not type check before desugaring started.
    #[display("type checking failed with {_0} error(s)")]
    TypeCheck(#[error(not(source))] usize),

    #[display("{_0}")]
    Desugar(DesugarFailure),
}

/// Attribute and desugar `unit` with the reference attributor.
pub fn compile(
    unit: &mut Unit,
    config: &DesugarConfig,
    sink: &mut dyn DiagnosticSink,
) -> Result<DesugarOutcome, CompileError> {
    let mut attributor = LocalAttributor::from_config(config);
    compile_with(unit, config, &mut attributor, sink)
}

/// Attribute and desugar `unit` with a host-supplied attributor.
pub fn compile_with(
    unit: &mut Unit,
    config: &DesugarConfig,
    attributor: &mut dyn Reattribute,
    sink: &mut dyn DiagnosticSink,
) -> Result<DesugarOutcome, CompileError> {
    let diagnostics = attributor.reattribute(unit);
    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    for diagnostic in diagnostics {
        sink.report(diagnostic);
    }
    if errors > 0 {
        debug!(unit = %unit.name(), errors, "initial attribution failed");
        return Err(CompileError::TypeCheck(errors));
    }

    match Desugarer::new(config.clone()).run(unit, attributor) {
        Ok(outcome) => {
            debug!(
                unit = %unit.name(),
                passes = outcome.passes,
                rewrites = outcome.rewrites,
                "desugared"
            );
            Ok(outcome)
        }
        Err(failure) => {
            for diagnostic in &failure.diagnostics {
                sink.report(diagnostic.clone());
            }
            Err(CompileError::Desugar(failure))
        }
    }
}
