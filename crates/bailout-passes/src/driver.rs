//! Fixpoint driver.
//!
//! Repeats {rewrite pass, re-attribute} until a pass changes nothing, then
//! runs the orphan scan. Every pass that rewrites something removes at least
//! one legally positioned marker call, so the loop is bounded by the number
//! of marker calls in the unit.

use bailout_core::Diagnostic;
use bailout_tree::Unit;
use tracing::{debug, warn};

use crate::attribute::Reattribute;
use crate::config::DesugarConfig;
use crate::errors::DesugarFailure;
use crate::fresh::FreshNames;
use crate::orphan;
use crate::rewriter::BlockRewriter;
use crate::search::Searcher;

/// Result of a successful desugaring run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DesugarOutcome {
    /// Rewrite passes performed, including the final pass that found nothing.
    pub passes: usize,
    /// Total number of marker calls rewritten.
    pub rewrites: usize,
    /// Whether the last pass changed nothing (false only if the cap was hit).
    pub reached_fixpoint: bool,
}

pub struct Desugarer {
    config: DesugarConfig,
}

impl Desugarer {
    pub fn new(config: DesugarConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DesugarConfig {
        &self.config
    }

    /// Desugar `unit` in place.
    ///
    /// The unit must already be attributed. On success it contains no marker
    /// call on a cataloged type. On failure the diagnostics are either the
    /// attributor's errors after a rewrite pass, or one `UnsupportedPosition`
    /// per orphaned marker call.
    pub fn run(
        &self,
        unit: &mut Unit,
        attributor: &mut dyn Reattribute,
    ) -> Result<DesugarOutcome, DesugarFailure> {
        let searcher = Searcher::new(&self.config.catalog, self.config.marker);
        let rewriter = BlockRewriter::new(&searcher);
        let mut names = FreshNames::for_unit(unit);
        let max_passes = self
            .config
            .max_passes
            .unwrap_or_else(|| orphan::count_marker_calls(unit, &searcher) + 1);

        let mut outcome = DesugarOutcome::default();
        while outcome.passes < max_passes {
            outcome.passes += 1;
            let rewrites = rewriter.run_pass(unit, &mut names);
            debug!(pass = outcome.passes, rewrites, "desugaring pass");
            if rewrites == 0 {
                outcome.reached_fixpoint = true;
                break;
            }
            outcome.rewrites += rewrites;

            let diagnostics = attributor.reattribute(unit);
            if diagnostics.iter().any(Diagnostic::is_error) {
                debug!(
                    pass = outcome.passes,
                    errors = diagnostics.len(),
                    "re-attribution failed"
                );
                return Err(DesugarFailure { diagnostics });
            }
        }
        if !outcome.reached_fixpoint {
            warn!(max_passes, "desugaring stopped at the pass limit");
        }

        let orphans = orphan::scan(unit, &searcher);
        if !orphans.is_empty() {
            debug!(count = orphans.len(), "orphaned marker calls");
            return Err(DesugarFailure {
                diagnostics: orphans.into_iter().map(Diagnostic::from).collect(),
            });
        }
        Ok(outcome)
    }
}
