//! Re-attribution port.
//!
//! The desugarer never types code itself. After each pass that changed the
//! unit it hands the whole unit to a [`Reattribute`] implementation, which
//! must rewrite every expression's type slot and report ordinary semantic
//! errors. Those errors are returned to the caller untouched.

mod checker;

pub use checker::LocalAttributor;

use bailout_core::Diagnostic;
use bailout_tree::Unit;

pub trait Reattribute {
    /// Re-resolve types for every node, including newly inserted ones.
    ///
    /// Must be idempotent and safe to call repeatedly.
    fn reattribute(&mut self, unit: &mut Unit) -> Vec<Diagnostic>;
}

impl<F> Reattribute for F
where
    F: FnMut(&mut Unit) -> Vec<Diagnostic>,
{
    fn reattribute(&mut self, unit: &mut Unit) -> Vec<Diagnostic> {
        self(unit)
    }
}
