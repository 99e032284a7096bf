//! Pass-scoped fresh-name generator.

use std::collections::HashSet;

use bailout_tree::{ExprKind, StmtKind, Symbol, Unit};

/// Generates `$<seed><n>` identifiers that are unique within one unit.
///
/// One monotonic counter is shared by all seeds. Names already bound in the
/// unit when the generator was created are skipped, so re-running the pass
/// over its own output cannot shadow an earlier temporary.
pub struct FreshNames {
    counter: usize,
    taken: HashSet<Symbol>,
}

impl FreshNames {
    pub fn new() -> Self {
        Self {
            counter: 0,
            taken: HashSet::new(),
        }
    }

    /// Start a generator that avoids every name bound in `unit`.
    pub fn for_unit(unit: &Unit) -> Self {
        let mut taken = HashSet::new();
        for func in unit.funcs() {
            taken.extend(unit.func(func).params.iter().map(|p| p.name));
        }
        for (_, data) in unit.all_stmts() {
            match &data.kind {
                StmtKind::Local { name, .. } => {
                    taken.insert(*name);
                }
                StmtKind::ForEach { var, .. } => {
                    taken.insert(*var);
                }
                StmtKind::Try { catches, .. } => {
                    taken.extend(catches.iter().map(|c| c.param));
                }
                _ => {}
            }
        }
        for (_, data) in unit.all_exprs() {
            if let ExprKind::Lambda { params, .. } = &data.kind {
                taken.extend(params.iter().map(|p| p.name));
            }
        }
        Self { counter: 0, taken }
    }

    pub fn fresh(&mut self, seed: &str) -> Symbol {
        loop {
            let candidate = Symbol::from_dynamic(&format!("${seed}{}", self.counter));
            self.counter += 1;
            if self.taken.insert(candidate) {
                return candidate;
            }
        }
    }
}

impl Default for FreshNames {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bailout_tree::Builder;

    #[test]
    fn counter_is_shared_across_seeds() {
        let mut names = FreshNames::new();
        assert_eq!(names.fresh("r"), "$r0");
        assert_eq!(names.fresh("v"), "$v1");
        assert_eq!(names.fresh("r"), "$r2");
    }

    #[test]
    fn names_bound_in_unit_are_skipped() {
        let mut b = Builder::new("fresh");
        let one = b.int(1);
        let taken = b.local("$r0", one);
        let void = b.ty("void");
        b.func("main", &[], void, [taken]);
        let unit = b.finish();

        let mut names = FreshNames::for_unit(&unit);
        assert_eq!(names.fresh("r"), "$r1");
    }
}
