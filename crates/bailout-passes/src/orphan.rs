//! Orphan scan: marker calls that survived the fixpoint loop.
//!
//! Runs over the final, re-attributed unit and visits every expression,
//! including the positions the searcher never enters. Each remaining marker
//! call on a cataloged receiver is one `UnsupportedPosition` error.

use std::ops::ControlFlow;

use bailout_tree::walk::walk_unit;
use bailout_tree::{Unit, WalkAction};

use crate::errors::DesugarError;
use crate::search::Searcher;

pub fn scan(unit: &Unit, searcher: &Searcher<'_>) -> Vec<DesugarError> {
    let mut orphans = Vec::new();
    let _ = walk_unit::<()>(unit, &mut |e| {
        if let Some(lens) = searcher.marker_call(unit, e) {
            orphans.push(DesugarError::UnsupportedPosition { span: lens.span });
        }
        ControlFlow::Continue(WalkAction::Advance)
    });
    orphans
}

/// Count marker calls by name alone, whatever their receiver type.
pub fn count_marker_calls(unit: &Unit, searcher: &Searcher<'_>) -> usize {
    let mut count = 0;
    let _ = walk_unit::<()>(unit, &mut |e| {
        if searcher.is_marker_shape(unit, e) {
            count += 1;
        }
        ControlFlow::Continue(WalkAction::Advance)
    });
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use bailout_tree::{BinaryOp, Builder, Span, Symbol};

    #[test]
    fn reports_marker_in_condition_with_its_span() {
        let mut b = Builder::new("orphan");
        let int = b.ty("int");
        let string = b.ty("String");
        let boolean = b.ty("boolean");
        let result = b.generic("Result", [int, string]);

        let recv = b.call("f", []);
        b.unit_mut().set_expr_ty(recv, Some(result));
        b.at(Span::new(40, 52));
        let call = b.unwrap(recv);
        b.unpin();
        b.unit_mut().set_expr_ty(call, Some(int));
        let zero = b.int(0);
        let cond = b.binary(BinaryOp::Gt, call, zero);
        b.unit_mut().set_expr_ty(cond, Some(boolean));
        let if_stmt = b.if_(cond, [], None);
        b.func("f", &[], result, [if_stmt]);

        let catalog = Catalog::standard();
        let searcher = Searcher::new(&catalog, Symbol::new("unwrap"));
        let orphans = scan(b.unit(), &searcher);
        assert_eq!(
            orphans,
            vec![DesugarError::UnsupportedPosition {
                span: Span::new(40, 52)
            }]
        );
        assert_eq!(count_marker_calls(b.unit(), &searcher), 1);
    }

    #[test]
    fn unrelated_unwrap_is_not_an_orphan() {
        let mut b = Builder::new("orphan");
        let int = b.ty("int");
        let lock = b.generic("Lock", [int]);
        let recv = b.name("guard");
        b.unit_mut().set_expr_ty(recv, Some(lock));
        let call = b.unwrap(recv);
        let stmt = b.assert_(call, None);
        let void = b.ty("void");
        b.func("f", &[], void, [stmt]);

        let catalog = Catalog::standard();
        let searcher = Searcher::new(&catalog, Symbol::new("unwrap"));
        assert!(scan(b.unit(), &searcher).is_empty());
        assert_eq!(count_marker_calls(b.unit(), &searcher), 1);
    }
}
