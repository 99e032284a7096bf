//! Marker-call searcher.
//!
//! Given one statement, finds the first legally positioned marker call: the
//! outermost, leftmost one in depth-first order. Only the statement's entry
//! expressions are searched:
//!
//! | statement            | entry expression            |
//! |----------------------|-----------------------------|
//! | local declaration    | initializer                 |
//! | expression statement | the expression              |
//! | for-each             | iterated expression         |
//! | return / throw       | the value                   |
//! | (compound) assign    | right-hand side             |
//! | synchronized         | lock expression             |
//! | switch               | selector                    |
//!
//! Conditions of `if`/`while`/`do`/`for`, `assert`, try resources, labeled
//! statements and rule-form switch bodies are never entry positions. Nested
//! statement lists (bodies, lambda blocks, catch/finally blocks) are handled
//! by the block rewriter, not here.

use bailout_tree::{ExprKind, ExprRef, Span, StmtKind, StmtRef, Symbol, Unit};
use smallvec::SmallVec;

use crate::catalog::{Catalog, StrategyId};

/// A found marker call: the receiver to hoist and the node to replace.
///
/// Lives for one statement visit. Consuming it with [`Lens::replace`]
/// overwrites the marker call node in place, so every parent that referred
/// to the call now sees the replacement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lens {
    pub call: ExprRef,
    pub receiver: ExprRef,
    pub strategy: StrategyId,
    pub span: Span,
}

impl Lens {
    pub fn replace(self, unit: &mut Unit, replacement: ExprKind) {
        unit.replace_expr(self.call, replacement);
    }
}

pub struct Searcher<'c> {
    catalog: &'c Catalog,
    marker: Symbol,
}

impl<'c> Searcher<'c> {
    pub fn new(catalog: &'c Catalog, marker: Symbol) -> Self {
        Self { catalog, marker }
    }

    pub fn catalog(&self) -> &'c Catalog {
        self.catalog
    }

    /// Match `receiver.<marker>()` whose receiver's static type is cataloged.
    pub fn marker_call(&self, unit: &Unit, e: ExprRef) -> Option<Lens> {
        let receiver = self.marker_receiver(unit, e)?;
        let ty = unit.expr_ty(receiver)?;
        let strategy = self.catalog.lookup_type(&unit.types, ty)?;
        Some(Lens {
            call: e,
            receiver,
            strategy,
            span: unit.expr_span(e),
        })
    }

    /// `receiver.<marker>()` regardless of the receiver's type.
    pub fn is_marker_shape(&self, unit: &Unit, e: ExprRef) -> bool {
        self.marker_receiver(unit, e).is_some()
    }

    fn marker_receiver(&self, unit: &Unit, e: ExprRef) -> Option<ExprRef> {
        match unit.expr_kind(e) {
            ExprKind::MethodCall {
                receiver,
                method,
                args,
            } if *method == self.marker && args.is_empty() => Some(*receiver),
            _ => None,
        }
    }

    /// Find the first legal marker call in `stmt`, if any.
    pub fn find(&self, unit: &Unit, stmt: StmtRef) -> Option<Lens> {
        entry_exprs(unit, stmt)
            .into_iter()
            .find_map(|e| self.search_expr(unit, e))
    }

    /// Depth-first, outermost-first search below an entry expression.
    pub fn search_expr(&self, unit: &Unit, e: ExprRef) -> Option<Lens> {
        if let Some(lens) = self.marker_call(unit, e) {
            return Some(lens);
        }
        searchable_children(unit, e)
            .into_iter()
            .find_map(|child| self.search_expr(unit, child))
    }
}

/// Entry expressions of a statement in evaluation order.
fn entry_exprs(unit: &Unit, stmt: StmtRef) -> SmallVec<[ExprRef; 2]> {
    let mut out = SmallVec::new();
    match unit.stmt_kind(stmt) {
        StmtKind::Local {
            init: Some(init), ..
        } => out.push(*init),
        StmtKind::Expr(e) | StmtKind::Throw(e) | StmtKind::Return(Some(e)) => out.push(*e),
        StmtKind::ForEach { iterable, .. } => out.push(*iterable),
        StmtKind::Assign { target, value, .. } => {
            if is_stable_target(unit, *target) {
                out.push(*value);
            }
        }
        StmtKind::Synchronized { lock, .. } => out.push(*lock),
        StmtKind::Switch { selector, .. } => out.push(*selector),
        _ => {}
    }
    out
}

/// Targets whose evaluation cannot observe the hoisted right-hand side:
/// locals, and fields/elements addressed only through names and literals.
fn is_stable_target(unit: &Unit, target: ExprRef) -> bool {
    match unit.expr_kind(target) {
        ExprKind::Name(_) => true,
        ExprKind::Field { receiver, .. } => is_pure(unit, *receiver),
        ExprKind::Index { array, index } => is_pure(unit, *array) && is_pure(unit, *index),
        _ => false,
    }
}

fn is_pure(unit: &Unit, e: ExprRef) -> bool {
    match unit.expr_kind(e) {
        ExprKind::Name(_)
        | ExprKind::Int(_)
        | ExprKind::Bool(_)
        | ExprKind::Str(_)
        | ExprKind::Null => true,
        ExprKind::Field { receiver, .. } => is_pure(unit, *receiver),
        _ => false,
    }
}

/// Sub-expressions that are evaluated unconditionally before their parent.
///
/// The right operand of `&&`/`||` and the branches of `?:` are conditional,
/// and lambda bodies run later, so none of them are searched. Siblings are
/// searched left to right up to and including the first impure one: a
/// marker further right would be hoisted above that sibling's evaluation.
fn searchable_children(unit: &Unit, e: ExprRef) -> SmallVec<[ExprRef; 4]> {
    let mut out = SmallVec::new();
    match unit.expr_kind(e) {
        ExprKind::Binary { op, lhs, rhs } => {
            if op.is_short_circuit() {
                out.push(*lhs);
            } else {
                push_in_order(unit, &mut out, [*lhs, *rhs]);
            }
        }
        ExprKind::Unary { operand, .. } => out.push(*operand),
        ExprKind::Index { array, index } => push_in_order(unit, &mut out, [*array, *index]),
        ExprKind::Call { args, .. } | ExprKind::StaticCall { args, .. } => {
            push_in_order(unit, &mut out, args.iter().copied())
        }
        ExprKind::MethodCall { receiver, args, .. } => push_in_order(
            unit,
            &mut out,
            std::iter::once(*receiver).chain(args.iter().copied()),
        ),
        ExprKind::Field { receiver, .. } => out.push(*receiver),
        ExprKind::Conditional { cond, .. } => out.push(*cond),
        ExprKind::ArrayLit { elems, .. } => push_in_order(unit, &mut out, elems.iter().copied()),
        ExprKind::Name(_)
        | ExprKind::Int(_)
        | ExprKind::Bool(_)
        | ExprKind::Str(_)
        | ExprKind::Null
        | ExprKind::Lambda { .. } => {}
    }
    out
}

fn push_in_order(
    unit: &Unit,
    out: &mut SmallVec<[ExprRef; 4]>,
    siblings: impl IntoIterator<Item = ExprRef>,
) {
    for sibling in siblings {
        out.push(sibling);
        if !is_pure(unit, sibling) {
            break;
        }
    }
}
