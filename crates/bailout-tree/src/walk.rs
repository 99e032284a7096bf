//! Recursive traversal utilities for the arena syntax tree.
//!
//! Provides `walk_*` functions that visit every expression reachable from a
//! function, block, statement or expression, including expressions in
//! positions the desugaring pass never rewrites (conditions, resources,
//! rule-form switch bodies, lambda bodies).

use std::ops::ControlFlow;

use smallvec::SmallVec;

use crate::node::*;
use crate::refs::*;
use crate::unit::Unit;

/// Controls whether to descend into children during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    /// Continue walking and descend into sub-expressions.
    Advance,
    /// Skip the sub-expressions of the current expression.
    Skip,
}

/// Direct sub-expressions of `e` in evaluation order.
///
/// Lambda bodies are not included: they are separate code that runs later.
pub fn expr_children(unit: &Unit, e: ExprRef) -> SmallVec<[ExprRef; 4]> {
    let mut out = SmallVec::new();
    match unit.expr_kind(e) {
        ExprKind::Name(_)
        | ExprKind::Int(_)
        | ExprKind::Bool(_)
        | ExprKind::Str(_)
        | ExprKind::Null
        | ExprKind::Lambda { .. } => {}
        ExprKind::Call { args, .. } | ExprKind::StaticCall { args, .. } => {
            out.extend(args.iter().copied())
        }
        ExprKind::MethodCall { receiver, args, .. } => {
            out.push(*receiver);
            out.extend(args.iter().copied());
        }
        ExprKind::Field { receiver, .. } => out.push(*receiver),
        ExprKind::Index { array, index } => {
            out.push(*array);
            out.push(*index);
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            out.push(*lhs);
            out.push(*rhs);
        }
        ExprKind::Unary { operand, .. } => out.push(*operand),
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            out.push(*cond);
            out.push(*then_expr);
            out.push(*else_expr);
        }
        ExprKind::ArrayLit { elems, .. } => out.extend(elems.iter().copied()),
    }
    out
}

/// Walk every function body in the unit.
pub fn walk_unit<B>(
    unit: &Unit,
    f: &mut dyn FnMut(ExprRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    for func in unit.funcs() {
        walk_block(unit, unit.func(func).body, f)?;
    }
    ControlFlow::Continue(())
}

/// Walk all expressions in a statement list recursively.
pub fn walk_block<B>(
    unit: &Unit,
    block: BlockRef,
    f: &mut dyn FnMut(ExprRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    for &stmt in &unit.block(block).stmts {
        walk_stmt(unit, stmt, f)?;
    }
    ControlFlow::Continue(())
}

/// Walk all expressions in a statement and its nested statements.
pub fn walk_stmt<B>(
    unit: &Unit,
    stmt: StmtRef,
    f: &mut dyn FnMut(ExprRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    match unit.stmt_kind(stmt) {
        StmtKind::Local { init, .. } => {
            if let Some(init) = init {
                walk_expr(unit, *init, f)?;
            }
        }
        StmtKind::Expr(e) | StmtKind::Throw(e) => walk_expr(unit, *e, f)?,
        StmtKind::Assign { target, value, .. } => {
            walk_expr(unit, *target, f)?;
            walk_expr(unit, *value, f)?;
        }
        StmtKind::Return(value) => {
            if let Some(value) = value {
                walk_expr(unit, *value, f)?;
            }
        }
        StmtKind::If {
            cond,
            then_block,
            else_block,
        } => {
            walk_expr(unit, *cond, f)?;
            walk_block(unit, *then_block, f)?;
            if let Some(else_block) = else_block {
                walk_block(unit, *else_block, f)?;
            }
        }
        StmtKind::While { cond, body } => {
            walk_expr(unit, *cond, f)?;
            walk_block(unit, *body, f)?;
        }
        StmtKind::DoWhile { body, cond } => {
            walk_block(unit, *body, f)?;
            walk_expr(unit, *cond, f)?;
        }
        StmtKind::For {
            init,
            cond,
            update,
            body,
        } => {
            for &s in init {
                walk_stmt(unit, s, f)?;
            }
            if let Some(cond) = cond {
                walk_expr(unit, *cond, f)?;
            }
            for &s in update {
                walk_stmt(unit, s, f)?;
            }
            walk_block(unit, *body, f)?;
        }
        StmtKind::ForEach { iterable, body, .. } => {
            walk_expr(unit, *iterable, f)?;
            walk_block(unit, *body, f)?;
        }
        StmtKind::Block(block) => walk_block(unit, *block, f)?,
        StmtKind::Labeled { body, .. } => walk_stmt(unit, *body, f)?,
        StmtKind::Try {
            resources,
            body,
            catches,
            finally,
        } => {
            for &s in resources {
                walk_stmt(unit, s, f)?;
            }
            walk_block(unit, *body, f)?;
            for catch in catches {
                walk_block(unit, catch.body, f)?;
            }
            if let Some(finally) = finally {
                walk_block(unit, *finally, f)?;
            }
        }
        StmtKind::Switch { selector, cases } => {
            walk_expr(unit, *selector, f)?;
            for case in cases {
                for &label in &case.labels {
                    walk_expr(unit, label, f)?;
                }
                match case.body {
                    CaseBody::Statements(block) | CaseBody::RuleBlock(block) => {
                        walk_block(unit, block, f)?
                    }
                    CaseBody::RuleExpr(e) => walk_expr(unit, e, f)?,
                }
            }
        }
        StmtKind::Synchronized { lock, body } => {
            walk_expr(unit, *lock, f)?;
            walk_block(unit, *body, f)?;
        }
        StmtKind::Assert { cond, detail } => {
            walk_expr(unit, *cond, f)?;
            if let Some(detail) = detail {
                walk_expr(unit, *detail, f)?;
            }
        }
        StmtKind::Break(_) | StmtKind::Continue(_) => {}
    }
    ControlFlow::Continue(())
}

/// Walk an expression, its sub-expressions, and any lambda bodies inside it.
pub fn walk_expr<B>(
    unit: &Unit,
    expr: ExprRef,
    f: &mut dyn FnMut(ExprRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    match f(expr) {
        ControlFlow::Break(b) => return ControlFlow::Break(b),
        ControlFlow::Continue(WalkAction::Skip) => return ControlFlow::Continue(()),
        ControlFlow::Continue(WalkAction::Advance) => {}
    }
    if let ExprKind::Lambda { body, .. } = unit.expr_kind(expr) {
        return match *body {
            LambdaBody::Expr(e) => walk_expr(unit, e, f),
            LambdaBody::Block(block) => walk_block(unit, block, f),
        };
    }
    for child in expr_children(unit, expr) {
        walk_expr(unit, child, f)?;
    }
    ControlFlow::Continue(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::Builder;

    #[test]
    fn walk_reaches_conditions_resources_and_lambdas() {
        let mut b = Builder::new("walk");
        let int = b.ty("int");
        let cond = b.boolean(true);
        let res_init = b.call("open", []);
        let resource = b.local("r", res_init);
        let inner = b.int(7);
        let lambda = b.lambda_expr(&[("x", int)], None, inner);
        let keep = b.local("f", lambda);
        let try_stmt = b.try_([resource], [keep], vec![], None);
        let if_stmt = b.if_(cond, [try_stmt], None);
        let void = b.ty("void");
        b.func("main", &[], void, [if_stmt]);
        let unit = b.finish();

        let mut seen = Vec::new();
        let _ = walk_unit::<()>(&unit, &mut |e| {
            seen.push(e);
            ControlFlow::Continue(WalkAction::Advance)
        });
        assert_eq!(seen, vec![cond, res_init, lambda, inner]);
    }

    #[test]
    fn skip_prunes_sub_expressions() {
        let mut b = Builder::new("walk");
        let one = b.int(1);
        let two = b.int(2);
        let sum = b.binary(BinaryOp::Add, one, two);
        let stmt = b.expr_stmt(sum);
        let void = b.ty("void");
        b.func("main", &[], void, [stmt]);
        let unit = b.finish();

        let mut seen = Vec::new();
        let _ = walk_unit::<()>(&unit, &mut |e| {
            seen.push(e);
            ControlFlow::Continue(WalkAction::Skip)
        });
        assert_eq!(seen, vec![sum]);
    }
}
