//! Block rewriter: one fixpoint pass over every statement list in a unit.
//!
//! Statement lists are function bodies and every block nested in them,
//! lambda block bodies, try/catch/finally blocks and statement-form switch
//! cases. For-loop init/update clauses, try resources and rule-form switch
//! bodies are not lists; they are walked only for lambdas, whose bodies are.
//!
//! In each list at most the first statement with a legal marker call is
//! expanded per pass. Lists are collected before any rewrite, so a pass only
//! sees lists that existed when it started.

use bailout_tree::walk::expr_children;
use bailout_tree::{
    BlockRef, CaseBody, ExprKind, ExprRef, LambdaBody, Param, StmtKind, StmtRef, TypeRef, Unit,
};
use tracing::trace;

use crate::builder::RewriteBuilder;
use crate::fresh::FreshNames;
use crate::search::Searcher;

/// A statement list and the result type a short-circuit returns into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StmtList {
    pub block: BlockRef,
    /// `None` inside a lambda without a declared return type.
    pub ambient: Option<TypeRef>,
}

pub struct BlockRewriter<'s, 'c> {
    searcher: &'s Searcher<'c>,
    builder: RewriteBuilder<'c>,
}

impl<'s, 'c> BlockRewriter<'s, 'c> {
    pub fn new(searcher: &'s Searcher<'c>) -> Self {
        Self {
            searcher,
            builder: RewriteBuilder::new(searcher.catalog()),
        }
    }

    /// Run one pass. Returns the number of lists that were rewritten.
    pub fn run_pass(&self, unit: &mut Unit, names: &mut FreshNames) -> usize {
        let lists = self.collect_lists(unit);
        let mut rewrites = 0;
        for list in lists {
            if self.rewrite_list(unit, names, list) {
                rewrites += 1;
            }
        }
        rewrites
    }

    /// Expand the first statement in `list` that holds a legal marker call.
    pub fn rewrite_list(&self, unit: &mut Unit, names: &mut FreshNames, list: StmtList) -> bool {
        trace!(block = %list.block, "visiting statement list");
        let stmts = unit.block(list.block).stmts.clone();
        for stmt in stmts {
            let Some(lens) = self.searcher.find(unit, stmt) else {
                continue;
            };
            trace!(%stmt, span = %lens.span, "marker call found");
            let result = self.builder.build(unit, names, lens, list.ambient);
            unit.insert_stmts_before(list.block, stmt, result.stmts);
            return true;
        }
        false
    }

    /// Every statement list in the unit, outer lists before inner ones.
    ///
    /// Expression-bodied lambdas holding a legal marker call are turned into
    /// block lambdas on the way so their bodies become lists too.
    pub fn collect_lists(&self, unit: &mut Unit) -> Vec<StmtList> {
        let mut collector = ListCollector {
            searcher: self.searcher,
            lists: Vec::new(),
            in_list: true,
        };
        let funcs: Vec<_> = unit.funcs().collect();
        for func in funcs {
            let data = unit.func(func);
            let (body, ret) = (data.body, data.ret);
            collector.block(unit, body, Some(ret));
        }
        collector.lists
    }
}

struct ListCollector<'s, 'c> {
    searcher: &'s Searcher<'c>,
    lists: Vec<StmtList>,
    /// False while walking a position that is not a statement list.
    in_list: bool,
}

impl ListCollector<'_, '_> {
    fn block(&mut self, unit: &mut Unit, block: BlockRef, ambient: Option<TypeRef>) {
        if self.in_list {
            self.lists.push(StmtList { block, ambient });
        }
        let stmts = unit.block(block).stmts.clone();
        for stmt in stmts {
            self.stmt(unit, stmt, ambient);
        }
    }

    fn stmt(&mut self, unit: &mut Unit, stmt: StmtRef, ambient: Option<TypeRef>) {
        match unit.stmt_kind(stmt).clone() {
            StmtKind::Local { init, .. } => {
                if let Some(init) = init {
                    self.expr(unit, init);
                }
            }
            StmtKind::Expr(e) | StmtKind::Throw(e) | StmtKind::Return(Some(e)) => {
                self.expr(unit, e)
            }
            StmtKind::Assign { target, value, .. } => {
                self.expr(unit, target);
                self.expr(unit, value);
            }
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                self.expr(unit, cond);
                self.block(unit, then_block, ambient);
                if let Some(else_block) = else_block {
                    self.block(unit, else_block, ambient);
                }
            }
            StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
                self.expr(unit, cond);
                self.block(unit, body, ambient);
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                self.outside_lists(|c| {
                    for s in init {
                        c.stmt(unit, s, ambient);
                    }
                });
                if let Some(cond) = cond {
                    self.expr(unit, cond);
                }
                self.outside_lists(|c| {
                    for s in update {
                        c.stmt(unit, s, ambient);
                    }
                });
                self.block(unit, body, ambient);
            }
            StmtKind::ForEach { iterable, body, .. } => {
                self.expr(unit, iterable);
                self.block(unit, body, ambient);
            }
            StmtKind::Block(block) => self.block(unit, block, ambient),
            // The labeled statement is not itself in a list; blocks below it are.
            StmtKind::Labeled { body, .. } => self.stmt(unit, body, ambient),
            StmtKind::Try {
                resources,
                body,
                catches,
                finally,
            } => {
                self.outside_lists(|c| {
                    for s in resources {
                        c.stmt(unit, s, ambient);
                    }
                });
                self.block(unit, body, ambient);
                for catch in catches {
                    self.block(unit, catch.body, ambient);
                }
                if let Some(finally) = finally {
                    self.block(unit, finally, ambient);
                }
            }
            StmtKind::Switch { selector, cases } => {
                self.expr(unit, selector);
                for case in cases {
                    for label in case.labels {
                        self.expr(unit, label);
                    }
                    match case.body {
                        CaseBody::Statements(block) => self.block(unit, block, ambient),
                        CaseBody::RuleExpr(e) => self.expr(unit, e),
                        CaseBody::RuleBlock(block) => {
                            self.outside_lists(|c| c.block(unit, block, ambient))
                        }
                    }
                }
            }
            StmtKind::Synchronized { lock, body } => {
                self.expr(unit, lock);
                self.block(unit, body, ambient);
            }
            StmtKind::Assert { cond, detail } => {
                self.expr(unit, cond);
                if let Some(detail) = detail {
                    self.expr(unit, detail);
                }
            }
            StmtKind::Return(None) | StmtKind::Break(_) | StmtKind::Continue(_) => {}
        }
    }

    /// Run `walk` with block collection switched off.
    fn outside_lists(&mut self, walk: impl FnOnce(&mut Self)) {
        let saved = std::mem::replace(&mut self.in_list, false);
        walk(self);
        self.in_list = saved;
    }

    /// Find lambdas below `e` and enter their bodies.
    fn expr(&mut self, unit: &mut Unit, e: ExprRef) {
        let ExprKind::Lambda { params, ret, body } = unit.expr_kind(e).clone() else {
            for child in expr_children(unit, e) {
                self.expr(unit, child);
            }
            return;
        };
        let saved = std::mem::replace(&mut self.in_list, true);
        match body {
            LambdaBody::Block(block) => self.block(unit, block, ret),
            LambdaBody::Expr(inner) => {
                if self.searcher.search_expr(unit, inner).is_some() {
                    let block = normalize_lambda(unit, e, params, ret, inner);
                    self.block(unit, block, ret);
                } else {
                    self.expr(unit, inner);
                }
            }
        }
        self.in_list = saved;
    }
}

/// Rewrite `(..) -> e` as `(..) -> { return e; }`, or `{ e; }` for `void`.
fn normalize_lambda(
    unit: &mut Unit,
    lambda: ExprRef,
    params: Vec<Param>,
    ret: Option<TypeRef>,
    inner: ExprRef,
) -> BlockRef {
    let span = unit.expr_span(inner);
    let is_void = ret.is_some_and(|ty| unit.types.is_named(ty, "void"));
    let kind = if is_void {
        StmtKind::Expr(inner)
    } else {
        StmtKind::Return(Some(inner))
    };
    let stmt = unit.create_stmt(kind, span);
    let block = unit.create_block([stmt]);
    trace!(%lambda, "expression lambda turned into block lambda");
    unit.replace_expr(
        lambda,
        ExprKind::Lambda {
            params,
            ret,
            body: LambdaBody::Block(block),
        },
    );
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use bailout_tree::printer::print_unit;
    use bailout_tree::{BinaryOp, Builder, Symbol};

    struct Fx {
        b: Builder,
        int: TypeRef,
        result: TypeRef,
    }

    fn fx() -> Fx {
        let mut b = Builder::new("rewriter");
        let int = b.ty("int");
        let string = b.ty("String");
        let result = b.generic("Result", [int, string]);
        Fx { b, int, result }
    }

    impl Fx {
        fn unwrap_call(&mut self, callee: &str) -> ExprRef {
            let recv = self.b.call(callee, []);
            self.b.unit_mut().set_expr_ty(recv, Some(self.result));
            self.b.unwrap(recv)
        }

        /// `var name = () : Result<int, String> -> { var x = callee().unwrap(); return Result.ok(x); };`
        fn lambda_decl(&mut self, name: &str, callee: &str) -> StmtRef {
            let call = self.unwrap_call(callee);
            let x = self.b.local("x", call);
            let x_name = self.b.name("x");
            let ok = self.b.static_call("Result", "ok", [x_name]);
            let ret = self.b.ret(ok);
            let lambda = self.b.lambda_block(&[], Some(self.result), [x, ret]);
            self.b.local(name, lambda)
        }

        fn pass(&mut self) -> usize {
            let catalog = Catalog::standard();
            let searcher = Searcher::new(&catalog, Symbol::new("unwrap"));
            let mut names = FreshNames::for_unit(self.b.unit());
            BlockRewriter::new(&searcher).run_pass(self.b.unit_mut(), &mut names)
        }
    }

    #[test]
    fn one_rewrite_per_list_per_pass() {
        let mut fx = fx();
        let a = fx.unwrap_call("a");
        let first = fx.b.local("x", a);
        let b_call = fx.unwrap_call("b");
        let second = fx.b.local("y", b_call);
        let sum = {
            let x = fx.b.name("x");
            let y = fx.b.name("y");
            fx.b.binary(BinaryOp::Add, x, y)
        };
        let ok = fx.b.static_call("Result", "ok", [sum]);
        let ret = fx.b.ret(ok);
        let result = fx.result;
        fx.b.func("both", &[], result, [first, second, ret]);

        assert_eq!(fx.pass(), 1);
        insta::assert_snapshot!(print_unit(fx.b.unit()), @r"
        Result<int, String> both() {
            var $r0 = a();
            if ($r0.isErr()) {
                return Result.err($r0.getError());
            }
            var $v1 = $r0.get();
            var x = $v1;
            var y = b().unwrap();
            return Result.ok(x + y);
        }
        ");
    }

    #[test]
    fn nested_lists_are_rewritten_in_the_same_pass() {
        let mut fx = fx();
        let a = fx.unwrap_call("a");
        let outer = fx.b.local("x", a);
        let b_call = fx.unwrap_call("b");
        let inner = fx.b.expr_stmt(b_call);
        let t = fx.b.boolean(true);
        let if_stmt = fx.b.if_(t, [inner], None);
        let result = fx.result;
        fx.b.func("f", &[], result, [outer, if_stmt]);

        assert_eq!(fx.pass(), 2);
    }

    #[test]
    fn rule_bodies_and_for_clauses_are_not_lists() {
        let mut fx = fx();
        let sel = fx.b.name("k");
        let one = fx.b.int(1);
        let in_rule = fx.unwrap_call("a");
        let rule = fx.b.rule_expr([one], in_rule);
        let switch = fx.b.switch(sel, vec![rule]);

        let in_init = fx.unwrap_call("b");
        let init = fx.b.local("i", in_init);
        let for_stmt = fx.b.for_([init], None, [], []);

        let labeled_call = fx.unwrap_call("c");
        let decl = fx.b.local("z", labeled_call);
        let labeled = fx.b.labeled("l", decl);

        let result = fx.result;
        let int = fx.int;
        fx.b.func("f", &[("k", int)], result, [switch, for_stmt, labeled]);

        assert_eq!(fx.pass(), 0);
    }

    #[test]
    fn lambdas_in_headers_and_rule_bodies_are_lists() {
        let mut fx = fx();
        let result = fx.result;
        let init = fx.lambda_decl("g", "a");
        let for_stmt = fx.b.for_([init], None, [], []);
        let resource = fx.lambda_decl("r", "b");
        let try_stmt = fx.b.try_([resource], [], vec![], None);
        let in_rule = fx.lambda_decl("k", "c");
        let sel = fx.b.int(1);
        let one = fx.b.int(1);
        let rule = fx.b.rule_block([one], [in_rule]);
        let switch = fx.b.switch(sel, vec![rule]);
        fx.b.func("f", &[], result, [for_stmt, try_stmt, switch]);

        let catalog = Catalog::standard();
        let searcher = Searcher::new(&catalog, Symbol::new("unwrap"));
        let lists = BlockRewriter::new(&searcher).collect_lists(fx.b.unit_mut());
        assert_eq!(lists.len(), 4, "function body plus three lambda bodies");
        assert!(lists[1..].iter().all(|l| l.ambient == Some(result)));
        assert_eq!(fx.pass(), 3);
    }

    #[test]
    fn expression_lambda_becomes_block_lambda() {
        let mut fx = fx();
        let body = fx.unwrap_call("g");
        let result = fx.result;
        let lambda = fx.b.lambda_expr(&[], Some(result), body);
        let bind = fx.b.local("h", lambda);
        let void = fx.b.ty("void");
        fx.b.func("f", &[], void, [bind]);

        assert_eq!(fx.pass(), 1);
        let unit = fx.b.unit();
        let ExprKind::Lambda {
            body: LambdaBody::Block(block),
            ..
        } = unit.expr_kind(lambda)
        else {
            panic!("lambda should have a block body");
        };
        assert_eq!(unit.block(*block).stmts.len(), 4);
    }

    #[test]
    fn lambda_without_marker_is_untouched() {
        let mut fx = fx();
        let body = fx.b.call("g", []);
        let lambda = fx.b.lambda_expr(&[], None, body);
        let bind = fx.b.local("h", lambda);
        let void = fx.b.ty("void");
        fx.b.func("f", &[], void, [bind]);

        assert_eq!(fx.pass(), 0);
        assert!(matches!(
            fx.b.unit().expr_kind(lambda),
            ExprKind::Lambda {
                body: LambdaBody::Expr(_),
                ..
            }
        ));
    }
}
