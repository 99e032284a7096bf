//! Programmatic construction of units.
//!
//! Hosts lower their own parsed trees through this API. Every node gets a
//! distinct synthetic span (a running offset) unless an explicit span is
//! set with [`Builder::at`], so diagnostics always point at one node.

use smallvec::SmallVec;

use crate::location::Span;
use crate::node::*;
use crate::refs::*;
use crate::symbol::Symbol;
use crate::unit::Unit;

pub struct Builder {
    unit: Unit,
    cursor: usize,
    pinned: Option<Span>,
}

impl Builder {
    pub fn new(name: &str) -> Self {
        Self {
            unit: Unit::new(Symbol::from_dynamic(name)),
            cursor: 0,
            pinned: None,
        }
    }

    /// Use `span` for every node created until the next call to `unpin`.
    pub fn at(&mut self, span: Span) -> &mut Self {
        self.pinned = Some(span);
        self
    }

    pub fn unpin(&mut self) -> &mut Self {
        self.pinned = None;
        self
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn unit_mut(&mut self) -> &mut Unit {
        &mut self.unit
    }

    pub fn finish(self) -> Unit {
        self.unit
    }

    fn next_span(&mut self) -> Span {
        if let Some(span) = self.pinned {
            return span;
        }
        let span = Span::new(self.cursor, self.cursor + 1);
        self.cursor += 1;
        span
    }

    fn expr(&mut self, kind: ExprKind) -> ExprRef {
        let span = self.next_span();
        self.unit.create_expr(kind, span)
    }

    fn stmt(&mut self, kind: StmtKind) -> StmtRef {
        let span = self.next_span();
        self.unit.create_stmt(kind, span)
    }

    // ========================================================================
    // Types
    // ========================================================================

    pub fn ty(&mut self, name: &str) -> TypeRef {
        self.unit.types.named(Symbol::from_dynamic(name), [])
    }

    pub fn generic(&mut self, name: &str, args: impl IntoIterator<Item = TypeRef>) -> TypeRef {
        self.unit.types.named(Symbol::from_dynamic(name), args)
    }

    pub fn array_ty(&mut self, elem: TypeRef) -> TypeRef {
        self.unit.types.array(elem)
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    pub fn name(&mut self, name: &str) -> ExprRef {
        self.expr(ExprKind::Name(Symbol::from_dynamic(name)))
    }

    pub fn int(&mut self, value: i64) -> ExprRef {
        self.expr(ExprKind::Int(value))
    }

    pub fn boolean(&mut self, value: bool) -> ExprRef {
        self.expr(ExprKind::Bool(value))
    }

    pub fn str(&mut self, value: &str) -> ExprRef {
        self.expr(ExprKind::Str(value.to_owned()))
    }

    pub fn null(&mut self) -> ExprRef {
        self.expr(ExprKind::Null)
    }

    pub fn call(&mut self, callee: &str, args: impl IntoIterator<Item = ExprRef>) -> ExprRef {
        self.expr(ExprKind::Call {
            callee: Symbol::from_dynamic(callee),
            args: args.into_iter().collect(),
        })
    }

    pub fn static_call(
        &mut self,
        owner: &str,
        member: &str,
        args: impl IntoIterator<Item = ExprRef>,
    ) -> ExprRef {
        self.expr(ExprKind::StaticCall {
            owner: Symbol::from_dynamic(owner),
            member: Symbol::from_dynamic(member),
            args: args.into_iter().collect(),
        })
    }

    pub fn method(
        &mut self,
        receiver: ExprRef,
        method: &str,
        args: impl IntoIterator<Item = ExprRef>,
    ) -> ExprRef {
        self.expr(ExprKind::MethodCall {
            receiver,
            method: Symbol::from_dynamic(method),
            args: args.into_iter().collect(),
        })
    }

    /// `receiver.unwrap()`
    pub fn unwrap(&mut self, receiver: ExprRef) -> ExprRef {
        self.method(receiver, "unwrap", [])
    }

    pub fn field(&mut self, receiver: ExprRef, name: &str) -> ExprRef {
        self.expr(ExprKind::Field {
            receiver,
            name: Symbol::from_dynamic(name),
        })
    }

    pub fn index(&mut self, array: ExprRef, index: ExprRef) -> ExprRef {
        self.expr(ExprKind::Index { array, index })
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: ExprRef, rhs: ExprRef) -> ExprRef {
        self.expr(ExprKind::Binary { op, lhs, rhs })
    }

    pub fn unary(&mut self, op: UnaryOp, operand: ExprRef) -> ExprRef {
        self.expr(ExprKind::Unary { op, operand })
    }

    pub fn conditional(&mut self, cond: ExprRef, then_expr: ExprRef, else_expr: ExprRef) -> ExprRef {
        self.expr(ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        })
    }

    pub fn array_lit(&mut self, elem: TypeRef, elems: impl IntoIterator<Item = ExprRef>) -> ExprRef {
        self.expr(ExprKind::ArrayLit {
            elem,
            elems: elems.into_iter().collect(),
        })
    }

    /// Lambda with a single-expression body.
    pub fn lambda_expr(
        &mut self,
        params: &[(&str, TypeRef)],
        ret: Option<TypeRef>,
        body: ExprRef,
    ) -> ExprRef {
        let params = Self::params(params);
        self.expr(ExprKind::Lambda {
            params,
            ret,
            body: LambdaBody::Expr(body),
        })
    }

    /// Lambda with a block body.
    pub fn lambda_block(
        &mut self,
        params: &[(&str, TypeRef)],
        ret: Option<TypeRef>,
        body: impl IntoIterator<Item = StmtRef>,
    ) -> ExprRef {
        let params = Self::params(params);
        let body = self.block(body);
        self.expr(ExprKind::Lambda {
            params,
            ret,
            body: LambdaBody::Block(body),
        })
    }

    fn params(params: &[(&str, TypeRef)]) -> Vec<Param> {
        params
            .iter()
            .map(|(name, ty)| Param {
                name: Symbol::from_dynamic(name),
                ty: *ty,
            })
            .collect()
    }

    // ========================================================================
    // Statements
    // ========================================================================

    pub fn block(&mut self, stmts: impl IntoIterator<Item = StmtRef>) -> BlockRef {
        self.unit.create_block(stmts)
    }

    /// `var name = init;`
    pub fn local(&mut self, name: &str, init: ExprRef) -> StmtRef {
        self.stmt(StmtKind::Local {
            name: Symbol::from_dynamic(name),
            ty: None,
            init: Some(init),
        })
    }

    /// `T name = init;` or `T name;`
    pub fn local_typed(&mut self, name: &str, ty: TypeRef, init: Option<ExprRef>) -> StmtRef {
        self.stmt(StmtKind::Local {
            name: Symbol::from_dynamic(name),
            ty: Some(ty),
            init,
        })
    }

    pub fn expr_stmt(&mut self, expr: ExprRef) -> StmtRef {
        self.stmt(StmtKind::Expr(expr))
    }

    pub fn assign(&mut self, target: ExprRef, value: ExprRef) -> StmtRef {
        self.stmt(StmtKind::Assign {
            target,
            op: None,
            value,
        })
    }

    pub fn compound_assign(&mut self, target: ExprRef, op: BinaryOp, value: ExprRef) -> StmtRef {
        self.stmt(StmtKind::Assign {
            target,
            op: Some(op),
            value,
        })
    }

    pub fn ret(&mut self, value: ExprRef) -> StmtRef {
        self.stmt(StmtKind::Return(Some(value)))
    }

    pub fn ret_void(&mut self) -> StmtRef {
        self.stmt(StmtKind::Return(None))
    }

    pub fn throw(&mut self, value: ExprRef) -> StmtRef {
        self.stmt(StmtKind::Throw(value))
    }

    pub fn if_(
        &mut self,
        cond: ExprRef,
        then_stmts: impl IntoIterator<Item = StmtRef>,
        else_stmts: Option<Vec<StmtRef>>,
    ) -> StmtRef {
        let then_block = self.block(then_stmts);
        let else_block = else_stmts.map(|stmts| self.block(stmts));
        self.stmt(StmtKind::If {
            cond,
            then_block,
            else_block,
        })
    }

    pub fn while_(&mut self, cond: ExprRef, body: impl IntoIterator<Item = StmtRef>) -> StmtRef {
        let body = self.block(body);
        self.stmt(StmtKind::While { cond, body })
    }

    pub fn do_while(&mut self, body: impl IntoIterator<Item = StmtRef>, cond: ExprRef) -> StmtRef {
        let body = self.block(body);
        self.stmt(StmtKind::DoWhile { body, cond })
    }

    pub fn for_(
        &mut self,
        init: impl IntoIterator<Item = StmtRef>,
        cond: Option<ExprRef>,
        update: impl IntoIterator<Item = StmtRef>,
        body: impl IntoIterator<Item = StmtRef>,
    ) -> StmtRef {
        let init: SmallVec<[StmtRef; 2]> = init.into_iter().collect();
        let update: SmallVec<[StmtRef; 2]> = update.into_iter().collect();
        let body = self.block(body);
        self.stmt(StmtKind::For {
            init,
            cond,
            update,
            body,
        })
    }

    pub fn for_each(
        &mut self,
        var: &str,
        iterable: ExprRef,
        body: impl IntoIterator<Item = StmtRef>,
    ) -> StmtRef {
        let body = self.block(body);
        self.stmt(StmtKind::ForEach {
            var: Symbol::from_dynamic(var),
            var_ty: None,
            iterable,
            body,
        })
    }

    pub fn block_stmt(&mut self, stmts: impl IntoIterator<Item = StmtRef>) -> StmtRef {
        let block = self.block(stmts);
        self.stmt(StmtKind::Block(block))
    }

    pub fn labeled(&mut self, label: &str, body: StmtRef) -> StmtRef {
        self.stmt(StmtKind::Labeled {
            label: Symbol::from_dynamic(label),
            body,
        })
    }

    pub fn try_(
        &mut self,
        resources: impl IntoIterator<Item = StmtRef>,
        body: impl IntoIterator<Item = StmtRef>,
        catches: Vec<(&str, TypeRef, Vec<StmtRef>)>,
        finally: Option<Vec<StmtRef>>,
    ) -> StmtRef {
        let resources: SmallVec<[StmtRef; 2]> = resources.into_iter().collect();
        let body = self.block(body);
        let catches = catches
            .into_iter()
            .map(|(param, ty, stmts)| CatchClause {
                param: Symbol::from_dynamic(param),
                ty,
                body: self.block(stmts),
            })
            .collect();
        let finally = finally.map(|stmts| self.block(stmts));
        self.stmt(StmtKind::Try {
            resources,
            body,
            catches,
            finally,
        })
    }

    /// Statement-form case: `case labels: stmts`.
    pub fn case(
        &mut self,
        labels: impl IntoIterator<Item = ExprRef>,
        stmts: impl IntoIterator<Item = StmtRef>,
    ) -> SwitchCase {
        SwitchCase {
            labels: labels.into_iter().collect(),
            body: CaseBody::Statements(self.block(stmts)),
        }
    }

    /// Rule-form case with a single expression: `case labels -> expr;`.
    pub fn rule_expr(&mut self, labels: impl IntoIterator<Item = ExprRef>, expr: ExprRef) -> SwitchCase {
        SwitchCase {
            labels: labels.into_iter().collect(),
            body: CaseBody::RuleExpr(expr),
        }
    }

    /// Rule-form case with a block: `case labels -> { stmts }`.
    pub fn rule_block(
        &mut self,
        labels: impl IntoIterator<Item = ExprRef>,
        stmts: impl IntoIterator<Item = StmtRef>,
    ) -> SwitchCase {
        SwitchCase {
            labels: labels.into_iter().collect(),
            body: CaseBody::RuleBlock(self.block(stmts)),
        }
    }

    pub fn switch(&mut self, selector: ExprRef, cases: Vec<SwitchCase>) -> StmtRef {
        self.stmt(StmtKind::Switch { selector, cases })
    }

    pub fn synchronized(&mut self, lock: ExprRef, body: impl IntoIterator<Item = StmtRef>) -> StmtRef {
        let body = self.block(body);
        self.stmt(StmtKind::Synchronized { lock, body })
    }

    pub fn assert_(&mut self, cond: ExprRef, detail: Option<ExprRef>) -> StmtRef {
        self.stmt(StmtKind::Assert { cond, detail })
    }

    pub fn break_(&mut self, label: Option<&str>) -> StmtRef {
        self.stmt(StmtKind::Break(label.map(Symbol::from_dynamic)))
    }

    pub fn continue_(&mut self, label: Option<&str>) -> StmtRef {
        self.stmt(StmtKind::Continue(label.map(Symbol::from_dynamic)))
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    pub fn func(
        &mut self,
        name: &str,
        params: &[(&str, TypeRef)],
        ret: TypeRef,
        body: impl IntoIterator<Item = StmtRef>,
    ) -> FuncRef {
        let body = self.block(body);
        let span = self.next_span();
        let params = Self::params(params);
        self.unit.add_func(FuncData {
            name: Symbol::from_dynamic(name),
            params,
            ret,
            body,
            span,
        })
    }

    pub fn extern_fn(&mut self, name: &str, params: &[TypeRef], ret: TypeRef) {
        self.unit.declare_extern(ExternSig {
            name: Symbol::from_dynamic(name),
            params: params.to_vec(),
            ret,
        });
    }
}
