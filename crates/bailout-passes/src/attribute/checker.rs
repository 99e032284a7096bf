//! Reference attributor.
//!
//! A small scoped type checker over the arena tree. It knows the unit's own
//! functions, host-registered extern signatures, and the cataloged
//! containers (their accessors and constructors). Members of any other named
//! type are typed `?` without complaint; the host owns those.

use std::collections::HashMap;

use bailout_core::{CompilationPhase, Diagnostic};
use bailout_tree::{
    BinaryOp, BlockRef, CaseBody, ExprKind, ExprRef, FuncRef, LambdaBody, Param, Span, StmtKind,
    StmtRef, Symbol, TypeData, TypeRef, UnaryOp, Unit,
};
use smallvec::SmallVec;
use tracing::trace;

use super::Reattribute;
use crate::catalog::{Catalog, ContainerKind};
use crate::config::DesugarConfig;

/// Type checker used by the pipeline and the tests.
#[derive(Clone, Debug)]
pub struct LocalAttributor {
    catalog: Catalog,
    marker: Symbol,
}

impl LocalAttributor {
    pub fn new(catalog: Catalog, marker: Symbol) -> Self {
        Self { catalog, marker }
    }

    pub fn from_config(config: &DesugarConfig) -> Self {
        Self::new(config.catalog.clone(), config.marker)
    }
}

impl Default for LocalAttributor {
    fn default() -> Self {
        Self::from_config(&DesugarConfig::default())
    }
}

impl Reattribute for LocalAttributor {
    fn reattribute(&mut self, unit: &mut Unit) -> Vec<Diagnostic> {
        let mut checker = Checker::new(&self.catalog, self.marker, unit);
        checker.run();
        trace!(errors = checker.diagnostics.len(), "attributed unit");
        checker.diagnostics
    }
}

/// How `return` statements in the current body are checked.
#[derive(Clone, Copy, Debug)]
enum ReturnCtx {
    Declared(TypeRef),
    /// Lambda without a declared return type; the first return decides.
    Inferred(Option<TypeRef>),
}

struct Checker<'a> {
    catalog: &'a Catalog,
    marker: Symbol,
    unit: &'a mut Unit,
    scopes: Vec<HashMap<Symbol, TypeRef>>,
    returns: Vec<ReturnCtx>,
    diagnostics: Vec<Diagnostic>,
    unknown: TypeRef,
    int: TypeRef,
    boolean: TypeRef,
    string: TypeRef,
    void: TypeRef,
}

impl<'a> Checker<'a> {
    fn new(catalog: &'a Catalog, marker: Symbol, unit: &'a mut Unit) -> Self {
        let unknown = unit.types.unknown();
        let int = unit.types.int();
        let boolean = unit.types.boolean();
        let string = unit.types.string();
        let void = unit.types.void();
        Self {
            catalog,
            marker,
            unit,
            scopes: Vec::new(),
            returns: Vec::new(),
            diagnostics: Vec::new(),
            unknown,
            int,
            boolean,
            string,
            void,
        }
    }

    fn run(&mut self) {
        let funcs: Vec<FuncRef> = self.unit.funcs().collect();
        for func in funcs {
            let data = self.unit.func(func).clone();
            self.scopes.clear();
            self.scopes.push(HashMap::new());
            for param in &data.params {
                self.define(param.name, param.ty, data.span);
            }
            self.returns.push(ReturnCtx::Declared(data.ret));
            self.block(data.body);
            self.returns.pop();
        }
    }

    // ========================================================================
    // Scopes and reporting
    // ========================================================================

    fn error(&mut self, span: Span, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::error(
            CompilationPhase::TypeChecking,
            span,
            message,
        ));
    }

    fn define(&mut self, name: Symbol, ty: TypeRef, span: Span) {
        if self.scopes.iter().any(|scope| scope.contains_key(&name)) {
            self.error(span, format!("variable `{name}` is already defined"));
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, ty);
        }
    }

    fn lookup(&self, name: Symbol) -> Option<TypeRef> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&name).copied())
    }

    fn expect(&mut self, actual: TypeRef, expected: TypeRef, span: Span) {
        if !self.unit.types.compatible(actual, expected) {
            let message = format!(
                "incompatible types: {} cannot be converted to {}",
                self.unit.types.display(actual),
                self.unit.types.display(expected)
            );
            self.error(span, message);
        }
    }

    fn display(&self, ty: TypeRef) -> String {
        self.unit.types.display(ty)
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn block(&mut self, block: BlockRef) {
        self.scopes.push(HashMap::new());
        let stmts = self.unit.block(block).stmts.clone();
        for stmt in stmts {
            self.stmt(stmt);
        }
        self.scopes.pop();
    }

    fn stmt(&mut self, stmt: StmtRef) {
        let span = self.unit.stmt_span(stmt);
        match self.unit.stmt_kind(stmt).clone() {
            StmtKind::Local { name, ty, init } => {
                let actual = init.map(|e| (self.expr(e), self.unit.expr_span(e)));
                let bound = match (ty, actual) {
                    (Some(declared), Some((actual, at))) => {
                        self.expect(actual, declared, at);
                        declared
                    }
                    (Some(declared), None) => declared,
                    (None, Some((actual, _))) => actual,
                    (None, None) => {
                        self.error(span, format!("cannot infer type for local variable `{name}`"));
                        self.unknown
                    }
                };
                self.define(name, bound, span);
            }
            StmtKind::Expr(e) | StmtKind::Throw(e) => {
                self.expr(e);
            }
            StmtKind::Assign { target, op, value } => {
                if !matches!(
                    self.unit.expr_kind(target),
                    ExprKind::Name(_) | ExprKind::Field { .. } | ExprKind::Index { .. }
                ) {
                    self.error(span, "unexpected assignment target");
                }
                let target_ty = self.expr(target);
                let value_ty = self.expr(value);
                let value_span = self.unit.expr_span(value);
                let result = match op {
                    Some(op) => self.binary(op, target_ty, value_ty, value_span),
                    None => value_ty,
                };
                self.expect(result, target_ty, value_span);
            }
            StmtKind::Return(value) => self.ret(value, span),
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                self.condition(cond);
                self.block(then_block);
                if let Some(else_block) = else_block {
                    self.block(else_block);
                }
            }
            StmtKind::While { cond, body } => {
                self.condition(cond);
                self.block(body);
            }
            StmtKind::DoWhile { body, cond } => {
                self.block(body);
                self.condition(cond);
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                self.scopes.push(HashMap::new());
                for s in init {
                    self.stmt(s);
                }
                if let Some(cond) = cond {
                    self.condition(cond);
                }
                for s in update {
                    self.stmt(s);
                }
                self.block(body);
                self.scopes.pop();
            }
            StmtKind::ForEach {
                var,
                var_ty,
                iterable,
                body,
            } => {
                let iter_ty = self.expr(iterable);
                let elem = match self.unit.types.get(iter_ty) {
                    TypeData::Array(elem) => *elem,
                    _ => self.unknown,
                };
                let bound = match var_ty {
                    Some(declared) => {
                        self.expect(elem, declared, span);
                        declared
                    }
                    None => elem,
                };
                self.scopes.push(HashMap::new());
                self.define(var, bound, span);
                self.block(body);
                self.scopes.pop();
            }
            StmtKind::Block(block) => self.block(block),
            StmtKind::Labeled { body, .. } => self.stmt(body),
            StmtKind::Try {
                resources,
                body,
                catches,
                finally,
            } => {
                self.scopes.push(HashMap::new());
                for s in resources {
                    self.stmt(s);
                }
                self.block(body);
                self.scopes.pop();
                for catch in catches {
                    self.scopes.push(HashMap::new());
                    self.define(catch.param, catch.ty, span);
                    self.block(catch.body);
                    self.scopes.pop();
                }
                if let Some(finally) = finally {
                    self.block(finally);
                }
            }
            StmtKind::Switch { selector, cases } => {
                let selector_ty = self.expr(selector);
                for case in cases {
                    for label in case.labels {
                        let label_ty = self.expr(label);
                        let at = self.unit.expr_span(label);
                        self.expect(label_ty, selector_ty, at);
                    }
                    match case.body {
                        CaseBody::Statements(block) | CaseBody::RuleBlock(block) => {
                            self.block(block)
                        }
                        CaseBody::RuleExpr(e) => {
                            self.expr(e);
                        }
                    }
                }
            }
            StmtKind::Synchronized { lock, body } => {
                self.expr(lock);
                self.block(body);
            }
            StmtKind::Assert { cond, detail } => {
                self.condition(cond);
                if let Some(detail) = detail {
                    self.expr(detail);
                }
            }
            StmtKind::Break(_) | StmtKind::Continue(_) => {}
        }
    }

    fn condition(&mut self, cond: ExprRef) {
        let ty = self.expr(cond);
        let span = self.unit.expr_span(cond);
        self.expect(ty, self.boolean, span);
    }

    fn ret(&mut self, value: Option<ExprRef>, span: Span) {
        let actual = value.map(|e| (self.expr(e), self.unit.expr_span(e)));
        match self.returns.last().copied() {
            Some(ReturnCtx::Declared(declared)) => {
                let is_void = declared == self.void;
                match actual {
                    Some((_, at)) if is_void => {
                        self.error(at, "incompatible types: unexpected return value")
                    }
                    Some((actual, at)) => self.expect(actual, declared, at),
                    None if !is_void => self.error(span, "missing return value"),
                    None => {}
                }
            }
            Some(ReturnCtx::Inferred(seen)) => {
                let (actual, at) = actual.unwrap_or((self.void, span));
                let merged = match seen {
                    None => actual,
                    Some(prev) if self.unit.types.compatible(prev, actual) => {
                        self.unit.types.unify(prev, actual)
                    }
                    Some(prev) => {
                        let message = format!(
                            "bad return type in lambda expression: {} cannot be converted to {}",
                            self.display(actual),
                            self.display(prev)
                        );
                        self.error(at, message);
                        prev
                    }
                };
                if let Some(ctx) = self.returns.last_mut() {
                    *ctx = ReturnCtx::Inferred(Some(merged));
                }
            }
            None => self.error(span, "return outside of a function body"),
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Type `e`, record the type on the node and return it.
    fn expr(&mut self, e: ExprRef) -> TypeRef {
        let ty = self.infer(e);
        self.unit.set_expr_ty(e, Some(ty));
        ty
    }

    fn infer(&mut self, e: ExprRef) -> TypeRef {
        let span = self.unit.expr_span(e);
        match self.unit.expr_kind(e).clone() {
            ExprKind::Name(name) => self.lookup(name).unwrap_or_else(|| {
                self.error(span, format!("cannot find symbol `{name}`"));
                self.unknown
            }),
            ExprKind::Int(_) => self.int,
            ExprKind::Bool(_) => self.boolean,
            ExprKind::Str(_) => self.string,
            ExprKind::Null => self.unknown,
            ExprKind::Call { callee, args } => self.call(callee, &args, span),
            ExprKind::StaticCall {
                owner,
                member,
                args,
            } => self.static_call(owner, member, &args, span),
            ExprKind::MethodCall {
                receiver,
                method,
                args,
            } => self.method_call(receiver, method, &args, span),
            ExprKind::Field { receiver, name } => {
                let receiver_ty = self.expr(receiver);
                match self.unit.types.get(receiver_ty) {
                    TypeData::Array(_) if name == "length" => self.int,
                    _ => self.unknown,
                }
            }
            ExprKind::Index { array, index } => {
                let array_ty = self.expr(array);
                let index_ty = self.expr(index);
                let index_span = self.unit.expr_span(index);
                self.expect(index_ty, self.int, index_span);
                match self.unit.types.get(array_ty).clone() {
                    TypeData::Array(elem) => elem,
                    TypeData::Unknown => self.unknown,
                    TypeData::Named { .. } => {
                        let message =
                            format!("array required, but {} found", self.display(array_ty));
                        self.error(span, message);
                        self.unknown
                    }
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.expr(lhs);
                let rhs = self.expr(rhs);
                self.binary(op, lhs, rhs, span)
            }
            ExprKind::Unary { op, operand } => {
                let ty = self.expr(operand);
                let expected = match op {
                    UnaryOp::Neg => self.int,
                    UnaryOp::Not => self.boolean,
                };
                self.expect(ty, expected, span);
                expected
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.condition(cond);
                let a = self.expr(then_expr);
                let b = self.expr(else_expr);
                if self.unit.types.compatible(a, b) {
                    self.unit.types.unify(a, b)
                } else {
                    let message = format!(
                        "incompatible types in conditional expression: {} and {}",
                        self.display(a),
                        self.display(b)
                    );
                    self.error(span, message);
                    self.unknown
                }
            }
            ExprKind::ArrayLit { elem, elems } => {
                for item in elems {
                    let ty = self.expr(item);
                    let at = self.unit.expr_span(item);
                    self.expect(ty, elem, at);
                }
                self.unit.types.array(elem)
            }
            ExprKind::Lambda { params, ret, body } => self.lambda(&params, ret, body, span),
        }
    }

    fn binary(&mut self, op: BinaryOp, lhs: TypeRef, rhs: TypeRef, span: Span) -> TypeRef {
        match op {
            BinaryOp::Add if lhs == self.string || rhs == self.string => self.string,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                self.expect(lhs, self.int, span);
                self.expect(rhs, self.int, span);
                self.int
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                if !self.unit.types.compatible(lhs, rhs) {
                    let message = format!(
                        "incomparable types: {} and {}",
                        self.display(lhs),
                        self.display(rhs)
                    );
                    self.error(span, message);
                }
                self.boolean
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                self.expect(lhs, self.int, span);
                self.expect(rhs, self.int, span);
                self.boolean
            }
            BinaryOp::And | BinaryOp::Or => {
                self.expect(lhs, self.boolean, span);
                self.expect(rhs, self.boolean, span);
                self.boolean
            }
        }
    }

    fn args(&mut self, args: &[ExprRef]) -> SmallVec<[(TypeRef, Span); 4]> {
        args.iter()
            .map(|&a| (self.expr(a), self.unit.expr_span(a)))
            .collect()
    }

    /// Free call: a local closure, a function of the unit, or an extern.
    fn call(&mut self, callee: Symbol, args: &[ExprRef], span: Span) -> TypeRef {
        let actual = self.args(args);
        let signature = if let Some(local) = self.lookup(callee) {
            self.closure_signature(local)
        } else if let Some(func) = self.unit.func_by_name(callee) {
            let data = self.unit.func(func);
            Some((data.params.iter().map(|p| p.ty).collect(), data.ret))
        } else {
            self.unit
                .extern_by_name(callee)
                .map(|sig| (sig.params.clone(), sig.ret))
        };
        let Some((params, ret)) = signature else {
            self.error(span, format!("cannot find symbol `{callee}`"));
            return self.unknown;
        };
        if params.len() != actual.len() {
            let message = format!(
                "`{callee}` expects {} argument(s) but {} were given",
                params.len(),
                actual.len()
            );
            self.error(span, message);
        } else {
            for ((ty, at), expected) in actual.into_iter().zip(params) {
                self.expect(ty, expected, at);
            }
        }
        ret
    }

    /// `Fn<P1, .., Pn, R>` as parameter types and result type.
    fn closure_signature(&self, ty: TypeRef) -> Option<(Vec<TypeRef>, TypeRef)> {
        match self.unit.types.get(ty) {
            TypeData::Named { name, args } if *name == "Fn" => {
                let (ret, params) = args.split_last()?;
                Some((params.to_vec(), *ret))
            }
            _ => None,
        }
    }

    /// Container constructor: `Owner.ctor(args)`.
    fn static_call(
        &mut self,
        owner: Symbol,
        member: Symbol,
        args: &[ExprRef],
        span: Span,
    ) -> TypeRef {
        let actual = self.args(args);
        let catalog = self.catalog;
        let Some(desc) = catalog.lookup_name(owner).map(|id| catalog.get(id)) else {
            self.error(span, format!("cannot find symbol `{owner}.{member}`"));
            return self.unknown;
        };
        let payload = actual.first().map_or(self.unknown, |(ty, _)| *ty);
        let u = self.unknown;
        let (arity, type_args): (usize, SmallVec<[TypeRef; 2]>) =
            match (member == desc.failure_ctor, member == desc.success_ctor, desc.kind()) {
                (true, _, ContainerKind::Carrying) => (1, [u, payload].into_iter().collect()),
                (true, _, ContainerKind::Presence) => (0, [u].into_iter().collect()),
                (_, true, ContainerKind::Carrying) => (1, [payload, u].into_iter().collect()),
                (_, true, ContainerKind::Presence) => (1, [payload].into_iter().collect()),
                (false, false, _) => {
                    self.error(span, format!("cannot find symbol `{owner}.{member}`"));
                    return self.unknown;
                }
            };
        if actual.len() != arity {
            let message = format!(
                "`{owner}.{member}` expects {arity} argument(s) but {} were given",
                actual.len()
            );
            self.error(span, message);
        }
        self.unit.types.named(owner, type_args)
    }

    /// Container accessors come from the catalog; anything else is the host's.
    fn method_call(
        &mut self,
        receiver: ExprRef,
        method: Symbol,
        args: &[ExprRef],
        span: Span,
    ) -> TypeRef {
        let receiver_ty = self.expr(receiver);
        let actual = self.args(args);
        let catalog = self.catalog;
        let Some(id) = catalog.lookup_type(&self.unit.types, receiver_ty) else {
            return match self.unit.types.get(receiver_ty) {
                TypeData::Named { name, .. } if *name == "String" && method == "length" => {
                    self.int
                }
                _ => self.unknown,
            };
        };
        let desc = catalog.get(id);
        let ty = if method == self.marker || method == desc.success_payload {
            self.unit.types.arg(receiver_ty, 0)
        } else if Some(method) == desc.failure_payload {
            self.unit.types.arg(receiver_ty, 1)
        } else if method == desc.failure_test {
            Some(self.boolean)
        } else {
            let message = format!(
                "cannot find symbol: method `{method}` in {}",
                self.display(receiver_ty)
            );
            self.error(span, message);
            return self.unknown;
        };
        if !actual.is_empty() {
            self.error(span, format!("`{method}` takes no arguments"));
        }
        ty.unwrap_or(self.unknown)
    }

    fn lambda(
        &mut self,
        params: &[Param],
        ret: Option<TypeRef>,
        body: LambdaBody,
        span: Span,
    ) -> TypeRef {
        self.scopes.push(HashMap::new());
        for param in params {
            self.define(param.name, param.ty, span);
        }
        let result = match body {
            LambdaBody::Expr(inner) => {
                let ty = self.expr(inner);
                match ret {
                    Some(declared) if declared == self.void => declared,
                    Some(declared) => {
                        let at = self.unit.expr_span(inner);
                        self.expect(ty, declared, at);
                        declared
                    }
                    None => ty,
                }
            }
            LambdaBody::Block(block) => {
                self.returns
                    .push(ret.map_or(ReturnCtx::Inferred(None), ReturnCtx::Declared));
                self.block(block);
                match self.returns.pop() {
                    Some(ReturnCtx::Declared(ty)) | Some(ReturnCtx::Inferred(Some(ty))) => ty,
                    _ => self.void,
                }
            }
        };
        self.scopes.pop();
        let signature: SmallVec<[TypeRef; 4]> = params
            .iter()
            .map(|p| p.ty)
            .chain(std::iter::once(result))
            .collect();
        self.unit.types.named(Symbol::new("Fn"), signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bailout_tree::Builder;

    fn attribute(unit: &mut Unit) -> Vec<Diagnostic> {
        LocalAttributor::default().reattribute(unit)
    }

    fn messages(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics.iter().map(|d| d.message.as_str()).collect()
    }

    #[test]
    fn types_marker_calls_from_the_catalog() {
        let mut b = Builder::new("attr");
        let int = b.ty("int");
        let string = b.ty("String");
        let result = b.generic("Result", [int, string]);
        b.extern_fn("fetch", &[], result);
        let recv = b.call("fetch", []);
        let call = b.unwrap(recv);
        let decl = b.local("x", call);
        let x = b.name("x");
        let ok = b.static_call("Result", "ok", [x]);
        let ret = b.ret(ok);
        b.func("f", &[], result, [decl, ret]);
        let mut unit = b.finish();

        assert!(attribute(&mut unit).is_empty());
        assert_eq!(unit.expr_ty(recv), Some(result));
        assert_eq!(unit.expr_ty(call), Some(int));
        assert_eq!(unit.types.display(unit.expr_ty(ok).unwrap()), "Result<int, ?>");
    }

    #[test]
    fn wrong_failure_payload_is_a_type_error() {
        let mut b = Builder::new("attr");
        let int = b.ty("int");
        let integer = b.ty("Integer");
        let result = b.generic("Result", [int, integer]);
        let msg = b.str("boom");
        let err = b.static_call("Result", "err", [msg]);
        let ret = b.ret(err);
        b.func("f", &[], result, [ret]);
        let mut unit = b.finish();

        let diagnostics = attribute(&mut unit);
        assert_eq!(
            messages(&diagnostics),
            ["incompatible types: Result<?, String> cannot be converted to Result<int, Integer>"]
        );
        assert_eq!(diagnostics[0].phase, CompilationPhase::TypeChecking);
    }

    #[test]
    fn constructor_arity_and_duplicate_locals() {
        let mut b = Builder::new("attr");
        let one = b.int(1);
        let none = b.static_call("Option", "none", [one]);
        let first = b.local("x", none);
        let two = b.int(2);
        let second = b.local("x", two);
        let ret = b.ret_void();
        let void = b.ty("void");
        b.func("f", &[], void, [first, second, ret]);
        let mut unit = b.finish();

        assert_eq!(
            messages(&attribute(&mut unit)),
            [
                "`Option.none` expects 0 argument(s) but 1 were given",
                "variable `x` is already defined",
            ]
        );
    }

    #[test]
    fn lambdas_get_function_types_and_can_be_called() {
        let mut b = Builder::new("attr");
        let int = b.ty("int");
        let y = b.name("y");
        let one = b.int(1);
        let body = b.binary(BinaryOp::Add, y, one);
        let lambda = b.lambda_expr(&[("y", int)], None, body);
        let bind = b.local("inc", lambda);
        let two = b.int(2);
        let call = b.call("inc", [two]);
        let ret = b.ret(call);
        b.func("f", &[], int, [bind, ret]);
        let mut unit = b.finish();

        assert!(attribute(&mut unit).is_empty());
        assert_eq!(unit.types.display(unit.expr_ty(lambda).unwrap()), "Fn<int, int>");
        assert_eq!(unit.expr_ty(call), Some(int));
    }

    #[test]
    fn reattribution_is_idempotent() {
        let mut b = Builder::new("attr");
        let int = b.ty("int");
        let arr = b.array_ty(int);
        let xs = b.name("xs");
        let zero = b.int(0);
        let elem = b.index(xs, zero);
        let ret = b.ret(elem);
        b.func("first", &[("xs", arr)], int, [ret]);
        let mut unit = b.finish();

        let mut attributor = LocalAttributor::default();
        assert!(attributor.reattribute(&mut unit).is_empty());
        let before = unit.expr_ty(elem);
        assert!(attributor.reattribute(&mut unit).is_empty());
        assert_eq!(unit.expr_ty(elem), before);
        assert_eq!(before, Some(int));
    }
}
