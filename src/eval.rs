//! Tree-walking evaluator for units.
//!
//! Runs functions of a (desugared or original) unit so tests can check
//! runtime behavior: which branch was taken, how often a host function was
//! called, and in what order. Containers are tagged values whose accessors
//! and constructors come from the catalog. Host functions are registered as
//! Rust closures and every call is logged.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use bailout_passes::{Catalog, ContainerDescriptor, DesugarConfig};
use bailout_tree::{
    BinaryOp, BlockRef, CaseBody, ExprKind, ExprRef, LambdaBody, StmtKind, StmtRef, Symbol,
    UnaryOp, Unit,
};
use derive_more::{Display, Error};
use tracing::trace;

#[derive(Clone, Debug)]
pub enum Value {
    Void,
    Int(i64),
    Bool(bool),
    Str(Rc<str>),
    Null,
    Array(Rc<RefCell<Vec<Value>>>),
    Container(Rc<Container>),
    Closure(Rc<Closure>),
}

/// A value of a cataloged container type.
#[derive(Clone, Debug, PartialEq)]
pub struct Container {
    pub owner: Symbol,
    pub ctor: Symbol,
    pub failed: bool,
    pub payload: Option<Value>,
}

#[derive(Debug)]
pub struct Closure {
    params: Vec<Symbol>,
    body: LambdaBody,
    captured: HashMap<Symbol, Value>,
}

impl Value {
    pub fn str(text: &str) -> Self {
        Value::Str(Rc::from(text))
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    /// `Owner.<success-ctor>(value)`
    pub fn success(desc: &ContainerDescriptor, value: Value) -> Self {
        Value::Container(Rc::new(Container {
            owner: desc.type_name,
            ctor: desc.success_ctor,
            failed: false,
            payload: Some(value),
        }))
    }

    /// `Owner.<failure-ctor>(payload?)`
    pub fn failure(desc: &ContainerDescriptor, payload: Option<Value>) -> Self {
        Value::Container(Rc::new(Container {
            owner: desc.type_name,
            ctor: desc.failure_ctor,
            failed: true,
            payload,
        }))
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Int(_) => "int",
            Value::Bool(_) => "boolean",
            Value::Str(_) => "String",
            Value::Null => "null",
            Value::Array(_) => "array",
            Value::Container(_) => "container",
            Value::Closure(_) => "lambda",
        }
    }
}

/// Structural equality; closures compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) | (Value::Null, Value::Null) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => *a.borrow() == *b.borrow(),
            (Value::Container(a), Value::Container(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => f.write_str("void"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Null => f.write_str("null"),
            Value::Array(items) => {
                let items: Vec<String> = items.borrow().iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Container(c) => match &c.payload {
                Some(payload) => write!(f, "{}.{}({payload})", c.owner, c.ctor),
                None => write!(f, "{}.{}()", c.owner, c.ctor),
            },
            Value::Closure(_) => f.write_str("<lambda>"),
        }
    }
}

#[derive(Clone, Debug, Display, Error, PartialEq)]
pub enum EvalError {
    #[display("unknown function `{_0}`")]
    UnknownFunction(#[error(not(source))] Symbol),

    #[display("cannot find symbol `{_0}`")]
    UnboundName(#[error(not(source))] Symbol),

    #[display("no member `{member}` on {owner}")]
    UnknownMember { owner: Symbol, member: Symbol },

    #[display("`{_0}` called on a failed container")]
    FailedAccess(#[error(not(source))] Symbol),

    #[display("wrong number of arguments to `{_0}`")]
    Arity(#[error(not(source))] Symbol),

    #[display("expected {expected}, found {found}")]
    Type {
        expected: &'static str,
        found: &'static str,
    },

    #[display("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[display("division by zero")]
    DivisionByZero,

    #[display("assertion failed")]
    AssertionFailed,

    #[display("uncaught exception: {_0}")]
    Thrown(#[error(not(source))] Value),
}

type HostFn = Box<dyn FnMut(&[Value]) -> Value>;

/// How a statement finished.
#[derive(Debug)]
enum Flow {
    Normal,
    Return(Value),
    Break(Option<Symbol>),
    Continue(Option<Symbol>),
}

enum LoopStep {
    Next,
    Exit,
    Propagate(Flow),
}

fn loop_step(flow: Flow, label: Option<Symbol>) -> LoopStep {
    match flow {
        Flow::Normal | Flow::Continue(None) => LoopStep::Next,
        Flow::Continue(Some(l)) if Some(l) == label => LoopStep::Next,
        Flow::Break(None) => LoopStep::Exit,
        Flow::Break(Some(l)) if Some(l) == label => LoopStep::Exit,
        other => LoopStep::Propagate(other),
    }
}

#[derive(Default)]
struct Environment {
    scopes: Vec<HashMap<Symbol, Value>>,
}

impl Environment {
    fn with_bindings(bindings: HashMap<Symbol, Value>) -> Self {
        Environment {
            scopes: vec![bindings],
        }
    }

    fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop(&mut self) {
        self.scopes.pop();
    }

    fn bind(&mut self, name: Symbol, value: Value) {
        if self.scopes.is_empty() {
            self.push();
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, value);
        }
    }

    fn lookup(&self, name: Symbol) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(&name))
    }

    fn assign(&mut self, name: Symbol, value: Value) -> Result<(), EvalError> {
        let slot = self
            .scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(&name))
            .ok_or(EvalError::UnboundName(name))?;
        *slot = value;
        Ok(())
    }

    /// Flatten visible bindings for a closure.
    fn capture(&self) -> HashMap<Symbol, Value> {
        let mut out = HashMap::new();
        for scope in &self.scopes {
            out.extend(scope.iter().map(|(k, v)| (*k, v.clone())));
        }
        out
    }
}

/// Assignable location.
enum Place {
    Local(Symbol),
    Element(Rc<RefCell<Vec<Value>>>, usize),
}

pub struct Interpreter<'u> {
    unit: &'u Unit,
    catalog: Catalog,
    marker: Symbol,
    host: HashMap<Symbol, HostFn>,
    calls: Vec<Symbol>,
}

impl<'u> Interpreter<'u> {
    pub fn new(unit: &'u Unit, config: &DesugarConfig) -> Self {
        Self {
            unit,
            catalog: config.catalog.clone(),
            marker: config.marker,
            host: HashMap::new(),
            calls: Vec::new(),
        }
    }

    /// Register a host function under `name`.
    pub fn register(&mut self, name: &str, f: impl FnMut(&[Value]) -> Value + 'static) {
        self.host.insert(Symbol::from_dynamic(name), Box::new(f));
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> &[Symbol] {
        &self.calls
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.iter().filter(|c| **c == *name).count()
    }

    /// Call a function of the unit by name.
    pub fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        self.call_named(Symbol::from_dynamic(name), args)
    }

    fn call_named(&mut self, name: Symbol, args: Vec<Value>) -> Result<Value, EvalError> {
        self.calls.push(name);
        trace!(%name, "call");
        let unit = self.unit;
        if let Some(func) = unit.func_by_name(name) {
            let data = unit.func(func);
            if data.params.len() != args.len() {
                return Err(EvalError::Arity(name));
            }
            let bindings = data.params.iter().map(|p| p.name).zip(args).collect();
            let mut env = Environment::with_bindings(bindings);
            return match self.exec_block(&mut env, data.body)? {
                Flow::Return(value) => Ok(value),
                _ => Ok(Value::Void),
            };
        }
        let host = self
            .host
            .get_mut(&name)
            .ok_or(EvalError::UnknownFunction(name))?;
        Ok(host(&args))
    }

    fn call_closure(&mut self, closure: &Closure, args: Vec<Value>) -> Result<Value, EvalError> {
        let mut env = Environment::with_bindings(closure.captured.clone());
        env.push();
        for (param, arg) in closure.params.iter().zip(args) {
            env.bind(*param, arg);
        }
        match closure.body {
            LambdaBody::Expr(e) => self.eval(&mut env, e),
            LambdaBody::Block(block) => match self.exec_block(&mut env, block)? {
                Flow::Return(value) => Ok(value),
                _ => Ok(Value::Void),
            },
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn exec_block(&mut self, env: &mut Environment, block: BlockRef) -> Result<Flow, EvalError> {
        let unit = self.unit;
        env.push();
        let result = self.exec_stmts(env, &unit.block(block).stmts);
        env.pop();
        result
    }

    fn exec_stmts(&mut self, env: &mut Environment, stmts: &[StmtRef]) -> Result<Flow, EvalError> {
        for &stmt in stmts {
            let flow = self.exec(env, stmt, None)?;
            if !matches!(flow, Flow::Normal) {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(
        &mut self,
        env: &mut Environment,
        stmt: StmtRef,
        label: Option<Symbol>,
    ) -> Result<Flow, EvalError> {
        let unit = self.unit;
        match unit.stmt_kind(stmt) {
            StmtKind::Local { name, init, .. } => {
                let value = match init {
                    Some(init) => self.eval(env, *init)?,
                    None => Value::Null,
                };
                env.bind(*name, value);
            }
            StmtKind::Expr(e) => {
                self.eval(env, *e)?;
            }
            StmtKind::Assign { target, op, value } => {
                let place = self.place(env, *target)?;
                let rhs = self.eval(env, *value)?;
                let new = match op {
                    Some(op) => {
                        let current = self.read(env, &place)?;
                        binary(*op, current, rhs)?
                    }
                    None => rhs,
                };
                self.write(env, place, new)?;
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(value) => self.eval(env, *value)?,
                    None => Value::Void,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::Throw(e) => {
                let value = self.eval(env, *e)?;
                return Err(EvalError::Thrown(value));
            }
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                if self.eval_bool(env, *cond)? {
                    return self.exec_block(env, *then_block);
                } else if let Some(else_block) = else_block {
                    return self.exec_block(env, *else_block);
                }
            }
            StmtKind::While { cond, body } => {
                while self.eval_bool(env, *cond)? {
                    match loop_step(self.exec_block(env, *body)?, label) {
                        LoopStep::Next => {}
                        LoopStep::Exit => break,
                        LoopStep::Propagate(flow) => return Ok(flow),
                    }
                }
            }
            StmtKind::DoWhile { body, cond } => loop {
                match loop_step(self.exec_block(env, *body)?, label) {
                    LoopStep::Next => {}
                    LoopStep::Exit => break,
                    LoopStep::Propagate(flow) => return Ok(flow),
                }
                if !self.eval_bool(env, *cond)? {
                    break;
                }
            },
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                env.push();
                let result = self.exec_for(env, init, *cond, update, *body, label);
                env.pop();
                return result;
            }
            StmtKind::ForEach {
                var,
                iterable,
                body,
                ..
            } => {
                let items = match self.eval(env, *iterable)? {
                    Value::Array(items) => items.borrow().clone(),
                    other => {
                        return Err(EvalError::Type {
                            expected: "array",
                            found: other.kind_name(),
                        });
                    }
                };
                for item in items {
                    env.push();
                    env.bind(*var, item);
                    let flow = self.exec_block(env, *body);
                    env.pop();
                    match loop_step(flow?, label) {
                        LoopStep::Next => {}
                        LoopStep::Exit => break,
                        LoopStep::Propagate(flow) => return Ok(flow),
                    }
                }
            }
            StmtKind::Block(block) => return self.exec_block(env, *block),
            StmtKind::Labeled { label, body } => {
                return match self.exec(env, *body, Some(*label))? {
                    Flow::Break(Some(l)) if l == *label => Ok(Flow::Normal),
                    flow => Ok(flow),
                };
            }
            StmtKind::Try {
                resources,
                body,
                catches,
                finally,
            } => {
                let depth = env.scopes.len();
                env.push();
                let mut result = self.exec_stmts(env, resources);
                if let Ok(Flow::Normal) = result {
                    result = self.exec_block(env, *body);
                }
                env.scopes.truncate(depth);
                let caught = match (&result, catches.first()) {
                    (Err(EvalError::Thrown(thrown)), Some(catch)) => Some((thrown.clone(), catch)),
                    _ => None,
                };
                if let Some((thrown, catch)) = caught {
                    env.push();
                    env.bind(catch.param, thrown);
                    result = self.exec_block(env, catch.body);
                    env.scopes.truncate(depth);
                }
                if let Some(finally) = finally {
                    let flow = self.exec_block(env, *finally)?;
                    if !matches!(flow, Flow::Normal) {
                        return Ok(flow);
                    }
                }
                return result;
            }
            StmtKind::Switch { selector, cases } => {
                let value = self.eval(env, *selector)?;
                let mut chosen = None;
                'cases: for (idx, case) in cases.iter().enumerate() {
                    for &label_expr in &case.labels {
                        if self.eval(env, label_expr)? == value {
                            chosen = Some(idx);
                            break 'cases;
                        }
                    }
                }
                let chosen = chosen.or_else(|| cases.iter().position(|c| c.labels.is_empty()));
                let Some(start) = chosen else {
                    return Ok(Flow::Normal);
                };
                for case in &cases[start..] {
                    let flow = match case.body {
                        CaseBody::Statements(block) => self.exec_block(env, block)?,
                        CaseBody::RuleExpr(e) => {
                            self.eval(env, e)?;
                            Flow::Break(None)
                        }
                        CaseBody::RuleBlock(block) => match self.exec_block(env, block)? {
                            Flow::Normal => Flow::Break(None),
                            flow => flow,
                        },
                    };
                    match flow {
                        Flow::Normal => {}
                        Flow::Break(None) => break,
                        flow => return Ok(flow),
                    }
                }
            }
            StmtKind::Synchronized { lock, body } => {
                self.eval(env, *lock)?;
                return self.exec_block(env, *body);
            }
            StmtKind::Assert { cond, .. } => {
                if !self.eval_bool(env, *cond)? {
                    return Err(EvalError::AssertionFailed);
                }
            }
            StmtKind::Break(label) => return Ok(Flow::Break(*label)),
            StmtKind::Continue(label) => return Ok(Flow::Continue(*label)),
        }
        Ok(Flow::Normal)
    }

    fn exec_for(
        &mut self,
        env: &mut Environment,
        init: &[StmtRef],
        cond: Option<ExprRef>,
        update: &[StmtRef],
        body: BlockRef,
        label: Option<Symbol>,
    ) -> Result<Flow, EvalError> {
        self.exec_stmts(env, init)?;
        loop {
            if let Some(cond) = cond {
                if !self.eval_bool(env, cond)? {
                    break;
                }
            }
            match loop_step(self.exec_block(env, body)?, label) {
                LoopStep::Next => {}
                LoopStep::Exit => break,
                LoopStep::Propagate(flow) => return Ok(flow),
            }
            self.exec_stmts(env, update)?;
        }
        Ok(Flow::Normal)
    }

    fn place(&mut self, env: &mut Environment, target: ExprRef) -> Result<Place, EvalError> {
        let unit = self.unit;
        match unit.expr_kind(target) {
            ExprKind::Name(name) => Ok(Place::Local(*name)),
            ExprKind::Index { array, index } => {
                let array = self.eval(env, *array)?;
                let index = self.eval(env, *index)?;
                match (array, index) {
                    (Value::Array(items), Value::Int(i)) => {
                        let len = items.borrow().len();
                        let slot = usize::try_from(i)
                            .ok()
                            .filter(|&slot| slot < len)
                            .ok_or(EvalError::IndexOutOfBounds { index: i, len })?;
                        Ok(Place::Element(items, slot))
                    }
                    (other, _) => Err(EvalError::Type {
                        expected: "array",
                        found: other.kind_name(),
                    }),
                }
            }
            _ => Err(EvalError::Type {
                expected: "assignable location",
                found: "expression",
            }),
        }
    }

    fn read(&self, env: &Environment, place: &Place) -> Result<Value, EvalError> {
        match place {
            Place::Local(name) => env
                .lookup(*name)
                .cloned()
                .ok_or(EvalError::UnboundName(*name)),
            Place::Element(items, slot) => Ok(items.borrow()[*slot].clone()),
        }
    }

    fn write(&self, env: &mut Environment, place: Place, value: Value) -> Result<(), EvalError> {
        match place {
            Place::Local(name) => env.assign(name, value),
            Place::Element(items, slot) => {
                items.borrow_mut()[slot] = value;
                Ok(())
            }
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn eval_bool(&mut self, env: &mut Environment, e: ExprRef) -> Result<bool, EvalError> {
        match self.eval(env, e)? {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::Type {
                expected: "boolean",
                found: other.kind_name(),
            }),
        }
    }

    fn eval_args(
        &mut self,
        env: &mut Environment,
        args: &[ExprRef],
    ) -> Result<Vec<Value>, EvalError> {
        args.iter().map(|&a| self.eval(env, a)).collect()
    }

    fn eval(&mut self, env: &mut Environment, e: ExprRef) -> Result<Value, EvalError> {
        let unit = self.unit;
        Ok(match unit.expr_kind(e) {
            ExprKind::Name(name) => env
                .lookup(*name)
                .cloned()
                .ok_or(EvalError::UnboundName(*name))?,
            ExprKind::Int(n) => Value::Int(*n),
            ExprKind::Bool(b) => Value::Bool(*b),
            ExprKind::Str(s) => Value::str(s),
            ExprKind::Null => Value::Null,
            ExprKind::Call { callee, args } => {
                let args = self.eval_args(env, args)?;
                if let Some(Value::Closure(closure)) = env.lookup(*callee).cloned() {
                    self.calls.push(*callee);
                    self.call_closure(&closure, args)?
                } else {
                    self.call_named(*callee, args)?
                }
            }
            ExprKind::StaticCall {
                owner,
                member,
                args,
            } => {
                let args = self.eval_args(env, args)?;
                self.construct(*owner, *member, args)?
            }
            ExprKind::MethodCall {
                receiver,
                method,
                args,
            } => {
                let receiver = self.eval(env, *receiver)?;
                self.eval_args(env, args)?;
                self.method(receiver, *method)?
            }
            ExprKind::Field { receiver, name } => match self.eval(env, *receiver)? {
                Value::Array(items) if *name == "length" => Value::Int(items.borrow().len() as i64),
                other => {
                    return Err(EvalError::UnknownMember {
                        owner: Symbol::new(other.kind_name()),
                        member: *name,
                    });
                }
            },
            ExprKind::Index { array, index } => {
                let array = self.eval(env, *array)?;
                let index = self.eval(env, *index)?;
                match (array, index) {
                    (Value::Array(items), Value::Int(i)) => {
                        let items = items.borrow();
                        usize::try_from(i)
                            .ok()
                            .and_then(|slot| items.get(slot))
                            .cloned()
                            .ok_or(EvalError::IndexOutOfBounds {
                                index: i,
                                len: items.len(),
                            })?
                    }
                    (other, _) => {
                        return Err(EvalError::Type {
                            expected: "array",
                            found: other.kind_name(),
                        });
                    }
                }
            }
            ExprKind::Binary { op, lhs, rhs } if op.is_short_circuit() => {
                let lhs = self.eval_bool(env, *lhs)?;
                let value = match op {
                    BinaryOp::And if !lhs => false,
                    BinaryOp::Or if lhs => true,
                    _ => self.eval_bool(env, *rhs)?,
                };
                Value::Bool(value)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.eval(env, *lhs)?;
                let rhs = self.eval(env, *rhs)?;
                binary(*op, lhs, rhs)?
            }
            ExprKind::Unary { op, operand } => match (op, self.eval(env, *operand)?) {
                (UnaryOp::Neg, Value::Int(n)) => Value::Int(n.wrapping_neg()),
                (UnaryOp::Not, Value::Bool(b)) => Value::Bool(!b),
                (UnaryOp::Neg, other) => {
                    return Err(EvalError::Type {
                        expected: "int",
                        found: other.kind_name(),
                    });
                }
                (UnaryOp::Not, other) => {
                    return Err(EvalError::Type {
                        expected: "boolean",
                        found: other.kind_name(),
                    });
                }
            },
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                if self.eval_bool(env, *cond)? {
                    self.eval(env, *then_expr)?
                } else {
                    self.eval(env, *else_expr)?
                }
            }
            ExprKind::ArrayLit { elems, .. } => Value::array(self.eval_args(env, elems)?),
            ExprKind::Lambda { params, body, .. } => Value::Closure(Rc::new(Closure {
                params: params.iter().map(|p| p.name).collect(),
                body: *body,
                captured: env.capture(),
            })),
        })
    }

    fn construct(
        &self,
        owner: Symbol,
        member: Symbol,
        args: Vec<Value>,
    ) -> Result<Value, EvalError> {
        let unknown = EvalError::UnknownMember { owner, member };
        let Some(id) = self.catalog.lookup_name(owner) else {
            return Err(unknown);
        };
        let desc = self.catalog.get(id);
        let payload = args.into_iter().next();
        if member == desc.success_ctor {
            Ok(Value::success(desc, payload.unwrap_or(Value::Null)))
        } else if member == desc.failure_ctor {
            Ok(Value::failure(desc, payload))
        } else {
            Err(unknown)
        }
    }

    fn method(&self, receiver: Value, method: Symbol) -> Result<Value, EvalError> {
        let container = match receiver {
            Value::Container(c) => c,
            Value::Str(s) if method == "length" => return Ok(Value::Int(s.chars().count() as i64)),
            other => {
                return Err(EvalError::UnknownMember {
                    owner: Symbol::new(other.kind_name()),
                    member: method,
                });
            }
        };
        let desc = self
            .catalog
            .lookup_name(container.owner)
            .map(|id| self.catalog.get(id))
            .ok_or(EvalError::UnknownMember {
                owner: container.owner,
                member: method,
            })?;
        if method == desc.failure_test {
            return Ok(Value::Bool(container.failed));
        }
        let wants_failure = if method == self.marker || method == desc.success_payload {
            false
        } else if Some(method) == desc.failure_payload {
            true
        } else {
            return Err(EvalError::UnknownMember {
                owner: container.owner,
                member: method,
            });
        };
        if container.failed != wants_failure {
            return Err(EvalError::FailedAccess(method));
        }
        Ok(container.payload.clone().unwrap_or(Value::Null))
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    use Value::{Bool, Int, Str};
    Ok(match (op, lhs, rhs) {
        (BinaryOp::Add, Str(a), b) => Value::str(&format!("{a}{}", concat_piece(&b))),
        (BinaryOp::Add, a, Str(b)) => Value::str(&format!("{}{b}", concat_piece(&a))),
        (BinaryOp::Add, Int(a), Int(b)) => Int(a.wrapping_add(b)),
        (BinaryOp::Sub, Int(a), Int(b)) => Int(a.wrapping_sub(b)),
        (BinaryOp::Mul, Int(a), Int(b)) => Int(a.wrapping_mul(b)),
        (BinaryOp::Div | BinaryOp::Rem, Int(_), Int(0)) => return Err(EvalError::DivisionByZero),
        (BinaryOp::Div, Int(a), Int(b)) => Int(a.wrapping_div(b)),
        (BinaryOp::Rem, Int(a), Int(b)) => Int(a.wrapping_rem(b)),
        (BinaryOp::Eq, a, b) => Bool(a == b),
        (BinaryOp::Ne, a, b) => Bool(a != b),
        (BinaryOp::Lt, Int(a), Int(b)) => Bool(a < b),
        (BinaryOp::Le, Int(a), Int(b)) => Bool(a <= b),
        (BinaryOp::Gt, Int(a), Int(b)) => Bool(a > b),
        (BinaryOp::Ge, Int(a), Int(b)) => Bool(a >= b),
        (BinaryOp::And, Bool(a), Bool(b)) => Bool(a && b),
        (BinaryOp::Or, Bool(a), Bool(b)) => Bool(a || b),
        (_, a, _) => {
            return Err(EvalError::Type {
                expected: "operands matching the operator",
                found: a.kind_name(),
            });
        }
    })
}

/// String concatenation renders strings without quotes.
fn concat_piece(value: &Value) -> String {
    match value {
        Value::Str(s) => s.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bailout_tree::Builder;

    #[test]
    fn container_accessors_follow_the_catalog() {
        let mut b = Builder::new("eval");
        let int = b.ty("int");
        let string = b.ty("String");
        let result = b.generic("Result", [int, string]);
        let recv = b.call("fetch", []);
        let failed = b.method(recv, "isErr", []);
        let ret = b.ret(failed);
        b.func("inspect", &[], result, [ret]);
        let unit = b.finish();

        let config = DesugarConfig::default();
        let mut interp = Interpreter::new(&unit, &config);
        let desc = ContainerDescriptor::result();
        interp.register("fetch", move |_| Value::failure(&desc, Some(Value::str("boom"))));
        assert_eq!(interp.call("inspect", vec![]), Ok(Value::Bool(true)));
        assert_eq!(interp.call_count("fetch"), 1);
    }

    #[test]
    fn marker_on_failed_container_is_a_runtime_error() {
        let mut b = Builder::new("eval");
        let int = b.ty("int");
        let recv = b.call("fetch", []);
        let call = b.unwrap(recv);
        let ret = b.ret(call);
        b.func("inspect", &[], int, [ret]);
        let unit = b.finish();

        let config = DesugarConfig::default();
        let mut interp = Interpreter::new(&unit, &config);
        let desc = ContainerDescriptor::option();
        interp.register("fetch", move |_| Value::failure(&desc, None));
        assert_eq!(
            interp.call("inspect", vec![]),
            Err(EvalError::FailedAccess(Symbol::new("unwrap")))
        );
    }

    #[test]
    fn labeled_break_leaves_outer_loop() {
        let mut b = Builder::new("eval");
        let int = b.ty("int");
        let zero = b.int(0);
        let count = b.local("n", zero);
        let n = b.name("n");
        let one = b.int(1);
        let inc = b.compound_assign(n, BinaryOp::Add, one);
        let brk = b.break_(Some("outer"));
        let t = b.boolean(true);
        let inner = b.while_(t, [inc, brk]);
        let t = b.boolean(true);
        let outer = b.while_(t, [inner]);
        let labeled = b.labeled("outer", outer);
        let n = b.name("n");
        let ret = b.ret(n);
        b.func("count", &[], int, [count, labeled, ret]);
        let unit = b.finish();

        let config = DesugarConfig::default();
        let mut interp = Interpreter::new(&unit, &config);
        assert_eq!(interp.call("count", vec![]), Ok(Value::Int(1)));
    }
}
