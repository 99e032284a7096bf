//! Node data stored in the `Unit` arenas.

use smallvec::SmallVec;

use crate::location::Span;
use crate::refs::{BlockRef, ExprRef, StmtRef, TypeRef};
use crate::symbol::Symbol;

// ============================================================================
// Expressions
// ============================================================================

/// Data for a single expression.
///
/// `ty` is written by re-attribution and is `None` until the unit has been
/// attributed (or after an attributor failed to type the node).
#[derive(Clone, Debug)]
pub struct ExprData {
    pub kind: ExprKind,
    pub span: Span,
    pub ty: Option<TypeRef>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    /// Local variable or parameter reference.
    Name(Symbol),
    Int(i64),
    Bool(bool),
    Str(String),
    Null,
    /// Call to a function declared in the unit or registered as extern: `f(a, b)`.
    Call {
        callee: Symbol,
        args: SmallVec<[ExprRef; 4]>,
    },
    /// Type-qualified call: `Result.err(e)`.
    StaticCall {
        owner: Symbol,
        member: Symbol,
        args: SmallVec<[ExprRef; 4]>,
    },
    /// `receiver.method(args)`
    MethodCall {
        receiver: ExprRef,
        method: Symbol,
        args: SmallVec<[ExprRef; 4]>,
    },
    /// `receiver.name`
    Field { receiver: ExprRef, name: Symbol },
    /// `array[index]`
    Index { array: ExprRef, index: ExprRef },
    Binary {
        op: BinaryOp,
        lhs: ExprRef,
        rhs: ExprRef,
    },
    Unary { op: UnaryOp, operand: ExprRef },
    /// `cond ? then_expr : else_expr`
    Conditional {
        cond: ExprRef,
        then_expr: ExprRef,
        else_expr: ExprRef,
    },
    /// `new T[] { a, b }`
    ArrayLit {
        elem: TypeRef,
        elems: SmallVec<[ExprRef; 4]>,
    },
    Lambda {
        params: Vec<Param>,
        ret: Option<TypeRef>,
        body: LambdaBody,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LambdaBody {
    Expr(ExprRef),
    Block(BlockRef),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: Symbol,
    pub ty: TypeRef,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// `&&` and `||` evaluate their right operand conditionally.
    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Clone, Debug)]
pub struct StmtData {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    /// `var name = init;` when `ty` is `None`, `T name = init;` otherwise.
    Local {
        name: Symbol,
        ty: Option<TypeRef>,
        init: Option<ExprRef>,
    },
    Expr(ExprRef),
    /// `target = value;` or `target op= value;`
    Assign {
        target: ExprRef,
        op: Option<BinaryOp>,
        value: ExprRef,
    },
    Return(Option<ExprRef>),
    Throw(ExprRef),
    If {
        cond: ExprRef,
        then_block: BlockRef,
        else_block: Option<BlockRef>,
    },
    While {
        cond: ExprRef,
        body: BlockRef,
    },
    DoWhile {
        body: BlockRef,
        cond: ExprRef,
    },
    For {
        init: SmallVec<[StmtRef; 2]>,
        cond: Option<ExprRef>,
        update: SmallVec<[StmtRef; 2]>,
        body: BlockRef,
    },
    ForEach {
        var: Symbol,
        var_ty: Option<TypeRef>,
        iterable: ExprRef,
        body: BlockRef,
    },
    Block(BlockRef),
    Labeled {
        label: Symbol,
        body: StmtRef,
    },
    Try {
        resources: SmallVec<[StmtRef; 2]>,
        body: BlockRef,
        catches: Vec<CatchClause>,
        finally: Option<BlockRef>,
    },
    Switch {
        selector: ExprRef,
        cases: Vec<SwitchCase>,
    },
    Synchronized {
        lock: ExprRef,
        body: BlockRef,
    },
    Assert {
        cond: ExprRef,
        detail: Option<ExprRef>,
    },
    Break(Option<Symbol>),
    Continue(Option<Symbol>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CatchClause {
    pub param: Symbol,
    pub ty: TypeRef,
    pub body: BlockRef,
}

/// One arm of a switch. Empty `labels` is the `default` arm.
#[derive(Clone, Debug, PartialEq)]
pub struct SwitchCase {
    pub labels: SmallVec<[ExprRef; 2]>,
    pub body: CaseBody,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaseBody {
    /// `case 1: stmts` (falls through like a statement list)
    Statements(BlockRef),
    /// `case 1 -> expr;`
    RuleExpr(ExprRef),
    /// `case 1 -> { stmts }`
    RuleBlock(BlockRef),
}

// ============================================================================
// Blocks and declarations
// ============================================================================

/// An ordered statement list.
#[derive(Clone, Debug, Default)]
pub struct BlockData {
    pub stmts: SmallVec<[StmtRef; 8]>,
}

#[derive(Clone, Debug)]
pub struct FuncData {
    pub name: Symbol,
    pub params: Vec<Param>,
    pub ret: TypeRef,
    pub body: BlockRef,
    pub span: Span,
}

/// Signature of a function supplied by the host rather than declared in the unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternSig {
    pub name: Symbol,
    pub params: Vec<TypeRef>,
    pub ret: TypeRef,
}
