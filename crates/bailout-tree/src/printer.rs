//! Source-like printer for units.
//!
//! Debug aid only: renders the tree in the surface syntax it models so a
//! rewritten unit can be read (and snapshot-tested) as ordinary code.
//!
//! ```text
//! Result<int, String> f() {
//!     var $r0 = a();
//!     if ($r0.isErr()) {
//!         return Result.err($r0.getError());
//!     }
//!     var $v1 = $r0.get();
//!     return $v1;
//! }
//! ```
//!
//! Nested binary and conditional operands are always parenthesized, so the
//! output never depends on operator precedence.

use std::fmt::Write;

use crate::node::*;
use crate::refs::*;
use crate::unit::Unit;

const INDENT: &str = "    ";

/// Render every function of the unit, separated by blank lines.
pub fn print_unit(unit: &Unit) -> String {
    let mut printer = Printer::new(unit);
    for (i, func) in unit.funcs().enumerate() {
        if i > 0 {
            printer.out.push('\n');
        }
        printer.func(func);
    }
    printer.out
}

pub fn print_func(unit: &Unit, func: FuncRef) -> String {
    let mut printer = Printer::new(unit);
    printer.func(func);
    printer.out
}

/// Render a single statement (and its nested statements) at indent level 0.
pub fn print_stmt(unit: &Unit, stmt: StmtRef) -> String {
    let mut printer = Printer::new(unit);
    printer.stmt(stmt, 0, "");
    printer.out
}

pub fn print_expr(unit: &Unit, expr: ExprRef) -> String {
    Printer::new(unit).expr(expr, 0)
}

struct Printer<'a> {
    unit: &'a Unit,
    out: String,
}

impl<'a> Printer<'a> {
    fn new(unit: &'a Unit) -> Self {
        Self {
            unit,
            out: String::new(),
        }
    }

    fn ty(&self, ty: TypeRef) -> String {
        self.unit.types.display(ty)
    }

    fn line(&mut self, indent: usize, text: &str) {
        for _ in 0..indent {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn func(&mut self, func: FuncRef) {
        let data = self.unit.func(func);
        let params: Vec<String> = data
            .params
            .iter()
            .map(|p| format!("{} {}", self.ty(p.ty), p.name))
            .collect();
        let header = format!("{} {}({}) {{", self.ty(data.ret), data.name, params.join(", "));
        self.line(0, &header);
        self.block_body(data.body, 1);
        self.line(0, "}");
    }

    fn block_body(&mut self, block: BlockRef, indent: usize) {
        for &stmt in &self.unit.block(block).stmts {
            self.stmt(stmt, indent, "");
        }
    }

    /// Print `head {`, the block, and a closing line `tail`.
    fn braced(&mut self, indent: usize, head: &str, block: BlockRef, tail: &str) {
        self.line(indent, &format!("{head} {{"));
        self.block_body(block, indent + 1);
        self.line(indent, tail);
    }

    /// Statements that fit on one line, without the trailing `;`.
    fn simple(&self, stmt: StmtRef, indent: usize) -> Option<String> {
        Some(match self.unit.stmt_kind(stmt) {
            StmtKind::Local { name, ty, init } => {
                let ty = match ty {
                    Some(ty) => self.ty(*ty),
                    None => "var".to_owned(),
                };
                match init {
                    Some(init) => format!("{ty} {name} = {}", self.expr(*init, indent)),
                    None => format!("{ty} {name}"),
                }
            }
            StmtKind::Expr(e) => self.expr(*e, indent),
            StmtKind::Assign { target, op, value } => {
                let op = op.map(|op| op.as_str()).unwrap_or("");
                format!(
                    "{} {op}= {}",
                    self.expr(*target, indent),
                    self.expr(*value, indent)
                )
            }
            StmtKind::Return(Some(e)) => format!("return {}", self.expr(*e, indent)),
            StmtKind::Return(None) => "return".to_owned(),
            StmtKind::Throw(e) => format!("throw {}", self.expr(*e, indent)),
            StmtKind::Assert { cond, detail } => match detail {
                Some(detail) => format!(
                    "assert {} : {}",
                    self.expr(*cond, indent),
                    self.expr(*detail, indent)
                ),
                None => format!("assert {}", self.expr(*cond, indent)),
            },
            StmtKind::Break(Some(label)) => format!("break {label}"),
            StmtKind::Break(None) => "break".to_owned(),
            StmtKind::Continue(Some(label)) => format!("continue {label}"),
            StmtKind::Continue(None) => "continue".to_owned(),
            _ => return None,
        })
    }

    fn inline_list(&self, stmts: &[StmtRef], indent: usize, sep: &str) -> String {
        stmts
            .iter()
            .filter_map(|s| self.simple(*s, indent))
            .collect::<Vec<_>>()
            .join(sep)
    }

    fn stmt(&mut self, stmt: StmtRef, indent: usize, prefix: &str) {
        if let Some(text) = self.simple(stmt, indent) {
            self.line(indent, &format!("{prefix}{text};"));
            return;
        }
        let kind = self.unit.stmt_kind(stmt).clone();
        match kind {
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                let head = format!("{prefix}if ({})", self.expr(cond, indent));
                match else_block {
                    Some(else_block) => {
                        self.braced(indent, &head, then_block, "} else {");
                        self.block_body(else_block, indent + 1);
                        self.line(indent, "}");
                    }
                    None => self.braced(indent, &head, then_block, "}"),
                }
            }
            StmtKind::While { cond, body } => {
                let head = format!("{prefix}while ({})", self.expr(cond, indent));
                self.braced(indent, &head, body, "}");
            }
            StmtKind::DoWhile { body, cond } => {
                let tail = format!("}} while ({});", self.expr(cond, indent));
                self.braced(indent, &format!("{prefix}do"), body, &tail);
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                let cond = cond.map(|c| self.expr(c, indent)).unwrap_or_default();
                let head = format!(
                    "{prefix}for ({}; {}; {})",
                    self.inline_list(&init, indent, ", "),
                    cond,
                    self.inline_list(&update, indent, ", ")
                );
                self.braced(indent, &head, body, "}");
            }
            StmtKind::ForEach {
                var,
                var_ty,
                iterable,
                body,
            } => {
                let ty = var_ty.map(|t| self.ty(t)).unwrap_or_else(|| "var".to_owned());
                let head = format!("{prefix}for ({ty} {var} : {})", self.expr(iterable, indent));
                self.braced(indent, &head, body, "}");
            }
            StmtKind::Block(block) => {
                self.line(indent, &format!("{prefix}{{"));
                self.block_body(block, indent + 1);
                self.line(indent, "}");
            }
            StmtKind::Labeled { label, body } => {
                self.stmt(body, indent, &format!("{prefix}{label}: "));
            }
            StmtKind::Try {
                resources,
                body,
                catches,
                finally,
            } => {
                let head = if resources.is_empty() {
                    format!("{prefix}try")
                } else {
                    format!("{prefix}try ({})", self.inline_list(&resources, indent, "; "))
                };
                self.line(indent, &format!("{head} {{"));
                self.block_body(body, indent + 1);
                for catch in &catches {
                    self.line(
                        indent,
                        &format!("}} catch ({} {}) {{", self.ty(catch.ty), catch.param),
                    );
                    self.block_body(catch.body, indent + 1);
                }
                if let Some(finally) = finally {
                    self.line(indent, "} finally {");
                    self.block_body(finally, indent + 1);
                }
                self.line(indent, "}");
            }
            StmtKind::Switch { selector, cases } => {
                let head = format!("{prefix}switch ({}) {{", self.expr(selector, indent));
                self.line(indent, &head);
                for case in &cases {
                    let label = if case.labels.is_empty() {
                        "default".to_owned()
                    } else {
                        let labels: Vec<String> =
                            case.labels.iter().map(|l| self.expr(*l, indent + 1)).collect();
                        format!("case {}", labels.join(", "))
                    };
                    match case.body {
                        CaseBody::Statements(block) => {
                            self.line(indent + 1, &format!("{label}:"));
                            self.block_body(block, indent + 2);
                        }
                        CaseBody::RuleExpr(e) => {
                            let text = format!("{label} -> {};", self.expr(e, indent + 1));
                            self.line(indent + 1, &text);
                        }
                        CaseBody::RuleBlock(block) => {
                            self.braced(indent + 1, &format!("{label} ->"), block, "}");
                        }
                    }
                }
                self.line(indent, "}");
            }
            StmtKind::Synchronized { lock, body } => {
                let head = format!("{prefix}synchronized ({})", self.expr(lock, indent));
                self.braced(indent, &head, body, "}");
            }
            _ => unreachable!("simple statements are printed above"),
        }
    }

    fn operand(&self, e: ExprRef, indent: usize) -> String {
        let text = self.expr(e, indent);
        match self.unit.expr_kind(e) {
            ExprKind::Binary { .. } | ExprKind::Conditional { .. } | ExprKind::Lambda { .. } => {
                format!("({text})")
            }
            _ => text,
        }
    }

    fn args(&self, args: &[ExprRef], indent: usize) -> String {
        args.iter()
            .map(|a| self.expr(*a, indent))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn expr(&self, e: ExprRef, indent: usize) -> String {
        match self.unit.expr_kind(e) {
            ExprKind::Name(name) => name.to_string(),
            ExprKind::Int(v) => v.to_string(),
            ExprKind::Bool(v) => v.to_string(),
            ExprKind::Str(s) => format!("{s:?}"),
            ExprKind::Null => "null".to_owned(),
            ExprKind::Call { callee, args } => format!("{callee}({})", self.args(args, indent)),
            ExprKind::StaticCall {
                owner,
                member,
                args,
            } => format!("{owner}.{member}({})", self.args(args, indent)),
            ExprKind::MethodCall {
                receiver,
                method,
                args,
            } => {
                let receiver = match self.unit.expr_kind(*receiver) {
                    ExprKind::Unary { .. } => format!("({})", self.expr(*receiver, indent)),
                    _ => self.operand(*receiver, indent),
                };
                format!("{receiver}.{method}({})", self.args(args, indent))
            }
            ExprKind::Field { receiver, name } => {
                format!("{}.{name}", self.operand(*receiver, indent))
            }
            ExprKind::Index { array, index } => {
                format!("{}[{}]", self.operand(*array, indent), self.expr(*index, indent))
            }
            ExprKind::Binary { op, lhs, rhs } => format!(
                "{} {} {}",
                self.operand(*lhs, indent),
                op.as_str(),
                self.operand(*rhs, indent)
            ),
            ExprKind::Unary { op, operand } => {
                format!("{}{}", op.as_str(), self.operand(*operand, indent))
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => format!(
                "{} ? {} : {}",
                self.operand(*cond, indent),
                self.operand(*then_expr, indent),
                self.operand(*else_expr, indent)
            ),
            ExprKind::ArrayLit { elem, elems } => {
                format!("new {}[] {{{}}}", self.ty(*elem), self.args(elems, indent))
            }
            ExprKind::Lambda { params, ret, body } => {
                let params: Vec<String> = params
                    .iter()
                    .map(|p| format!("{} {}", self.ty(p.ty), p.name))
                    .collect();
                let ret = ret.map(|r| format!(": {}", self.ty(r))).unwrap_or_default();
                match body {
                    LambdaBody::Expr(body) => {
                        format!("({}){ret} -> {}", params.join(", "), self.expr(*body, indent))
                    }
                    LambdaBody::Block(block) => {
                        let mut nested = Printer::new(self.unit);
                        nested.block_body(*block, indent + 1);
                        let mut text = String::new();
                        let _ = write!(text, "({}){ret} -> {{\n{}", params.join(", "), nested.out);
                        for _ in 0..indent {
                            text.push_str(INDENT);
                        }
                        text.push('}');
                        text
                    }
                }
            }
        }
    }
}
