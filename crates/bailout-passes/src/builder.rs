//! Per-kind rewrite construction.
//!
//! Turns a [`Lens`] into three statements that bind the receiver once, return
//! early on the failure arm, and bind the success payload:
//!
//! ```text
//! var $r0 = <receiver>;
//! if ($r0.<failure-test>()) {
//!     return Ambient.<failure-ctor>($r0.<failure-payload>());
//! }
//! var $v1 = $r0.<success-payload>();
//! ```
//!
//! The marker call itself is overwritten with `$v1`. The receiver node moves
//! into the first binding, so it is still evaluated exactly once.

use bailout_tree::{BlockRef, ExprKind, ExprRef, Span, StmtKind, StmtRef, Symbol, TypeRef, Unit};
use smallvec::SmallVec;

use crate::catalog::{Catalog, ContainerDescriptor, ContainerKind};
use crate::fresh::FreshNames;
use crate::search::Lens;

/// Statements to splice before the rewritten statement, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RewriteResult {
    /// `[temp-bind, short-circuit-check, value-bind]`
    pub stmts: [StmtRef; 3],
    /// Name now standing where the marker call was.
    pub replacement: Symbol,
}

/// Owner and constructor of the early-return value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FailureReturn {
    owner: Symbol,
    ctor: Symbol,
    payload: Option<Symbol>,
}

pub struct RewriteBuilder<'c> {
    catalog: &'c Catalog,
}

impl<'c> RewriteBuilder<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self { catalog }
    }

    /// Build the expansion for `lens` and substitute the marker call.
    ///
    /// `ambient` is the declared result type of the enclosing function or
    /// lambda; `None` means the receiver's own type is used. An ambient type
    /// that cannot hold the failure is not checked here.
    pub fn build(
        &self,
        unit: &mut Unit,
        names: &mut FreshNames,
        lens: Lens,
        ambient: Option<TypeRef>,
    ) -> RewriteResult {
        let desc = self.catalog.get(lens.strategy);
        let span = lens.span;
        let temp = names.fresh("r");
        let value = names.fresh("v");

        let temp_bind = unit.create_stmt(
            StmtKind::Local {
                name: temp,
                ty: None,
                init: Some(lens.receiver),
            },
            span,
        );

        let failure = self.failure_return(unit, desc, lens.receiver, ambient);
        let test = accessor(unit, temp, desc.failure_test, span);
        let args: SmallVec<[ExprRef; 4]> = failure
            .payload
            .map(|payload| accessor(unit, temp, payload, span))
            .into_iter()
            .collect();
        let wrapped = unit.create_expr(
            ExprKind::StaticCall {
                owner: failure.owner,
                member: failure.ctor,
                args,
            },
            span,
        );
        let early = unit.create_stmt(StmtKind::Return(Some(wrapped)), span);
        let then_block: BlockRef = unit.create_block([early]);
        let check = unit.create_stmt(
            StmtKind::If {
                cond: test,
                then_block,
                else_block: None,
            },
            span,
        );

        let success = accessor(unit, temp, desc.success_payload, span);
        let value_bind = unit.create_stmt(
            StmtKind::Local {
                name: value,
                ty: None,
                init: Some(success),
            },
            span,
        );

        lens.replace(unit, ExprKind::Name(value));

        RewriteResult {
            stmts: [temp_bind, check, value_bind],
            replacement: value,
        }
    }

    fn failure_return(
        &self,
        unit: &Unit,
        receiver_desc: &ContainerDescriptor,
        receiver: ExprRef,
        ambient: Option<TypeRef>,
    ) -> FailureReturn {
        let ambient = ambient.or_else(|| unit.expr_ty(receiver));
        if let Some(id) = ambient.and_then(|ty| self.catalog.lookup_type(&unit.types, ty)) {
            let ambient_desc = self.catalog.get(id);
            let payload = match ambient_desc.kind() {
                ContainerKind::Carrying => receiver_desc.failure_payload,
                ContainerKind::Presence => None,
            };
            return FailureReturn {
                owner: ambient_desc.type_name,
                ctor: ambient_desc.failure_ctor,
                payload,
            };
        }
        // Not a container: keep the receiver's constructor on the ambient
        // name and let re-attribution report the mismatch.
        let owner = ambient
            .and_then(|ty| unit.types.head(ty))
            .unwrap_or(receiver_desc.type_name);
        FailureReturn {
            owner,
            ctor: receiver_desc.failure_ctor,
            payload: receiver_desc.failure_payload,
        }
    }
}

/// `temp.member()`
fn accessor(unit: &mut Unit, temp: Symbol, member: Symbol, span: Span) -> ExprRef {
    let receiver = unit.create_expr(ExprKind::Name(temp), span);
    unit.create_expr(
        ExprKind::MethodCall {
            receiver,
            method: member,
            args: SmallVec::new(),
        },
        span,
    )
}
