//! Unit: arena-based storage for one translation unit.
//!
//! All tree entities (functions, statements, expressions, blocks) are stored
//! in `PrimaryMap`s owned by the `Unit`. Parents refer to children by index,
//! so splicing a statement list or replacing an expression in place is an
//! index reassignment, never a pointer rewrite.

use cranelift_entity::PrimaryMap;

use crate::location::Span;
use crate::node::*;
use crate::refs::*;
use crate::symbol::Symbol;
use crate::types::TypeInterner;

pub struct Unit {
    name: Symbol,
    funcs: PrimaryMap<FuncRef, FuncData>,
    stmts: PrimaryMap<StmtRef, StmtData>,
    exprs: PrimaryMap<ExprRef, ExprData>,
    blocks: PrimaryMap<BlockRef, BlockData>,
    externs: Vec<ExternSig>,

    pub types: TypeInterner,
}

impl Unit {
    /// Create a new empty unit.
    pub fn new(name: Symbol) -> Self {
        Self {
            name,
            funcs: PrimaryMap::new(),
            stmts: PrimaryMap::new(),
            exprs: PrimaryMap::new(),
            blocks: PrimaryMap::new(),
            externs: Vec::new(),
            types: TypeInterner::new(),
        }
    }

    pub fn name(&self) -> Symbol {
        self.name
    }

    // ========================================================================
    // Functions
    // ========================================================================

    pub fn add_func(&mut self, data: FuncData) -> FuncRef {
        self.funcs.push(data)
    }

    pub fn func(&self, f: FuncRef) -> &FuncData {
        &self.funcs[f]
    }

    /// All functions in declaration order.
    pub fn funcs(&self) -> impl Iterator<Item = FuncRef> + '_ {
        self.funcs.keys()
    }

    pub fn func_by_name(&self, name: Symbol) -> Option<FuncRef> {
        self.funcs
            .iter()
            .find(|(_, data)| data.name == name)
            .map(|(f, _)| f)
    }

    /// Register a host-provided function signature.
    pub fn declare_extern(&mut self, sig: ExternSig) {
        self.externs.retain(|e| e.name != sig.name);
        self.externs.push(sig);
    }

    pub fn extern_by_name(&self, name: Symbol) -> Option<&ExternSig> {
        self.externs.iter().find(|e| e.name == name)
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    pub fn create_expr(&mut self, kind: ExprKind, span: Span) -> ExprRef {
        self.exprs.push(ExprData {
            kind,
            span,
            ty: None,
        })
    }

    pub fn expr(&self, e: ExprRef) -> &ExprData {
        &self.exprs[e]
    }

    pub fn expr_mut(&mut self, e: ExprRef) -> &mut ExprData {
        &mut self.exprs[e]
    }

    pub fn expr_kind(&self, e: ExprRef) -> &ExprKind {
        &self.exprs[e].kind
    }

    pub fn expr_span(&self, e: ExprRef) -> Span {
        self.exprs[e].span
    }

    /// The attributed type of an expression, if re-attribution assigned one.
    pub fn expr_ty(&self, e: ExprRef) -> Option<TypeRef> {
        self.exprs[e].ty
    }

    pub fn set_expr_ty(&mut self, e: ExprRef, ty: Option<TypeRef>) {
        self.exprs[e].ty = ty;
    }

    /// Every expression ever created in this unit, attached or not.
    pub fn all_exprs(&self) -> impl Iterator<Item = (ExprRef, &ExprData)> + '_ {
        self.exprs.iter()
    }

    /// Overwrite the node at `e` with a new kind, keeping its span.
    ///
    /// Every parent that refers to `e` observes the new node. The attributed
    /// type is cleared; the next re-attribution fills it in again.
    pub fn replace_expr(&mut self, e: ExprRef, kind: ExprKind) {
        let data = &mut self.exprs[e];
        data.kind = kind;
        data.ty = None;
    }

    // ========================================================================
    // Statements
    // ========================================================================

    pub fn create_stmt(&mut self, kind: StmtKind, span: Span) -> StmtRef {
        self.stmts.push(StmtData { kind, span })
    }

    pub fn stmt(&self, s: StmtRef) -> &StmtData {
        &self.stmts[s]
    }

    pub fn stmt_mut(&mut self, s: StmtRef) -> &mut StmtData {
        &mut self.stmts[s]
    }

    pub fn stmt_kind(&self, s: StmtRef) -> &StmtKind {
        &self.stmts[s].kind
    }

    pub fn stmt_span(&self, s: StmtRef) -> Span {
        self.stmts[s].span
    }

    /// Every statement ever created in this unit, attached or not.
    pub fn all_stmts(&self) -> impl Iterator<Item = (StmtRef, &StmtData)> + '_ {
        self.stmts.iter()
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    pub fn create_block(&mut self, stmts: impl IntoIterator<Item = StmtRef>) -> BlockRef {
        self.blocks.push(BlockData {
            stmts: stmts.into_iter().collect(),
        })
    }

    pub fn block(&self, b: BlockRef) -> &BlockData {
        &self.blocks[b]
    }

    pub fn block_mut(&mut self, b: BlockRef) -> &mut BlockData {
        &mut self.blocks[b]
    }

    /// Insert `new_stmts` (in order) before `before` in the given block.
    ///
    /// # Panics
    ///
    /// Panics if `before` is not found in the block.
    pub fn insert_stmts_before(
        &mut self,
        block: BlockRef,
        before: StmtRef,
        new_stmts: impl IntoIterator<Item = StmtRef>,
    ) {
        let stmts = &mut self.blocks[block].stmts;
        let pos = stmts
            .iter()
            .position(|&s| s == before)
            .expect("insert_stmts_before: `before` statement not found in block");
        stmts.insert_many(pos, new_stmts);
    }
}
