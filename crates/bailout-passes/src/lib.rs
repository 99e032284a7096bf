//! Short-circuit marker desugaring.
//!
//! Rewrites `receiver.unwrap()` on cataloged result containers into a
//! temp binding, an early return on the failure arm, and a binding of the
//! success payload. The pass runs to a fixpoint, re-attributing the unit
//! after every pass that changed it, and reports any marker call left in a
//! position it cannot rewrite.
//!
//! ## Pipeline
//!
//! [`Desugarer::run`] drives [`BlockRewriter`] (which uses [`Searcher`] and
//! [`RewriteBuilder`]) and a host-supplied [`Reattribute`] until nothing
//! changes, then runs the orphan scan.

// === Configuration ===
pub mod catalog;
pub mod config;
pub mod errors;

// === Rewrite engine ===
pub mod builder;
pub mod driver;
pub mod fresh;
pub mod orphan;
pub mod rewriter;
pub mod search;

// === Re-attribution ===
pub mod attribute;

// Re-exports
pub use attribute::{LocalAttributor, Reattribute};
pub use builder::{RewriteBuilder, RewriteResult};
pub use catalog::{Catalog, ContainerDescriptor, ContainerKind, StrategyId};
pub use config::DesugarConfig;
pub use driver::{DesugarOutcome, Desugarer};
pub use errors::{CatalogError, ConfigError, DesugarError, DesugarFailure, UNSUPPORTED_POSITION};
pub use fresh::FreshNames;
pub use rewriter::{BlockRewriter, StmtList};
pub use search::{Lens, Searcher};
