//! Strategy catalog: the closed set of recognized container kinds.
//!
//! Each descriptor names a container type and the members the rewrite needs:
//! the failure test, the payload accessors, and the two constructors. The
//! pass never looks at a container's representation, only at these names.
//!
//! Lookup is nominal on the type head (`Result<int, String>` matches the
//! `Result` descriptor) and never considers subtyping. At most one
//! descriptor may claim a given type name.

use std::collections::HashMap;

use bailout_tree::{Symbol, TypeInterner, TypeRef};
use serde::Deserialize;

use crate::errors::CatalogError;

/// Index of a descriptor inside its `Catalog`, in priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StrategyId(u32);

impl StrategyId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Whether the failure arm carries a payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerKind {
    /// present/absent: the failure arm is empty.
    Presence,
    /// success/error, success/failure: the failure arm carries a value.
    Carrying,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContainerDescriptor {
    /// Nominal type name, e.g. `Result`.
    #[serde(rename = "type")]
    pub type_name: Symbol,
    /// Zero-argument predicate that is true on the short-circuit arm.
    pub failure_test: Symbol,
    /// Accessor for the failure payload; absent for presence/absence kinds.
    #[serde(default)]
    pub failure_payload: Option<Symbol>,
    /// Accessor for the success payload.
    pub success_payload: Symbol,
    pub failure_ctor: Symbol,
    pub success_ctor: Symbol,
}

impl ContainerDescriptor {
    pub fn kind(&self) -> ContainerKind {
        match self.failure_payload {
            Some(_) => ContainerKind::Carrying,
            None => ContainerKind::Presence,
        }
    }

    /// Number of type arguments the container takes (`Option<T>`, `Result<T, E>`).
    pub fn arity(&self) -> usize {
        match self.kind() {
            ContainerKind::Presence => 1,
            ContainerKind::Carrying => 2,
        }
    }

    /// present/absent: `Option` with `isEmpty`/`get`/`none`/`some`.
    pub fn option() -> Self {
        Self {
            type_name: Symbol::new("Option"),
            failure_test: Symbol::new("isEmpty"),
            failure_payload: None,
            success_payload: Symbol::new("get"),
            failure_ctor: Symbol::new("none"),
            success_ctor: Symbol::new("some"),
        }
    }

    /// success/error: `Result` with `isErr`/`getError`/`get`/`err`/`ok`.
    pub fn result() -> Self {
        Self {
            type_name: Symbol::new("Result"),
            failure_test: Symbol::new("isErr"),
            failure_payload: Some(Symbol::new("getError")),
            success_payload: Symbol::new("get"),
            failure_ctor: Symbol::new("err"),
            success_ctor: Symbol::new("ok"),
        }
    }

    /// success/failure: `Try` with `isFailure`/`getCause`/`get`/`failure`/`success`.
    pub fn try_() -> Self {
        Self {
            type_name: Symbol::new("Try"),
            failure_test: Symbol::new("isFailure"),
            failure_payload: Some(Symbol::new("getCause")),
            success_payload: Symbol::new("get"),
            failure_ctor: Symbol::new("failure"),
            success_ctor: Symbol::new("success"),
        }
    }
}

/// Ordered, unambiguous set of container descriptors.
#[derive(Clone, Debug)]
pub struct Catalog {
    descriptors: Vec<ContainerDescriptor>,
    by_name: HashMap<Symbol, StrategyId>,
}

impl Catalog {
    /// Build a catalog; descriptor order is the priority order.
    pub fn new(descriptors: Vec<ContainerDescriptor>) -> Result<Self, CatalogError> {
        if descriptors.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut by_name = HashMap::with_capacity(descriptors.len());
        for (idx, desc) in descriptors.iter().enumerate() {
            if by_name
                .insert(desc.type_name, StrategyId(idx as u32))
                .is_some()
            {
                return Err(CatalogError::AmbiguousType(desc.type_name));
            }
        }
        Ok(Self {
            descriptors,
            by_name,
        })
    }

    /// The three recognized kinds: `Option`, `Result`, `Try`.
    pub fn standard() -> Self {
        let descriptors = vec![
            ContainerDescriptor::option(),
            ContainerDescriptor::result(),
            ContainerDescriptor::try_(),
        ];
        let by_name = descriptors
            .iter()
            .enumerate()
            .map(|(idx, d)| (d.type_name, StrategyId(idx as u32)))
            .collect();
        Self {
            descriptors,
            by_name,
        }
    }

    pub fn get(&self, id: StrategyId) -> &ContainerDescriptor {
        &self.descriptors[id.index()]
    }

    /// Descriptors in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (StrategyId, &ContainerDescriptor)> {
        self.descriptors
            .iter()
            .enumerate()
            .map(|(idx, d)| (StrategyId(idx as u32), d))
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn lookup_name(&self, name: Symbol) -> Option<StrategyId> {
        self.by_name.get(&name).copied()
    }

    /// Exact (nominal) match of a resolved static type.
    pub fn lookup_type(&self, types: &TypeInterner, ty: TypeRef) -> Option<StrategyId> {
        types.head(ty).and_then(|head| self.lookup_name(head))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_resolves_by_head_name() {
        let catalog = Catalog::standard();
        let mut types = TypeInterner::new();
        let int = types.int();
        let string = types.string();
        let result = types.named(Symbol::new("Result"), [int, string]);
        let id = catalog.lookup_type(&types, result).expect("Result is cataloged");
        assert_eq!(catalog.get(id).type_name, "Result");
        assert_eq!(catalog.get(id).kind(), ContainerKind::Carrying);
    }

    #[test]
    fn lookup_is_nominal_not_structural() {
        let catalog = Catalog::standard();
        let mut types = TypeInterner::new();
        let int = types.int();
        let opt_like = types.named(Symbol::new("Optional"), [int]);
        let arr = types.array(int);
        assert_eq!(catalog.lookup_type(&types, opt_like), None);
        assert_eq!(catalog.lookup_type(&types, arr), None);
    }

    #[test]
    fn duplicate_type_names_are_rejected() {
        let err = Catalog::new(vec![ContainerDescriptor::result(), ContainerDescriptor::result()])
            .unwrap_err();
        assert_eq!(err, CatalogError::AmbiguousType(Symbol::new("Result")));
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert_eq!(Catalog::new(vec![]).unwrap_err(), CatalogError::Empty);
    }

    #[test]
    fn option_is_presence_kind() {
        let option = ContainerDescriptor::option();
        assert_eq!(option.kind(), ContainerKind::Presence);
        assert_eq!(option.arity(), 1);
    }
}
