//! Type interning for the syntax tree.

use std::collections::HashMap;

use cranelift_entity::PrimaryMap;
use smallvec::SmallVec;

use crate::refs::TypeRef;
use crate::symbol::Symbol;

/// Data for a single interned type.
///
/// Primitive types (`int`, `boolean`, `void`, `String`) are `Named` with no
/// arguments. `Unknown` stands for a type the attributor could not pin down
/// (e.g. the error arm of `Result.ok(x)`); it is compatible with anything.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    Named {
        name: Symbol,
        args: SmallVec<[TypeRef; 2]>,
    },
    Array(TypeRef),
    Unknown,
}

/// Deduplicating type interner. Same `TypeData` always yields the same `TypeRef`.
pub struct TypeInterner {
    types: PrimaryMap<TypeRef, TypeData>,
    dedup: HashMap<TypeData, TypeRef>,
}

impl TypeInterner {
    pub fn new() -> Self {
        Self {
            types: PrimaryMap::new(),
            dedup: HashMap::default(),
        }
    }

    /// Intern a type, returning an existing ref if the data matches.
    pub fn intern(&mut self, data: TypeData) -> TypeRef {
        if let Some(&existing) = self.dedup.get(&data) {
            return existing;
        }
        let r = self.types.push(data.clone());
        self.dedup.insert(data, r);
        r
    }

    /// Look up type data by reference.
    pub fn get(&self, r: TypeRef) -> &TypeData {
        &self.types[r]
    }

    pub fn named(&mut self, name: Symbol, args: impl IntoIterator<Item = TypeRef>) -> TypeRef {
        self.intern(TypeData::Named {
            name,
            args: args.into_iter().collect(),
        })
    }

    /// A named type without arguments.
    pub fn simple(&mut self, name: &'static str) -> TypeRef {
        self.named(Symbol::new(name), [])
    }

    pub fn array(&mut self, elem: TypeRef) -> TypeRef {
        self.intern(TypeData::Array(elem))
    }

    pub fn unknown(&mut self) -> TypeRef {
        self.intern(TypeData::Unknown)
    }

    pub fn int(&mut self) -> TypeRef {
        self.simple("int")
    }

    pub fn boolean(&mut self) -> TypeRef {
        self.simple("boolean")
    }

    pub fn string(&mut self) -> TypeRef {
        self.simple("String")
    }

    pub fn void(&mut self) -> TypeRef {
        self.simple("void")
    }

    /// The nominal head of a named type (`Result` for `Result<int, String>`).
    pub fn head(&self, r: TypeRef) -> Option<Symbol> {
        match &self.types[r] {
            TypeData::Named { name, .. } => Some(*name),
            _ => None,
        }
    }

    /// The i-th type argument of a named type.
    pub fn arg(&self, r: TypeRef, index: usize) -> Option<TypeRef> {
        match &self.types[r] {
            TypeData::Named { args, .. } => args.get(index).copied(),
            _ => None,
        }
    }

    pub fn is_named(&self, r: TypeRef, name: &str) -> bool {
        self.head(r).is_some_and(|head| head == name)
    }

    /// Structural compatibility where `Unknown` matches anything.
    pub fn compatible(&self, a: TypeRef, b: TypeRef) -> bool {
        if a == b {
            return true;
        }
        match (&self.types[a], &self.types[b]) {
            (TypeData::Unknown, _) | (_, TypeData::Unknown) => true,
            (TypeData::Array(x), TypeData::Array(y)) => self.compatible(*x, *y),
            (
                TypeData::Named { name: n1, args: a1 },
                TypeData::Named { name: n2, args: a2 },
            ) => {
                n1 == n2
                    && a1.len() == a2.len()
                    && a1.iter().zip(a2.iter()).all(|(x, y)| self.compatible(*x, *y))
            }
            _ => false,
        }
    }

    /// Merge two compatible types, preferring the more specific side.
    pub fn unify(&mut self, a: TypeRef, b: TypeRef) -> TypeRef {
        if a == b {
            return a;
        }
        match (self.types[a].clone(), self.types[b].clone()) {
            (TypeData::Unknown, _) => b,
            (_, TypeData::Unknown) => a,
            (TypeData::Array(x), TypeData::Array(y)) => {
                let elem = self.unify(x, y);
                self.array(elem)
            }
            (TypeData::Named { name, args: a1 }, TypeData::Named { args: a2, .. })
                if a1.len() == a2.len() =>
            {
                let args: SmallVec<[TypeRef; 2]> = a1
                    .iter()
                    .zip(a2.iter())
                    .map(|(x, y)| self.unify(*x, *y))
                    .collect();
                self.named(name, args)
            }
            _ => a,
        }
    }

    /// Render a type the way it is written in source.
    pub fn display(&self, r: TypeRef) -> String {
        match &self.types[r] {
            TypeData::Named { name, args } if args.is_empty() => name.to_string(),
            TypeData::Named { name, args } => {
                let args: Vec<String> = args.iter().map(|a| self.display(*a)).collect();
                format!("{}<{}>", name, args.join(", "))
            }
            TypeData::Array(elem) => format!("{}[]", self.display(*elem)),
            TypeData::Unknown => "?".to_owned(),
        }
    }
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_interner_dedup() {
        let mut interner = TypeInterner::new();
        let int = interner.int();
        let r1 = interner.named(Symbol::new("Option"), [int]);
        let r2 = interner.named(Symbol::new("Option"), [int]);
        assert_eq!(r1, r2, "same TypeData must yield same TypeRef");
    }

    #[test]
    fn head_is_nominal() {
        let mut interner = TypeInterner::new();
        let int = interner.int();
        let string = interner.string();
        let result = interner.named(Symbol::new("Result"), [int, string]);
        assert_eq!(interner.head(result), Some(Symbol::new("Result")));
        assert_eq!(interner.arg(result, 1), Some(string));
        let arr = interner.array(result);
        assert_eq!(interner.head(arr), None);
    }

    #[test]
    fn unknown_is_compatible_and_unifies_away() {
        let mut interner = TypeInterner::new();
        let int = interner.int();
        let string = interner.string();
        let unknown = interner.unknown();
        let partial = interner.named(Symbol::new("Result"), [int, unknown]);
        let full = interner.named(Symbol::new("Result"), [int, string]);
        assert!(interner.compatible(partial, full));
        assert_eq!(interner.unify(partial, full), full);
        assert!(!interner.compatible(int, string));
    }

    #[test]
    fn display_matches_source_syntax() {
        let mut interner = TypeInterner::new();
        let int = interner.int();
        let string = interner.string();
        let result = interner.named(Symbol::new("Result"), [int, string]);
        let arr = interner.array(result);
        assert_eq!(interner.display(arr), "Result<int, String>[]");
    }
}
