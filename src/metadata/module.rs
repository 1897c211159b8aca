//! The in-memory module representation.
//!
//! [`Module`] is the mutable unit the whole pipeline operates on: created by the
//! metadata engine, mutated in place by the reference rewriter and the resource
//! patcher, and consumed exactly once by the finalizer when it is serialized
//! back over its original file.

use std::path::PathBuf;

use bitflags::bitflags;

use crate::metadata::{
    customattributes::CustomAttribute, identity::ModuleIdentity, resources::ResourceEntry,
};

bitflags! {
    /// Flag word of a module image.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ModuleFlags: u32 {
        /// The module carries a full public key and is strong-name signed.
        const SIGNED = 0x0001;
    }
}

/// A type definition with its attributes and nested types.
///
/// Only the shape the rewriter needs: attribute-embedded type references can
/// hide on any type at any nesting depth, so the tree must be walkable.
#[derive(Debug, Clone, Default)]
pub struct TypeDef {
    /// Namespace-qualified type name.
    pub name: String,
    /// Custom attributes attached to this type.
    pub attributes: Vec<CustomAttribute>,
    /// Types nested inside this one.
    pub nested: Vec<TypeDef>,
}

impl TypeDef {
    /// Create an empty type definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            nested: Vec::new(),
        }
    }
}

/// In-memory mutable representation of one binary module.
#[derive(Debug, Clone)]
pub struct Module {
    /// The module's own identity.
    pub identity: ModuleIdentity,
    /// Full strong-name public key, present iff [`ModuleFlags::SIGNED`] is set.
    pub public_key: Option<Vec<u8>>,
    /// Module flag word.
    pub flags: ModuleFlags,
    /// Ordered identities of the modules this one references directly.
    pub references: Vec<ModuleIdentity>,
    /// Module-level custom attributes (friend declarations live here).
    pub attributes: Vec<CustomAttribute>,
    /// Top-level type definitions.
    pub types: Vec<TypeDef>,
    /// Embedded resources.
    pub resources: Vec<ResourceEntry>,
    /// File this module was loaded from; serialization overwrites it.
    pub path: PathBuf,
}

impl Module {
    /// Create an empty module with the given identity.
    #[must_use]
    pub fn new(identity: ModuleIdentity) -> Self {
        Self {
            identity,
            public_key: None,
            flags: ModuleFlags::empty(),
            references: Vec::new(),
            attributes: Vec::new(),
            types: Vec::new(),
            resources: Vec::new(),
            path: PathBuf::new(),
        }
    }

    /// `true` if the module carries strong-name key material.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.flags.contains(ModuleFlags::SIGNED)
    }

    /// `true` if any direct reference names `identity` (token ignored).
    #[must_use]
    pub fn references_module(&self, identity: &ModuleIdentity) -> bool {
        self.references.iter().any(|r| r == identity)
    }
}
