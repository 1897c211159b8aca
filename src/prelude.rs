//! # snrekey Prelude
//!
//! Convenient prelude for the most commonly used types from the crate. Import
//! this module to get quick access to everything a typical rekeying run needs.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all snrekey operations
pub use crate::Error;

/// The result type used throughout snrekey
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The run context tying closure discovery, rewriting and writing together
pub use crate::rekey::{RekeyContext, RekeySummary};

/// The metadata backend seam and the built-in container engine
pub use crate::engine::{FileEngine, MetadataEngine, ModuleLocator};

// ================================================================================================
// Identity and Key Material
// ================================================================================================

/// Module identity, versioning and strong-name keys
pub use crate::metadata::identity::{ModuleIdentity, ModuleVersion, StrongNameKey};

// ================================================================================================
// Module Model
// ================================================================================================

/// The mutable module unit and its flag word
pub use crate::metadata::module::{Module, ModuleFlags, TypeDef};

/// Custom attribute model
pub use crate::metadata::customattributes::{
    AttributeArgument, CustomAttribute, NamedArgument, TypeRef, FRIEND_ACCESS_ATTRIBUTE,
};

/// Embedded resources
pub use crate::metadata::resources::{ResourceEntry, RESOURCE_TABLE_SUFFIX};

// ================================================================================================
// Pipeline Pieces
// ================================================================================================

/// Dependency closure discovery
pub use crate::dependencies::{find_closure, Closure, DependencySet};

/// Reference and resource rewriting
pub use crate::rewrite::{
    references::{rewrite_module, RewriteStats},
    resources::{patch_module_resources, RewriteTable},
};

/// Low-level container parsing
pub use crate::{read_module, write_module, Parser};
