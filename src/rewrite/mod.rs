//! In-place rewriting of everything that can name a re-keyed module.
//!
//! Per closure module, two passes run in order:
//!
//! 1. [`references::rewrite_module`] - direct references, friend-access
//!    declarations and attribute-embedded type scopes
//! 2. [`resources::patch_module_resources`] - identity strings baked into
//!    serialized resource payloads, under the strict equal-byte-length rule
//!
//! Both passes mutate the [`crate::metadata::module::Module`] in memory;
//! nothing is serialized until the finalizer hands the module to the engine.

pub mod references;
pub mod resources;
