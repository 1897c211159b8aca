//! Domain model for managed module metadata.
//!
//! The model is deliberately narrow: it carries exactly the shapes the
//! rekeying pipeline mutates, consumed through the engine seam in
//! [`crate::engine`].
//!
//! # Module Structure
//!
//! - [`identity`] - module identity, versioning and strong-name key material
//! - [`module`] - the mutable [`module::Module`] unit with its reference,
//!   attribute, type and resource tables
//! - [`customattributes`] - tagged-variant attribute argument tree
//! - [`resources`] - embedded resource entries and table classification

pub mod customattributes;
pub mod identity;
pub mod module;
pub mod resources;
