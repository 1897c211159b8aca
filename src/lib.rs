// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]

//! # snrekey
//!
//! Re-keys the strong-name identity of managed binary modules and propagates the
//! change through every module that depends on them, so the whole set stays
//! mutually consistent and loadable.
//!
//! Changing (or stripping) a module's signing key changes its public-key-token,
//! and that token is baked into more places than the obvious reference table:
//!
//! - **Direct references** in every dependent module
//! - **Friend-access declarations**, which embed the full public key
//! - **Attribute arguments** carrying assembly-qualified type references
//! - **Serialized resource payloads** with canonical identity strings inside
//!
//! The hard part is not reading the module format - that sits behind the
//! [`engine::MetadataEngine`] seam - but the closure-and-consistency algorithm:
//! find the full transitive set of affected modules, then rewrite every place
//! the old identity can appear while preserving the byte-length invariants the
//! container formats silently assume.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snrekey::prelude::*;
//!
//! let engine = FileEngine;
//! let key = StrongNameKey::from_file("app.snk".as_ref())?;
//! let context = RekeyContext::new(&engine, vec!["bin".into()], Some(key));
//!
//! let summary = context.run(&["MyApp.Core".to_string()])?;
//! println!("rewrote {} module(s)", summary.written.len());
//! # Ok::<(), snrekey::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`metadata`] - identity, key material and the mutable module model
//! - [`engine`] - the metadata backend seam plus the built-in container engine
//! - [`dependencies`] - fixed-point dependency closure discovery
//! - [`rewrite`] - in-place reference, friend and resource rewriting
//! - [`rekey`] - the run context tying the phases together
//!
//! Runs are single-threaded by design: closure discovery, rewriting and
//! writing are each a sequential pass, modules are exclusively owned by the
//! pass operating on them, and a failure on one module skips that module
//! without aborting the rest.

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Convenient re-exports of the most commonly used types and traits.
///
/// ```rust,no_run
/// use snrekey::prelude::*;
///
/// let engine = FileEngine;
/// let context = RekeyContext::new(&engine, vec!["bin".into()], None);
/// let paths = context.list_dependencies(&["MyApp.Core".to_string()])?;
/// # Ok::<(), snrekey::Error>(())
/// ```
pub mod prelude;

pub mod dependencies;
pub mod engine;
pub mod metadata;
pub mod rekey;
pub mod rewrite;

pub use error::Error;
pub use file::parser::Parser;
pub use file::{read_module, write_module, FORMAT_VERSION, MODULE_MAGIC};

/// `snrekey` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is
/// always [`Error`], used consistently throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
