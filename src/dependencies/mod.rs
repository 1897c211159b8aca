//! Dependency closure discovery.
//!
//! Re-keying one module invalidates every module that references it, directly
//! or through a chain. [`find_closure`] computes that transitive set with a
//! conservative fixed point: full repeated passes over every candidate file in
//! the search directories, until a pass adds nothing. A module newly drawn into
//! the closure may itself be referenced by a module already scanned and
//! rejected, which is exactly why single-sweep scanning is not enough; the
//! redundant re-scans buy correctness with no index to maintain, and the pass
//! count is bounded by the finite file set.
//!
//! # Key Components
//!
//! - [`DependencySet`] - monotone, insertion-ordered identity set
//! - [`find_closure`] - seed resolution plus the fixed-point scan

use std::collections::HashSet;

use crate::{
    engine::{MetadataEngine, ModuleLocator},
    metadata::{identity::ModuleIdentity, module::Module},
    Error, Result,
};

/// Monotone set of module identities accumulated during closure discovery.
///
/// Membership uses the token-ignoring equality of [`ModuleIdentity`], so a
/// reference that still carries the old token matches a member that was
/// discovered with a different one. Insertion order is preserved and determines
/// processing order; members are never removed.
#[derive(Debug, Default)]
pub struct DependencySet {
    members: Vec<ModuleIdentity>,
    index: HashSet<ModuleIdentity>,
}

impl DependencySet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an identity; returns `false` if it was already a member.
    pub fn insert(&mut self, identity: ModuleIdentity) -> bool {
        if self.index.insert(identity.clone()) {
            self.members.push(identity);
            true
        } else {
            false
        }
    }

    /// `true` if `identity` is a member (token ignored).
    #[must_use]
    pub fn contains(&self, identity: &ModuleIdentity) -> bool {
        self.index.contains(identity)
    }

    /// `true` if any of `references` is a member.
    #[must_use]
    pub fn contains_any(&self, references: &[ModuleIdentity]) -> bool {
        references.iter().any(|r| self.contains(r))
    }

    /// Members in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ModuleIdentity> {
        self.members.iter()
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// `true` if the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Result of closure discovery: the affected modules in discovery order, plus
/// the identity set that drew them in.
pub struct Closure {
    /// Modules to rewrite, targets first, then dependents in discovery order.
    pub modules: Vec<Module>,
    /// Identities of every closure member.
    pub set: DependencySet,
}

/// Discover every module affected by re-keying the named targets.
///
/// Seeds are resolved through the locator (a miss is fatal - nothing has been
/// written yet, so the run can still abort cleanly). The fixed point then
/// repeatedly scans every recognized-extension file across the search
/// directories, pulling in any module that references a member, until a full
/// pass adds nothing.
///
/// Files that fail to parse as modules are expected noise and logged at debug
/// level only; any other load failure is reported and the file skipped.
///
/// # Errors
/// Returns [`Error::ModuleNotFound`] if a target name cannot be resolved.
pub fn find_closure(
    engine: &dyn MetadataEngine,
    locator: &ModuleLocator<'_>,
    targets: &[String],
) -> Result<Closure> {
    let mut set = DependencySet::new();
    let mut modules = Vec::new();

    for target in targets {
        let module = locator.resolve(target)?;
        log::info!(
            "Target '{}' resolved to {} ({})",
            target,
            module.path.display(),
            module.identity
        );
        if set.insert(module.identity.clone()) {
            modules.push(module);
        }
    }

    let candidates = locator.candidate_files();
    let mut pass = 0usize;
    loop {
        pass += 1;
        let mut progressed = false;

        for path in &candidates {
            let module = match engine.load(path) {
                Ok(module) => module,
                Err(e) if is_parse_noise(&e) => {
                    log::debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
                Err(e) => {
                    log::warn!("Failed to load {}: {}", path.display(), e);
                    continue;
                }
            };

            if set.contains(&module.identity) {
                continue;
            }
            if set.contains_any(&module.references) {
                log::debug!(
                    "Pass {}: {} joins the closure via its references",
                    pass,
                    module.identity
                );
                set.insert(module.identity.clone());
                modules.push(module);
                progressed = true;
            }
        }

        if !progressed {
            break;
        }
    }

    log::info!(
        "Dependency closure: {} module(s) after {} pass(es)",
        set.len(),
        pass
    );
    Ok(Closure { modules, set })
}

/// Load failures that just mean "not a module": expected scan noise.
fn is_parse_noise(error: &Error) -> bool {
    matches!(
        error,
        Error::NotSupported | Error::Malformed { .. } | Error::OutOfBounds | Error::Empty
    )
}
