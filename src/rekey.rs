//! Run orchestration: closure, rewrite, finalize, write.
//!
//! [`RekeyContext`] is the explicit run state - the engine, the search
//! directories and the optional signing key - threaded through every phase
//! instead of living in process globals, so the whole pipeline is testable
//! with a scratch directory and nothing else.
//!
//! Control flow per run: resolve targets and compute the dependency closure
//! (any failure here is fatal and happens before any write), then per closure
//! module rewrite references, patch resources, finalize the module's own
//! identity and hand it to the engine. A failure on one module skips that
//! module only; the run continues and reports what it wrote.

use std::path::PathBuf;

use crate::{
    dependencies::{find_closure, Closure},
    engine::{MetadataEngine, ModuleLocator},
    metadata::{
        identity::StrongNameKey,
        module::{Module, ModuleFlags},
    },
    rewrite::{
        references::rewrite_module,
        resources::{patch_module_resources, RewriteTable},
    },
    Result,
};

/// Explicit state of one rekeying run.
pub struct RekeyContext<'a> {
    engine: &'a dyn MetadataEngine,
    search_dirs: Vec<PathBuf>,
    key: Option<StrongNameKey>,
}

/// What a run wrote, and what it had to skip.
#[derive(Debug, Default)]
pub struct RekeySummary {
    /// Files successfully rewritten, in processing order.
    pub written: Vec<PathBuf>,
    /// Modules skipped due to per-module failures.
    pub skipped: usize,
}

impl<'a> RekeyContext<'a> {
    /// Create a run context.
    ///
    /// `key == None` means "strip signatures": every closure module ends up
    /// unsigned and every rewritten reference carries an empty token.
    pub fn new(
        engine: &'a dyn MetadataEngine,
        search_dirs: Vec<PathBuf>,
        key: Option<StrongNameKey>,
    ) -> Self {
        Self {
            engine,
            search_dirs,
            key,
        }
    }

    /// The signing key of this run, if any.
    #[must_use]
    pub fn key(&self) -> Option<&StrongNameKey> {
        self.key.as_ref()
    }

    /// Resolve the closure for `targets` without mutating anything.
    ///
    /// Returns each closure member's resolved file path in discovery order.
    ///
    /// # Errors
    /// Returns an error if a target cannot be resolved.
    pub fn list_dependencies(&self, targets: &[String]) -> Result<Vec<PathBuf>> {
        let closure = self.closure(targets)?;
        Ok(closure
            .modules
            .into_iter()
            .map(|module| module.path)
            .collect())
    }

    /// Rewrite and re-serialize every module affected by re-keying `targets`.
    ///
    /// # Errors
    /// Returns an error only for fatal, pre-write failures (unresolvable
    /// targets). Per-module rewrite or write failures are reported and counted
    /// in the summary instead.
    pub fn run(&self, targets: &[String]) -> Result<RekeySummary> {
        let closure = self.closure(targets)?;
        let new_token = self.key.as_ref().map(StrongNameKey::token);
        let table = RewriteTable::build(&closure.set, new_token);

        let Closure { modules, set } = closure;
        let mut summary = RekeySummary::default();

        for mut module in modules {
            let stats = rewrite_module(&mut module, &set, self.key.as_ref());
            let patched = patch_module_resources(&mut module, &table);
            self.finalize(&mut module);

            log::info!(
                "{}: {} reference(s), {} friend declaration(s), {} attribute scope(s), {} resource(s)",
                module.path.display(),
                stats.references,
                stats.friend_declarations,
                stats.attribute_scopes,
                patched
            );

            match self.engine.save(&module, self.key.as_ref()) {
                Ok(()) => summary.written.push(module.path),
                Err(e) => {
                    log::error!("Failed to write {}: {}", module.path.display(), e);
                    summary.skipped += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Apply or strip the run's key material on the module's own identity.
    ///
    /// With a key: install the public key, the derived token and the signed
    /// flag; actual signing happens inside the engine's `save`. Without one:
    /// drop the key material, clear the flag, empty the token.
    fn finalize(&self, module: &mut Module) {
        match &self.key {
            Some(key) => {
                module.identity.public_key_token = Some(key.token());
                module.public_key = Some(key.public_key().to_vec());
                module.flags |= ModuleFlags::SIGNED;
            }
            None => {
                module.identity.public_key_token = None;
                module.public_key = None;
                module.flags -= ModuleFlags::SIGNED;
            }
        }
    }

    fn closure(&self, targets: &[String]) -> Result<Closure> {
        let locator = ModuleLocator::new(self.engine, &self.search_dirs);
        find_closure(self.engine, &locator, targets)
    }
}
