//! Metadata engine seam and module location.
//!
//! The rekeying pipeline never touches bytes of a module image directly; it
//! goes through [`MetadataEngine`], the narrow interface a metadata backend has
//! to provide: load a file into the [`Module`] model, and serialize a mutated
//! module back over its file. [`FileEngine`] is the built-in backend for the
//! container format in [`crate::file`]; a full PE/metadata backend would plug in
//! at the same seam.
//!
//! [`ModuleLocator`] resolves target module *names* to files using the run's
//! search-directory list, and enumerates the candidate files a closure pass has
//! to look at.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    file,
    metadata::{identity::StrongNameKey, module::Module},
    Result,
};

/// File extensions recognized as binary module images.
pub const MODULE_EXTENSIONS: &[&str] = &["dll", "exe", "netmodule"];

/// The narrow interface the rekeying core needs from a metadata backend.
pub trait MetadataEngine {
    /// Load a module from a file.
    ///
    /// # Errors
    /// [`crate::Error::NotSupported`] must mean "this file is not a module
    /// image at all" - callers scanning directories treat it as expected noise.
    /// Every other error is reportable.
    fn load(&self, path: &Path) -> Result<Module>;

    /// Serialize a module back over its original file.
    ///
    /// When `key` is present the module's own identity is signed with it during
    /// serialization; the engine owns whatever that means for its format.
    ///
    /// # Errors
    /// Returns an error if serialization or the file write fails.
    fn save(&self, module: &Module, key: Option<&StrongNameKey>) -> Result<()>;
}

/// Built-in engine for the [`crate::file`] container format.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileEngine;

impl MetadataEngine for FileEngine {
    fn load(&self, path: &Path) -> Result<Module> {
        let data = fs::read(path)?;
        let mut module = file::read_module(&data)?;
        module.path = path.to_path_buf();
        Ok(module)
    }

    fn save(&self, module: &Module, _key: Option<&StrongNameKey>) -> Result<()> {
        // Key material was already installed on the module by the finalizer;
        // this format has no separate signature blob to compute.
        let bytes = file::write_module(module)?;
        fs::write(&module.path, bytes)?;
        Ok(())
    }
}

/// Resolves module names against a list of search directories.
pub struct ModuleLocator<'a> {
    engine: &'a dyn MetadataEngine,
    search_dirs: Vec<PathBuf>,
}

impl<'a> ModuleLocator<'a> {
    /// Create a locator over the given search directories.
    pub fn new(engine: &'a dyn MetadataEngine, search_dirs: &[PathBuf]) -> Self {
        Self {
            engine,
            search_dirs: search_dirs.to_vec(),
        }
    }

    /// Search directories this locator scans, in order.
    #[must_use]
    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Resolve a target name to a loaded module.
    ///
    /// Accepts a direct file path, or a bare name (with or without extension)
    /// tried against every search directory with every recognized extension.
    ///
    /// # Errors
    /// Returns [`crate::Error::ModuleNotFound`] if no candidate file loads as a
    /// module.
    pub fn resolve(&self, name: &str) -> Result<Module> {
        for candidate in self.candidate_paths(name) {
            if !candidate.is_file() {
                continue;
            }
            match self.engine.load(&candidate) {
                Ok(module) => return Ok(module),
                Err(e) => {
                    log::debug!(
                        "Candidate {} for '{}' did not load: {}",
                        candidate.display(),
                        name,
                        e
                    );
                }
            }
        }
        Err(crate::Error::ModuleNotFound(name.to_string()))
    }

    /// Every file with a recognized module extension across the search
    /// directories, in directory order. I/O errors on a directory are logged
    /// and that directory skipped.
    #[must_use]
    pub fn candidate_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for dir in &self.search_dirs {
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("Cannot scan search directory {}: {}", dir.display(), e);
                    continue;
                }
            };
            let mut in_dir: Vec<PathBuf> = entries
                .filter_map(std::result::Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.is_file() && has_module_extension(path))
                .collect();
            // Directory iteration order is filesystem-dependent; sort for a
            // deterministic processing order.
            in_dir.sort();
            files.extend(in_dir);
        }
        files
    }

    fn candidate_paths(&self, name: &str) -> Vec<PathBuf> {
        let direct = PathBuf::from(name);
        let mut candidates = vec![direct.clone()];

        for dir in &self.search_dirs {
            candidates.push(dir.join(name));
            for extension in MODULE_EXTENSIONS {
                candidates.push(dir.join(format!("{name}.{extension}")));
            }
        }
        candidates
    }
}

/// `true` if the path carries one of the recognized module extensions.
#[must_use]
pub fn has_module_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            MODULE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_recognition() {
        assert!(has_module_extension(Path::new("a/b/Thing.dll")));
        assert!(has_module_extension(Path::new("Thing.EXE")));
        assert!(has_module_extension(Path::new("Thing.netmodule")));
        assert!(!has_module_extension(Path::new("Thing.dll.config")));
        assert!(!has_module_extension(Path::new("Thing")));
    }
}
