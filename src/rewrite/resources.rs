//! Identity patching inside serialized resource payloads.
//!
//! Serialized key/value resource tables store strings in fixed-slot,
//! length-prefixed form. Resizing a slot would corrupt every offset behind it,
//! so the only safe rewrite is an exact, equal-byte-length substitution: the
//! [`RewriteTable`] maps an identity's padded canonical string to the same
//! string with the new token, drops any pair whose encodings differ in length
//! (never applied partially), and [`RewriteTable::apply`] performs a single
//! streaming pass that preserves total payload length by construction.
//!
//! The padding scheme in
//! [`crate::metadata::identity::ModuleIdentity::qualified_name_padded`] widens
//! the `null` token to the width of a full hex token, so signing an unsigned
//! identity (and vice versa) is still length-neutral. Embedded strings that
//! were written *without* that padding simply never match and stay stale - a
//! deliberate limitation of the format, not an error.

use crate::{
    dependencies::DependencySet,
    metadata::module::Module,
};

/// Byte-level substitution table for one closure run.
///
/// Entries pair the old canonical identity string (as discovered) with the new
/// one (same identity, new token), both in padded UTF-8 form. Only pairs of
/// identical byte length survive construction.
#[derive(Debug, Default)]
pub struct RewriteTable {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
}

impl RewriteTable {
    /// Build the table from the closure's identity set and the run's new token.
    #[must_use]
    pub fn build(set: &DependencySet, new_token: Option<[u8; 8]>) -> Self {
        let mut entries = Vec::new();
        for member in set.iter() {
            let old = member.qualified_name_padded().into_bytes();
            let new = member.with_token(new_token).qualified_name_padded().into_bytes();
            if old == new {
                continue;
            }
            if old.len() != new.len() {
                // Cannot be patched in place; dropped whole, never truncated.
                log::debug!(
                    "Dropping resource rewrite for '{}': {} -> {} bytes",
                    member,
                    old.len(),
                    new.len()
                );
                continue;
            }
            entries.push((old, new));
        }
        Self { entries }
    }

    /// `true` if no identity can be rewritten at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Substitute all old byte sequences in `data`, returning the patched
    /// payload and the number of replacements.
    ///
    /// Single streaming pass: at each position every configured sequence is
    /// tried; on a match the replacement is emitted and the cursor skips the
    /// match, otherwise one byte is copied. Sequences are full identity strings
    /// and cannot be substrings of one another under the padding scheme, so no
    /// longest-match tie-breaking is needed. Output length always equals input
    /// length.
    #[must_use]
    pub fn apply(&self, data: &[u8]) -> (Vec<u8>, usize) {
        let mut out = Vec::with_capacity(data.len());
        let mut applied = 0;
        let mut pos = 0;

        while pos < data.len() {
            let matched = self
                .entries
                .iter()
                .find(|(old, _)| data[pos..].starts_with(old));
            match matched {
                Some((old, new)) => {
                    out.extend_from_slice(new);
                    pos += old.len();
                    applied += 1;
                }
                None => {
                    out.push(data[pos]);
                    pos += 1;
                }
            }
        }

        debug_assert_eq!(out.len(), data.len());
        (out, applied)
    }
}

/// Patch every key/value resource table in `module`, in place.
///
/// Payloads are re-embedded only when at least one substitution actually
/// fired; untouched resources keep their original buffers byte for byte.
/// Returns the number of resource entries that were modified.
pub fn patch_module_resources(module: &mut Module, table: &RewriteTable) -> usize {
    if table.is_empty() {
        return 0;
    }

    let mut patched = 0;
    for resource in &mut module.resources {
        if !resource.is_resource_table() {
            continue;
        }
        let (data, applied) = table.apply(&resource.data);
        if applied > 0 {
            log::debug!(
                "{}: {} identity string(s) patched in resource '{}'",
                module.identity.simple_name(),
                applied,
                resource.name
            );
            resource.data = data;
            patched += 1;
        }
    }
    patched
}
