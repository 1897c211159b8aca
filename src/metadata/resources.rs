//! Embedded resource entries.
//!
//! A module can embed named binary blobs. Entries whose name carries the
//! reserved `.resources` suffix are serialized key/value tables; their payload
//! stores identity strings in fixed-slot, length-prefixed form, which is why the
//! resource patcher may only ever substitute byte sequences of identical length.
//! Everything else is opaque and never touched.

/// Reserved suffix marking a serialized key/value resource table.
pub const RESOURCE_TABLE_SUFFIX: &str = ".resources";

/// One embedded resource: a name and an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    /// Resource name, e.g. `MyApp.Strings.resources`.
    pub name: String,
    /// Raw payload bytes.
    pub data: Vec<u8>,
}

impl ResourceEntry {
    /// Create a resource entry.
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// `true` if this entry is a serialized key/value resource table.
    #[must_use]
    pub fn is_resource_table(&self) -> bool {
        self.name.ends_with(RESOURCE_TABLE_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_classification() {
        assert!(ResourceEntry::new("App.Strings.resources", vec![]).is_resource_table());
        assert!(!ResourceEntry::new("App.Icon.png", vec![]).is_resource_table());
        assert!(!ResourceEntry::new("resources", vec![]).is_resource_table());
    }
}
