//! Module identity and strong-name key material.
//!
//! This module is the foundation for everything the rewriter does: a module is
//! identified by its simple name, four-part version, culture and public-key-token,
//! and the whole tool is about swapping that token consistently across a set of
//! modules.
//!
//! # Key Components
//!
//! - [`ModuleIdentity`] - name, version, culture and token of one module
//! - [`ModuleVersion`] - four-part version numbering with parsing and comparison
//! - [`StrongNameKey`] - key-pair blob parsing and public-key-token derivation
//!
//! # Equality Semantics
//!
//! The `public_key_token` field is **excluded** from equality comparison and
//! hashing: two identities describe the same logical module when their name,
//! version and culture match, regardless of how (or whether) they are currently
//! signed. This is what lets the dependency closure recognize a reference to a
//! module whose token is about to change.

pub use cryptographic::StrongNameKey;

mod cryptographic;

use std::fmt::{self, Write as _};

use crate::{Error, Result};

/// Number of hex characters in a rendered public-key-token.
///
/// The padded rendering of a missing token (`null` plus trailing spaces) is
/// widened to exactly this many bytes so that signing and unsigning can swap
/// the token field without changing the string's byte length.
const TOKEN_HEX_WIDTH: usize = 16;

/// Complete identity of one managed module.
///
/// The canonical string form (via [`fmt::Display`]) is
/// `Name, Version=a.b.c.d, Culture=neutral, PublicKeyToken=xxxxxxxxxxxxxxxx`
/// with the literal `null` when no token is present. This must match the
/// convention the metadata engine uses for reference identities, because the
/// resource patcher searches for these exact byte sequences.
#[derive(Debug, Clone)]
pub struct ModuleIdentity {
    /// Simple module name (e.g. "MyLibrary"), without extension.
    pub name: String,
    /// Four-part version used for reference matching.
    pub version: ModuleVersion,
    /// Localization culture; `None` is rendered as `neutral`.
    pub culture: Option<String>,
    /// 8-byte public-key-token; `None` means unsigned.
    pub public_key_token: Option<[u8; 8]>,
}

impl PartialEq for ModuleIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.version == other.version && self.culture == other.culture
        // public_key_token is excluded: the same logical module may appear
        // signed in one reference and unsigned in another mid-rewrite.
    }
}

impl Eq for ModuleIdentity {}

impl std::hash::Hash for ModuleIdentity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.version.hash(state);
        self.culture.hash(state);
        // public_key_token is excluded, matching PartialEq.
    }
}

impl ModuleIdentity {
    /// Create a new identity from its components.
    pub fn new(
        name: impl Into<String>,
        version: ModuleVersion,
        culture: Option<String>,
        public_key_token: Option<[u8; 8]>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            culture,
            public_key_token,
        }
    }

    /// Parse an identity from its display-name form.
    ///
    /// Accepts `Name[, Version=a.b.c.d][, Culture=xx][, PublicKeyToken=hex|null]`.
    /// Unknown `Key=Value` parts are ignored, a missing version defaults to
    /// `0.0.0.0`, and `Culture=neutral` maps to `None`.
    ///
    /// # Errors
    /// Returns [`Error::Malformed`] for an empty name, a bad version number or a
    /// token that is not exactly 16 hex characters.
    pub fn parse(display_name: &str) -> Result<Self> {
        let parts: Vec<&str> = display_name.split(',').map(str::trim).collect();

        let name = parts[0].to_string();
        if name.is_empty() {
            return Err(malformed_error!(
                "Module name cannot be empty in '{}'",
                display_name
            ));
        }

        let mut version = ModuleVersion::new(0, 0, 0, 0);
        let mut culture = None;
        let mut public_key_token = None;

        for part in parts.iter().skip(1) {
            if let Some(value) = part.strip_prefix("Version=") {
                version = ModuleVersion::parse(value)?;
            } else if let Some(value) = part.strip_prefix("Culture=") {
                if value != "neutral" {
                    culture = Some(value.to_string());
                }
            } else if let Some(value) = part.strip_prefix("PublicKeyToken=") {
                let value = value.trim_end();
                if value != "null" && !value.is_empty() {
                    let bytes = hex::decode(value).map_err(|e| {
                        malformed_error!("Invalid hex in PublicKeyToken '{}': {}", value, e)
                    })?;
                    let token: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                        malformed_error!(
                            "PublicKeyToken must be exactly 8 bytes (16 hex characters), got {} bytes from '{}'",
                            bytes.len(),
                            value
                        )
                    })?;
                    public_key_token = Some(token);
                }
            }
        }

        Ok(Self {
            name,
            version,
            culture,
            public_key_token,
        })
    }

    /// Copy of this identity carrying a different token.
    #[must_use]
    pub fn with_token(&self, token: Option<[u8; 8]>) -> Self {
        Self {
            name: self.name.clone(),
            version: self.version,
            culture: self.culture.clone(),
            public_key_token: token,
        }
    }

    /// Simple name without version or culture information.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        &self.name
    }

    /// `true` if this identity carries a public-key-token.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.public_key_token.is_some()
    }

    /// Canonical string form with the token field padded to a fixed width.
    ///
    /// Identical to the [`fmt::Display`] form except that a missing token is
    /// rendered as `null` followed by trailing spaces up to the width of a full
    /// 16-hex-character token. Serialized resource tables store identity strings
    /// in length-prefixed slots that cannot be resized, so the padded form keeps
    /// signing and unsigning byte-length-neutral whenever possible.
    #[must_use]
    pub fn qualified_name_padded(&self) -> String {
        self.render(true)
    }

    fn render(&self, pad_null_token: bool) -> String {
        let mut result = String::with_capacity(self.name.len() + 80);

        result.push_str(&self.name);
        let _ = write!(result, ", Version={}", self.version);
        let _ = write!(
            result,
            ", Culture={}",
            self.culture.as_deref().unwrap_or("neutral")
        );

        result.push_str(", PublicKeyToken=");
        match &self.public_key_token {
            Some(token) => result.push_str(&hex::encode(token)),
            None => {
                result.push_str("null");
                if pad_null_token {
                    for _ in "null".len()..TOKEN_HEX_WIDTH {
                        result.push(' ');
                    }
                }
            }
        }

        result
    }
}

impl fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

/// Four-part version number of a managed module.
///
/// Compared component-wise in order: major, minor, build, revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleVersion {
    /// Major version component.
    pub major: u16,
    /// Minor version component.
    pub minor: u16,
    /// Build version component.
    pub build: u16,
    /// Revision version component.
    pub revision: u16,
}

impl ModuleVersion {
    /// Create a version from its four components.
    #[must_use]
    pub fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Parse a `major.minor.build.revision` string.
    ///
    /// # Errors
    /// Returns [`Error::Malformed`] unless exactly four dot-separated `u16`
    /// components are present.
    pub fn parse(value: &str) -> Result<Self> {
        let components: Vec<&str> = value.split('.').collect();
        if components.len() != 4 {
            return Err(malformed_error!(
                "Version must have exactly 4 components, got '{}'",
                value
            ));
        }

        let mut numbers = [0u16; 4];
        for (slot, component) in numbers.iter_mut().zip(&components) {
            *slot = component
                .parse::<u16>()
                .map_err(|e| malformed_error!("Invalid version component '{}': {}", component, e))?;
        }

        Ok(Self::new(numbers[0], numbers[1], numbers[2], numbers[3]))
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

impl std::str::FromStr for ModuleVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
