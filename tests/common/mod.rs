//! Shared helpers for building scratch module sets on disk.

#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use snrekey::prelude::*;

/// Build a structurally valid CAPI `PRIVATEKEYBLOB` for a 1024-bit key.
pub fn key_pair_blob() -> Vec<u8> {
    let mut blob = Vec::new();
    blob.push(0x07); // PRIVATEKEYBLOB
    blob.push(0x02);
    blob.extend_from_slice(&0u16.to_le_bytes());
    blob.extend_from_slice(&0x0000_2400u32.to_le_bytes()); // CALG_RSA_SIGN
    blob.extend_from_slice(&0x3241_5352u32.to_le_bytes()); // "RSA2"
    blob.extend_from_slice(&1024u32.to_le_bytes());
    blob.extend_from_slice(&65537u32.to_le_bytes());
    blob.extend_from_slice(&[0xAB; 128]); // modulus
    blob.extend_from_slice(&[0xCD; 320]); // private material, never parsed
    blob
}

pub fn test_key() -> StrongNameKey {
    StrongNameKey::from_blob(&key_pair_blob()).unwrap()
}

pub fn identity(name: &str, token: Option<[u8; 8]>) -> ModuleIdentity {
    ModuleIdentity::new(name, ModuleVersion::new(1, 0, 0, 0), None, token)
}

/// A module signed with `key`, referencing `references`.
pub fn signed_module(name: &str, key: &StrongNameKey, references: &[ModuleIdentity]) -> Module {
    let mut module = Module::new(identity(name, Some(key.token())));
    module.public_key = Some(key.public_key().to_vec());
    module.flags |= ModuleFlags::SIGNED;
    module.references = references.to_vec();
    module
}

/// An unsigned module referencing `references`.
pub fn unsigned_module(name: &str, references: &[ModuleIdentity]) -> Module {
    let mut module = Module::new(identity(name, None));
    module.references = references.to_vec();
    module
}

/// Serialize `module` into `dir/<file>` and return the path.
pub fn write_to(dir: &Path, file: &str, module: &Module) -> PathBuf {
    let path = dir.join(file);
    fs::write(&path, snrekey::write_module(module).unwrap()).unwrap();
    path
}

pub fn load(path: &Path) -> Module {
    FileEngine.load(path).unwrap()
}
