//! Dependency closure discovery over real directories.

mod common;

use std::fs;

use snrekey::prelude::*;

use common::{identity, test_key, unsigned_module, write_to};

#[test]
fn closure_includes_transitive_dependents() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let a = write_to(dir.path(), "A.dll", &unsigned_module("A", &[]));
    let b = write_to(
        dir.path(),
        "B.dll",
        &unsigned_module("B", &[identity("A", None)]),
    );
    // Named so it scans *before* B: C cannot join until a later pass has
    // already drawn B in, which is exactly what the fixed point is for.
    let c = write_to(
        dir.path(),
        "0C.dll",
        &unsigned_module("C", &[identity("B", None)]),
    );
    write_to(
        dir.path(),
        "D.dll",
        &unsigned_module("D", &[identity("Elsewhere", None)]),
    );

    let engine = FileEngine;
    let context = RekeyContext::new(&engine, vec![dir.path().to_path_buf()], None);
    let paths = context.list_dependencies(&["A".to_string()])?;

    assert_eq!(paths, vec![a, b, c]);
    Ok(())
}

#[test]
fn unrelated_modules_are_excluded() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let a = write_to(dir.path(), "A.dll", &unsigned_module("A", &[]));
    let b = write_to(
        dir.path(),
        "B.dll",
        &unsigned_module("B", &[identity("A", None)]),
    );
    write_to(dir.path(), "C.dll", &unsigned_module("C", &[]));

    let engine = FileEngine;
    let context = RekeyContext::new(&engine, vec![dir.path().to_path_buf()], None);
    let paths = context.list_dependencies(&["A".to_string()])?;

    assert_eq!(paths, vec![a, b]);
    Ok(())
}

#[test]
fn non_module_files_are_ignored() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let a = write_to(dir.path(), "A.dll", &unsigned_module("A", &[]));
    // Same extension, not a module image: expected scan noise.
    fs::write(dir.path().join("native.dll"), b"MZ\x90\x00garbage")?;
    fs::write(dir.path().join("empty.dll"), b"")?;
    fs::write(dir.path().join("readme.txt"), b"not scanned at all")?;

    let engine = FileEngine;
    let context = RekeyContext::new(&engine, vec![dir.path().to_path_buf()], None);
    let paths = context.list_dependencies(&["A".to_string()])?;

    assert_eq!(paths, vec![a]);
    Ok(())
}

#[test]
fn hostile_table_counts_are_scan_noise() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let a = write_to(dir.path(), "A.dll", &unsigned_module("A", &[]));

    // Valid magic, lying reference count: must be skipped like any other
    // unreadable file, not abort the scan.
    let mut bytes = snrekey::write_module(&unsigned_module("Evil", &[])).unwrap();
    let at = bytes.len() - 16;
    bytes[at..at + 4].copy_from_slice(&u32::MAX.to_le_bytes());
    fs::write(dir.path().join("evil.dll"), &bytes)?;

    let engine = FileEngine;
    let context = RekeyContext::new(&engine, vec![dir.path().to_path_buf()], None);
    let paths = context.list_dependencies(&["A".to_string()])?;

    assert_eq!(paths, vec![a]);
    Ok(())
}

#[test]
fn closure_spans_multiple_directories() -> Result<()> {
    let dir_a = tempfile::tempdir()?;
    let dir_b = tempfile::tempdir()?;
    let a = write_to(dir_a.path(), "A.dll", &unsigned_module("A", &[]));
    let b = write_to(
        dir_b.path(),
        "B.exe",
        &unsigned_module("B", &[identity("A", None)]),
    );

    let engine = FileEngine;
    let context = RekeyContext::new(
        &engine,
        vec![dir_a.path().to_path_buf(), dir_b.path().to_path_buf()],
        None,
    );
    let paths = context.list_dependencies(&["A".to_string()])?;

    assert_eq!(paths, vec![a, b]);
    Ok(())
}

#[test]
fn multiple_targets_are_all_seeds() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let a = write_to(dir.path(), "A.dll", &unsigned_module("A", &[]));
    let x = write_to(dir.path(), "X.dll", &unsigned_module("X", &[]));
    let b = write_to(
        dir.path(),
        "B.dll",
        &unsigned_module("B", &[identity("X", None)]),
    );

    let engine = FileEngine;
    let context = RekeyContext::new(&engine, vec![dir.path().to_path_buf()], None);
    let paths = context.list_dependencies(&["A".to_string(), "X".to_string()])?;

    assert_eq!(paths, vec![a, x, b]);
    Ok(())
}

#[test]
fn unresolvable_target_aborts_before_any_write() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let a_path = write_to(dir.path(), "A.dll", &unsigned_module("A", &[]));
    let before = fs::read(&a_path)?;

    let engine = FileEngine;
    let context = RekeyContext::new(
        &engine,
        vec![dir.path().to_path_buf()],
        Some(test_key()),
    );
    let result = context.run(&["A".to_string(), "Missing".to_string()]);

    assert!(matches!(result, Err(Error::ModuleNotFound(name)) if name == "Missing"));
    assert_eq!(fs::read(&a_path)?, before);
    Ok(())
}

#[test]
fn targets_resolve_by_direct_path_too() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let a = write_to(dir.path(), "A.netmodule", &unsigned_module("A", &[]));

    let engine = FileEngine;
    // No search directory carries the file under a probeable name; the direct
    // path still resolves.
    let context = RekeyContext::new(&engine, vec![], None);
    let paths = context.list_dependencies(&[a.display().to_string()])?;

    assert_eq!(paths, vec![a]);
    Ok(())
}
