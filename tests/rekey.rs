//! End-to-end rekeying scenarios over scratch directories.

mod common;

use std::fs;

use snrekey::prelude::*;

use common::{identity, load, signed_module, test_key, unsigned_module, write_to};

/// Three modules: A (target, signed), B (references A), C (unrelated).
/// Stripping must unsign A, clear B's reference token, and leave C alone.
#[test]
fn strip_updates_target_and_dependent_only() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let key = test_key();

    let a_path = write_to(dir.path(), "A.dll", &signed_module("A", &key, &[]));
    let b_path = write_to(
        dir.path(),
        "B.dll",
        &unsigned_module("B", &[identity("A", Some(key.token()))]),
    );
    let c_path = write_to(
        dir.path(),
        "C.dll",
        &unsigned_module("C", &[identity("Elsewhere", None)]),
    );
    let c_before = fs::read(&c_path)?;

    let engine = FileEngine;
    let context = RekeyContext::new(&engine, vec![dir.path().to_path_buf()], None);
    let summary = context.run(&["A".to_string()])?;

    assert_eq!(summary.written, vec![a_path.clone(), b_path.clone()]);
    assert_eq!(summary.skipped, 0);

    let a = load(&a_path);
    assert_eq!(a.identity.public_key_token, None);
    assert_eq!(a.public_key, None);
    assert!(!a.is_signed());

    let b = load(&b_path);
    assert_eq!(b.references[0].public_key_token, None);
    assert_eq!(b.identity.public_key_token, None);

    // C must be byte-for-byte untouched.
    assert_eq!(fs::read(&c_path)?, c_before);
    Ok(())
}

#[test]
fn signing_installs_key_across_the_closure() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let key = test_key();

    let a_path = write_to(dir.path(), "A.dll", &unsigned_module("A", &[]));
    let b_path = write_to(
        dir.path(),
        "B.dll",
        &unsigned_module("B", &[identity("A", None), identity("Other", Some([5; 8]))]),
    );

    let engine = FileEngine;
    let context = RekeyContext::new(&engine, vec![dir.path().to_path_buf()], Some(key.clone()));
    let summary = context.run(&["A".to_string()])?;
    assert_eq!(summary.written.len(), 2);

    let a = load(&a_path);
    assert_eq!(a.identity.public_key_token, Some(key.token()));
    assert_eq!(a.public_key.as_deref(), Some(key.public_key()));
    assert!(a.is_signed());

    let b = load(&b_path);
    assert_eq!(b.references[0].public_key_token, Some(key.token()));
    // References outside the closure keep their token.
    assert_eq!(b.references[1].public_key_token, Some([5; 8]));
    Ok(())
}

/// A friend declaration `"B"` on module A, with B in the dependency set and a
/// key supplied, becomes `"B, PublicKey=<hex of the full key>"`.
#[test]
fn friend_declaration_gains_full_public_key() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let key = test_key();

    let mut a = unsigned_module("A", &[]);
    a.attributes.push(CustomAttribute::friend_access("B"));
    let a_path = write_to(dir.path(), "A.dll", &a);
    write_to(
        dir.path(),
        "B.dll",
        &unsigned_module("B", &[identity("A", None)]),
    );

    let engine = FileEngine;
    let context = RekeyContext::new(&engine, vec![dir.path().to_path_buf()], Some(key.clone()));
    context.run(&["A".to_string()])?;

    let a = load(&a_path);
    let AttributeArgument::String(arg) = &a.attributes[0].fixed_args[0] else {
        panic!("friend argument must stay a string");
    };
    assert_eq!(arg, &format!("B, PublicKey={}", key.public_key_hex()));
    Ok(())
}

/// A resource payload embedding `A, ..., PublicKeyToken=null` (padded) gets
/// the derived token substituted at identical byte length.
#[test]
fn resource_identity_string_patched_at_same_length() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let key = test_key();

    let a_path = write_to(dir.path(), "A.dll", &unsigned_module("A", &[]));
    let embedded = identity("A", None).qualified_name_padded();
    let mut payload = vec![embedded.len() as u8];
    payload.extend_from_slice(embedded.as_bytes());

    let mut b = unsigned_module("B", &[identity("A", None)]);
    b.resources
        .push(ResourceEntry::new("B.Strings.resources", payload.clone()));
    b.resources
        .push(ResourceEntry::new("B.Logo.bin", payload.clone()));
    let b_path = write_to(dir.path(), "B.dll", &b);

    let engine = FileEngine;
    let context = RekeyContext::new(&engine, vec![dir.path().to_path_buf()], Some(key.clone()));
    context.run(&["A".to_string()])?;

    let b = load(&b_path);
    assert_eq!(b.resources[0].data.len(), payload.len());
    let text = String::from_utf8(b.resources[0].data[1..].to_vec()).unwrap();
    assert!(text.contains(&format!("PublicKeyToken={}", key.token_hex())));
    // Only the key/value resource table is patched; other blobs stay put.
    assert_eq!(b.resources[1].data, payload);

    // Reload path sanity: the patched image still round-trips.
    assert_eq!(load(&a_path).identity.public_key_token, Some(key.token()));
    Ok(())
}

#[test]
fn second_run_is_a_no_op() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let key = test_key();

    let mut a = unsigned_module("A", &[]);
    a.attributes.push(CustomAttribute::friend_access("B"));
    let embedded = identity("A", None).qualified_name_padded();
    a.resources.push(ResourceEntry::new(
        "A.Strings.resources",
        embedded.clone().into_bytes(),
    ));
    let a_path = write_to(dir.path(), "A.dll", &a);
    let b_path = write_to(
        dir.path(),
        "B.dll",
        &unsigned_module("B", &[identity("A", None)]),
    );

    let engine = FileEngine;
    let context = RekeyContext::new(&engine, vec![dir.path().to_path_buf()], Some(key.clone()));

    context.run(&["A".to_string()])?;
    let a_first = fs::read(&a_path)?;
    let b_first = fs::read(&b_path)?;

    context.run(&["A".to_string()])?;
    assert_eq!(fs::read(&a_path)?, a_first);
    assert_eq!(fs::read(&b_path)?, b_first);
    Ok(())
}

#[test]
fn strip_twice_is_also_a_no_op() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let key = test_key();

    let a_path = write_to(dir.path(), "A.dll", &signed_module("A", &key, &[]));

    let engine = FileEngine;
    let context = RekeyContext::new(&engine, vec![dir.path().to_path_buf()], None);

    context.run(&["A".to_string()])?;
    let first = fs::read(&a_path)?;
    context.run(&["A".to_string()])?;
    assert_eq!(fs::read(&a_path)?, first);
    Ok(())
}

#[test]
fn attribute_scopes_rewritten_through_nested_types() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let key = test_key();

    write_to(dir.path(), "A.dll", &unsigned_module("A", &[]));

    let mut inner = TypeDef::new("B.Outer/Inner");
    inner.attributes.push(CustomAttribute::new(
        TypeRef::local("MarkerAttribute"),
        vec![AttributeArgument::Type(TypeRef::external(
            "A.Widget",
            identity("A", None),
        ))],
    ));
    let mut outer = TypeDef::new("B.Outer");
    outer.nested.push(inner);
    let mut b = unsigned_module("B", &[identity("A", None)]);
    b.types.push(outer);
    let b_path = write_to(dir.path(), "B.dll", &b);

    let engine = FileEngine;
    let context = RekeyContext::new(&engine, vec![dir.path().to_path_buf()], Some(key.clone()));
    context.run(&["A".to_string()])?;

    let b = load(&b_path);
    let AttributeArgument::Type(type_arg) = &b.types[0].nested[0].attributes[0].fixed_args[0]
    else {
        panic!("expected type argument");
    };
    assert_eq!(
        type_arg.scope.as_ref().unwrap().public_key_token,
        Some(key.token())
    );
    Ok(())
}
