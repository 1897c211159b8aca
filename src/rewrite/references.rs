//! Reference, friend-declaration and attribute-scope rewriting.
//!
//! Three places inside a module can name a re-keyed identity, and each needs a
//! different fix:
//!
//! 1. **Direct references** carry the token of the module they bind to; the
//!    highest-confidence rewrite, run first.
//! 2. **Friend-access declarations** grant access by simple name plus the
//!    *full* public key (a trust relationship, not an identity reference), so
//!    they get the new key's hex, not the token.
//! 3. **Attribute arguments** own copies of type scopes: an attribute's own
//!    type, an enum argument's declaring type, or a type passed as a value can
//!    each point into an external module. These are walked recursively as the
//!    tagged-variant tree they are, nested types included.

use crate::{
    dependencies::DependencySet,
    metadata::{
        customattributes::{AttributeArgument, CustomAttribute, TypeRef},
        identity::StrongNameKey,
        module::{Module, TypeDef},
    },
};

/// Counts of what one rewrite pass touched, for logging and assertions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RewriteStats {
    /// Direct reference entries whose token was replaced.
    pub references: usize,
    /// Friend-access declaration arguments rewritten.
    pub friend_declarations: usize,
    /// Attribute-embedded type scopes whose token was replaced.
    pub attribute_scopes: usize,
}

/// Rewrite every occurrence of a closure identity inside `module`.
///
/// With `key` present, matching tokens become the key's token and friend
/// declarations embed the full new public key; with no key, tokens are cleared
/// and friend declarations are reduced to the bare name.
pub fn rewrite_module(
    module: &mut Module,
    set: &DependencySet,
    key: Option<&StrongNameKey>,
) -> RewriteStats {
    let new_token = key.map(StrongNameKey::token);
    let mut stats = RewriteStats::default();

    // Direct references first.
    for reference in &mut module.references {
        if set.contains(reference) && reference.public_key_token != new_token {
            log::debug!(
                "{}: reference '{}' gets new token",
                module.identity.simple_name(),
                reference
            );
            reference.public_key_token = new_token;
            stats.references += 1;
        }
    }

    // Friend-access declarations live on the module itself.
    for attribute in &mut module.attributes {
        stats.friend_declarations += rewrite_friend_declaration(attribute, set, key);
    }

    // Attribute-embedded scopes, everywhere an attribute can sit.
    for attribute in &mut module.attributes {
        stats.attribute_scopes += rewrite_attribute(attribute, set, new_token);
    }
    for type_def in &mut module.types {
        stats.attribute_scopes += rewrite_type(type_def, set, new_token);
    }

    stats
}

/// Rewrite a friend-access argument of the form `Name[, PublicKey=...]`.
///
/// Arguments that split into more than two comma-separated parts are an
/// unexpected form and left untouched. Returns the number of rewrites (0 or 1).
fn rewrite_friend_declaration(
    attribute: &mut CustomAttribute,
    set: &DependencySet,
    key: Option<&StrongNameKey>,
) -> usize {
    if !attribute.is_friend_access() {
        return 0;
    }
    let AttributeArgument::String(argument) = &mut attribute.fixed_args[0] else {
        return 0;
    };

    let parts: Vec<&str> = argument.split(',').collect();
    if parts.len() > 2 {
        return 0;
    }
    let name = parts[0].trim();
    if !set.iter().any(|member| member.simple_name() == name) {
        return 0;
    }

    let replacement = match key {
        Some(key) => format!("{}, PublicKey={}", name, key.public_key_hex()),
        None => name.to_string(),
    };
    if *argument == replacement {
        return 0;
    }
    *argument = replacement;
    1
}

fn rewrite_type(type_def: &mut TypeDef, set: &DependencySet, new_token: Option<[u8; 8]>) -> usize {
    let mut count = 0;
    for attribute in &mut type_def.attributes {
        count += rewrite_attribute(attribute, set, new_token);
    }
    for nested in &mut type_def.nested {
        count += rewrite_type(nested, set, new_token);
    }
    count
}

fn rewrite_attribute(
    attribute: &mut CustomAttribute,
    set: &DependencySet,
    new_token: Option<[u8; 8]>,
) -> usize {
    let mut count = rewrite_scope(&mut attribute.attr_type, set, new_token);
    for argument in &mut attribute.fixed_args {
        count += rewrite_argument(argument, set, new_token);
    }
    for named in &mut attribute.named_args {
        count += rewrite_argument(&mut named.value, set, new_token);
    }
    count
}

fn rewrite_argument(
    argument: &mut AttributeArgument,
    set: &DependencySet,
    new_token: Option<[u8; 8]>,
) -> usize {
    match argument {
        // A type passed as a value: its reference may point into a re-keyed
        // module independently of the argument's declared type.
        AttributeArgument::Type(type_ref) => rewrite_scope(type_ref, set, new_token),
        // An enum value: the declaring type is the externally hosted part.
        AttributeArgument::Enum(enum_type, value) => {
            rewrite_scope(enum_type, set, new_token) + rewrite_argument(value, set, new_token)
        }
        AttributeArgument::Array(items) => items
            .iter_mut()
            .map(|item| rewrite_argument(item, set, new_token))
            .sum(),
        _ => 0,
    }
}

fn rewrite_scope(type_ref: &mut TypeRef, set: &DependencySet, new_token: Option<[u8; 8]>) -> usize {
    let Some(scope) = &mut type_ref.scope else {
        return 0;
    };
    if set.contains(scope) && scope.public_key_token != new_token {
        scope.public_key_token = new_token;
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        customattributes::NamedArgument,
        identity::{ModuleIdentity, ModuleVersion},
    };

    fn identity(name: &str, token: Option<[u8; 8]>) -> ModuleIdentity {
        ModuleIdentity::new(name, ModuleVersion::new(1, 0, 0, 0), None, token)
    }

    fn set_of(names: &[&str]) -> DependencySet {
        let mut set = DependencySet::new();
        for name in names {
            set.insert(identity(name, None));
        }
        set
    }

    fn test_key() -> StrongNameKey {
        // Minimal public-only CAPI blob: header + RSA1 + 4-byte modulus.
        let mut blob = vec![0x06, 0x02, 0x00, 0x00];
        blob.extend_from_slice(&0x2400u32.to_le_bytes());
        blob.extend_from_slice(&0x3141_5352u32.to_le_bytes());
        blob.extend_from_slice(&32u32.to_le_bytes());
        blob.extend_from_slice(&65537u32.to_le_bytes());
        blob.extend_from_slice(&[0xAB, 0xCD, 0xEF, 0x01]);
        StrongNameKey::from_blob(&blob).unwrap()
    }

    #[test]
    fn direct_references_get_new_token() {
        let key = test_key();
        let mut module = Module::new(identity("B", None));
        module.references.push(identity("A", Some([1; 8])));
        module.references.push(identity("Other", Some([2; 8])));

        let stats = rewrite_module(&mut module, &set_of(&["A"]), Some(&key));

        assert_eq!(stats.references, 1);
        assert_eq!(module.references[0].public_key_token, Some(key.token()));
        // Non-member references are never altered.
        assert_eq!(module.references[1].public_key_token, Some([2; 8]));
    }

    #[test]
    fn stripping_clears_reference_tokens() {
        let mut module = Module::new(identity("B", None));
        module.references.push(identity("A", Some([1; 8])));

        let stats = rewrite_module(&mut module, &set_of(&["A"]), None);

        assert_eq!(stats.references, 1);
        assert_eq!(module.references[0].public_key_token, None);
    }

    #[test]
    fn friend_declaration_gets_full_public_key() {
        let key = test_key();
        let mut module = Module::new(identity("A", None));
        module.attributes.push(CustomAttribute::friend_access("B"));

        let stats = rewrite_module(&mut module, &set_of(&["B"]), Some(&key));

        assert_eq!(stats.friend_declarations, 1);
        let AttributeArgument::String(arg) = &module.attributes[0].fixed_args[0] else {
            panic!("friend argument must stay a string");
        };
        assert_eq!(arg, &format!("B, PublicKey={}", key.public_key_hex()));
    }

    #[test]
    fn friend_declaration_reduced_when_stripping() {
        let mut module = Module::new(identity("A", None));
        module
            .attributes
            .push(CustomAttribute::friend_access("B, PublicKey=00aabb"));

        let stats = rewrite_module(&mut module, &set_of(&["B"]), None);

        assert_eq!(stats.friend_declarations, 1);
        let AttributeArgument::String(arg) = &module.attributes[0].fixed_args[0] else {
            panic!("friend argument must stay a string");
        };
        assert_eq!(arg, "B");
    }

    #[test]
    fn malformed_friend_declaration_left_untouched() {
        let key = test_key();
        let mut module = Module::new(identity("A", None));
        module
            .attributes
            .push(CustomAttribute::friend_access("B, PublicKey=aa, Extra=1"));
        module.attributes.push(CustomAttribute::friend_access("C"));

        let stats = rewrite_module(&mut module, &set_of(&["B"]), Some(&key));

        // Three comma-separated parts: unexpected form. And "C" is not in the
        // dependency set, so neither argument changes.
        assert_eq!(stats.friend_declarations, 0);
    }

    #[test]
    fn attribute_scopes_rewritten_recursively() {
        let key = test_key();
        let dep = identity("Dep", Some([9; 8]));

        let mut inner = TypeDef::new("Outer/Inner");
        inner.attributes.push(CustomAttribute {
            attr_type: TypeRef::external("Dep.MarkerAttribute", dep.clone()),
            fixed_args: vec![
                AttributeArgument::Type(TypeRef::external("Dep.Widget", dep.clone())),
                AttributeArgument::Array(vec![AttributeArgument::Enum(
                    TypeRef::external("Dep.Color", dep.clone()),
                    Box::new(AttributeArgument::U1(1)),
                )]),
            ],
            named_args: vec![NamedArgument {
                is_field: false,
                name: "Shape".to_string(),
                value: AttributeArgument::Type(TypeRef::external("Dep.Shape", dep.clone())),
            }],
        });
        let mut outer = TypeDef::new("Outer");
        outer.nested.push(inner);

        let mut module = Module::new(identity("B", None));
        module.types.push(outer);

        let stats = rewrite_module(&mut module, &set_of(&["Dep"]), Some(&key));

        // attr type + Type arg + Enum type + named Type arg
        assert_eq!(stats.attribute_scopes, 4);
        let attr = &module.types[0].nested[0].attributes[0];
        let expected = Some(key.token());
        assert_eq!(
            attr.attr_type.scope.as_ref().unwrap().public_key_token,
            expected
        );
        let AttributeArgument::Type(type_arg) = &attr.fixed_args[0] else {
            panic!("expected type argument");
        };
        assert_eq!(
            type_arg.scope.as_ref().unwrap().public_key_token,
            expected
        );
    }

    #[test]
    fn local_scopes_and_foreign_scopes_untouched() {
        let key = test_key();
        let other = identity("Other", Some([3; 8]));

        let mut module = Module::new(identity("B", None));
        module.attributes.push(CustomAttribute::new(
            TypeRef::local("LocalAttribute"),
            vec![AttributeArgument::Type(TypeRef::external(
                "Other.Thing",
                other.clone(),
            ))],
        ));

        let stats = rewrite_module(&mut module, &set_of(&["Dep"]), Some(&key));

        assert_eq!(stats.attribute_scopes, 0);
        let AttributeArgument::Type(type_arg) = &module.attributes[0].fixed_args[0] else {
            panic!("expected type argument");
        };
        assert_eq!(type_arg.scope.as_ref().unwrap().public_key_token, Some([3; 8]));
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let key = test_key();
        let mut module = Module::new(identity("B", None));
        module.references.push(identity("A", Some([1; 8])));
        module.attributes.push(CustomAttribute::friend_access("A"));

        let set = set_of(&["A"]);
        let first = rewrite_module(&mut module, &set, Some(&key));
        assert_ne!(first, RewriteStats::default());

        let second = rewrite_module(&mut module, &set, Some(&key));
        assert_eq!(second, RewriteStats::default());
    }
}
