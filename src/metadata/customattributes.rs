//! Custom attribute model used by the reference rewriter.
//!
//! Attributes are stored as a tagged-variant tree: the attribute's own type, its
//! fixed constructor arguments and its named field/property arguments. Two of the
//! variants can smuggle a module identity into a module that never references it
//! through the ordinary reference table:
//!
//! - [`AttributeArgument::Type`] - a type passed as a value (`typeof(Foo)`),
//!   serialized as an assembly-qualified name and therefore owning its scope
//! - [`AttributeArgument::Enum`] - an enum constant whose declaring type may live
//!   in an external module
//!
//! Both carry a [`TypeRef`] whose `scope` is an owned [`ModuleIdentity`] copy;
//! fixing the module's reference table does not implicitly fix these, which is
//! why the rewriter walks the whole tree.

use crate::metadata::identity::ModuleIdentity;

/// Type name of the friend-access declaration attribute.
pub const FRIEND_ACCESS_ATTRIBUTE: &str =
    "System.Runtime.CompilerServices.InternalsVisibleToAttribute";

/// A reference to a type, with the identity of the module hosting it.
///
/// `scope == None` means the type is defined in the module carrying the
/// attribute (or resolved from the runtime library); `Some` names an external
/// module by identity.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    /// Namespace-qualified type name.
    pub full_name: String,
    /// Identity of the external module hosting the type, if any.
    pub scope: Option<ModuleIdentity>,
}

impl TypeRef {
    /// Create a reference to a type defined in the current module.
    pub fn local(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            scope: None,
        }
    }

    /// Create a reference to a type hosted in an external module.
    pub fn external(full_name: impl Into<String>, scope: ModuleIdentity) -> Self {
        Self {
            full_name: full_name.into(),
            scope: Some(scope),
        }
    }
}

/// A custom attribute instance attached to a module or a type.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAttribute {
    /// The attribute type itself, which may be hosted externally.
    pub attr_type: TypeRef,
    /// Fixed arguments from the constructor signature.
    pub fixed_args: Vec<AttributeArgument>,
    /// Named arguments (fields and properties).
    pub named_args: Vec<NamedArgument>,
}

impl CustomAttribute {
    /// Create an attribute with fixed arguments only.
    pub fn new(attr_type: TypeRef, fixed_args: Vec<AttributeArgument>) -> Self {
        Self {
            attr_type,
            fixed_args,
            named_args: Vec::new(),
        }
    }

    /// Create a friend-access declaration naming `argument`.
    pub fn friend_access(argument: impl Into<String>) -> Self {
        Self::new(
            TypeRef::local(FRIEND_ACCESS_ATTRIBUTE),
            vec![AttributeArgument::String(argument.into())],
        )
    }

    /// `true` if this is a friend-access declaration with the expected single
    /// string argument.
    #[must_use]
    pub fn is_friend_access(&self) -> bool {
        self.attr_type.full_name == FRIEND_ACCESS_ATTRIBUTE
            && self.fixed_args.len() == 1
            && matches!(self.fixed_args[0], AttributeArgument::String(_))
    }
}

/// A single custom attribute argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeArgument {
    /// Boolean value
    Bool(bool),
    /// Character value (16-bit Unicode)
    Char(char),
    /// Signed 8-bit integer
    I1(i8),
    /// Unsigned 8-bit integer
    U1(u8),
    /// Signed 16-bit integer
    I2(i16),
    /// Unsigned 16-bit integer
    U2(u16),
    /// Signed 32-bit integer
    I4(i32),
    /// Unsigned 32-bit integer
    U4(u32),
    /// Signed 64-bit integer
    I8(i64),
    /// Unsigned 64-bit integer
    U8(u64),
    /// 32-bit floating point
    R4(f32),
    /// 64-bit floating point
    R8(f64),
    /// UTF-8 string
    String(String),
    /// A type passed as a value, owning its scope
    Type(TypeRef),
    /// Enum value: declaring type + underlying value
    Enum(TypeRef, Box<AttributeArgument>),
    /// Array of arguments
    Array(Vec<AttributeArgument>),
}

/// A named argument (field or property) in a custom attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedArgument {
    /// Whether this is a field (true) or property (false)
    pub is_field: bool,
    /// Name of the field or property
    pub name: String,
    /// Value of the argument
    pub value: AttributeArgument,
}
