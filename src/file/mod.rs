//! Module image container codec.
//!
//! Serialized form of the [`crate::metadata::module::Module`] model: a compact
//! little-endian container with a magic header, the module's own identity, its
//! public key material, and its reference, attribute, type and resource tables.
//! Reading goes through the bounds-checked [`parser::Parser`], so truncated or
//! corrupt files fail cleanly; a file that does not even start with the magic is
//! reported as [`crate::Error::NotSupported`], which the directory scanner
//! treats as expected noise.
//!
//! Parsing full PE images is the job of a metadata engine behind the
//! [`crate::engine::MetadataEngine`] seam; this codec is the built-in engine's
//! on-disk format and the format all tests are written against.

pub mod parser;

use parser::Parser;

use crate::{
    metadata::{
        customattributes::{AttributeArgument, CustomAttribute, NamedArgument, TypeRef},
        identity::{ModuleIdentity, ModuleVersion},
        module::{Module, ModuleFlags, TypeDef},
        resources::ResourceEntry,
    },
    Result,
};

/// Magic bytes opening every module image.
pub const MODULE_MAGIC: &[u8; 4] = b"SNMD";
/// Container format version this codec reads and writes.
pub const FORMAT_VERSION: u16 = 1;

/// Maximum nesting depth for types and attribute argument trees.
const MAX_DEPTH: usize = 64;

/// Argument tags used in serialized attribute values.
#[allow(missing_docs)]
mod arg_tag {
    pub const BOOL: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0A;
    pub const U8: u8 = 0x0B;
    pub const R4: u8 = 0x0C;
    pub const R8: u8 = 0x0D;
    pub const STRING: u8 = 0x0E;
    pub const ARRAY: u8 = 0x1D;
    pub const TYPE: u8 = 0x50;
    pub const ENUM: u8 = 0x55;
}

/// Capacity hint for a table declaring `count` entries.
///
/// Bounded by the bytes left in the buffer: every entry encoding takes at
/// least one byte, so a count larger than the remainder is a lie and must not
/// drive the allocation before the entries prove to exist.
fn bounded_capacity(count: u32, parser: &Parser<'_>) -> usize {
    (count as usize).min(parser.remaining())
}

/// Decode a module image from raw bytes.
///
/// The returned module has an empty `path`; the engine fills it in from the
/// file it loaded.
///
/// # Errors
/// - [`crate::Error::Empty`] for empty input
/// - [`crate::Error::NotSupported`] if the magic or format version is wrong
/// - [`crate::Error::OutOfBounds`] / [`crate::Error::Malformed`] for truncated
///   or structurally invalid images
pub fn read_module(data: &[u8]) -> Result<Module> {
    if data.is_empty() {
        return Err(crate::Error::Empty);
    }
    if data.len() < 6 || &data[0..4] != MODULE_MAGIC {
        return Err(crate::Error::NotSupported);
    }

    let mut parser = Parser::new(data);
    parser.advance_by(4)?;
    if parser.read_u16()? != FORMAT_VERSION {
        return Err(crate::Error::NotSupported);
    }

    let flags = ModuleFlags::from_bits_truncate(parser.read_u32()?);
    let identity = read_identity(&mut parser)?;

    let key_len = parser.read_u32()? as usize;
    let public_key = if key_len == 0 {
        None
    } else {
        Some(parser.read_bytes(key_len)?.to_vec())
    };

    let ref_count = parser.read_u32()?;
    let mut references = Vec::with_capacity(bounded_capacity(ref_count, &parser));
    for _ in 0..ref_count {
        references.push(read_identity(&mut parser)?);
    }

    let attr_count = parser.read_u32()?;
    let mut attributes = Vec::with_capacity(bounded_capacity(attr_count, &parser));
    for _ in 0..attr_count {
        attributes.push(read_attribute(&mut parser, 0)?);
    }

    let type_count = parser.read_u32()?;
    let mut types = Vec::with_capacity(bounded_capacity(type_count, &parser));
    for _ in 0..type_count {
        types.push(read_type(&mut parser, 0)?);
    }

    let resource_count = parser.read_u32()?;
    let mut resources = Vec::with_capacity(bounded_capacity(resource_count, &parser));
    for _ in 0..resource_count {
        let name = parser.read_prefixed_string_utf8()?;
        let data_len = parser.read_u32()? as usize;
        let data = parser.read_bytes(data_len)?.to_vec();
        resources.push(ResourceEntry::new(name, data));
    }

    if parser.has_more_data() {
        return Err(malformed_error!(
            "Trailing {} bytes after module image",
            parser.remaining()
        ));
    }

    Ok(Module {
        identity,
        public_key,
        flags,
        references,
        attributes,
        types,
        resources,
        path: std::path::PathBuf::new(),
    })
}

/// Encode a module back into its container form.
///
/// The encoding is the exact inverse of [`read_module`]; a round trip
/// preserves everything but the in-memory `path`.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a table or blob exceeds the `u32`
/// size fields of the format.
pub fn write_module(module: &Module) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(256);
    out.extend_from_slice(MODULE_MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&module.flags.bits().to_le_bytes());
    write_identity(&mut out, &module.identity)?;

    match &module.public_key {
        Some(key) => {
            write_len(&mut out, key.len())?;
            out.extend_from_slice(key);
        }
        None => write_len(&mut out, 0)?,
    }

    write_len(&mut out, module.references.len())?;
    for reference in &module.references {
        write_identity(&mut out, reference)?;
    }

    write_len(&mut out, module.attributes.len())?;
    for attribute in &module.attributes {
        write_attribute(&mut out, attribute)?;
    }

    write_len(&mut out, module.types.len())?;
    for type_def in &module.types {
        write_type(&mut out, type_def)?;
    }

    write_len(&mut out, module.resources.len())?;
    for resource in &module.resources {
        write_string(&mut out, &resource.name)?;
        write_len(&mut out, resource.data.len())?;
        out.extend_from_slice(&resource.data);
    }

    Ok(out)
}

fn read_identity(parser: &mut Parser<'_>) -> Result<ModuleIdentity> {
    let name = parser.read_prefixed_string_utf8()?;
    if name.is_empty() {
        return Err(malformed_error!("Module identity with empty name"));
    }
    let version = ModuleVersion::new(
        parser.read_u16()?,
        parser.read_u16()?,
        parser.read_u16()?,
        parser.read_u16()?,
    );
    let culture = parser.read_prefixed_string_utf8()?;
    let culture = if culture.is_empty() {
        None
    } else {
        Some(culture)
    };

    let token = match parser.read_u8()? {
        0 => None,
        8 => {
            let bytes = parser.read_bytes(8)?;
            let mut token = [0u8; 8];
            token.copy_from_slice(bytes);
            Some(token)
        }
        n => {
            return Err(malformed_error!(
                "Public-key-token must be 0 or 8 bytes, got {}",
                n
            ))
        }
    };

    Ok(ModuleIdentity::new(name, version, culture, token))
}

fn write_identity(out: &mut Vec<u8>, identity: &ModuleIdentity) -> Result<()> {
    write_string(out, &identity.name)?;
    out.extend_from_slice(&identity.version.major.to_le_bytes());
    out.extend_from_slice(&identity.version.minor.to_le_bytes());
    out.extend_from_slice(&identity.version.build.to_le_bytes());
    out.extend_from_slice(&identity.version.revision.to_le_bytes());
    write_string(out, identity.culture.as_deref().unwrap_or(""))?;
    match &identity.public_key_token {
        Some(token) => {
            out.push(8);
            out.extend_from_slice(token);
        }
        None => out.push(0),
    }
    Ok(())
}

fn read_type_ref(parser: &mut Parser<'_>) -> Result<TypeRef> {
    let full_name = parser.read_prefixed_string_utf8()?;
    let scope = match parser.read_u8()? {
        0 => None,
        1 => Some(read_identity(parser)?),
        n => return Err(malformed_error!("Invalid type-ref scope marker {}", n)),
    };
    Ok(TypeRef { full_name, scope })
}

fn write_type_ref(out: &mut Vec<u8>, type_ref: &TypeRef) -> Result<()> {
    write_string(out, &type_ref.full_name)?;
    match &type_ref.scope {
        Some(scope) => {
            out.push(1);
            write_identity(out, scope)?;
        }
        None => out.push(0),
    }
    Ok(())
}

fn read_attribute(parser: &mut Parser<'_>, depth: usize) -> Result<CustomAttribute> {
    let attr_type = read_type_ref(parser)?;

    let fixed_count = parser.read_u32()?;
    let mut fixed_args = Vec::with_capacity(bounded_capacity(fixed_count, parser));
    for _ in 0..fixed_count {
        fixed_args.push(read_argument(parser, depth)?);
    }

    let named_count = parser.read_u32()?;
    let mut named_args = Vec::with_capacity(bounded_capacity(named_count, parser));
    for _ in 0..named_count {
        let is_field = parser.read_u8()? != 0;
        let name = parser.read_prefixed_string_utf8()?;
        let value = read_argument(parser, depth)?;
        named_args.push(NamedArgument {
            is_field,
            name,
            value,
        });
    }

    Ok(CustomAttribute {
        attr_type,
        fixed_args,
        named_args,
    })
}

fn write_attribute(out: &mut Vec<u8>, attribute: &CustomAttribute) -> Result<()> {
    write_type_ref(out, &attribute.attr_type)?;
    write_len(out, attribute.fixed_args.len())?;
    for arg in &attribute.fixed_args {
        write_argument(out, arg)?;
    }
    write_len(out, attribute.named_args.len())?;
    for named in &attribute.named_args {
        out.push(u8::from(named.is_field));
        write_string(out, &named.name)?;
        write_argument(out, &named.value)?;
    }
    Ok(())
}

fn read_argument(parser: &mut Parser<'_>, depth: usize) -> Result<AttributeArgument> {
    if depth > MAX_DEPTH {
        return Err(malformed_error!(
            "Attribute argument nesting exceeds {} levels",
            MAX_DEPTH
        ));
    }

    let tag = parser.read_u8()?;
    let arg = match tag {
        arg_tag::BOOL => AttributeArgument::Bool(parser.read_u8()? != 0),
        arg_tag::CHAR => {
            let scalar = parser.read_u32()?;
            AttributeArgument::Char(
                char::from_u32(scalar)
                    .ok_or_else(|| malformed_error!("Invalid char scalar 0x{:08x}", scalar))?,
            )
        }
        arg_tag::I1 => AttributeArgument::I1(parser.read_u8()? as i8),
        arg_tag::U1 => AttributeArgument::U1(parser.read_u8()?),
        arg_tag::I2 => AttributeArgument::I2(parser.read_u16()? as i16),
        arg_tag::U2 => AttributeArgument::U2(parser.read_u16()?),
        arg_tag::I4 => AttributeArgument::I4(parser.read_u32()? as i32),
        arg_tag::U4 => AttributeArgument::U4(parser.read_u32()?),
        arg_tag::I8 => AttributeArgument::I8(parser.read_u64()? as i64),
        arg_tag::U8 => AttributeArgument::U8(parser.read_u64()?),
        arg_tag::R4 => AttributeArgument::R4(f32::from_bits(parser.read_u32()?)),
        arg_tag::R8 => AttributeArgument::R8(f64::from_bits(parser.read_u64()?)),
        arg_tag::STRING => AttributeArgument::String(parser.read_prefixed_string_utf8()?),
        arg_tag::TYPE => AttributeArgument::Type(read_type_ref(parser)?),
        arg_tag::ENUM => {
            let enum_type = read_type_ref(parser)?;
            let value = read_argument(parser, depth + 1)?;
            AttributeArgument::Enum(enum_type, Box::new(value))
        }
        arg_tag::ARRAY => {
            let count = parser.read_u32()?;
            let mut items = Vec::with_capacity(bounded_capacity(count, parser));
            for _ in 0..count {
                items.push(read_argument(parser, depth + 1)?);
            }
            AttributeArgument::Array(items)
        }
        _ => return Err(malformed_error!("Unknown argument tag 0x{:02x}", tag)),
    };
    Ok(arg)
}

fn write_argument(out: &mut Vec<u8>, arg: &AttributeArgument) -> Result<()> {
    match arg {
        AttributeArgument::Bool(v) => {
            out.push(arg_tag::BOOL);
            out.push(u8::from(*v));
        }
        AttributeArgument::Char(v) => {
            out.push(arg_tag::CHAR);
            out.extend_from_slice(&(*v as u32).to_le_bytes());
        }
        AttributeArgument::I1(v) => {
            out.push(arg_tag::I1);
            out.push(*v as u8);
        }
        AttributeArgument::U1(v) => {
            out.push(arg_tag::U1);
            out.push(*v);
        }
        AttributeArgument::I2(v) => {
            out.push(arg_tag::I2);
            out.extend_from_slice(&(*v as u16).to_le_bytes());
        }
        AttributeArgument::U2(v) => {
            out.push(arg_tag::U2);
            out.extend_from_slice(&v.to_le_bytes());
        }
        AttributeArgument::I4(v) => {
            out.push(arg_tag::I4);
            out.extend_from_slice(&(*v as u32).to_le_bytes());
        }
        AttributeArgument::U4(v) => {
            out.push(arg_tag::U4);
            out.extend_from_slice(&v.to_le_bytes());
        }
        AttributeArgument::I8(v) => {
            out.push(arg_tag::I8);
            out.extend_from_slice(&(*v as u64).to_le_bytes());
        }
        AttributeArgument::U8(v) => {
            out.push(arg_tag::U8);
            out.extend_from_slice(&v.to_le_bytes());
        }
        AttributeArgument::R4(v) => {
            out.push(arg_tag::R4);
            out.extend_from_slice(&v.to_bits().to_le_bytes());
        }
        AttributeArgument::R8(v) => {
            out.push(arg_tag::R8);
            out.extend_from_slice(&v.to_bits().to_le_bytes());
        }
        AttributeArgument::String(v) => {
            out.push(arg_tag::STRING);
            write_string(out, v)?;
        }
        AttributeArgument::Type(type_ref) => {
            out.push(arg_tag::TYPE);
            write_type_ref(out, type_ref)?;
        }
        AttributeArgument::Enum(enum_type, value) => {
            out.push(arg_tag::ENUM);
            write_type_ref(out, enum_type)?;
            write_argument(out, value)?;
        }
        AttributeArgument::Array(items) => {
            out.push(arg_tag::ARRAY);
            write_len(out, items.len())?;
            for item in items {
                write_argument(out, item)?;
            }
        }
    }
    Ok(())
}

fn read_type(parser: &mut Parser<'_>, depth: usize) -> Result<TypeDef> {
    if depth > MAX_DEPTH {
        return Err(malformed_error!(
            "Type nesting exceeds {} levels",
            MAX_DEPTH
        ));
    }

    let name = parser.read_prefixed_string_utf8()?;

    let attr_count = parser.read_u32()?;
    let mut attributes = Vec::with_capacity(bounded_capacity(attr_count, parser));
    for _ in 0..attr_count {
        attributes.push(read_attribute(parser, depth)?);
    }

    let nested_count = parser.read_u32()?;
    let mut nested = Vec::with_capacity(bounded_capacity(nested_count, parser));
    for _ in 0..nested_count {
        nested.push(read_type(parser, depth + 1)?);
    }

    Ok(TypeDef {
        name,
        attributes,
        nested,
    })
}

fn write_type(out: &mut Vec<u8>, type_def: &TypeDef) -> Result<()> {
    write_string(out, &type_def.name)?;
    write_len(out, type_def.attributes.len())?;
    for attribute in &type_def.attributes {
        write_attribute(out, attribute)?;
    }
    write_len(out, type_def.nested.len())?;
    for nested in &type_def.nested {
        write_type(out, nested)?;
    }
    Ok(())
}

fn write_string(out: &mut Vec<u8>, value: &str) -> Result<()> {
    write_len(out, value.len())?;
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

fn write_len(out: &mut Vec<u8>, len: usize) -> Result<()> {
    let len = u32::try_from(len)
        .map_err(|_| malformed_error!("Length {} exceeds container field width", len))?;
    out.extend_from_slice(&len.to_le_bytes());
    Ok(())
}
