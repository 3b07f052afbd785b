//! YANG built-in leaf types
//!
//! This module declares the value types a leaf or leaf-list can carry. The
//! validation engine never parses values for their own sake; the declared
//! type only decides how two values are compared (see
//! [`builtins`](super::builtins)).

use std::fmt;

// =============================================================================
// Leaf Type
// =============================================================================

/// Declared value type of a leaf or leaf-list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafType {
    /// int8
    Int8,
    /// int16
    Int16,
    /// int32
    Int32,
    /// int64
    Int64,
    /// uint8
    Uint8,
    /// uint16
    Uint16,
    /// uint32
    Uint32,
    /// uint64
    Uint64,
    /// decimal64 with the given number of fraction digits
    Decimal64 {
        /// fraction-digits statement (1..=18)
        fraction_digits: u8,
    },
    /// string
    String,
    /// boolean
    Boolean,
    /// enumeration with its enum names
    Enumeration(Vec<String>),
    /// bits with the declared bit names
    Bits(Vec<String>),
    /// binary (base64 encoded)
    Binary,
    /// empty
    Empty,
    /// identityref
    IdentityRef,
    /// instance-identifier
    InstanceIdentifier,
    /// leafref, compared under the referred leaf's type
    LeafRef(Box<LeafType>),
    /// union of member types, in declaration order
    Union(Vec<LeafType>),
}

impl LeafType {
    /// Inclusive range of an integer type, `None` for non-integer types
    pub fn integer_range(&self) -> Option<(i128, i128)> {
        match self {
            LeafType::Int8 => Some((i8::MIN as i128, i8::MAX as i128)),
            LeafType::Int16 => Some((i16::MIN as i128, i16::MAX as i128)),
            LeafType::Int32 => Some((i32::MIN as i128, i32::MAX as i128)),
            LeafType::Int64 => Some((i64::MIN as i128, i64::MAX as i128)),
            LeafType::Uint8 => Some((0, u8::MAX as i128)),
            LeafType::Uint16 => Some((0, u16::MAX as i128)),
            LeafType::Uint32 => Some((0, u32::MAX as i128)),
            LeafType::Uint64 => Some((0, u64::MAX as i128)),
            _ => None,
        }
    }

    /// Check if this is one of the integer types
    pub fn is_integer(&self) -> bool {
        self.integer_range().is_some()
    }

    /// The YANG keyword naming this type
    pub fn name(&self) -> &'static str {
        match self {
            LeafType::Int8 => "int8",
            LeafType::Int16 => "int16",
            LeafType::Int32 => "int32",
            LeafType::Int64 => "int64",
            LeafType::Uint8 => "uint8",
            LeafType::Uint16 => "uint16",
            LeafType::Uint32 => "uint32",
            LeafType::Uint64 => "uint64",
            LeafType::Decimal64 { .. } => "decimal64",
            LeafType::String => "string",
            LeafType::Boolean => "boolean",
            LeafType::Enumeration(_) => "enumeration",
            LeafType::Bits(_) => "bits",
            LeafType::Binary => "binary",
            LeafType::Empty => "empty",
            LeafType::IdentityRef => "identityref",
            LeafType::InstanceIdentifier => "instance-identifier",
            LeafType::LeafRef(_) => "leafref",
            LeafType::Union(_) => "union",
        }
    }
}

impl fmt::Display for LeafType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
