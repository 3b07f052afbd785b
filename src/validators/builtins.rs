//! Canonical value comparison for built-in types
//!
//! Leaf-list values and list keys are compared by value, not by text:
//! `"007"` and `"7"` are the same `uint8`, `"1.50"` and `"1.5"` the same
//! `decimal64`, and two base64 spellings of the same bytes the same
//! `binary`. Values that do not parse under the declared type fall back to
//! literal comparison.

use std::collections::BTreeSet;
use std::str::FromStr;

use base64::Engine;
use rust_decimal::Decimal;

use super::base::ValueComparator;
use super::simple_types::LeafType;

/// Value in canonical form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalValue {
    /// Any integer type
    Integer(i128),
    /// decimal64 (normalized)
    Decimal(Decimal),
    /// boolean
    Boolean(bool),
    /// binary, decoded
    Bytes(Vec<u8>),
    /// bits, as a set of bit names
    Bits(BTreeSet<String>),
    /// Everything compared as text
    Text(String),
}

/// Parse a lexical value into its canonical form under `ty`
///
/// Returns `None` when the value is not valid for the type.
pub fn canonicalize(value: &str, ty: &LeafType) -> Option<CanonicalValue> {
    match ty {
        LeafType::Int8
        | LeafType::Int16
        | LeafType::Int32
        | LeafType::Int64
        | LeafType::Uint8
        | LeafType::Uint16
        | LeafType::Uint32
        | LeafType::Uint64 => {
            let (min, max) = ty.integer_range()?;
            let parsed = parse_integer(value.trim())?;
            (min..=max).contains(&parsed).then_some(CanonicalValue::Integer(parsed))
        }
        LeafType::Decimal64 { fraction_digits } => {
            let parsed = Decimal::from_str(value.trim()).ok()?;
            if parsed.normalize().scale() > u32::from(*fraction_digits) {
                return None;
            }
            Some(CanonicalValue::Decimal(parsed.normalize()))
        }
        LeafType::Boolean => match value {
            "true" => Some(CanonicalValue::Boolean(true)),
            "false" => Some(CanonicalValue::Boolean(false)),
            _ => None,
        },
        LeafType::Binary => {
            let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
            base64::engine::general_purpose::STANDARD
                .decode(cleaned)
                .ok()
                .map(CanonicalValue::Bytes)
        }
        LeafType::Bits(names) => {
            let set: BTreeSet<String> = value.split_whitespace().map(str::to_string).collect();
            set.iter()
                .all(|bit| names.contains(bit))
                .then_some(CanonicalValue::Bits(set))
        }
        LeafType::Enumeration(names) => names
            .iter()
            .any(|n| n == value)
            .then(|| CanonicalValue::Text(value.to_string())),
        LeafType::Empty => value.is_empty().then(|| CanonicalValue::Text(String::new())),
        LeafType::LeafRef(target) => canonicalize(value, target),
        LeafType::Union(members) => members.iter().find_map(|m| canonicalize(value, m)),
        LeafType::String | LeafType::IdentityRef | LeafType::InstanceIdentifier => {
            Some(CanonicalValue::Text(value.to_string()))
        }
    }
}

// YANG integer literals are decimal, leading zeros included
fn parse_integer(text: &str) -> Option<i128> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let magnitude = digits.parse::<i128>().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Comparator using canonical values of the declared type
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalComparator;

impl CanonicalComparator {
    /// Create a new comparator
    pub fn new() -> Self {
        Self
    }
}

impl ValueComparator for CanonicalComparator {
    fn equal(&self, a: &str, b: &str, ty: &LeafType) -> bool {
        if let LeafType::Union(members) = ty {
            // both values must resolve to the same member type
            let member_a = members.iter().position(|m| canonicalize(a, m).is_some());
            let member_b = members.iter().position(|m| canonicalize(b, m).is_some());
            return match (member_a, member_b) {
                (Some(ia), Some(ib)) if ia == ib => self.equal(a, b, &members[ia]),
                (None, None) => a == b,
                _ => false,
            };
        }

        match (canonicalize(a, ty), canonicalize(b, ty)) {
            (Some(ca), Some(cb)) => ca == cb,
            _ => a == b,
        }
    }
}
