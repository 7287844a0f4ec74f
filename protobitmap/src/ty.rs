use num_enum::TryFromPrimitive;
use num_enum::IntoPrimitive;

#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};

/// Scalar value types of the protobuf schema language
///
#[repr(u8)]
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "lowercase"))]
pub enum TypeTag {
    DOUBLE = 0,
    FLOAT = 1,
    INT32 = 2,
    INT64 = 3,
    UINT32 = 4,
    UINT64 = 5,
    SINT32 = 6,
    SINT64 = 7,
    FIXED32 = 8,
    FIXED64 = 9,
    SFIXED32 = 10,
    SFIXED64 = 11,
    BOOL = 12,
    STRING = 13,
    BYTES = 14,
}

const KEYWORDS: [(&str, TypeTag); 15] = [
    ("double",   TypeTag::DOUBLE),
    ("float",    TypeTag::FLOAT),
    ("int32",    TypeTag::INT32),
    ("int64",    TypeTag::INT64),
    ("uint32",   TypeTag::UINT32),
    ("uint64",   TypeTag::UINT64),
    ("sint32",   TypeTag::SINT32),
    ("sint64",   TypeTag::SINT64),
    ("fixed32",  TypeTag::FIXED32),
    ("fixed64",  TypeTag::FIXED64),
    ("sfixed32", TypeTag::SFIXED32),
    ("sfixed64", TypeTag::SFIXED64),
    ("bool",     TypeTag::BOOL),
    ("string",   TypeTag::STRING),
    ("bytes",    TypeTag::BYTES),
];

/// Largest number of flags a bitmap can hold
pub const MAX_BITMAP_FLAGS: usize = 64;

impl TypeTag {
    /// Keyword used for this type in `.proto` text
    pub fn keyword(self) -> &'static str {
        KEYWORDS[u8::from(self) as usize].0
    }

    pub fn from_keyword(kw: &str) -> Option<TypeTag> {
        KEYWORDS.iter()
            .find(|(k, _)| *k == kw)
            .map(|(_, ty)| *ty)
    }

    /// Storage type for a bitmap holding `count` flags.
    ///
    /// Flags take bits `1, 2, 4, ...` in order, so after `count` flags the next
    /// free value is `2^count`. The bitmap stays `uint32` while that value is
    /// below `2^32`.
    pub fn for_bit_count(count: usize) -> Option<TypeTag> {
        match count {
            0 ..= 31 => Some(TypeTag::UINT32),
            32 ..= MAX_BITMAP_FLAGS => Some(TypeTag::UINT64),
            _ => None,
        }
    }
}

impl core::default::Default for TypeTag {
    fn default() -> Self {
        TypeTag::UINT32
    }
}

impl core::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Value of the flag with the given index
#[inline(always)]
pub const fn bit(index: u32) -> u64 {
    1u64 << index
}
