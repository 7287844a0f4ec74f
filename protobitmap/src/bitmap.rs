use core::fmt;

use crate::ty::TypeTag;

/// Flag set generated from an enum marked with `option (bitmap)`.
///
/// The schema transform assigns flags the values `1, 2, 4, ...` in declaration
/// order and reserves `None = 0` for the empty set, which is why `None` never
/// appears in [`Bitmap::FLAGS`].
pub trait Bitmap: Copy + Sized {
    /// Integer type the bitmap field is stored as
    const WIDTH: TypeTag;

    /// Flag names with their bit values, in declaration order
    const FLAGS: &'static [(&'static str, u64)];

    fn to_bits(self) -> u64;

    /// `None` when `bits` has anything set outside the declared flags
    fn from_bits_u64(bits: u64) -> Option<Self>;

    fn flag_names(self) -> FlagNames {
        FlagNames {
            flags: Self::FLAGS,
            bits: self.to_bits(),
        }
    }

    fn display(self) -> BitmapDisplay {
        BitmapDisplay {
            flags: Self::FLAGS,
            bits: self.to_bits(),
        }
    }
}

/// Bits left over after removing every declared flag
pub fn unknown_bits(flags: &[(&str, u64)], bits: u64) -> u64 {
    flags.iter().fold(bits, |acc, (_, v)| acc & !v)
}

pub struct FlagNames {
    flags: &'static [(&'static str, u64)],
    bits: u64,
}

impl Iterator for FlagNames {
    type Item = &'static str;

    fn next(&mut self) -> Option<&'static str> {
        while let Some(((name, value), rest)) = self.flags.split_first() {
            self.flags = rest;
            if *value != 0 && self.bits & value == *value {
                return Some(*name);
            }
        }
        None
    }
}

/// Formats a bitmap as `M | S`, `None` when empty
pub struct BitmapDisplay {
    flags: &'static [(&'static str, u64)],
    bits: u64,
}

impl fmt::Display for BitmapDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bits == 0 {
            return f.write_str("None");
        }

        let names = FlagNames { flags: self.flags, bits: self.bits };
        let mut first = true;
        for name in names {
            if !first { f.write_str(" | ")?; }
            f.write_str(name)?;
            first = false;
        }

        let rest = unknown_bits(self.flags, self.bits);
        if rest != 0 {
            if !first { f.write_str(" | ")?; }
            write!(f, "{:#x}", rest)?;
        }

        Ok(())
    }
}
