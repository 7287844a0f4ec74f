pub mod protocol {
    include!(concat!(env!("OUT_DIR"), "/codegen.rs"));
}

use protocol::riscv::privileged::Mode;
use protocol::riscv::Privileged;

fn main() {
    let mut p = Privileged::new();
    p.set_modes(Mode::M | Mode::S);
    if !(p.modes() & Mode::M).is_empty() {
        println!("M bit present");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protobitmap::{Bitmap, TypeTag};
    use protocol::riscv::{Hart, Xlen};

    const TRANSFORMED: &str = include_str!(concat!(env!("OUT_DIR"), "/example.proto"));

    #[test]
    fn modes_round_trip() {
        let mut p = Privileged::new();
        assert!(p.modes().is_empty());

        p.set_modes(Mode::M | Mode::S);
        assert_eq!(p.modes(), Mode::M | Mode::S);
        assert_eq!(p.modes().bits(), 3);
        assert!(!(p.modes() & Mode::M).is_empty());
        assert!((p.modes() & Mode::U).is_empty());

        p.clear_modes();
        assert_eq!(p.modes(), Mode::empty());
    }

    #[test]
    fn bitmap_metadata() {
        assert_eq!(Mode::WIDTH, TypeTag::UINT32);
        assert_eq!(Mode::FLAGS, &[("M", 1), ("S", 2), ("U", 4)]);
        assert_eq!(Mode::from_bits_u64(5), Some(Mode::M | Mode::U));
        assert_eq!(Mode::from_bits_u64(8), None);
        assert_eq!((Mode::S | Mode::U).display().to_string(), "S | U");
        assert_eq!(Mode::empty().display().to_string(), "None");
    }

    #[test]
    fn other_fields() {
        let mut p = Privileged::new();
        p.set_mxlen(64);
        p.set_isa("rv64imac");
        assert_eq!(p.mxlen(), 64);
        assert_eq!(p.isa(), "rv64imac");

        let mut hart = Hart::new();
        assert_eq!(hart.xlen(), Xlen::XLEN_UNSPECIFIED);
        hart.set_xlen(Xlen::XLEN_64);
        assert_eq!(hart.xlen(), Xlen::XLEN_64);

        assert!(!hart.has_privileged());
        hart.mutable_privileged().set_modes(Mode::M);
        assert_eq!(hart.privileged().map(|p| p.modes()), Some(Mode::M));

        hart.add_delegated(Mode::S | Mode::U);
        hart.add_extensions("zicsr");
        assert_eq!(hart.delegated(), &[6]);
        assert_eq!(hart.extensions_len(), 1);
    }

    #[test]
    fn transformed_schema() {
        assert!(TRANSFORMED.contains("uint32 modes = 1;"));
        assert!(TRANSFORMED.contains("repeated uint32 delegated = 4;"));
        assert!(!TRANSFORMED.contains("option (bitmap)"));
    }
}
