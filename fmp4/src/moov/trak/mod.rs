mod mdia;
mod tkhd;

pub use mdia::*;
pub use tkhd::*;

use crate::*;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Trak {
    pub tkhd: Tkhd,
    pub mdia: Mdia,
}

impl Atom for Trak {
    const KIND: FourCC = FourCC::new(b"trak");

    nested! {
        required: [ Tkhd, Mdia ],
        optional: [],
        multiple: [],
    }
}
