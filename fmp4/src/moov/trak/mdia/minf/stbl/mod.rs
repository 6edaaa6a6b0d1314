mod stco;
mod stsc;
mod stsd;
mod stsz;
mod stts;

pub use stco::*;
pub use stsc::*;
pub use stsd::*;
pub use stsz::*;
pub use stts::*;

use crate::*;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stbl {
    pub stsd: Stsd,
    pub stts: Stts,
    pub stsc: Stsc,
    pub stsz: Stsz,
    pub stco: Stco,
}

impl Atom for Stbl {
    const KIND: FourCC = FourCC::new(b"stbl");

    nested! {
        required: [ Stsd, Stts, Stsc, Stsz, Stco ],
        optional: [],
        multiple: [],
    }
}
