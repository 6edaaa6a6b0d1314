mod mvhd;
mod mvex;
mod trak;

pub use mvhd::*;
pub use mvex::*;
pub use trak::*;

use crate::*;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Moov {
    pub mvhd: Mvhd,
    pub mvex: Option<Mvex>,
    pub trak: Vec<Trak>,
    pub pssh: Vec<Pssh>,
}

impl Atom for Moov {
    const KIND: FourCC = FourCC::new(b"moov");

    nested! {
        required: [ Mvhd ],
        optional: [ Mvex ],
        multiple: [ Trak, Pssh ],
    }
}
