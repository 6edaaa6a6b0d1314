mod saio;
mod saiz;
mod sdtp;
mod senc;
mod tfdt;
mod tfhd;
mod trun;

pub use saio::*;
pub use saiz::*;
pub use sdtp::*;
pub use senc::*;
pub use tfdt::*;
pub use tfhd::*;
pub use trun::*;

use crate::*;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Traf {
    pub tfhd: Tfhd,
    pub tfdt: Option<Tfdt>,
    pub trun: Vec<Trun>,
    pub senc: Option<Senc>,
    pub saiz: Option<Saiz>,
    pub saio: Option<Saio>,
    pub sdtp: Option<Sdtp>,
}

impl Atom for Traf {
    const KIND: FourCC = FourCC::new(b"traf");

    nested! {
        required: [ Tfhd ],
        optional: [ Tfdt, Senc, Saiz, Saio, Sdtp ],
        multiple: [ Trun ],
    }
}
