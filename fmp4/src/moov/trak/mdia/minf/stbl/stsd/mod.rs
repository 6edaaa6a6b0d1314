mod audio;
mod avc1;
mod ec3;
mod esds;
mod mp4a;
mod sinf;
mod stpp;
mod visual;

pub use audio::*;
pub use avc1::*;
pub use ec3::*;
pub use esds::*;
pub use mp4a::*;
pub use sinf::*;
pub use stpp::*;
pub use visual::*;

use crate::*;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stsd {
    pub entries: Vec<SampleEntry>,
}

/// Called a "sample entry" in the ISOBMFF specification.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SampleEntry {
    // H264
    Avc1(Avc1),

    // H264, CENC protected
    Encv(Encv),

    // AAC
    Mp4a(Mp4a),

    // AAC, CENC protected
    Enca(Enca),

    // Enhanced AC-3
    Ec3(Ec3),

    // TTML subtitles
    Stpp(Stpp),

    // Unknown
    Unknown(FourCC),
}

impl SampleEntry {
    pub fn kind(&self) -> FourCC {
        match self {
            Self::Avc1(_) => Avc1::KIND,
            Self::Encv(_) => Encv::KIND,
            Self::Mp4a(_) => Mp4a::KIND,
            Self::Enca(_) => Enca::KIND,
            Self::Ec3(_) => Ec3::KIND,
            Self::Stpp(_) => Stpp::KIND,
            Self::Unknown(kind) => *kind,
        }
    }
}

impl Decode for SampleEntry {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let atom = Any::decode(buf)?;
        Ok(match atom {
            Any::Avc1(atom) => Self::Avc1(atom),
            Any::Encv(atom) => Self::Encv(atom),
            Any::Mp4a(atom) => Self::Mp4a(atom),
            Any::Enca(atom) => Self::Enca(atom),
            Any::Ec3(atom) => Self::Ec3(atom),
            Any::Stpp(atom) => Self::Stpp(atom),
            Any::Unknown(kind, _) => Self::Unknown(kind),
            _ => return Err(Error::UnexpectedBox(atom.kind())),
        })
    }
}

impl Encode for SampleEntry {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        match self {
            Self::Avc1(atom) => atom.encode(buf),
            Self::Encv(atom) => atom.encode(buf),
            Self::Mp4a(atom) => atom.encode(buf),
            Self::Enca(atom) => atom.encode(buf),
            Self::Ec3(atom) => atom.encode(buf),
            Self::Stpp(atom) => atom.encode(buf),
            Self::Unknown(kind) => kind.encode(buf),
        }
    }
}

impl AtomExt for Stsd {
    type Ext = ();

    const KIND_EXT: FourCC = FourCC::new(b"stsd");

    fn decode_body_ext<B: Buf>(buf: &mut B, _ext: ()) -> Result<Self> {
        let entry_count = u32::decode(buf)?;
        let mut entries = Vec::new();
        for _ in 0..entry_count {
            entries.push(SampleEntry::decode(buf)?);
        }

        Ok(Stsd { entries })
    }

    fn encode_body_ext<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        (self.entries.len() as u32).encode(buf)?;
        self.entries.encode(buf)?;

        Ok(())
    }
}
