use crate::*;

/// A media data atom.
///
/// The entire payload is kept in memory; media segments are expected to be
/// modest in size (a few MiB).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mdat {
    pub data: Vec<u8>,
}

impl Atom for Mdat {
    const KIND: FourCC = FourCC::new(b"mdat");

    fn decode_body<B: Buf>(buf: &mut B) -> Result<Self> {
        Ok(Mdat {
            data: Vec::decode(buf)?,
        })
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        self.data.encode(buf)
    }
}
