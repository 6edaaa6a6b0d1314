use crate::*;

ext! {
    name: Sthd,
    versions: [0],
    flags: {}
}

/// Subtitle media header. The body is empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sthd {}

impl AtomExt for Sthd {
    type Ext = SthdExt;

    const KIND_EXT: FourCC = FourCC::new(b"sthd");

    fn decode_body_ext<B: Buf>(_buf: &mut B, _ext: SthdExt) -> Result<Self> {
        Ok(Sthd {})
    }

    fn encode_body_ext<B: BufMut>(&self, _buf: &mut B) -> Result<SthdExt> {
        Ok(SthdExt::default())
    }
}
