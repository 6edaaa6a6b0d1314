use crate::*;

ext! {
    name: Mfhd,
    versions: [0],
    flags: {}
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mfhd {
    pub sequence_number: u32,
}

impl AtomExt for Mfhd {
    const KIND_EXT: FourCC = FourCC::new(b"mfhd");

    type Ext = MfhdExt;

    fn decode_body_ext<B: Buf>(buf: &mut B, _ext: MfhdExt) -> Result<Self> {
        Ok(Mfhd {
            sequence_number: u32::decode(buf)?,
        })
    }

    fn encode_body_ext<B: BufMut>(&self, buf: &mut B) -> Result<MfhdExt> {
        self.sequence_number.encode(buf)?;
        Ok(MfhdExt::default())
    }
}
