use crate::*;

ext! {
    name: Sdtp,
    versions: [0],
    flags: {}
}

/// Independent and disposable samples; one byte per sample.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sdtp {
    pub entries: Vec<u8>,
}

impl AtomExt for Sdtp {
    type Ext = SdtpExt;

    const KIND_EXT: FourCC = FourCC::new(b"sdtp");

    fn decode_body_ext<B: Buf>(buf: &mut B, _ext: SdtpExt) -> Result<Self> {
        Ok(Sdtp {
            entries: Vec::decode(buf)?,
        })
    }

    fn encode_body_ext<B: BufMut>(&self, buf: &mut B) -> Result<SdtpExt> {
        self.entries.encode(buf)?;
        Ok(SdtpExt::default())
    }
}
