use crate::*;

ext! {
    name: Mehd,
    versions: [0, 1],
    flags: {}
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mehd {
    pub fragment_duration: u64,
}

impl AtomExt for Mehd {
    const KIND_EXT: FourCC = FourCC::new(b"mehd");

    type Ext = MehdExt;

    fn decode_body_ext<B: Buf>(buf: &mut B, ext: MehdExt) -> Result<Self> {
        let fragment_duration = match ext.version {
            MehdVersion::V1 => u64::decode(buf)?,
            MehdVersion::V0 => u32::decode(buf)? as u64,
        };

        Ok(Mehd { fragment_duration })
    }

    fn encode_body_ext<B: BufMut>(&self, buf: &mut B) -> Result<MehdExt> {
        self.fragment_duration.encode(buf)?;
        Ok(MehdVersion::V1.into())
    }
}
