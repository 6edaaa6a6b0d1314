use crate::*;

ext! {
    name: Smhd,
    versions: [0],
    flags: {}
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Smhd {
    pub balance: FixedPoint<i8>,
}

impl AtomExt for Smhd {
    type Ext = SmhdExt;

    const KIND_EXT: FourCC = FourCC::new(b"smhd");

    fn decode_body_ext<B: Buf>(buf: &mut B, _ext: SmhdExt) -> Result<Self> {
        let balance = FixedPoint::decode(buf)?;
        u16::decode(buf)?; // reserved

        Ok(Smhd { balance })
    }

    fn encode_body_ext<B: BufMut>(&self, buf: &mut B) -> Result<SmhdExt> {
        self.balance.encode(buf)?;
        0u16.encode(buf)?; // reserved

        Ok(SmhdExt::default())
    }
}
