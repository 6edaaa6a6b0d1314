use crate::*;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stco {
    pub entries: Vec<u32>,
}

impl AtomExt for Stco {
    type Ext = ();

    const KIND_EXT: FourCC = FourCC::new(b"stco");

    fn decode_body_ext<B: Buf>(buf: &mut B, _ext: ()) -> Result<Self> {
        let count = u32::decode(buf)?;
        let mut entries = Vec::new();

        for _ in 0..count {
            let chunk_offset = u32::decode(buf)?;
            entries.push(chunk_offset);
        }

        Ok(Stco { entries })
    }

    fn encode_body_ext<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        (self.entries.len() as u32).encode(buf)?;
        for chunk_offset in self.entries.iter() {
            (chunk_offset).encode(buf)?;
        }

        Ok(())
    }
}
