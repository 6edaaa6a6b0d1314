use crate::*;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stsc {
    pub entries: Vec<StscEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StscEntry {
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_description_index: u32,
}

impl AtomExt for Stsc {
    type Ext = ();

    const KIND_EXT: FourCC = FourCC::new(b"stsc");

    fn decode_body_ext<B: Buf>(buf: &mut B, _ext: ()) -> Result<Self> {
        let entry_count = u32::decode(buf)?;
        let mut entries = Vec::new();
        for _ in 0..entry_count {
            let entry = StscEntry {
                first_chunk: u32::decode(buf)?,
                samples_per_chunk: u32::decode(buf)?,
                sample_description_index: u32::decode(buf)?,
            };
            entries.push(entry);
        }

        Ok(Stsc { entries })
    }

    fn encode_body_ext<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        (self.entries.len() as u32).encode(buf)?;
        for entry in self.entries.iter() {
            entry.first_chunk.encode(buf)?;
            entry.samples_per_chunk.encode(buf)?;
            entry.sample_description_index.encode(buf)?;
        }

        Ok(())
    }
}
