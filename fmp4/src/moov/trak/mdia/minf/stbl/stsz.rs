use crate::*;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stsz {
    pub sample_size: u32,
    pub sample_count: u32,
    pub sizes: Vec<u32>,
}

impl AtomExt for Stsz {
    type Ext = ();

    const KIND_EXT: FourCC = FourCC::new(b"stsz");

    fn decode_body_ext<B: Buf>(buf: &mut B, _ext: ()) -> Result<Self> {
        let sample_size = u32::decode(buf)?;
        let sample_count = u32::decode(buf)?;

        let mut sizes = Vec::new();
        if sample_size == 0 {
            for _ in 0..sample_count {
                sizes.push(u32::decode(buf)?);
            }
        }

        Ok(Stsz {
            sample_size,
            sample_count,
            sizes,
        })
    }

    fn encode_body_ext<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        self.sample_size.encode(buf)?;
        self.sample_count.encode(buf)?;

        if self.sample_size == 0 {
            for size in self.sizes.iter() {
                size.encode(buf)?;
            }
        }

        Ok(())
    }
}
