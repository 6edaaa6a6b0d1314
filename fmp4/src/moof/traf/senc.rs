use crate::*;

ext! {
    name: Senc,
    versions: [0],
    flags: {
        subsamples = 1,
    }
}

/// Sample encryption box (ISO/IEC 23001-7).
///
/// The per-sample IV size is declared in tenc, not here, so the payload
/// cannot be interpreted on its own. The raw body is kept verbatim and
/// [Senc::samples] parses it once the IV size is known.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Senc {
    pub subsamples: bool,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SencSample {
    pub iv: Vec<u8>,
    pub subsamples: Vec<SencSubsample>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SencSubsample {
    pub clear: u16,
    pub protected: u32,
}

impl Senc {
    pub fn samples(&self, iv_size: u8) -> Result<Vec<SencSample>> {
        let mut buf: &[u8] = &self.data;

        let sample_count = u32::decode(&mut buf)?;
        let mut samples = Vec::with_capacity(sample_count.min(4096) as usize);

        for _ in 0..sample_count {
            let iv = Vec::decode_exact(&mut buf, iv_size as usize)?;

            let mut subsamples = Vec::new();
            if self.subsamples {
                let count = u16::decode(&mut buf)?;
                for _ in 0..count {
                    subsamples.push(SencSubsample {
                        clear: u16::decode(&mut buf)?,
                        protected: u32::decode(&mut buf)?,
                    });
                }
            }

            samples.push(SencSample { iv, subsamples });
        }

        if buf.has_remaining() {
            return Err(Error::InvalidSampleEncryption);
        }

        Ok(samples)
    }
}

impl AtomExt for Senc {
    type Ext = SencExt;

    const KIND_EXT: FourCC = FourCC::new(b"senc");

    fn decode_body_ext<B: Buf>(buf: &mut B, ext: SencExt) -> Result<Self> {
        Ok(Senc {
            subsamples: ext.subsamples,
            data: Vec::decode(buf)?,
        })
    }

    fn encode_body_ext<B: BufMut>(&self, buf: &mut B) -> Result<SencExt> {
        self.data.encode(buf)?;

        Ok(SencExt {
            subsamples: self.subsamples,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_senc_samples() {
        // Two samples with 8 byte IVs, one subsample each.
        let mut data = Vec::new();
        2u32.encode(&mut data).unwrap();
        [1u8; 8].encode(&mut data).unwrap();
        1u16.encode(&mut data).unwrap();
        9u16.encode(&mut data).unwrap();
        100u32.encode(&mut data).unwrap();
        [2u8; 8].encode(&mut data).unwrap();
        1u16.encode(&mut data).unwrap();
        9u16.encode(&mut data).unwrap();
        200u32.encode(&mut data).unwrap();

        let senc = Senc {
            subsamples: true,
            data,
        };

        let samples = senc.samples(8).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].iv, vec![1u8; 8]);
        assert_eq!(samples[0].subsamples[0].clear, 9);
        assert_eq!(samples[0].subsamples[0].protected, 100);
        assert_eq!(samples[1].iv, vec![2u8; 8]);
        assert_eq!(samples[1].subsamples[0].protected, 200);
    }

    #[test]
    fn test_senc_roundtrip() {
        let mut data = Vec::new();
        1u32.encode(&mut data).unwrap();
        [3u8; 8].encode(&mut data).unwrap();

        let expected = Senc {
            subsamples: false,
            data,
        };

        let mut buf = Vec::new();
        expected.encode(&mut buf).unwrap();

        let mut buf = buf.as_ref();
        let decoded = Senc::decode(&mut buf).unwrap();
        assert_eq!(decoded, expected);
    }
}
