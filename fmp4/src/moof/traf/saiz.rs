use crate::*;

ext! {
    name: Saiz,
    versions: [0],
    flags: {
        aux_info_type = 0,
    }
}

/// Sample auxiliary information sizes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Saiz {
    pub aux_info_type: Option<(u32, u32)>,
    pub default_sample_info_size: u8,
    pub sample_count: u32,
    pub sizes: Vec<u8>,
}

impl AtomExt for Saiz {
    type Ext = SaizExt;

    const KIND_EXT: FourCC = FourCC::new(b"saiz");

    fn decode_body_ext<B: Buf>(buf: &mut B, ext: SaizExt) -> Result<Self> {
        let aux_info_type = match ext.aux_info_type {
            true => Some((u32::decode(buf)?, u32::decode(buf)?)),
            false => None,
        };

        let default_sample_info_size = u8::decode(buf)?;
        let sample_count = u32::decode(buf)?;

        let mut sizes = Vec::new();
        if default_sample_info_size == 0 {
            for _ in 0..sample_count {
                sizes.push(u8::decode(buf)?);
            }
        }

        Ok(Saiz {
            aux_info_type,
            default_sample_info_size,
            sample_count,
            sizes,
        })
    }

    fn encode_body_ext<B: BufMut>(&self, buf: &mut B) -> Result<SaizExt> {
        if let Some((aux_type, aux_param)) = self.aux_info_type {
            aux_type.encode(buf)?;
            aux_param.encode(buf)?;
        }

        self.default_sample_info_size.encode(buf)?;
        self.sample_count.encode(buf)?;

        if self.default_sample_info_size == 0 {
            self.sizes.encode(buf)?;
        }

        Ok(SaizExt {
            aux_info_type: self.aux_info_type.is_some(),
            ..Default::default()
        })
    }
}
