use crate::*;

ext! {
    name: Saio,
    versions: [0, 1],
    flags: {
        aux_info_type = 0,
    }
}

/// Sample auxiliary information offsets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Saio {
    pub aux_info_type: Option<(u32, u32)>,
    pub offsets: Vec<u64>,
}

impl AtomExt for Saio {
    type Ext = SaioExt;

    const KIND_EXT: FourCC = FourCC::new(b"saio");

    fn decode_body_ext<B: Buf>(buf: &mut B, ext: SaioExt) -> Result<Self> {
        let aux_info_type = match ext.aux_info_type {
            true => Some((u32::decode(buf)?, u32::decode(buf)?)),
            false => None,
        };

        let entry_count = u32::decode(buf)?;
        let mut offsets = Vec::with_capacity(entry_count.min(4096) as usize);
        for _ in 0..entry_count {
            let offset = match ext.version {
                SaioVersion::V1 => u64::decode(buf)?,
                SaioVersion::V0 => u32::decode(buf)? as u64,
            };
            offsets.push(offset);
        }

        Ok(Saio {
            aux_info_type,
            offsets,
        })
    }

    fn encode_body_ext<B: BufMut>(&self, buf: &mut B) -> Result<SaioExt> {
        if let Some((aux_type, aux_param)) = self.aux_info_type {
            aux_type.encode(buf)?;
            aux_param.encode(buf)?;
        }

        (self.offsets.len() as u32).encode(buf)?;
        for offset in &self.offsets {
            offset.encode(buf)?;
        }

        Ok(SaioExt {
            version: SaioVersion::V1,
            aux_info_type: self.aux_info_type.is_some(),
        })
    }
}
