use crate::*;

ext! {
    name: Pssh,
    versions: [0, 1],
    flags: {}
}

/// Protection System Specific Header box.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pssh {
    pub system_id: [u8; 16],
    pub kids: Vec<[u8; 16]>,
    pub data: Vec<u8>,
}

impl AtomExt for Pssh {
    const KIND_EXT: FourCC = FourCC::new(b"pssh");

    type Ext = PsshExt;

    fn decode_body_ext<B: Buf>(buf: &mut B, ext: PsshExt) -> Result<Self> {
        let system_id = <[u8; 16]>::decode(buf)?;

        let mut kids = Vec::new();
        if ext.version == PsshVersion::V1 {
            let count = u32::decode(buf)?;
            for _ in 0..count {
                kids.push(<[u8; 16]>::decode(buf)?);
            }
        }

        let size = u32::decode(buf)? as usize;
        let data = Vec::decode_exact(buf, size)?;

        Ok(Pssh {
            system_id,
            kids,
            data,
        })
    }

    fn encode_body_ext<B: BufMut>(&self, buf: &mut B) -> Result<PsshExt> {
        self.system_id.encode(buf)?;

        let version = match self.kids.is_empty() {
            true => PsshVersion::V0,
            false => {
                (self.kids.len() as u32).encode(buf)?;
                for kid in &self.kids {
                    kid.encode(buf)?;
                }
                PsshVersion::V1
            }
        };

        (self.data.len() as u32).encode(buf)?;
        self.data.encode(buf)?;

        Ok(version.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pssh() {
        let expected = Pssh {
            system_id: [
                0x9a, 0x04, 0xf0, 0x79, 0x98, 0x40, 0x42, 0x86, 0xab, 0x92, 0xe6, 0x5b, 0xe0,
                0x88, 0x5f, 0x95,
            ],
            kids: vec![],
            data: vec![1, 2, 3, 4],
        };

        let mut buf = Vec::new();
        expected.encode(&mut buf).unwrap();

        let mut buf = buf.as_ref();
        let decoded = Pssh::decode(&mut buf).unwrap();
        assert_eq!(decoded, expected);
    }
}
