use crate::*;

ext! {
    name: Trun,
    versions: [0, 1],
    flags: {
        data_offset = 0,
        first_sample_flags = 2,
        sample_duration = 8,
        sample_size = 9,
        sample_flags = 10,
        sample_cts = 11,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Trun {
    pub data_offset: Option<i32>,
    pub entries: Vec<TrunEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrunEntry {
    pub duration: Option<u32>,
    pub size: Option<u32>,
    pub flags: Option<u32>,
    pub cts: Option<i32>,
}

impl AtomExt for Trun {
    const KIND_EXT: FourCC = FourCC::new(b"trun");

    type Ext = TrunExt;

    fn decode_body_ext<B: Buf>(buf: &mut B, ext: TrunExt) -> Result<Self> {
        let sample_count = u32::decode(buf)?;
        let data_offset = match ext.data_offset {
            true => i32::decode(buf)?.into(),
            false => None,
        };

        let mut first_sample_flags = match ext.first_sample_flags {
            true => u32::decode(buf)?.into(),
            false => None,
        };

        // Avoid a memory exhaustion attack when none of the per-sample
        // flags are set; the entries would be zero sized.
        if !(ext.sample_duration
            || ext.sample_size
            || ext.sample_flags
            || ext.sample_cts
            || sample_count <= 4096)
        {
            return Err(Error::OutOfBounds);
        }

        let mut entries = Vec::with_capacity(sample_count.min(4096) as _);

        for _ in 0..sample_count {
            let duration = match ext.sample_duration {
                true => u32::decode(buf)?.into(),
                false => None,
            };
            let size = match ext.sample_size {
                true => u32::decode(buf)?.into(),
                false => None,
            };
            let sample_flags = match first_sample_flags.take() {
                Some(flags) => Some(flags),
                None => match ext.sample_flags {
                    true => u32::decode(buf)?.into(),
                    false => None,
                },
            };
            let cts = match ext.sample_cts {
                true => i32::decode(buf)?.into(),
                false => None,
            };

            entries.push(TrunEntry {
                duration,
                size,
                flags: sample_flags,
                cts,
            });
        }

        Ok(Trun {
            data_offset,
            entries,
        })
    }

    fn encode_body_ext<B: BufMut>(&self, buf: &mut B) -> Result<TrunExt> {
        let ext = TrunExt {
            version: TrunVersion::V1,
            data_offset: self.data_offset.is_some(),
            first_sample_flags: false,

            sample_duration: self.entries.iter().all(|s| s.duration.is_some()),
            sample_size: self.entries.iter().all(|s| s.size.is_some()),
            sample_flags: self.entries.iter().all(|s| s.flags.is_some()),
            sample_cts: self.entries.iter().all(|s| s.cts.is_some()),
        };

        (self.entries.len() as u32).encode(buf)?;

        self.data_offset.encode(buf)?;

        for entry in &self.entries {
            if ext.sample_duration {
                entry.duration.encode(buf)?;
            }
            if ext.sample_size {
                entry.size.encode(buf)?;
            }
            if ext.sample_flags {
                entry.flags.encode(buf)?;
            }
            if ext.sample_cts {
                entry.cts.encode(buf)?;
            }
        }

        Ok(ext)
    }
}

impl Trun {
    /// The total size of the samples in this run, when every entry carries
    /// an explicit size.
    pub fn total_size(&self) -> Option<u64> {
        self.entries
            .iter()
            .map(|e| e.size.map(|s| s as u64))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trun() {
        let expected = Trun {
            data_offset: Some(0),
            entries: vec![
                TrunEntry {
                    duration: Some(20_000_000),
                    size: Some(1024),
                    flags: None,
                    cts: None,
                },
                TrunEntry {
                    duration: Some(20_000_000),
                    size: Some(891),
                    flags: None,
                    cts: None,
                },
            ],
        };

        let mut buf = Vec::new();
        expected.encode(&mut buf).unwrap();

        let mut buf = buf.as_ref();
        let decoded = Trun::decode(&mut buf).unwrap();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_trun_empty_sample() {
        let expected = Trun {
            data_offset: None,
            entries: vec![TrunEntry::default()],
        };

        let mut buf = Vec::new();
        expected.encode(&mut buf).unwrap();

        let mut buf = buf.as_ref();
        let decoded = Trun::decode(&mut buf).unwrap();
        assert_eq!(decoded, expected);
    }
}
