use crate::*;

/// A synthesized initialization segment: ftyp + moov.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitSegment {
    pub ftyp: Ftyp,
    pub moov: Moov,
}

impl InitSegment {
    pub fn encode_to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.ftyp.encode(&mut buf)?;
        self.moov.encode(&mut buf)?;
        Ok(buf)
    }
}

/// A fragmented media segment: optional styp/sidx headers followed by
/// moof + mdat pairs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FragmentedFile {
    pub styp: Option<Styp>,
    pub sidx: Vec<Sidx>,
    pub fragments: Vec<Fragment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub moof: Moof,
    pub mdat: Mdat,
}

impl FragmentedFile {
    /// Decode a complete media segment held in memory.
    ///
    /// Progressive (moov + mdat) files are rejected with
    /// [Error::NotFragmented].
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut buf = data;

        let mut styp = None;
        let mut sidx = Vec::new();
        let mut fragments = Vec::new();
        let mut moof: Option<Moof> = None;

        while let Some(atom) = Any::decode_maybe(&mut buf)? {
            match atom {
                Any::Styp(atom) => styp = Some(atom),
                Any::Sidx(atom) => sidx.push(atom),
                Any::Moov(_) => return Err(Error::NotFragmented),
                Any::Moof(atom) => {
                    if moof.is_some() {
                        // moof without a matching mdat
                        return Err(Error::MissingBox(Mdat::KIND));
                    }
                    moof = Some(atom);
                }
                Any::Mdat(atom) => {
                    let moof = moof.take().ok_or(Error::NotFragmented)?;
                    fragments.push(Fragment { moof, mdat: atom });
                }
                Any::Ftyp(_) | Any::Unknown(..) => {}
                _ => return Err(Error::UnexpectedBox(atom.kind())),
            }
        }

        if buf.has_remaining() {
            return Err(Error::ShortRead);
        }

        if fragments.is_empty() {
            return Err(Error::NotFragmented);
        }

        Ok(FragmentedFile {
            styp,
            sidx,
            fragments,
        })
    }

    /// Encode the segment, recomputing each trun's data offset so the
    /// sample data lines up with the freshly written moof.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();

        self.styp.encode(&mut buf)?;
        for sidx in &self.sidx {
            sidx.encode(&mut buf)?;
        }

        for fragment in &self.fragments {
            let mut moof = fragment.moof.clone();

            // Offsets depend on the moof size, which in turn depends on
            // whether the offset fields are present. Force them on, then
            // measure.
            for traf in &mut moof.traf {
                if let Some(trun) = traf.trun.first_mut() {
                    trun.data_offset = Some(0);
                }
            }

            let mut probe = Vec::new();
            moof.encode(&mut probe)?;

            // Sample data starts right after the mdat header and each
            // track's run follows the previous one.
            let mut offset = probe.len() as i64 + 8;
            for traf in &mut moof.traf {
                let default_size = traf.tfhd.default_sample_size.unwrap_or(0) as u64;
                let mut consumed = 0u64;

                if let Some(trun) = traf.trun.first_mut() {
                    trun.data_offset = Some(offset as i32);
                }
                for trun in &traf.trun {
                    consumed += trun
                        .total_size()
                        .unwrap_or(default_size * trun.entries.len() as u64);
                }

                offset += consumed as i64;
            }

            moof.encode(&mut buf)?;
            fragment.mdat.encode(&mut buf)?;
        }

        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(track_id: u32, data: &[u8]) -> Fragment {
        Fragment {
            moof: Moof {
                mfhd: Mfhd { sequence_number: 1 },
                traf: vec![Traf {
                    tfhd: Tfhd {
                        track_id,
                        ..Default::default()
                    },
                    trun: vec![Trun {
                        data_offset: Some(0xDEAD),
                        entries: vec![TrunEntry {
                            size: Some(data.len() as u32),
                            duration: Some(20_000_000),
                            ..Default::default()
                        }],
                    }],
                    ..Default::default()
                }],
            },
            mdat: Mdat { data: data.into() },
        }
    }

    #[test]
    fn test_roundtrip() {
        let file = FragmentedFile {
            styp: None,
            sidx: vec![],
            fragments: vec![fragment(1, b"hello world")],
        };

        let bytes = file.encode_to_vec().unwrap();
        let decoded = FragmentedFile::decode(&bytes).unwrap();

        assert_eq!(decoded.fragments.len(), 1);
        assert_eq!(decoded.fragments[0].mdat.data, b"hello world");
    }

    #[test]
    fn test_data_offset_recompute() {
        let file = FragmentedFile {
            styp: None,
            sidx: vec![],
            fragments: vec![fragment(1, b"0123456789")],
        };

        let bytes = file.encode_to_vec().unwrap();
        let decoded = FragmentedFile::decode(&bytes).unwrap();

        // The bogus input offset must be replaced by the real moof size.
        let trun = &decoded.fragments[0].moof.traf[0].trun[0];
        let offset = trun.data_offset.unwrap() as usize;
        assert_eq!(&bytes[offset..offset + 10], b"0123456789");
    }

    #[test]
    fn test_not_fragmented() {
        let mut buf = Vec::new();
        Moov::default().encode(&mut buf).unwrap();
        Mdat { data: vec![1] }.encode(&mut buf).unwrap();

        assert!(matches!(
            FragmentedFile::decode(&buf),
            Err(Error::NotFragmented)
        ));
    }
}
