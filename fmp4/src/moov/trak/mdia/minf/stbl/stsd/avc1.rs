use crate::*;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Avc1 {
    pub visual: Visual,
    pub avcc: Avcc,
}

impl Atom for Avc1 {
    const KIND: FourCC = FourCC::new(b"avc1");

    fn decode_body<B: Buf>(buf: &mut B) -> Result<Self> {
        let visual = Visual::decode(buf)?;

        let mut avcc = None;
        while let Some(atom) = Any::decode_maybe(buf)? {
            match atom {
                Any::Avcc(atom) => avcc = atom.into(),
                _ => tracing::warn!("unknown atom: {:?}", atom),
            }
        }

        Ok(Avc1 {
            visual,
            avcc: avcc.ok_or(Error::MissingBox(Avcc::KIND))?,
        })
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        self.visual.encode(buf)?;
        self.avcc.encode(buf)?;

        Ok(())
    }
}

/// The protected form of avc1. The original format is recorded in sinf/frma.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Encv {
    pub visual: Visual,
    pub avcc: Avcc,
    pub sinf: Sinf,
}

impl Atom for Encv {
    const KIND: FourCC = FourCC::new(b"encv");

    fn decode_body<B: Buf>(buf: &mut B) -> Result<Self> {
        let visual = Visual::decode(buf)?;

        let mut avcc = None;
        let mut sinf = None;
        while let Some(atom) = Any::decode_maybe(buf)? {
            match atom {
                Any::Avcc(atom) => avcc = atom.into(),
                Any::Sinf(atom) => sinf = atom.into(),
                _ => tracing::warn!("unknown atom: {:?}", atom),
            }
        }

        Ok(Encv {
            visual,
            avcc: avcc.ok_or(Error::MissingBox(Avcc::KIND))?,
            sinf: sinf.ok_or(Error::MissingBox(Sinf::KIND))?,
        })
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        self.visual.encode(buf)?;
        self.avcc.encode(buf)?;
        self.sinf.encode(buf)?;

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Avcc {
    pub configuration_version: u8,
    pub avc_profile_indication: u8,
    pub profile_compatibility: u8,
    pub avc_level_indication: u8,
    pub length_size: u8,
    pub sequence_parameter_sets: Vec<Vec<u8>>,
    pub picture_parameter_sets: Vec<Vec<u8>>,
}

impl Avcc {
    pub fn new(sps: &[u8], pps: &[u8]) -> Result<Self> {
        if sps.len() < 4 {
            return Err(Error::OutOfBounds);
        }

        Ok(Self {
            configuration_version: 1,
            avc_profile_indication: sps[1],
            profile_compatibility: sps[2],
            avc_level_indication: sps[3],
            length_size: 4,
            sequence_parameter_sets: vec![sps.into()],
            picture_parameter_sets: vec![pps.into()],
        })
    }
}

impl Atom for Avcc {
    const KIND: FourCC = FourCC::new(b"avcC");

    fn decode_body<B: Buf>(buf: &mut B) -> Result<Self> {
        let configuration_version = u8::decode(buf)?;
        if configuration_version != 1 {
            return Err(Error::UnknownVersion(configuration_version));
        }
        let avc_profile_indication = u8::decode(buf)?;
        let profile_compatibility = u8::decode(buf)?;
        let avc_level_indication = u8::decode(buf)?;

        // The first 5 bits are reserved as 0b11111 and the value is encoded -1
        let mut length_size = u8::decode(buf)?;
        length_size = match length_size {
            0xfc..=0xff => (length_size & 0x03) + 1,
            _ => return Err(Error::InvalidSize),
        };

        let num_of_spss = u8::decode(buf)? & 0x1F;
        let mut sequence_parameter_sets = Vec::with_capacity(num_of_spss as usize);
        for _ in 0..num_of_spss {
            let size = u16::decode(buf)? as usize;
            let nal = Vec::decode_exact(buf, size)?;
            sequence_parameter_sets.push(nal);
        }

        let num_of_ppss = u8::decode(buf)?;
        let mut picture_parameter_sets = Vec::with_capacity(num_of_ppss as usize);
        for _ in 0..num_of_ppss {
            let size = u16::decode(buf)? as usize;
            let nal = Vec::decode_exact(buf, size)?;
            picture_parameter_sets.push(nal);
        }

        // High profiles may append chroma/bit-depth extensions. Nothing
        // downstream needs them, so drain whatever remains.
        buf.advance(buf.remaining());

        Ok(Avcc {
            configuration_version,
            avc_profile_indication,
            profile_compatibility,
            avc_level_indication,
            length_size,
            sequence_parameter_sets,
            picture_parameter_sets,
        })
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        self.configuration_version.encode(buf)?;
        self.avc_profile_indication.encode(buf)?;
        self.profile_compatibility.encode(buf)?;
        self.avc_level_indication.encode(buf)?;
        let length_size = match self.length_size {
            0 => return Err(Error::InvalidSize),
            1..=4 => self.length_size - 1,
            _ => return Err(Error::InvalidSize),
        };
        (length_size | 0xFC).encode(buf)?;

        (self.sequence_parameter_sets.len() as u8 | 0xE0).encode(buf)?;
        for sps in &self.sequence_parameter_sets {
            (sps.len() as u16).encode(buf)?;
            sps.encode(buf)?;
        }

        (self.picture_parameter_sets.len() as u8).encode(buf)?;
        for pps in &self.picture_parameter_sets {
            (pps.len() as u16).encode(buf)?;
            pps.encode(buf)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avc1() {
        let expected = Avc1 {
            visual: Visual {
                data_reference_index: 1,
                width: 1280,
                height: 720,
                horizresolution: 0x48.into(),
                vertresolution: 0x48.into(),
                frame_count: 1,
                compressor: Default::default(),
                depth: 24,
            },
            avcc: Avcc {
                configuration_version: 1,
                avc_profile_indication: 0x4d,
                profile_compatibility: 0x40,
                avc_level_indication: 0x20,
                length_size: 4,
                sequence_parameter_sets: vec![vec![
                    0x67, 0x4d, 0x40, 0x20, 0x9e, 0x52, 0x81, 0x80, 0x6f, 0x60,
                ]],
                picture_parameter_sets: vec![vec![0x68, 0xef, 0x75, 0x20]],
            },
        };
        let mut buf = Vec::new();
        expected.encode(&mut buf).unwrap();

        let mut buf = buf.as_ref();
        let decoded = Avc1::decode(&mut buf).unwrap();
        assert_eq!(decoded, expected);
    }
}
