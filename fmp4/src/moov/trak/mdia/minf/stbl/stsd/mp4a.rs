use crate::*;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mp4a {
    pub audio: Audio,
    pub esds: Option<Esds>,
}

impl Atom for Mp4a {
    const KIND: FourCC = FourCC::new(b"mp4a");

    fn decode_body<B: Buf>(buf: &mut B) -> Result<Self> {
        let audio = Audio::decode(buf)?;

        let mut esds = None;
        while let Some(atom) = Any::decode_maybe(buf)? {
            match atom {
                Any::Esds(atom) => esds = atom.into(),
                _ => tracing::warn!("unknown atom: {:?}", atom),
            }
        }

        Ok(Mp4a { audio, esds })
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        self.audio.encode(buf)?;
        self.esds.encode(buf)?;

        Ok(())
    }
}

/// The protected form of mp4a. The original format is recorded in sinf/frma.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Enca {
    pub audio: Audio,
    pub esds: Option<Esds>,
    pub dec3: Option<Dec3>,
    pub sinf: Sinf,
}

impl Atom for Enca {
    const KIND: FourCC = FourCC::new(b"enca");

    fn decode_body<B: Buf>(buf: &mut B) -> Result<Self> {
        let audio = Audio::decode(buf)?;

        let mut esds = None;
        let mut dec3 = None;
        let mut sinf = None;
        while let Some(atom) = Any::decode_maybe(buf)? {
            match atom {
                Any::Esds(atom) => esds = atom.into(),
                Any::Dec3(atom) => dec3 = atom.into(),
                Any::Sinf(atom) => sinf = atom.into(),
                _ => tracing::warn!("unknown atom: {:?}", atom),
            }
        }

        Ok(Enca {
            audio,
            esds,
            dec3,
            sinf: sinf.ok_or(Error::MissingBox(Sinf::KIND))?,
        })
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        self.audio.encode(buf)?;
        self.esds.encode(buf)?;
        self.dec3.encode(buf)?;
        self.sinf.encode(buf)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mp4a() {
        let expected = Mp4a {
            audio: Audio {
                data_reference_index: 1,
                channel_count: 2,
                sample_size: 16,
                sample_rate: 44100.into(),
            },
            esds: Some(Esds::default()),
        };

        let mut buf = Vec::new();
        expected.encode(&mut buf).unwrap();

        let mut buf = buf.as_ref();
        let decoded = Mp4a::decode(&mut buf).unwrap();
        assert_eq!(decoded, expected);
    }
}
