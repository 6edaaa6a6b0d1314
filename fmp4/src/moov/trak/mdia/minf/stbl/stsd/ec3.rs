use crate::*;

/// Enhanced AC-3 sample entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ec3 {
    pub audio: Audio,
    pub dec3: Dec3,
}

impl Atom for Ec3 {
    const KIND: FourCC = FourCC::new(b"ec-3");

    fn decode_body<B: Buf>(buf: &mut B) -> Result<Self> {
        let audio = Audio::decode(buf)?;

        let mut dec3 = None;
        while let Some(atom) = Any::decode_maybe(buf)? {
            match atom {
                Any::Dec3(atom) => dec3 = atom.into(),
                _ => tracing::warn!("unknown atom: {:?}", atom),
            }
        }

        Ok(Ec3 {
            audio,
            dec3: dec3.ok_or(Error::MissingBox(Dec3::KIND))?,
        })
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        self.audio.encode(buf)?;
        self.dec3.encode(buf)?;

        Ok(())
    }
}

/// EC3SpecificBox, ETSI TS 102 366 annex F.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dec3 {
    pub data_rate: u16,
    pub substreams: Vec<Dec3Substream>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dec3Substream {
    pub fscod: u8,
    pub bsid: u8,
    pub asvc: u8,
    pub bsmod: u8,
    pub acmod: u8,
    pub lfeon: u8,
    pub num_dep_sub: u8,
    pub chan_loc: u16,
}

impl Atom for Dec3 {
    const KIND: FourCC = FourCC::new(b"dec3");

    fn decode_body<B: Buf>(buf: &mut B) -> Result<Self> {
        let data = Vec::<u8>::decode(buf)?;
        let mut bits = BitReader::new(&data);

        let data_rate = bits.read(13)? as u16;
        let num_ind_sub = bits.read(3)? as usize + 1;

        let mut substreams = Vec::with_capacity(num_ind_sub);
        for _ in 0..num_ind_sub {
            let fscod = bits.read(2)? as u8;
            let bsid = bits.read(5)? as u8;
            bits.read(1)?; // reserved
            let asvc = bits.read(1)? as u8;
            let bsmod = bits.read(3)? as u8;
            let acmod = bits.read(3)? as u8;
            let lfeon = bits.read(1)? as u8;
            bits.read(3)?; // reserved
            let num_dep_sub = bits.read(4)? as u8;

            let chan_loc = match num_dep_sub {
                0 => {
                    bits.read(1)?; // reserved
                    0
                }
                _ => bits.read(9)? as u16,
            };

            substreams.push(Dec3Substream {
                fscod,
                bsid,
                asvc,
                bsmod,
                acmod,
                lfeon,
                num_dep_sub,
                chan_loc,
            });
        }

        Ok(Dec3 {
            data_rate,
            substreams,
        })
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        let mut bits = BitWriter::new();

        bits.write(self.data_rate as u32, 13);
        bits.write(self.substreams.len().saturating_sub(1) as u32, 3);

        for sub in &self.substreams {
            bits.write(sub.fscod as u32, 2);
            bits.write(sub.bsid as u32, 5);
            bits.write(0, 1); // reserved
            bits.write(sub.asvc as u32, 1);
            bits.write(sub.bsmod as u32, 3);
            bits.write(sub.acmod as u32, 3);
            bits.write(sub.lfeon as u32, 1);
            bits.write(0, 3); // reserved
            bits.write(sub.num_dep_sub as u32, 4);

            match sub.num_dep_sub {
                0 => bits.write(0, 1), // reserved
                _ => bits.write(sub.chan_loc as u32, 9),
            }
        }

        bits.finish().encode(buf)
    }
}

struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn read(&mut self, count: usize) -> Result<u32> {
        let mut value = 0u32;
        for _ in 0..count {
            let byte = self.pos / 8;
            if byte >= self.data.len() {
                return Err(Error::OutOfBounds);
            }

            let bit = 7 - (self.pos % 8);
            value = (value << 1) | ((self.data[byte] >> bit) & 1) as u32;
            self.pos += 1;
        }

        Ok(value)
    }
}

struct BitWriter {
    data: Vec<u8>,
    pos: usize,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            data: Vec::new(),
            pos: 0,
        }
    }

    fn write(&mut self, value: u32, count: usize) {
        for i in (0..count).rev() {
            let byte = self.pos / 8;
            if byte >= self.data.len() {
                self.data.push(0);
            }

            let bit = 7 - (self.pos % 8);
            self.data[byte] |= (((value >> i) & 1) as u8) << bit;
            self.pos += 1;
        }
    }

    fn finish(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dec3() {
        let expected = Dec3 {
            data_rate: 224,
            substreams: vec![Dec3Substream {
                fscod: 0,
                bsid: 16,
                asvc: 0,
                bsmod: 0,
                acmod: 7,
                lfeon: 1,
                num_dep_sub: 0,
                chan_loc: 0,
            }],
        };

        let mut buf = Vec::new();
        expected.encode(&mut buf).unwrap();

        let mut buf = buf.as_ref();
        let decoded = Dec3::decode(&mut buf).unwrap();
        assert_eq!(decoded, expected);
    }

    // The payload as carried in a Smooth Streaming CodecPrivateData blob,
    // after the WAVEFORMATEXTENSIBLE prefix is stripped.
    #[test]
    fn test_dec3_payload() {
        let payload = [0x07u8, 0x00, 0x20, 0x0f, 0x00];

        let mut body = Vec::new();
        0u32.encode(&mut body).unwrap();
        Dec3::KIND.encode(&mut body).unwrap();
        payload.encode(&mut body).unwrap();
        let size = (body.len() as u32).to_be_bytes();
        body[..4].copy_from_slice(&size);

        let decoded = Dec3::decode(&mut body.as_slice()).unwrap();
        assert_eq!(decoded.data_rate, 224);
        assert_eq!(decoded.substreams.len(), 1);

        let mut out = Vec::new();
        decoded.encode(&mut out).unwrap();
        assert_eq!(out, body);
    }
}
