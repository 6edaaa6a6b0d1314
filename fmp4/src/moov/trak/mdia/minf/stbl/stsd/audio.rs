use crate::*;

/// The shared prefix of every audio sample entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audio {
    pub data_reference_index: u16,
    pub channel_count: u16,
    pub sample_size: u16,
    pub sample_rate: FixedPoint<u16>,
}

impl Default for Audio {
    fn default() -> Self {
        Self {
            data_reference_index: 1,
            channel_count: 2,
            sample_size: 16,
            sample_rate: 48000.into(),
        }
    }
}

impl Encode for Audio {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        // SampleEntry
        0u32.encode(buf)?; // reserved
        0u16.encode(buf)?; // reserved
        self.data_reference_index.encode(buf)?;

        // AudioSampleEntry
        0u16.encode(buf)?; // version
        0u16.encode(buf)?; // reserved
        0u32.encode(buf)?; // reserved
        self.channel_count.encode(buf)?;
        self.sample_size.encode(buf)?;
        0u32.encode(buf)?; // pre-defined, reserved
        self.sample_rate.encode(buf)?;

        Ok(())
    }
}

impl Decode for Audio {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        // SampleEntry
        u32::decode(buf)?; // reserved
        u16::decode(buf)?; // reserved
        let data_reference_index = u16::decode(buf)?;

        // AudioSampleEntry
        let version = u16::decode(buf)?;
        u16::decode(buf)?; // reserved
        u32::decode(buf)?; // reserved
        let channel_count = u16::decode(buf)?;
        let sample_size = u16::decode(buf)?;
        u32::decode(buf)?; // pre-defined, reserved
        let sample_rate = FixedPoint::decode(buf)?;

        if version == 1 {
            // Skip QTFF extensions
            u64::decode(buf)?;
            u64::decode(buf)?;
        }

        Ok(Self {
            data_reference_index,
            channel_count,
            sample_size,
            sample_rate,
        })
    }
}
