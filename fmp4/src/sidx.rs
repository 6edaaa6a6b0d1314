use crate::*;

ext! {
    name: Sidx,
    versions: [0, 1],
    flags: {}
}

/// Segment index box.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sidx {
    pub reference_id: u32,
    pub timescale: u32,
    pub earliest_presentation_time: u64,
    pub first_offset: u64,
    pub references: Vec<SidxRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SidxRef {
    pub reference_type: bool,
    pub referenced_size: u32,
    pub subsegment_duration: u32,
    pub starts_with_sap: bool,
    pub sap_type: u8,
    pub sap_delta_time: u32,
}

impl AtomExt for Sidx {
    const KIND_EXT: FourCC = FourCC::new(b"sidx");

    type Ext = SidxExt;

    fn decode_body_ext<B: Buf>(buf: &mut B, ext: SidxExt) -> Result<Self> {
        let reference_id = u32::decode(buf)?;
        let timescale = u32::decode(buf)?;

        let (earliest_presentation_time, first_offset) = match ext.version {
            SidxVersion::V1 => (u64::decode(buf)?, u64::decode(buf)?),
            SidxVersion::V0 => (u32::decode(buf)? as u64, u32::decode(buf)? as u64),
        };

        u16::decode(buf)?; // reserved
        let reference_count = u16::decode(buf)?;

        let mut references = Vec::with_capacity(reference_count.min(1024) as usize);
        for _ in 0..reference_count {
            let word = u32::decode(buf)?;
            let subsegment_duration = u32::decode(buf)?;
            let sap = u32::decode(buf)?;

            references.push(SidxRef {
                reference_type: (word >> 31) != 0,
                referenced_size: word & 0x7FFF_FFFF,
                subsegment_duration,
                starts_with_sap: (sap >> 31) != 0,
                sap_type: ((sap >> 28) & 0x7) as u8,
                sap_delta_time: sap & 0x0FFF_FFFF,
            });
        }

        Ok(Sidx {
            reference_id,
            timescale,
            earliest_presentation_time,
            first_offset,
            references,
        })
    }

    fn encode_body_ext<B: BufMut>(&self, buf: &mut B) -> Result<SidxExt> {
        self.reference_id.encode(buf)?;
        self.timescale.encode(buf)?;
        self.earliest_presentation_time.encode(buf)?;
        self.first_offset.encode(buf)?;

        0u16.encode(buf)?; // reserved
        (self.references.len() as u16).encode(buf)?;

        for r in &self.references {
            let word = ((r.reference_type as u32) << 31) | (r.referenced_size & 0x7FFF_FFFF);
            word.encode(buf)?;
            r.subsegment_duration.encode(buf)?;

            let sap = ((r.starts_with_sap as u32) << 31)
                | ((r.sap_type as u32 & 0x7) << 28)
                | (r.sap_delta_time & 0x0FFF_FFFF);
            sap.encode(buf)?;
        }

        Ok(SidxVersion::V1.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidx() {
        let expected = Sidx {
            reference_id: 1,
            timescale: 10_000_000,
            earliest_presentation_time: 17_443_164_950_004_000,
            first_offset: 0,
            references: vec![SidxRef {
                reference_type: false,
                referenced_size: 0,
                subsegment_duration: 20_000_000,
                starts_with_sap: true,
                sap_type: 1,
                sap_delta_time: 0,
            }],
        };

        let mut buf = Vec::new();
        expected.encode(&mut buf).unwrap();

        let mut buf = buf.as_ref();
        let decoded = Sidx::decode(&mut buf).unwrap();
        assert_eq!(decoded, expected);
    }
}
