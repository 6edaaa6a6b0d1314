use crate::*;

/// TTML subtitle sample entry (ISO/IEC 14496-30).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stpp {
    pub data_reference_index: u16,
    pub namespace: String,
    pub schema_location: String,
    pub auxiliary_mime_types: String,
}

impl Default for Stpp {
    fn default() -> Self {
        Stpp {
            data_reference_index: 1,
            namespace: String::new(),
            schema_location: String::new(),
            auxiliary_mime_types: String::new(),
        }
    }
}

impl Atom for Stpp {
    const KIND: FourCC = FourCC::new(b"stpp");

    fn decode_body<B: Buf>(buf: &mut B) -> Result<Self> {
        // SampleEntry
        <[u8; 6]>::decode(buf)?;
        let data_reference_index = u16::decode(buf)?;

        let namespace = String::decode(buf)?;
        let schema_location = String::decode(buf)?;
        let auxiliary_mime_types = String::decode(buf)?;

        Ok(Stpp {
            data_reference_index,
            namespace,
            schema_location,
            auxiliary_mime_types,
        })
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        [0u8; 6].encode(buf)?; // reserved
        self.data_reference_index.encode(buf)?;

        self.namespace.as_str().encode(buf)?;
        self.schema_location.as_str().encode(buf)?;
        self.auxiliary_mime_types.as_str().encode(buf)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stpp() {
        let expected = Stpp {
            data_reference_index: 1,
            namespace: String::from("http://www.w3.org/ns/ttml"),
            schema_location: String::new(),
            auxiliary_mime_types: String::new(),
        };

        let mut buf = Vec::new();
        expected.encode(&mut buf).unwrap();

        let mut buf = buf.as_ref();
        let decoded = Stpp::decode(&mut buf).unwrap();
        assert_eq!(decoded, expected);
    }
}
