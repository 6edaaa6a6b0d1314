use crate::*;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dinf {
    pub dref: Dref,
}

impl Atom for Dinf {
    const KIND: FourCC = FourCC::new(b"dinf");

    nested! {
        required: [ Dref ],
        optional: [],
        multiple: [],
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dref {
    pub urls: Vec<Url>,
}

impl Default for Dref {
    fn default() -> Self {
        Dref {
            urls: vec![Url::default()],
        }
    }
}

impl AtomExt for Dref {
    type Ext = ();

    const KIND_EXT: FourCC = FourCC::new(b"dref");

    fn decode_body_ext<B: Buf>(buf: &mut B, _ext: ()) -> Result<Self> {
        let entry_count = u32::decode(buf)?;
        let mut urls = Vec::new();

        for _ in 0..entry_count {
            let url = Url::decode(buf)?;
            urls.push(url);
        }

        Ok(Dref { urls })
    }

    fn encode_body_ext<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        (self.urls.len() as u32).encode(buf)?;

        for url in &self.urls {
            url.encode(buf)?;
        }

        Ok(())
    }
}

ext! {
    name: Url,
    versions: [0],
    flags: {
        self_contained = 0,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Url {
    pub location: String,
}

impl AtomExt for Url {
    type Ext = UrlExt;

    const KIND_EXT: FourCC = FourCC::new(b"url ");

    fn decode_body_ext<B: Buf>(buf: &mut B, _ext: UrlExt) -> Result<Self> {
        let location = match buf.has_remaining() {
            true => String::decode(buf)?,
            false => "".to_string(),
        };

        Ok(Url { location })
    }

    fn encode_body_ext<B: BufMut>(&self, buf: &mut B) -> Result<UrlExt> {
        if !self.location.is_empty() {
            self.location.as_str().encode(buf)?;
        }

        Ok(UrlExt {
            self_contained: true,
            ..Default::default()
        })
    }
}
