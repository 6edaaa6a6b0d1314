use crate::*;

/// Protection scheme information, attached to encv/enca sample entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sinf {
    pub frma: Frma,
    pub schm: Option<Schm>,
    pub schi: Option<Schi>,
}

impl Atom for Sinf {
    const KIND: FourCC = FourCC::new(b"sinf");

    nested! {
        required: [ Frma ],
        optional: [ Schm, Schi ],
        multiple: [],
    }
}

/// The original (unprotected) sample entry format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frma {
    pub data_format: FourCC,
}

impl Default for Frma {
    fn default() -> Self {
        Frma {
            data_format: FourCC::new(b"avc1"),
        }
    }
}

impl Atom for Frma {
    const KIND: FourCC = FourCC::new(b"frma");

    fn decode_body<B: Buf>(buf: &mut B) -> Result<Self> {
        Ok(Frma {
            data_format: FourCC::decode(buf)?,
        })
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        self.data_format.encode(buf)
    }
}

ext! {
    name: Schm,
    versions: [0],
    flags: {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schm {
    pub scheme_type: FourCC,
    pub scheme_version: u32,
}

impl Default for Schm {
    fn default() -> Self {
        Schm {
            scheme_type: FourCC::new(b"cenc"),
            scheme_version: 0x0001_0000,
        }
    }
}

impl AtomExt for Schm {
    type Ext = SchmExt;

    const KIND_EXT: FourCC = FourCC::new(b"schm");

    fn decode_body_ext<B: Buf>(buf: &mut B, _ext: SchmExt) -> Result<Self> {
        Ok(Schm {
            scheme_type: FourCC::decode(buf)?,
            scheme_version: u32::decode(buf)?,
        })
    }

    fn encode_body_ext<B: BufMut>(&self, buf: &mut B) -> Result<SchmExt> {
        self.scheme_type.encode(buf)?;
        self.scheme_version.encode(buf)?;

        Ok(SchmExt::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schi {
    pub tenc: Tenc,
}

impl Atom for Schi {
    const KIND: FourCC = FourCC::new(b"schi");

    nested! {
        required: [ Tenc ],
        optional: [],
        multiple: [],
    }
}

ext! {
    name: Tenc,
    versions: [0, 1],
    flags: {}
}

/// Track encryption defaults (ISO/IEC 23001-7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenc {
    pub default_is_protected: bool,
    pub default_per_sample_iv_size: u8,
    pub default_kid: [u8; 16],
    pub default_constant_iv: Option<Vec<u8>>,
}

impl Default for Tenc {
    fn default() -> Self {
        Tenc {
            default_is_protected: true,
            default_per_sample_iv_size: 8,
            default_kid: [0u8; 16],
            default_constant_iv: None,
        }
    }
}

impl AtomExt for Tenc {
    type Ext = TencExt;

    const KIND_EXT: FourCC = FourCC::new(b"tenc");

    fn decode_body_ext<B: Buf>(buf: &mut B, _ext: TencExt) -> Result<Self> {
        u8::decode(buf)?; // reserved
        u8::decode(buf)?; // reserved, or pattern info in v1
        let default_is_protected = u8::decode(buf)? != 0;
        let default_per_sample_iv_size = u8::decode(buf)?;
        let default_kid = <[u8; 16]>::decode(buf)?;

        let default_constant_iv = match default_is_protected && default_per_sample_iv_size == 0 {
            true => {
                let size = u8::decode(buf)? as usize;
                Some(Vec::decode_exact(buf, size)?)
            }
            false => None,
        };

        Ok(Tenc {
            default_is_protected,
            default_per_sample_iv_size,
            default_kid,
            default_constant_iv,
        })
    }

    fn encode_body_ext<B: BufMut>(&self, buf: &mut B) -> Result<TencExt> {
        0u8.encode(buf)?; // reserved
        0u8.encode(buf)?; // reserved
        (self.default_is_protected as u8).encode(buf)?;
        self.default_per_sample_iv_size.encode(buf)?;
        self.default_kid.encode(buf)?;

        if let Some(iv) = &self.default_constant_iv {
            (iv.len() as u8).encode(buf)?;
            iv.encode(buf)?;
        }

        Ok(TencVersion::V0.into())
    }
}
