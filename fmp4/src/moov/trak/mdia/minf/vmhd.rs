use crate::*;

ext! {
    name: Vmhd,
    versions: [0],
    flags: {
        no_lean_ahead = 0,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Vmhd {
    pub graphics_mode: u16,
    pub op_color: RgbColor,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RgbColor {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

impl AtomExt for Vmhd {
    type Ext = VmhdExt;

    const KIND_EXT: FourCC = FourCC::new(b"vmhd");

    fn decode_body_ext<B: Buf>(buf: &mut B, _ext: VmhdExt) -> Result<Self> {
        Ok(Vmhd {
            graphics_mode: u16::decode(buf)?,
            op_color: RgbColor {
                red: u16::decode(buf)?,
                green: u16::decode(buf)?,
                blue: u16::decode(buf)?,
            },
        })
    }

    fn encode_body_ext<B: BufMut>(&self, buf: &mut B) -> Result<VmhdExt> {
        self.graphics_mode.encode(buf)?;
        self.op_color.red.encode(buf)?;
        self.op_color.green.encode(buf)?;
        self.op_color.blue.encode(buf)?;

        Ok(VmhdExt {
            no_lean_ahead: true,
            ..Default::default()
        })
    }
}
