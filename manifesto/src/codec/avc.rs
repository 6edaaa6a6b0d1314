use super::CodecError;

/// SPS and PPS NAL units extracted from MSS codec private data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvcPrivateData {
	pub sps: Vec<u8>,
	pub pps: Vec<u8>,
}

impl AvcPrivateData {
	/// The private data is Annex-B: start codes followed by the parameter
	/// set NALUs. Splitting on `00 00 00 01` yields an empty piece, the
	/// SPS and the PPS.
	pub fn parse(codec_private_data: &str) -> Result<Self, CodecError> {
		let data = hex::decode(codec_private_data)?;

		let mut pieces = split_nalus(&data);
		if pieces.len() < 3 {
			return Err(CodecError::Malformed("expected SPS and PPS NALUs"));
		}

		let pps = pieces.remove(2);
		let sps = pieces.remove(1);

		Ok(Self { sps, pps })
	}

	/// The RFC 6381 codec string, e.g. "avc1.4d4020".
	pub fn codec_string(&self) -> Result<String, CodecError> {
		if self.sps.len() < 4 {
			return Err(CodecError::Malformed("SPS too short"));
		}

		Ok(format!(
			"avc1.{:02x}{:02x}{:02x}",
			self.sps[1], self.sps[2], self.sps[3]
		))
	}

	/// Coded picture dimensions, parsed out of the SPS.
	pub fn dimensions(&self) -> Result<(u16, u16), CodecError> {
		sps_dimensions(&self.sps)
	}
}

/// Split an Annex-B buffer on 4-byte start codes. The leading start code
/// produces an empty first piece, matching the upstream private data
/// layout.
fn split_nalus(data: &[u8]) -> Vec<Vec<u8>> {
	const START_CODE: [u8; 4] = [0, 0, 0, 1];

	let mut pieces = Vec::new();
	let mut start = 0;
	let mut pos = 0;

	// Only split into 3 pieces; a PPS may legitimately contain the
	// start code pattern.
	while pos + 4 <= data.len() && pieces.len() < 2 {
		if data[pos..pos + 4] == START_CODE {
			pieces.push(data[start..pos].to_vec());
			pos += 4;
			start = pos;
		} else {
			pos += 1;
		}
	}

	pieces.push(data[start..].to_vec());
	pieces
}

/// Parse the handful of SPS fields needed to compute the frame size.
fn sps_dimensions(sps: &[u8]) -> Result<(u16, u16), CodecError> {
	if sps.len() < 4 {
		return Err(CodecError::Malformed("SPS too short"));
	}

	// Strip emulation prevention bytes (00 00 03 -> 00 00) before bit
	// level parsing.
	let rbsp = strip_emulation_prevention(&sps[1..]);
	let mut bits = SpsBits::new(&rbsp);

	let profile_idc = bits.u(8)?;
	bits.u(8)?; // constraint flags + reserved
	bits.u(8)?; // level_idc
	bits.ue()?; // seq_parameter_set_id

	let mut chroma_format_idc = 1;
	if matches!(
		profile_idc,
		100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128 | 138 | 139 | 134 | 135
	) {
		chroma_format_idc = bits.ue()?;
		if chroma_format_idc == 3 {
			bits.u(1)?; // separate_colour_plane_flag
		}
		bits.ue()?; // bit_depth_luma_minus8
		bits.ue()?; // bit_depth_chroma_minus8
		bits.u(1)?; // qpprime_y_zero_transform_bypass_flag
		let seq_scaling_matrix_present = bits.u(1)? == 1;
		if seq_scaling_matrix_present {
			let count = if chroma_format_idc == 3 { 12 } else { 8 };
			for i in 0..count {
				if bits.u(1)? == 1 {
					skip_scaling_list(&mut bits, if i < 6 { 16 } else { 64 })?;
				}
			}
		}
	}

	bits.ue()?; // log2_max_frame_num_minus4
	let pic_order_cnt_type = bits.ue()?;
	if pic_order_cnt_type == 0 {
		bits.ue()?; // log2_max_pic_order_cnt_lsb_minus4
	} else if pic_order_cnt_type == 1 {
		bits.u(1)?; // delta_pic_order_always_zero_flag
		bits.se()?; // offset_for_non_ref_pic
		bits.se()?; // offset_for_top_to_bottom_field
		let cycle = bits.ue()?;
		for _ in 0..cycle {
			bits.se()?;
		}
	}

	bits.ue()?; // max_num_ref_frames
	bits.u(1)?; // gaps_in_frame_num_value_allowed_flag

	let pic_width_in_mbs = bits.ue()? + 1;
	let pic_height_in_map_units = bits.ue()? + 1;
	let frame_mbs_only = bits.u(1)? == 1;
	if !frame_mbs_only {
		bits.u(1)?; // mb_adaptive_frame_field_flag
	}
	bits.u(1)?; // direct_8x8_inference_flag

	let mut width = pic_width_in_mbs * 16;
	let mut height = pic_height_in_map_units * 16 * if frame_mbs_only { 1 } else { 2 };

	let frame_cropping = bits.u(1)? == 1;
	if frame_cropping {
		let left = bits.ue()?;
		let right = bits.ue()?;
		let top = bits.ue()?;
		let bottom = bits.ue()?;

		let (crop_x, crop_y) = match chroma_format_idc {
			0 => (1, 2 - frame_mbs_only as u64),
			1 => (2, 2 * (2 - frame_mbs_only as u64)),
			2 => (2, 2 - frame_mbs_only as u64),
			_ => (1, 2 - frame_mbs_only as u64),
		};

		width = width.saturating_sub((left + right) * crop_x);
		height = height.saturating_sub((top + bottom) * crop_y);
	}

	Ok((width as u16, height as u16))
}

fn strip_emulation_prevention(data: &[u8]) -> Vec<u8> {
	let mut out = Vec::with_capacity(data.len());
	let mut zeros = 0;

	for &byte in data {
		if zeros >= 2 && byte == 0x03 {
			zeros = 0;
			continue;
		}

		zeros = match byte {
			0 => zeros + 1,
			_ => 0,
		};
		out.push(byte);
	}

	out
}

fn skip_scaling_list(bits: &mut SpsBits, size: usize) -> Result<(), CodecError> {
	let mut last_scale = 8i64;
	let mut next_scale = 8i64;

	for _ in 0..size {
		if next_scale != 0 {
			let delta = bits.se()?;
			next_scale = (last_scale + delta + 256) % 256;
		}
		if next_scale != 0 {
			last_scale = next_scale;
		}
	}

	Ok(())
}

/// A minimal big-endian bit reader with Exp-Golomb support.
struct SpsBits<'a> {
	data: &'a [u8],
	pos: usize,
}

impl<'a> SpsBits<'a> {
	fn new(data: &'a [u8]) -> Self {
		Self { data, pos: 0 }
	}

	fn u(&mut self, count: usize) -> Result<u64, CodecError> {
		let mut value = 0u64;
		for _ in 0..count {
			let byte = self.pos / 8;
			if byte >= self.data.len() {
				return Err(CodecError::Malformed("SPS bitstream exhausted"));
			}

			let bit = 7 - (self.pos % 8);
			value = (value << 1) | ((self.data[byte] >> bit) & 1) as u64;
			self.pos += 1;
		}

		Ok(value)
	}

	fn ue(&mut self) -> Result<u64, CodecError> {
		let mut zeros = 0;
		while self.u(1)? == 0 {
			zeros += 1;
			if zeros > 32 {
				return Err(CodecError::Malformed("exp-golomb overflow"));
			}
		}

		Ok((1 << zeros) - 1 + self.u(zeros)?)
	}

	fn se(&mut self) -> Result<i64, CodecError> {
		let value = self.ue()? as i64;
		Ok(match value % 2 {
			0 => -(value / 2),
			_ => (value + 1) / 2,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const PRIVATE_DATA: &str = "00000001674D40209E5281806F60284040405000000300100000064E00000D1F400068FA3F13E0A00000000168EF7520";

	#[test]
	fn test_split() {
		let parsed = AvcPrivateData::parse(PRIVATE_DATA).unwrap();

		assert_eq!(
			hex::encode(&parsed.sps),
			"674d40209e5281806f60284040405000000300100000064e00000d1f400068fa3f13e0a0"
		);
		assert_eq!(hex::encode(&parsed.pps), "68ef7520");
	}

	#[test]
	fn test_codec_string() {
		let parsed = AvcPrivateData::parse(PRIVATE_DATA).unwrap();
		assert_eq!(parsed.codec_string().unwrap(), "avc1.4d4020");
	}

	#[test]
	fn test_dimensions() {
		let parsed = AvcPrivateData::parse(PRIVATE_DATA).unwrap();
		let (width, height) = parsed.dimensions().unwrap();

		assert_eq!(width, 768);
		assert_eq!(height, 432);
	}

	#[test]
	fn test_malformed() {
		assert!(AvcPrivateData::parse("zz").is_err());
		assert!(AvcPrivateData::parse("00000001674d").is_err());
	}
}
