mod audio;
mod subtitle;
mod video;

pub use audio::*;
pub use subtitle::*;
pub use video::*;

use fmp4::{
	Dinf, Ftyp, Hdlr, InitSegment, Mdhd, Mdia, Minf, Moov, Mvex, Mvhd, Pssh, SampleEntry, Schi,
	Schm, Sinf, Smhd, Stbl, Sthd, Stpp, Tenc, Tkhd, Trak, Trex, Vmhd,
};

use crate::drm::{KeySource, PLAYREADY_SYSTEM_ID_BYTES};
use crate::segment::DecryptInfo;

/// Media fragments are rewritten to track 1, so the init must declare it.
pub const TRACK_ID: u32 = 1;

/// CENC per-sample IVs are 8 bytes in Smooth Streaming (PIFF) content.
pub const DEFAULT_IV_SIZE: u8 = 8;

/// The shared inputs for building an initialization segment.
#[derive(Debug, Clone)]
pub struct InitParams<'a> {
	/// Presentation timescale in ticks per second.
	pub time_scale: u32,
	/// BCP-47 language, or "und".
	pub language: &'a str,
	/// Hex-encoded codec private data from the quality level.
	pub codec_private_data: &'a str,
	pub keys: &'a KeySource,
}

/// Outcome of an init build: the segment bytes plus whatever the segment
/// repackager needs to decrypt matching media fragments.
pub struct BuiltInit {
	pub segment: InitSegment,
	pub decrypt: Option<DecryptInfo>,
}

impl BuiltInit {
	pub fn encode_to_vec(&self) -> fmp4::Result<Vec<u8>> {
		self.segment.encode_to_vec()
	}
}

/// The scaffolding every init segment shares: dash brands, a single
/// empty track, and fragment defaults for track 1.
fn base_init(
	handler: &[u8; 4],
	codec_brand: Option<&[u8; 4]>,
	time_scale: u32,
	language: &str,
	entry: SampleEntry,
) -> InitSegment {
	let mut compatible_brands: Vec<fmp4::FourCC> = vec![b"iso6".into(), b"piff".into()];
	if let Some(brand) = codec_brand {
		compatible_brands.push(brand.into());
	}

	let ftyp = Ftyp {
		major_brand: b"dash".into(),
		minor_version: 0,
		compatible_brands,
	};

	let minf = Minf {
		vmhd: (handler == b"vide").then(Vmhd::default),
		smhd: (handler == b"soun").then(Smhd::default),
		sthd: (handler == b"subt").then(Sthd::default),
		dinf: Dinf::default(),
		stbl: Stbl {
			stsd: fmp4::Stsd {
				entries: vec![entry],
			},
			..Default::default()
		},
	};

	let trak = Trak {
		tkhd: Tkhd {
			track_id: TRACK_ID,
			enabled: true,
			..Default::default()
		},
		mdia: Mdia {
			mdhd: Mdhd {
				timescale: time_scale,
				language: language.to_string(),
				..Default::default()
			},
			hdlr: Hdlr {
				handler: handler.into(),
				name: handler_name(handler).to_string(),
			},
			minf,
		},
	};

	let moov = Moov {
		mvhd: Mvhd {
			timescale: time_scale,
			next_track_id: TRACK_ID + 1,
			..Default::default()
		},
		mvex: Some(Mvex {
			mehd: None,
			trex: vec![Trex {
				track_id: TRACK_ID,
				default_sample_description_index: 1,
				..Default::default()
			}],
		}),
		trak: vec![trak],
		pssh: vec![],
	};

	InitSegment { ftyp, moov }
}

fn handler_name(handler: &[u8; 4]) -> &'static str {
	match handler {
		b"vide" => "VideoHandler",
		b"soun" => "SoundHandler",
		b"subt" => "SubtitleHandler",
		_ => "",
	}
}

/// The protection scheme information for a CENC protected sample entry.
fn cenc_sinf(original_format: &[u8; 4], kid: [u8; 16]) -> Sinf {
	Sinf {
		frma: fmp4::Frma {
			data_format: original_format.into(),
		},
		schm: Some(Schm {
			scheme_type: b"cenc".into(),
			scheme_version: 0x0001_0000,
		}),
		schi: Some(Schi {
			tenc: Tenc {
				default_is_protected: true,
				default_per_sample_iv_size: DEFAULT_IV_SIZE,
				default_kid: kid,
				default_constant_iv: None,
			},
		}),
	}
}

/// Attach the PlayReady pssh box for pass-through content, and derive
/// the decrypt info when the key is known.
///
/// When we decrypt, the served init is clear: no pssh, no sinf. Players
/// would otherwise wait for sample encryption data that the repackager
/// already stripped.
fn apply_protection(init: &mut InitSegment, keys: &KeySource) -> Option<DecryptInfo> {
	if let KeySource::Passthrough { pssh, .. } = keys {
		init.moov.pssh.push(Pssh {
			system_id: PLAYREADY_SYSTEM_ID_BYTES,
			kids: vec![],
			data: pssh.clone(),
		});
	}

	match keys {
		KeySource::Decrypt { kid, key, .. } => Some(DecryptInfo {
			kid: *kid,
			key: *key,
			iv_size: DEFAULT_IV_SIZE,
		}),
		_ => None,
	}
}

/// The namespaces declared by Smooth Streaming TTML tracks.
pub(crate) const TTML_NAMESPACES: &str = "http://www.w3.org/ns/ttml http://www.smpte-ra.org/schemas/2052-1/2010/smpte-tt http://www.w3.org/ns/ttml#metadata  http://www.w3.org/ns/ttml#parameter http://www.w3.org/ns/ttml#styling http://www.w3.org/2001/XMLSchema-instance http://www.smpte-ra.org/schemas/2052-1/2010/smpte-tt http://www.smpte-ra.org/schemas/2052-1/2010/smpte-tt.xsd";

pub(crate) fn stpp_entry() -> SampleEntry {
	SampleEntry::Stpp(Stpp {
		data_reference_index: 1,
		namespace: TTML_NAMESPACES.to_string(),
		schema_location: String::new(),
		auxiliary_mime_types: String::new(),
	})
}
