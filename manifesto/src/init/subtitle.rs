use super::{base_init, stpp_entry, BuiltInit, InitParams};
use crate::error::ServeError;

/// Build the initialization segment for a TTML subtitle track.
///
/// Subtitle tracks are never encrypted, so the key source only matters
/// for audio and video.
pub fn build_stpp_init(params: &InitParams) -> Result<BuiltInit, ServeError> {
	let segment = base_init(b"subt", None, params.time_scale, params.language, stpp_entry());

	Ok(BuiltInit {
		segment,
		decrypt: None,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::drm::KeySource;
	use crate::init::TTML_NAMESPACES;
	use fmp4::SampleEntry;

	#[test]
	fn test_stpp_init() {
		let built = build_stpp_init(&InitParams {
			time_scale: 10_000_000,
			language: "eng",
			codec_private_data: "",
			keys: &KeySource::Unprotected,
		})
		.unwrap();

		assert!(built.decrypt.is_none());

		let segment = &built.segment;
		// No codec brand for subtitles.
		assert_eq!(
			segment.ftyp.compatible_brands,
			vec![b"iso6".into(), b"piff".into()]
		);

		let trak = &segment.moov.trak[0];
		assert_eq!(trak.mdia.hdlr.handler, b"subt".into());
		assert!(trak.mdia.minf.sthd.is_some());

		match &trak.mdia.minf.stbl.stsd.entries[0] {
			SampleEntry::Stpp(stpp) => assert_eq!(stpp.namespace, TTML_NAMESPACES),
			other => panic!("expected stpp, got {:?}", other.kind()),
		}
	}
}
