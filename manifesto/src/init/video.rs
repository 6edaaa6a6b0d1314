use fmp4::{Avc1, Avcc, Encv, SampleEntry, Visual};

use super::{apply_protection, base_init, cenc_sinf, BuiltInit, InitParams};
use crate::codec::AvcPrivateData;
use crate::drm::KeySource;
use crate::error::ServeError;

/// Build the initialization segment for an AVC video track.
pub fn build_avc_init(params: &InitParams) -> Result<BuiltInit, ServeError> {
	let private = AvcPrivateData::parse(params.codec_private_data)?;
	let (width, height) = private.dimensions()?;

	let visual = Visual {
		data_reference_index: 1,
		width,
		height,
		..Default::default()
	};
	let avcc = Avcc::new(&private.sps, &private.pps)?;

	let entry = match params.keys.passthrough_kid() {
		Some(kid) => SampleEntry::Encv(Encv {
			visual,
			avcc,
			sinf: cenc_sinf(b"avc1", *kid),
		}),
		None => SampleEntry::Avc1(Avc1 { visual, avcc }),
	};

	let mut segment = base_init(
		b"vide",
		Some(b"avc1"),
		params.time_scale,
		params.language,
		entry,
	);
	let decrypt = apply_protection(&mut segment, params.keys);

	Ok(BuiltInit { segment, decrypt })
}

/// The codec string for the DASH manifest, without building the segment.
pub fn avc_codec_string(codec_private_data: &str) -> Result<String, ServeError> {
	let private = AvcPrivateData::parse(codec_private_data)?;
	Ok(private.codec_string()?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::init::{DEFAULT_IV_SIZE, TRACK_ID};
	use fmp4::Decode;

	const PRIVATE_DATA: &str = "00000001674D40209E5281806F60284040405000000300100000064E00000D1F400068FA3F13E0A00000000168EF7520";

	fn params(keys: &KeySource) -> InitParams {
		InitParams {
			time_scale: 10_000_000,
			language: "und",
			codec_private_data: PRIVATE_DATA,
			keys,
		}
	}

	#[test]
	fn test_clear_init() {
		let built = build_avc_init(&params(&KeySource::Unprotected)).unwrap();
		assert!(built.decrypt.is_none());

		let segment = &built.segment;
		assert_eq!(segment.ftyp.major_brand, b"dash".into());
		assert_eq!(
			segment.ftyp.compatible_brands,
			vec![b"iso6".into(), b"piff".into(), b"avc1".into()]
		);

		let trak = &segment.moov.trak[0];
		assert_eq!(trak.tkhd.track_id, TRACK_ID);
		assert_eq!(trak.mdia.mdhd.timescale, 10_000_000);

		match &trak.mdia.minf.stbl.stsd.entries[0] {
			SampleEntry::Avc1(avc1) => {
				assert_eq!(
					hex::encode(&avc1.avcc.sequence_parameter_sets[0]),
					"674d40209e5281806f60284040405000000300100000064e00000d1f400068fa3f13e0a0"
				);
				assert_eq!(hex::encode(&avc1.avcc.picture_parameter_sets[0]), "68ef7520");
			}
			other => panic!("expected avc1, got {:?}", other.kind()),
		}

		// And it round-trips through the encoder.
		let bytes = built.encode_to_vec().unwrap();
		let mut slice = bytes.as_slice();
		let ftyp = fmp4::Ftyp::decode(&mut slice).unwrap();
		assert_eq!(ftyp.major_brand, b"dash".into());
		let moov = fmp4::Moov::decode(&mut slice).unwrap();
		assert_eq!(moov.trak[0].tkhd.track_id, TRACK_ID);
	}

	#[test]
	fn test_decrypt_init_is_clear() {
		let keys = KeySource::Decrypt {
			kid: [7u8; 16],
			key: [9u8; 16],
			pssh: vec![1, 2, 3],
		};

		let built = build_avc_init(&params(&keys)).unwrap();

		let decrypt = built.decrypt.expect("expected decrypt info");
		assert_eq!(decrypt.kid, [7u8; 16]);
		assert_eq!(decrypt.key, [9u8; 16]);
		assert_eq!(decrypt.iv_size, DEFAULT_IV_SIZE);

		// Segments come out decrypted, so the init must not announce
		// protection.
		let segment = &built.segment;
		assert!(segment.moov.pssh.is_empty());
		assert!(matches!(
			segment.moov.trak[0].mdia.minf.stbl.stsd.entries[0],
			SampleEntry::Avc1(_)
		));
	}

	#[test]
	fn test_passthrough_init() {
		let keys = KeySource::Passthrough {
			kid: [7u8; 16],
			pssh: vec![1, 2, 3],
		};

		let built = build_avc_init(&params(&keys)).unwrap();

		// Encryption descriptors but nothing to decrypt with.
		assert!(built.decrypt.is_none());

		let segment = &built.segment;
		assert_eq!(segment.moov.pssh.len(), 1);
		assert_eq!(segment.moov.pssh[0].data, vec![1, 2, 3]);

		match &segment.moov.trak[0].mdia.minf.stbl.stsd.entries[0] {
			SampleEntry::Encv(encv) => {
				let tenc = &encv.sinf.schi.as_ref().unwrap().tenc;
				assert_eq!(tenc.default_kid, [7u8; 16]);
				assert_eq!(tenc.default_per_sample_iv_size, DEFAULT_IV_SIZE);
			}
			other => panic!("expected encv, got {:?}", other.kind()),
		}
	}
}
