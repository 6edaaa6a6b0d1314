use fmp4::{
	Audio, DecoderConfig, DecoderSpecific, Ec3, Enca, EsDescriptor, Esds, Mp4a, SampleEntry,
	SLConfig,
};

use super::{apply_protection, base_init, cenc_sinf, BuiltInit, InitParams};
use crate::codec::{AudioSpecificConfig, Ec3PrivateData};
use crate::error::ServeError;

/// Build the initialization segment for an AAC audio track.
pub fn build_aac_init(params: &InitParams) -> Result<BuiltInit, ServeError> {
	let asc = AudioSpecificConfig::parse(params.codec_private_data)?;

	let audio = Audio {
		data_reference_index: 1,
		channel_count: asc.channel_configuration.max(1) as u16,
		sample_size: 16,
		sample_rate: (asc.sampling_frequency.min(u16::MAX as u32) as u16).into(),
	};

	let esds = Esds {
		es_desc: EsDescriptor {
			es_id: 1,
			dec_config: DecoderConfig {
				object_type_indication: 0x40,
				stream_type: 0x05,
				up_stream: 0,
				buffer_size_db: Default::default(),
				max_bitrate: 0,
				avg_bitrate: 0,
				dec_specific: DecoderSpecific {
					profile: asc.object_type,
					freq_index: asc.sampling_frequency_index,
					chan_conf: asc.channel_configuration,
				},
			},
			sl_config: SLConfig::default(),
		},
	};

	let entry = match params.keys.passthrough_kid() {
		Some(kid) => SampleEntry::Enca(Enca {
			audio,
			esds: Some(esds),
			dec3: None,
			sinf: cenc_sinf(b"mp4a", *kid),
		}),
		None => SampleEntry::Mp4a(Mp4a {
			audio,
			esds: Some(esds),
		}),
	};

	let mut segment = base_init(
		b"soun",
		Some(b"mp4a"),
		params.time_scale,
		params.language,
		entry,
	);
	let decrypt = apply_protection(&mut segment, params.keys);

	Ok(BuiltInit { segment, decrypt })
}

/// Build the initialization segment for an Enhanced AC-3 audio track.
pub fn build_ec3_init(params: &InitParams) -> Result<BuiltInit, ServeError> {
	let private = Ec3PrivateData::parse(params.codec_private_data)?;
	let dec3 = private.dec3()?;

	let audio = Audio {
		data_reference_index: 1,
		..Default::default()
	};

	let entry = match params.keys.passthrough_kid() {
		Some(kid) => SampleEntry::Enca(Enca {
			audio,
			esds: None,
			dec3: Some(dec3),
			sinf: cenc_sinf(b"ec-3", *kid),
		}),
		None => SampleEntry::Ec3(Ec3 { audio, dec3 }),
	};

	let mut segment = base_init(
		b"soun",
		Some(b"mp4a"),
		params.time_scale,
		params.language,
		entry,
	);
	let decrypt = apply_protection(&mut segment, params.keys);

	Ok(BuiltInit { segment, decrypt })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::drm::KeySource;

	#[test]
	fn test_aac_init() {
		let built = build_aac_init(&InitParams {
			time_scale: 10_000_000,
			language: "deu",
			codec_private_data: "1190",
			keys: &KeySource::Unprotected,
		})
		.unwrap();

		let trak = &built.segment.moov.trak[0];
		assert_eq!(trak.mdia.mdhd.language, "deu");
		assert_eq!(trak.mdia.hdlr.handler, b"soun".into());

		match &trak.mdia.minf.stbl.stsd.entries[0] {
			SampleEntry::Mp4a(mp4a) => {
				let asc = mp4a.esds.as_ref().unwrap().es_desc.dec_config.dec_specific;
				assert_eq!(asc.profile, 2);
				assert_eq!(asc.freq_index, 3);
				assert_eq!(asc.chan_conf, 2);
			}
			other => panic!("expected mp4a, got {:?}", other.kind()),
		}
	}

	#[test]
	fn test_ec3_init() {
		let built = build_ec3_init(&InitParams {
			time_scale: 10_000_000,
			language: "und",
			codec_private_data: "00063F000000AF87FBA7022DFB42A4D405CD93843BDD0700200F00",
			keys: &KeySource::Unprotected,
		})
		.unwrap();

		match &built.segment.moov.trak[0].mdia.minf.stbl.stsd.entries[0] {
			SampleEntry::Ec3(ec3) => {
				assert_eq!(ec3.dec3.data_rate, 224);
				assert_eq!(ec3.dec3.substreams.len(), 1);
			}
			other => panic!("expected ec-3, got {:?}", other.kind()),
		}
	}

	#[test]
	fn test_protected_aac_records_format() {
		let keys = KeySource::Passthrough {
			kid: [1u8; 16],
			pssh: vec![0],
		};

		let built = build_aac_init(&InitParams {
			time_scale: 10_000_000,
			language: "und",
			codec_private_data: "1190",
			keys: &keys,
		})
		.unwrap();

		match &built.segment.moov.trak[0].mdia.minf.stbl.stsd.entries[0] {
			SampleEntry::Enca(enca) => {
				assert_eq!(enca.sinf.frma.data_format, b"mp4a".into());
			}
			other => panic!("expected enca, got {:?}", other.kind()),
		}
	}
}
