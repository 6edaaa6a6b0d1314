mod decrypt;
mod ttml;

pub use decrypt::*;
pub use ttml::*;

use fmp4::{FragmentedFile, Sidx, SidxRef, Tfdt};

use crate::error::ServeError;
use crate::init::TRACK_ID;

/// The earliest presentation time stamped onto synthesized subtitle sidx
/// boxes. Observed in working feeds; FFmpeg refuses subtitle streams
/// without it.
// TODO derive this from the fragment's tfdt instead of hard-coding.
const SUBTITLE_EARLIEST_PRESENTATION_TIME: u64 = 17_443_164_950_004_000;

/// Rewrite one fetched video fragment for DASH playback.
///
/// Track ids are forced to 1 to match the synthesized init, broken data
/// offsets are discarded (the encoder recomputes them), seek hints are
/// dropped, and a tfdt carrying the segment time is added when the
/// origin left it out.
pub fn repackage_video(
	input: &[u8],
	decrypt: Option<&DecryptInfo>,
	time: u64,
) -> Result<Vec<u8>, ServeError> {
	let mut file = FragmentedFile::decode(input)?;

	for fragment in &mut file.fragments {
		rewrite_fragment(fragment, time, true);

		if let Some(info) = decrypt {
			decrypt_fragment(fragment, info)?;
		}
	}

	Ok(file.encode_to_vec()?)
}

/// Rewrite one fetched audio fragment. Same as video, except the seek
/// hint box is left untouched.
pub fn repackage_audio(
	input: &[u8],
	decrypt: Option<&DecryptInfo>,
	time: u64,
) -> Result<Vec<u8>, ServeError> {
	let mut file = FragmentedFile::decode(input)?;

	for fragment in &mut file.fragments {
		rewrite_fragment(fragment, time, false);

		if let Some(info) = decrypt {
			decrypt_fragment(fragment, info)?;
		}
	}

	Ok(file.encode_to_vec()?)
}

/// Rewrite one fetched subtitle fragment.
///
/// On top of the common fixups, the TTML payload is rebased from
/// segment-relative to absolute timestamps, a single-reference sidx is
/// prepended when missing, and the sample metadata is rebuilt around the
/// rewritten payload.
pub fn repackage_subtitle(
	input: &[u8],
	time: u64,
	time_scale: u32,
	first_chunk_duration: u32,
) -> Result<Vec<u8>, ServeError> {
	let mut file = FragmentedFile::decode(input)?;

	if file.sidx.is_empty() && time_scale > 0 && first_chunk_duration > 0 {
		file.sidx.push(Sidx {
			reference_id: TRACK_ID,
			timescale: time_scale,
			earliest_presentation_time: SUBTITLE_EARLIEST_PRESENTATION_TIME,
			first_offset: 0,
			references: vec![SidxRef {
				reference_type: false,
				// Left at 0; players tolerate it and the real size is
				// only known after encoding.
				referenced_size: 0,
				subsegment_duration: first_chunk_duration,
				starts_with_sap: true,
				sap_type: 1,
				sap_delta_time: 0,
			}],
		});
	}

	let offset_seconds = time as f64 / time_scale as f64;

	for fragment in &mut file.fragments {
		rewrite_fragment(fragment, time, false);

		let rebased = rebase_timestamps(&fragment.mdat.data, offset_seconds)?;
		fragment.mdat.data = rebased;

		// Players respect tfhd defaults better than per-sample trun
		// values once the payload size has changed. Keep a single empty
		// sample entry so the count stays right.
		for traf in &mut fragment.moof.traf {
			traf.tfhd.default_sample_size = Some(fragment.mdat.data.len() as u32);
			traf.tfhd.default_sample_duration = Some(first_chunk_duration);

			for trun in &mut traf.trun {
				trun.entries = vec![fmp4::TrunEntry::default()];
			}
		}
	}

	Ok(file.encode_to_vec()?)
}

/// The fixups shared by every stream type.
fn rewrite_fragment(fragment: &mut fmp4::Fragment, time: u64, drop_sdtp: bool) {
	for traf in &mut fragment.moof.traf {
		// The synthesized init declares track 1; decryption also looks
		// the track up by id.
		traf.tfhd.track_id = TRACK_ID;

		// Some origins emit offsets that point outside the fragment and
		// crash strict parsers. Zero them; the encoder recomputes on
		// output.
		for trun in &mut traf.trun {
			trun.data_offset = Some(0);
		}

		if drop_sdtp {
			traf.sdtp = None;
		}

		// VLC delays audio when tfdt is missing. The segment time isn't
		// always exactly the decode time, but it's what the manifest
		// advertised for this chunk.
		if traf.tfdt.is_none() {
			traf.tfdt = Some(Tfdt {
				base_media_decode_time: time,
			});
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use fmp4::{Encode, Fragment, Mdat, Mfhd, Moof, Sdtp, Tfhd, Traf, Trun, TrunEntry};

	fn input_fragment(track_id: u32, data: &[u8], with_tfdt: Option<u64>) -> Vec<u8> {
		let file = FragmentedFile {
			styp: None,
			sidx: vec![],
			fragments: vec![Fragment {
				moof: Moof {
					mfhd: Mfhd { sequence_number: 1 },
					traf: vec![Traf {
						tfhd: Tfhd {
							track_id,
							..Default::default()
						},
						tfdt: with_tfdt.map(|t| Tfdt {
							base_media_decode_time: t,
						}),
						trun: vec![Trun {
							data_offset: Some(0xDEAD_BEEF_u32 as i32),
							entries: vec![TrunEntry {
								size: Some(data.len() as u32),
								duration: Some(20_000_000),
								..Default::default()
							}],
						}],
						sdtp: Some(Sdtp {
							entries: vec![0x20],
						}),
						..Default::default()
					}],
				},
				mdat: Mdat { data: data.into() },
			}],
		};

		// Encode with the bogus offset intact, bypassing the fixups.
		let mut buf = Vec::new();
		for fragment in &file.fragments {
			fragment.moof.encode(&mut buf).unwrap();
			fragment.mdat.encode(&mut buf).unwrap();
		}
		buf
	}

	#[test]
	fn test_video_rewrite() {
		let input = input_fragment(7, b"frame data", None);
		let output = repackage_video(&input, None, 1234).unwrap();

		let file = FragmentedFile::decode(&output).unwrap();
		let traf = &file.fragments[0].moof.traf[0];

		assert_eq!(traf.tfhd.track_id, 1);
		assert_eq!(traf.tfdt.as_ref().unwrap().base_media_decode_time, 1234);
		assert!(traf.sdtp.is_none());

		// The offset now points at the real payload.
		let offset = traf.trun[0].data_offset.unwrap() as usize;
		assert_eq!(&output[offset..offset + 10], b"frame data");
	}

	#[test]
	fn test_tfdt_preserved() {
		let input = input_fragment(7, b"frame data", Some(5555));
		let output = repackage_video(&input, None, 1234).unwrap();

		let file = FragmentedFile::decode(&output).unwrap();
		let traf = &file.fragments[0].moof.traf[0];

		// An existing tfdt wins over the segment time.
		assert_eq!(traf.tfdt.as_ref().unwrap().base_media_decode_time, 5555);
	}

	#[test]
	fn test_repackage_idempotent() {
		let input = input_fragment(7, b"frame data", None);
		let once = repackage_video(&input, None, 1234).unwrap();
		let twice = repackage_video(&once, None, 1234).unwrap();

		assert_eq!(once, twice);
	}

	#[test]
	fn test_audio_keeps_sdtp() {
		let input = input_fragment(2, b"audio", None);
		let output = repackage_audio(&input, None, 99).unwrap();

		let file = FragmentedFile::decode(&output).unwrap();
		assert!(file.fragments[0].moof.traf[0].sdtp.is_some());
	}

	#[test]
	fn test_not_fragmented() {
		let mut buf = Vec::new();
		fmp4::Moov::default().encode(&mut buf).unwrap();
		Mdat { data: vec![0] }.encode(&mut buf).unwrap();

		assert!(repackage_video(&buf, None, 0).is_err());
	}

	#[test]
	fn test_subtitle_rewrite() {
		let ttml = br#"<tt xmlns="http://www.w3.org/ns/ttml"><body><div><p begin="00:00:01.000" end="00:00:03.500">hi</p></div></body></tt>"#;
		let input = input_fragment(3, ttml, None);

		let output = repackage_subtitle(&input, 100_000_000, 10_000_000, 20_000_000).unwrap();
		let file = FragmentedFile::decode(&output).unwrap();

		// Synthesized sidx up front.
		assert_eq!(file.sidx.len(), 1);
		let sidx = &file.sidx[0];
		assert_eq!(sidx.reference_id, 1);
		assert_eq!(sidx.timescale, 10_000_000);
		assert_eq!(
			sidx.earliest_presentation_time,
			SUBTITLE_EARLIEST_PRESENTATION_TIME
		);
		assert_eq!(sidx.references[0].subsegment_duration, 20_000_000);
		assert_eq!(sidx.references[0].sap_type, 1);

		// Rebased timestamps: +10s.
		let payload = String::from_utf8(file.fragments[0].mdat.data.clone()).unwrap();
		assert!(payload.contains(r#"begin="00:00:11.000""#), "{payload}");
		assert!(payload.contains(r#"end="00:00:13.500""#), "{payload}");

		// Sample metadata rebuilt around the new payload.
		let traf = &file.fragments[0].moof.traf[0];
		assert_eq!(
			traf.tfhd.default_sample_size,
			Some(file.fragments[0].mdat.data.len() as u32)
		);
		assert_eq!(traf.tfhd.default_sample_duration, Some(20_000_000));
		assert_eq!(traf.trun[0].entries.len(), 1);
		assert_eq!(traf.trun[0].entries[0], TrunEntry::default());
	}

	#[test]
	fn test_subtitle_existing_sidx_kept() {
		let ttml = br#"<tt><body><p begin="0" end="1">x</p></body></tt>"#;

		let mut input = Vec::new();
		Sidx {
			reference_id: 1,
			timescale: 90_000,
			..Default::default()
		}
		.encode(&mut input)
		.unwrap();
		input.extend_from_slice(&input_fragment(3, ttml, None));

		let output = repackage_subtitle(&input, 0, 10_000_000, 20_000_000).unwrap();
		let file = FragmentedFile::decode(&output).unwrap();

		assert_eq!(file.sidx.len(), 1);
		assert_eq!(file.sidx[0].timescale, 90_000);
	}
}
