pub mod model;

use chrono::{DateTime, Utc};

use model::*;

use crate::codec::AvcPrivateData;
use crate::config::Channel;
use crate::drm::{self, PLAYREADY_SYSTEM_ID};
use crate::error::ServeError;
use crate::mss::{SmoothStream, StreamIndex};

/// MSS tick durations are expressed against a 10 MHz clock at the
/// presentation level.
const MSS_TICKS_PER_SECOND: u64 = 10_000_000;

/// Convert a parsed Smooth Streaming manifest into a DASH MPD.
///
/// All init and media URLs are relative templates that route back through
/// this service: `$RepresentationID$/init.mp4` and
/// `$RepresentationID$/$Time$/<rewritten upstream template>`.
pub fn smooth_to_dash(
	manifest: &SmoothStream,
	has_keys: bool,
	allow_subs: bool,
	channel: &Channel,
	now: DateTime<Utc>,
) -> Result<Mpd, ServeError> {
	let playready = manifest.protection(PLAYREADY_SYSTEM_ID);

	let pssh = match playready {
		Some(header) => Some(drm::pssh_base64(&header.custom_data)?),
		None => None,
	};

	let mut adaptation_sets = Vec::new();
	for (position, stream) in manifest.stream_indexes.iter().enumerate() {
		if stream.kind == "text" && !allow_subs {
			continue;
		}

		let mut timeline = Vec::new();
		for (index, chunk) in stream.chunk_infos.iter().enumerate() {
			timeline.push(TimelineSegment {
				t: (index == 0).then(|| chunk.start_time.unwrap_or(0)),
				d: chunk.duration,
			});
		}

		let segment_template = SegmentTemplate {
			timescale: manifest.time_scale,
			initialization: "$RepresentationID$/init.mp4".to_string(),
			media: format!("$RepresentationID$/$Time$/{}", rewrite_template(&stream.url)),
			timeline,
		};

		let name = stream_name(stream);

		let mut audio_channels = 2u32;
		let mut representations = Vec::new();
		for quality in &stream.quality_levels {
			let mut representation = Representation {
				id: format!("{}_{}", name, quality.index),
				bandwidth: quality.bitrate,
				..Default::default()
			};

			match stream.kind.as_str() {
				"video" => {
					representation.width = quality.max_width;
					representation.height = quality.max_height;

					if quality.codec_private_data.is_empty() {
						return Err(ServeError::Input(format!(
							"no codec private data for quality level {}",
							quality.index
						)));
					}

					let private = AvcPrivateData::parse(&quality.codec_private_data)?;
					representation.codecs = private.codec_string()?;
					representation.scan_type = Some("progressive".to_string());
				}
				"audio" => {
					if quality.channels > 0 {
						audio_channels = quality.channels;
					}

					representation.audio_sampling_rate = Some(quality.sampling_rate.to_string());
					representation.codecs = match quality.four_cc.as_str() {
						"EC-3" => "ec-3".to_string(),
						_ => "mp4a.40.2".to_string(),
					};
				}
				"text" => {
					representation.codecs = "stpp".to_string();
				}
				_ => {}
			}

			representations.push(representation);
		}

		let mut set = AdaptationSet {
			id: position.to_string(),
			mime_type: stream.mime_type().to_string(),
			content_type: stream.kind.clone(),
			lang: stream.language_or_und().to_string(),
			start_with_sap: 1,
			segment_alignment: true,
			segment_template: Some(segment_template),
			representations,
			..Default::default()
		};

		match stream.kind.as_str() {
			"audio" => {
				set.audio_channel_configuration = Some(AudioChannelConfiguration {
					scheme_id_uri: "urn:mpeg:dash:23003:3:audio_channel_configuration:2011"
						.to_string(),
					value: audio_channels.to_string(),
				});
			}
			_ => {}
		}

		// Without keys we can't decrypt, so the manifest has to hand the
		// player everything it needs to license the stream itself.
		if !has_keys && matches!(stream.kind.as_str(), "video" | "audio") {
			if let (Some(header), Some(pssh)) = (playready, &pssh) {
				set.content_protections = vec![ContentProtection {
					scheme_id_uri: format!("urn:uuid:{}", header.system_id.to_lowercase()),
					value: "MSPR 2.0".to_string(),
					pro: Some(header.custom_data.clone()),
					pssh: Some(pssh.clone()),
				}];
			}
		}

		adaptation_sets.push(set);
	}

	let stamp = now.format("%Y-%m-%dT%H:%M:%SZ").to_string();

	let mut mpd = Mpd {
		kind: match manifest.is_live {
			true => "dynamic".to_string(),
			false => "static".to_string(),
		},
		protection_namespaces: !has_keys && playready.is_some(),
		min_buffer_time: "PT2S".to_string(),
		availability_start_time: "1970-01-01T00:00:00Z".to_string(),
		publish_time: stamp.clone(),
		periods: vec![Period {
			id: "0".to_string(),
			start: "PT0S".to_string(),
			adaptation_sets,
		}],
		utc_timing: Some(UtcTiming {
			scheme_id_uri: "urn:mpeg:dash:utc:direct:2014".to_string(),
			value: stamp,
		}),
		program_information: Some(ProgramInformation {
			title: channel.name.clone(),
			copyright: "Served by manifesto".to_string(),
		}),
		..Default::default()
	};

	if manifest.is_live {
		mpd.minimum_update_period = Some("PT2S".to_string());

		if manifest.dvr_window_length > 0 {
			mpd.time_shift_buffer_depth = Some(format_seconds(
				manifest.dvr_window_length / MSS_TICKS_PER_SECOND,
			));
		}
	} else if manifest.duration > 0 {
		mpd.media_presentation_duration =
			Some(format_seconds(manifest.duration / MSS_TICKS_PER_SECOND));
	}

	Ok(mpd)
}

/// The name the representation ids are derived from: the stream's Name
/// attribute when present, else its type.
pub fn stream_name(stream: &StreamIndex) -> &str {
	match stream.name.is_empty() {
		true => &stream.kind,
		false => &stream.name,
	}
}

/// Map the MSS URL template placeholders onto their DASH equivalents.
fn rewrite_template(url: &str) -> String {
	url.replace("{bitrate}", "$Bandwidth$")
		.replace("{start time}", "$Time$")
}

fn format_seconds(seconds: u64) -> String {
	format!("PT{seconds}S")
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mss::{ChunkInfo, ProtectionHeader, QualityLevel};
	use base64::engine::general_purpose::STANDARD as BASE64;
	use base64::Engine;
	use chrono::TimeZone;

	const AVC_PRIVATE: &str = "00000001674D40209E5281806F60284040405000000300100000064E00000D1F400068FA3F13E0A00000000168EF7520";

	fn now() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
	}

	fn channel() -> Channel {
		Channel {
			id: "one".into(),
			name: "Channel One".into(),
			url: "https://example.com/stream.ism/Manifest".into(),
			..Default::default()
		}
	}

	fn vod_manifest() -> SmoothStream {
		SmoothStream {
			major_version: 2,
			time_scale: 10_000_000,
			duration: 100_000_000,
			is_live: false,
			stream_indexes: vec![
				StreamIndex {
					kind: "video".into(),
					url: "QualityLevels({bitrate})/Fragments(video={start time})".into(),
					quality_levels: vec![
						QualityLevel {
							index: 0,
							bitrate: 2_000_000,
							four_cc: "H264".into(),
							codec_private_data: AVC_PRIVATE.into(),
							max_width: 1280,
							max_height: 720,
							..Default::default()
						},
						QualityLevel {
							index: 1,
							bitrate: 1_000_000,
							four_cc: "H264".into(),
							codec_private_data: AVC_PRIVATE.into(),
							max_width: 640,
							max_height: 360,
							..Default::default()
						},
					],
					chunk_infos: vec![
						ChunkInfo {
							start_time: Some(0),
							duration: 20_000_000,
						},
						ChunkInfo {
							start_time: None,
							duration: 20_000_000,
						},
					],
					..Default::default()
				},
				StreamIndex {
					kind: "audio".into(),
					name: "audio_deu".into(),
					language: "deu".into(),
					url: "QualityLevels({bitrate})/Fragments(audio_deu={start time})".into(),
					quality_levels: vec![QualityLevel {
						index: 0,
						bitrate: 128_000,
						four_cc: "AACL".into(),
						codec_private_data: "1190".into(),
						sampling_rate: 48_000,
						channels: 2,
						..Default::default()
					}],
					chunk_infos: vec![ChunkInfo {
						start_time: Some(0),
						duration: 20_000_000,
					}],
					..Default::default()
				},
			],
			..Default::default()
		}
	}

	#[test]
	fn test_vod_manifest() {
		let mpd = smooth_to_dash(&vod_manifest(), false, true, &channel(), now()).unwrap();

		assert_eq!(mpd.kind, "static");
		assert_eq!(mpd.media_presentation_duration.as_deref(), Some("PT10S"));
		assert!(mpd.minimum_update_period.is_none());
		assert!(!mpd.protection_namespaces);

		let sets = &mpd.periods[0].adaptation_sets;
		assert_eq!(sets.len(), 2);

		let video = &sets[0];
		assert_eq!(video.content_type, "video");
		assert_eq!(video.representations.len(), 2);
		assert_eq!(video.representations[0].id, "video_0");
		assert_eq!(video.representations[0].bandwidth, 2_000_000);
		assert_eq!(video.representations[0].codecs, "avc1.4d4020");
		assert_eq!(video.representations[1].id, "video_1");

		let template = video.segment_template.as_ref().unwrap();
		assert_eq!(template.timescale, 10_000_000);
		assert_eq!(template.initialization, "$RepresentationID$/init.mp4");
		assert_eq!(
			template.media,
			"$RepresentationID$/$Time$/QualityLevels($Bandwidth$)/Fragments(video=$Time$)"
		);
		assert_eq!(template.timeline[0].t, Some(0));
		assert_eq!(template.timeline[1].t, None);

		let audio = &sets[1];
		assert_eq!(audio.lang, "deu");
		assert_eq!(audio.representations[0].id, "audio_deu_0");
		assert_eq!(
			audio.audio_channel_configuration.as_ref().unwrap().value,
			"2"
		);

		let info = mpd.program_information.as_ref().unwrap();
		assert_eq!(info.title, "Channel One");
	}

	#[test]
	fn test_vod_xml_output() {
		let mpd = smooth_to_dash(&vod_manifest(), false, true, &channel(), now()).unwrap();
		let xml = String::from_utf8(mpd.encode().unwrap()).unwrap();

		assert!(xml.contains(r#"type="static""#));
		assert!(xml.contains(r#"mediaPresentationDuration="PT10S""#));
		assert!(xml.contains(r#"profiles="urn:mpeg:dash:profile:isoff-live:2011""#));
		assert!(xml.contains(r#"availabilityStartTime="1970-01-01T00:00:00Z""#));
		assert!(xml.contains(r#"publishTime="2025-06-01T12:00:00Z""#));
		assert!(xml.contains(r#"minBufferTime="PT2S""#));
		assert!(xml.contains(r#"<AudioChannelConfiguration schemeIdUri="urn:mpeg:dash:23003:3:audio_channel_configuration:2011" value="2"/>"#));
		assert_eq!(xml.matches("<Representation ").count(), 3);

		// No protection in the clear case.
		assert!(!xml.contains("ContentProtection"));
		assert!(!xml.contains("xmlns:cenc"));

		// Self-closing empties only.
		assert!(!xml.contains("></"), "{xml}");
	}

	#[test]
	fn test_live_with_protection() {
		let mut manifest = vod_manifest();
		manifest.is_live = true;
		manifest.duration = 0;
		manifest.dvr_window_length = 300_000_000;
		manifest.protection = vec![ProtectionHeader {
			system_id: "9A04F079-9840-4286-AB92-E65BE0885F95".into(),
			custom_data: BASE64.encode(b"playready header"),
		}];

		let mpd = smooth_to_dash(&manifest, false, true, &channel(), now()).unwrap();

		assert_eq!(mpd.kind, "dynamic");
		assert_eq!(mpd.minimum_update_period.as_deref(), Some("PT2S"));
		assert_eq!(mpd.time_shift_buffer_depth.as_deref(), Some("PT30S"));
		assert!(mpd.protection_namespaces);

		for set in &mpd.periods[0].adaptation_sets {
			let protection = &set.content_protections[0];
			assert_eq!(
				protection.scheme_id_uri,
				"urn:uuid:9a04f079-9840-4286-ab92-e65be0885f95"
			);
			assert_eq!(protection.value, "MSPR 2.0");
			// The pro element carries the upstream header verbatim.
			assert_eq!(protection.pro.as_deref(), Some(BASE64.encode(b"playready header").as_str()));

			// And the pssh is a valid box wrapping the same payload.
			let pssh = BASE64.decode(protection.pssh.as_deref().unwrap()).unwrap();
			assert_eq!(&pssh[4..8], b"pssh");
			assert_eq!(&pssh[32..], b"playready header");
		}
	}

	#[test]
	fn test_keys_suppress_protection() {
		let mut manifest = vod_manifest();
		manifest.protection = vec![ProtectionHeader {
			system_id: "9A04F079-9840-4286-AB92-E65BE0885F95".into(),
			custom_data: BASE64.encode(b"header"),
		}];

		let mpd = smooth_to_dash(&manifest, true, true, &channel(), now()).unwrap();

		assert!(!mpd.protection_namespaces);
		for set in &mpd.periods[0].adaptation_sets {
			assert!(set.content_protections.is_empty());
		}
	}

	#[test]
	fn test_subtitle_toggle() {
		let mut manifest = vod_manifest();
		manifest.stream_indexes.push(StreamIndex {
			kind: "text".into(),
			language: "eng".into(),
			url: "QualityLevels({bitrate})/Fragments(textstream_eng={start time})".into(),
			quality_levels: vec![QualityLevel {
				index: 0,
				bitrate: 20_000,
				four_cc: "TTML".into(),
				..Default::default()
			}],
			chunk_infos: vec![ChunkInfo {
				start_time: Some(0),
				duration: 20_000_000,
			}],
			..Default::default()
		});

		let with_subs = smooth_to_dash(&manifest, false, true, &channel(), now()).unwrap();
		assert!(with_subs.periods[0]
			.adaptation_sets
			.iter()
			.any(|s| s.content_type == "text"));

		let text = with_subs.periods[0]
			.adaptation_sets
			.iter()
			.find(|s| s.content_type == "text")
			.unwrap();
		assert_eq!(text.representations[0].codecs, "stpp");
		assert_eq!(text.representations[0].id, "text_0");

		let without = smooth_to_dash(&manifest, false, false, &channel(), now()).unwrap();
		assert!(!without.periods[0]
			.adaptation_sets
			.iter()
			.any(|s| s.content_type == "text"));
	}
}
