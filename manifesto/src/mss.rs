use quick_xml::events::Event;
use quick_xml::Reader;

#[derive(thiserror::Error, Debug)]
pub enum MssError {
	#[error("malformed manifest xml: {0}")]
	Xml(String),

	#[error("missing attribute: {0}")]
	MissingAttribute(&'static str),

	#[error("no stream index named {0:?}")]
	UnknownStream(String),

	#[error("no quality level with index {0}")]
	UnknownQuality(u32),
}

impl From<quick_xml::Error> for MssError {
	fn from(err: quick_xml::Error) -> Self {
		MssError::Xml(err.to_string())
	}
}

/// A parsed SmoothStreamingMedia manifest.
#[derive(Debug, Clone, Default)]
pub struct SmoothStream {
	pub major_version: u32,
	pub minor_version: u32,
	/// Ticks per second for the presentation, usually 10_000_000.
	pub time_scale: u64,
	/// Total duration in presentation ticks; 0 for live.
	pub duration: u64,
	pub is_live: bool,
	pub look_ahead_fragment_count: u32,
	/// DVR window in presentation ticks.
	pub dvr_window_length: u64,
	pub can_seek: bool,
	pub can_pause: bool,
	pub protection: Vec<ProtectionHeader>,
	pub stream_indexes: Vec<StreamIndex>,
}

#[derive(Debug, Clone, Default)]
pub struct ProtectionHeader {
	/// DRM system UUID, e.g. the PlayReady system id.
	pub system_id: String,
	/// Base64 blob, format defined by the DRM system.
	pub custom_data: String,
}

#[derive(Debug, Clone, Default)]
pub struct StreamIndex {
	/// "video", "audio" or "text".
	pub kind: String,
	pub name: String,
	pub language: String,
	pub subtype: String,
	pub chunks: u32,
	/// Ticks per second for this stream; may differ from the presentation.
	pub time_scale: u64,
	/// Upstream URL template with {bitrate} and {start time} placeholders.
	pub url: String,
	pub quality_levels: Vec<QualityLevel>,
	pub chunk_infos: Vec<ChunkInfo>,
}

#[derive(Debug, Clone, Default)]
pub struct QualityLevel {
	pub index: u32,
	pub bitrate: u64,
	pub four_cc: String,
	pub codec_private_data: String,
	pub max_width: u64,
	pub max_height: u64,
	pub audio_tag: u32,
	pub channels: u32,
	pub sampling_rate: u32,
	pub bits_per_sample: u32,
	pub packet_size: u32,
}

/// One `<c>` element: an entry in the chunk timeline. Later entries
/// inherit their start time by accumulating durations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkInfo {
	pub start_time: Option<u64>,
	pub duration: u64,
}

impl SmoothStream {
	pub fn parse(xml: &str) -> Result<Self, MssError> {
		let mut reader = Reader::from_str(xml);
		reader.config_mut().trim_text(true);

		let mut manifest = SmoothStream::default();
		let mut stream: Option<StreamIndex> = None;
		let mut in_protection_header = false;
		let mut buf = Vec::new();

		loop {
			match reader.read_event_into(&mut buf).map_err(MssError::from)? {
				Event::Start(ref e) | Event::Empty(ref e) => {
					let name = e.local_name();
					match name.as_ref() {
						b"SmoothStreamingMedia" => {
							for attr in e.attributes() {
								let attr = attr.map_err(|e| MssError::Xml(e.to_string()))?;
								let value = attr
									.unescape_value()
									.map_err(|e| MssError::Xml(e.to_string()))?;
								match attr.key.as_ref() {
									b"MajorVersion" => {
										manifest.major_version = parse_num(&value)?
									}
									b"MinorVersion" => {
										manifest.minor_version = parse_num(&value)?
									}
									b"TimeScale" => manifest.time_scale = parse_num(&value)?,
									b"Duration" => manifest.duration = parse_num(&value)?,
									b"IsLive" => manifest.is_live = parse_bool(&value),
									b"LookAheadFragmentCount" => {
										manifest.look_ahead_fragment_count = parse_num(&value)?
									}
									b"DVRWindowLength" => {
										manifest.dvr_window_length = parse_num(&value)?
									}
									b"CanSeek" => manifest.can_seek = parse_bool(&value),
									b"CanPause" => manifest.can_pause = parse_bool(&value),
									_ => {}
								}
							}

							if manifest.time_scale == 0 {
								manifest.time_scale = 10_000_000;
							}
						}
						b"ProtectionHeader" => {
							let mut header = ProtectionHeader::default();
							for attr in e.attributes() {
								let attr = attr.map_err(|e| MssError::Xml(e.to_string()))?;
								if attr.key.as_ref() == b"SystemID" {
									header.system_id = attr
										.unescape_value()
										.map_err(|e| MssError::Xml(e.to_string()))?
										.to_string();
								}
							}
							manifest.protection.push(header);
							in_protection_header = true;
						}
						b"StreamIndex" => {
							let mut index = StreamIndex::default();
							for attr in e.attributes() {
								let attr = attr.map_err(|e| MssError::Xml(e.to_string()))?;
								let value = attr
									.unescape_value()
									.map_err(|e| MssError::Xml(e.to_string()))?;
								match attr.key.as_ref() {
									b"Type" => index.kind = value.to_string(),
									b"Name" => index.name = value.to_string(),
									b"Language" => index.language = value.to_string(),
									b"Subtype" => index.subtype = value.to_string(),
									b"Chunks" => index.chunks = parse_num(&value)?,
									b"TimeScale" => index.time_scale = parse_num(&value)?,
									b"Url" => index.url = value.to_string(),
									_ => {}
								}
							}

							if index.kind.is_empty() {
								return Err(MssError::MissingAttribute("StreamIndex.Type"));
							}

							stream = Some(index);
						}
						b"QualityLevel" => {
							let stream = stream
								.as_mut()
								.ok_or(MssError::Xml("QualityLevel outside StreamIndex".into()))?;

							let mut level = QualityLevel::default();
							for attr in e.attributes() {
								let attr = attr.map_err(|e| MssError::Xml(e.to_string()))?;
								let value = attr
									.unescape_value()
									.map_err(|e| MssError::Xml(e.to_string()))?;
								match attr.key.as_ref() {
									b"Index" => level.index = parse_num(&value)?,
									b"Bitrate" => level.bitrate = parse_num(&value)?,
									b"FourCC" => level.four_cc = value.to_string(),
									b"CodecPrivateData" => {
										level.codec_private_data = value.to_string()
									}
									b"MaxWidth" => level.max_width = parse_num(&value)?,
									b"MaxHeight" => level.max_height = parse_num(&value)?,
									b"AudioTag" => level.audio_tag = parse_num(&value)?,
									b"Channels" => level.channels = parse_num(&value)?,
									b"SamplingRate" => level.sampling_rate = parse_num(&value)?,
									b"BitsPerSample" => {
										level.bits_per_sample = parse_num(&value)?
									}
									b"PacketSize" => level.packet_size = parse_num(&value)?,
									_ => {}
								}
							}

							stream.quality_levels.push(level);
						}
						b"c" => {
							let stream = stream
								.as_mut()
								.ok_or(MssError::Xml("chunk outside StreamIndex".into()))?;

							let mut chunk = ChunkInfo::default();
							for attr in e.attributes() {
								let attr = attr.map_err(|e| MssError::Xml(e.to_string()))?;
								let value = attr
									.unescape_value()
									.map_err(|e| MssError::Xml(e.to_string()))?;
								match attr.key.as_ref() {
									b"t" => chunk.start_time = Some(parse_num(&value)?),
									b"d" => chunk.duration = parse_num(&value)?,
									_ => {}
								}
							}

							stream.chunk_infos.push(chunk);
						}
						_ => {}
					}
				}
				Event::Text(e) if in_protection_header => {
					if let Some(header) = manifest.protection.last_mut() {
						header.custom_data = e
							.unescape()
							.map_err(|e| MssError::Xml(e.to_string()))?
							.trim()
							.to_string();
					}
				}
				Event::End(ref e) => match e.local_name().as_ref() {
					b"ProtectionHeader" => in_protection_header = false,
					b"StreamIndex" => {
						if let Some(index) = stream.take() {
							manifest.stream_indexes.push(index);
						}
					}
					_ => {}
				},
				Event::Eof => break,
				_ => {}
			}

			buf.clear();
		}

		Ok(manifest)
	}

	/// The first stream index matching the name; failing that, the first
	/// matching the type.
	pub fn stream_index_by_name_or_type(&self, name: &str) -> Result<&StreamIndex, MssError> {
		self.stream_indexes
			.iter()
			.find(|si| si.name == name)
			.or_else(|| self.stream_indexes.iter().find(|si| si.kind == name))
			.ok_or_else(|| MssError::UnknownStream(name.to_string()))
	}

	/// The protection header for a DRM system id, compared
	/// case-insensitively.
	pub fn protection(&self, system_id: &str) -> Option<&ProtectionHeader> {
		self.protection
			.iter()
			.find(|p| p.system_id.eq_ignore_ascii_case(system_id))
	}
}

impl StreamIndex {
	/// Quality levels are looked up by their declared Index attribute,
	/// not by list position.
	pub fn quality_level_by_index(&self, index: u32) -> Result<&QualityLevel, MssError> {
		self.quality_levels
			.iter()
			.find(|ql| ql.index == index)
			.ok_or(MssError::UnknownQuality(index))
	}

	pub fn mime_type(&self) -> &'static str {
		match self.kind.as_str() {
			"video" => "video/mp4",
			"audio" => "audio/mp4",
			"text" => "application/mp4",
			_ => "application/octet-stream",
		}
	}

	/// The stream language, defaulting to "und".
	pub fn language_or_und(&self) -> &str {
		match self.language.is_empty() {
			true => "und",
			false => &self.language,
		}
	}
}

fn parse_num<T: std::str::FromStr>(value: &str) -> Result<T, MssError> {
	value
		.parse()
		.map_err(|_| MssError::Xml(format!("invalid number: {value:?}")))
}

fn parse_bool(value: &str) -> bool {
	value.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
	use super::*;

	pub const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SmoothStreamingMedia MajorVersion="2" MinorVersion="0" Duration="100000000" TimeScale="10000000">
  <StreamIndex Type="video" Chunks="2" QualityLevels="2" TimeScale="10000000"
    Url="QualityLevels({bitrate})/Fragments(video={start time})" MaxWidth="1280" MaxHeight="720">
    <QualityLevel Index="0" Bitrate="2000000" FourCC="H264" MaxWidth="1280" MaxHeight="720"
      CodecPrivateData="00000001674D40209E5281806F60284040405000000300100000064E00000D1F400068FA3F13E0A00000000168EF7520" />
    <QualityLevel Index="1" Bitrate="1000000" FourCC="H264" MaxWidth="640" MaxHeight="360"
      CodecPrivateData="00000001674D40209E5281806F60284040405000000300100000064E00000D1F400068FA3F13E0A00000000168EF7520" />
    <c t="0" d="20000000" />
    <c d="20000000" />
  </StreamIndex>
  <StreamIndex Type="audio" Name="audio_deu" Language="deu" Chunks="2" QualityLevels="1"
    TimeScale="10000000" Url="QualityLevels({bitrate})/Fragments(audio_deu={start time})">
    <QualityLevel Index="0" Bitrate="128000" FourCC="AACL" SamplingRate="48000"
      Channels="2" BitsPerSample="16" PacketSize="4" AudioTag="255" CodecPrivateData="1190" />
    <c t="0" d="20000000" />
    <c d="20000000" />
  </StreamIndex>
</SmoothStreamingMedia>"#;

	#[test]
	fn test_parse() {
		let manifest = SmoothStream::parse(SAMPLE).unwrap();

		assert_eq!(manifest.major_version, 2);
		assert_eq!(manifest.time_scale, 10_000_000);
		assert_eq!(manifest.duration, 100_000_000);
		assert!(!manifest.is_live);
		assert_eq!(manifest.stream_indexes.len(), 2);

		let video = &manifest.stream_indexes[0];
		assert_eq!(video.kind, "video");
		assert_eq!(video.quality_levels.len(), 2);
		assert_eq!(video.chunk_infos.len(), 2);
		assert_eq!(video.chunk_infos[0].start_time, Some(0));
		assert_eq!(video.chunk_infos[1].start_time, None);
		assert_eq!(video.chunk_infos[1].duration, 20_000_000);

		let audio = &manifest.stream_indexes[1];
		assert_eq!(audio.name, "audio_deu");
		assert_eq!(audio.language, "deu");
	}

	#[test]
	fn test_lookups() {
		let manifest = SmoothStream::parse(SAMPLE).unwrap();

		// By name first, by type second.
		assert_eq!(
			manifest.stream_index_by_name_or_type("audio_deu").unwrap().kind,
			"audio"
		);
		assert_eq!(
			manifest.stream_index_by_name_or_type("video").unwrap().kind,
			"video"
		);
		assert!(manifest.stream_index_by_name_or_type("nope").is_err());

		let video = manifest.stream_index_by_name_or_type("video").unwrap();
		assert_eq!(video.quality_level_by_index(1).unwrap().bitrate, 1_000_000);
		assert!(video.quality_level_by_index(7).is_err());

		assert_eq!(video.mime_type(), "video/mp4");
		assert_eq!(video.language_or_und(), "und");
	}

	#[test]
	fn test_protection() {
		let xml = r#"<SmoothStreamingMedia MajorVersion="2" MinorVersion="0" TimeScale="10000000" IsLive="TRUE" DVRWindowLength="300000000">
  <Protection>
    <ProtectionHeader SystemID="9A04F079-9840-4286-AB92-E65BE0885F95">dGVzdA==</ProtectionHeader>
  </Protection>
</SmoothStreamingMedia>"#;

		let manifest = SmoothStream::parse(xml).unwrap();
		assert!(manifest.is_live);
		assert_eq!(manifest.dvr_window_length, 300_000_000);

		let header = manifest
			.protection("9a04f079-9840-4286-ab92-e65be0885f95")
			.unwrap();
		assert_eq!(header.custom_data, "dGVzdA==");
	}

	#[test]
	fn test_malformed() {
		assert!(SmoothStream::parse("<SmoothStreamingMedia").is_err());
	}
}
