use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

/// The DASH manifest tree, reduced to the attributes this translator
/// emits.
///
/// Serialization is hand rolled: DASH clients are picky about namespace
/// placement and empty elements, so the writer emits `<X/>` for every
/// childless element and declares the cenc/mspr namespaces only when
/// content protection is present.
#[derive(Debug, Clone, Default)]
pub struct Mpd {
	/// "static" or "dynamic".
	pub kind: String,
	/// Declare xmlns:cenc and xmlns:mspr on the root.
	pub protection_namespaces: bool,
	pub min_buffer_time: String,
	pub availability_start_time: String,
	pub minimum_update_period: Option<String>,
	pub publish_time: String,
	pub time_shift_buffer_depth: Option<String>,
	pub media_presentation_duration: Option<String>,
	pub periods: Vec<Period>,
	pub utc_timing: Option<UtcTiming>,
	pub program_information: Option<ProgramInformation>,
}

#[derive(Debug, Clone, Default)]
pub struct UtcTiming {
	pub scheme_id_uri: String,
	pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProgramInformation {
	pub title: String,
	pub copyright: String,
}

#[derive(Debug, Clone, Default)]
pub struct Period {
	pub id: String,
	pub start: String,
	pub adaptation_sets: Vec<AdaptationSet>,
}

#[derive(Debug, Clone, Default)]
pub struct AdaptationSet {
	pub id: String,
	pub mime_type: String,
	pub content_type: String,
	pub lang: String,
	/// Serialized as an unsigned integer.
	pub start_with_sap: u32,
	/// Serialized as a boolean.
	pub segment_alignment: bool,
	pub audio_channel_configuration: Option<AudioChannelConfiguration>,
	pub content_protections: Vec<ContentProtection>,
	pub segment_template: Option<SegmentTemplate>,
	pub representations: Vec<Representation>,
}

#[derive(Debug, Clone, Default)]
pub struct AudioChannelConfiguration {
	pub scheme_id_uri: String,
	pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct ContentProtection {
	pub scheme_id_uri: String,
	pub value: String,
	/// Raw PlayReady header for the mspr:pro child.
	pub pro: Option<String>,
	/// Base64 pssh box for the cenc:pssh child.
	pub pssh: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SegmentTemplate {
	pub timescale: u64,
	pub initialization: String,
	pub media: String,
	pub timeline: Vec<TimelineSegment>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TimelineSegment {
	pub t: Option<u64>,
	pub d: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Representation {
	pub id: String,
	pub width: u64,
	pub height: u64,
	pub bandwidth: u64,
	pub audio_sampling_rate: Option<String>,
	pub codecs: String,
	pub scan_type: Option<String>,
}

pub const XMLNS_MPD: &str = "urn:mpeg:dash:schema:mpd:2011";
pub const XMLNS_CENC: &str = "urn:mpeg:cenc:2013";
pub const XMLNS_MSPR: &str = "urn:microsoft:playready";
pub const PROFILE_ISOFF_LIVE: &str = "urn:mpeg:dash:profile:isoff-live:2011";

impl Mpd {
	/// Serialize to XML with a declaration, two-space indentation and
	/// self-closing empty elements.
	pub fn encode(&self) -> Result<Vec<u8>, quick_xml::Error> {
		let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

		writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

		let mut mpd = BytesStart::new("MPD");
		mpd.push_attribute(("xmlns", XMLNS_MPD));
		mpd.push_attribute(("profiles", PROFILE_ISOFF_LIVE));
		if self.protection_namespaces {
			mpd.push_attribute(("xmlns:cenc", XMLNS_CENC));
			mpd.push_attribute(("xmlns:mspr", XMLNS_MSPR));
		}
		mpd.push_attribute(("type", self.kind.as_str()));
		mpd.push_attribute(("minBufferTime", self.min_buffer_time.as_str()));
		mpd.push_attribute((
			"availabilityStartTime",
			self.availability_start_time.as_str(),
		));
		if let Some(v) = &self.minimum_update_period {
			mpd.push_attribute(("minimumUpdatePeriod", v.as_str()));
		}
		mpd.push_attribute(("publishTime", self.publish_time.as_str()));
		if let Some(v) = &self.time_shift_buffer_depth {
			mpd.push_attribute(("timeShiftBufferDepth", v.as_str()));
		}
		if let Some(v) = &self.media_presentation_duration {
			mpd.push_attribute(("mediaPresentationDuration", v.as_str()));
		}

		writer.write_event(Event::Start(mpd))?;

		for period in &self.periods {
			period.write(&mut writer)?;
		}

		if let Some(timing) = &self.utc_timing {
			let mut el = BytesStart::new("UTCTiming");
			el.push_attribute(("schemeIdUri", timing.scheme_id_uri.as_str()));
			el.push_attribute(("value", timing.value.as_str()));
			writer.write_event(Event::Empty(el))?;
		}

		if let Some(info) = &self.program_information {
			writer.write_event(Event::Start(BytesStart::new("ProgramInformation")))?;
			write_text_element(&mut writer, "Title", &info.title)?;
			write_text_element(&mut writer, "Copyright", &info.copyright)?;
			writer.write_event(Event::End(BytesEnd::new("ProgramInformation")))?;
		}

		writer.write_event(Event::End(BytesEnd::new("MPD")))?;

		let mut out = writer.into_inner();
		out.push(b'\n');
		Ok(out)
	}
}

fn write_text_element(
	writer: &mut Writer<Vec<u8>>,
	name: &str,
	text: &str,
) -> Result<(), quick_xml::Error> {
	if text.is_empty() {
		writer.write_event(Event::Empty(BytesStart::new(name)))?;
		return Ok(());
	}

	writer.write_event(Event::Start(BytesStart::new(name)))?;
	writer.write_event(Event::Text(BytesText::new(text)))?;
	writer.write_event(Event::End(BytesEnd::new(name)))?;

	Ok(())
}

impl Period {
	fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), quick_xml::Error> {
		let mut el = BytesStart::new("Period");
		el.push_attribute(("start", self.start.as_str()));
		el.push_attribute(("id", self.id.as_str()));

		if self.adaptation_sets.is_empty() {
			writer.write_event(Event::Empty(el))?;
			return Ok(());
		}

		writer.write_event(Event::Start(el))?;
		for set in &self.adaptation_sets {
			set.write(writer)?;
		}
		writer.write_event(Event::End(BytesEnd::new("Period")))?;

		Ok(())
	}
}

impl AdaptationSet {
	fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), quick_xml::Error> {
		let mut el = BytesStart::new("AdaptationSet");
		el.push_attribute(("mimeType", self.mime_type.as_str()));
		el.push_attribute(("startWithSAP", self.start_with_sap.to_string().as_str()));
		el.push_attribute(("id", self.id.as_str()));
		el.push_attribute((
			"segmentAlignment",
			if self.segment_alignment { "true" } else { "false" },
		));
		el.push_attribute(("lang", self.lang.as_str()));
		el.push_attribute(("contentType", self.content_type.as_str()));

		writer.write_event(Event::Start(el))?;

		if let Some(config) = &self.audio_channel_configuration {
			let mut el = BytesStart::new("AudioChannelConfiguration");
			el.push_attribute(("schemeIdUri", config.scheme_id_uri.as_str()));
			el.push_attribute(("value", config.value.as_str()));
			writer.write_event(Event::Empty(el))?;
		}

		for protection in &self.content_protections {
			protection.write(writer)?;
		}

		if let Some(template) = &self.segment_template {
			template.write(writer)?;
		}

		for representation in &self.representations {
			representation.write(writer)?;
		}

		writer.write_event(Event::End(BytesEnd::new("AdaptationSet")))?;

		Ok(())
	}
}

impl ContentProtection {
	fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), quick_xml::Error> {
		let mut el = BytesStart::new("ContentProtection");
		el.push_attribute(("value", self.value.as_str()));
		el.push_attribute(("schemeIdUri", self.scheme_id_uri.as_str()));

		if self.pro.is_none() && self.pssh.is_none() {
			writer.write_event(Event::Empty(el))?;
			return Ok(());
		}

		writer.write_event(Event::Start(el))?;

		if let Some(pro) = &self.pro {
			let mut el = BytesStart::new("mspr:pro");
			el.push_attribute(("xmlns:mspr", XMLNS_MSPR));
			writer.write_event(Event::Start(el))?;
			writer.write_event(Event::Text(BytesText::new(pro)))?;
			writer.write_event(Event::End(BytesEnd::new("mspr:pro")))?;
		}

		if let Some(pssh) = &self.pssh {
			let mut el = BytesStart::new("cenc:pssh");
			el.push_attribute(("xmlns:cenc", XMLNS_CENC));
			writer.write_event(Event::Start(el))?;
			writer.write_event(Event::Text(BytesText::new(pssh)))?;
			writer.write_event(Event::End(BytesEnd::new("cenc:pssh")))?;
		}

		writer.write_event(Event::End(BytesEnd::new("ContentProtection")))?;

		Ok(())
	}
}

impl SegmentTemplate {
	fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), quick_xml::Error> {
		let mut el = BytesStart::new("SegmentTemplate");
		el.push_attribute(("initialization", self.initialization.as_str()));
		el.push_attribute(("media", self.media.as_str()));
		el.push_attribute(("timescale", self.timescale.to_string().as_str()));

		if self.timeline.is_empty() {
			writer.write_event(Event::Empty(el))?;
			return Ok(());
		}

		writer.write_event(Event::Start(el))?;
		writer.write_event(Event::Start(BytesStart::new("SegmentTimeline")))?;

		for segment in &self.timeline {
			let mut el = BytesStart::new("S");
			if let Some(t) = segment.t {
				el.push_attribute(("t", t.to_string().as_str()));
			}
			el.push_attribute(("d", segment.d.to_string().as_str()));
			writer.write_event(Event::Empty(el))?;
		}

		writer.write_event(Event::End(BytesEnd::new("SegmentTimeline")))?;
		writer.write_event(Event::End(BytesEnd::new("SegmentTemplate")))?;

		Ok(())
	}
}

impl Representation {
	fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), quick_xml::Error> {
		let mut el = BytesStart::new("Representation");
		el.push_attribute(("id", self.id.as_str()));
		if self.width > 0 {
			el.push_attribute(("width", self.width.to_string().as_str()));
		}
		if self.height > 0 {
			el.push_attribute(("height", self.height.to_string().as_str()));
		}
		el.push_attribute(("bandwidth", self.bandwidth.to_string().as_str()));
		if let Some(rate) = &self.audio_sampling_rate {
			el.push_attribute(("audioSamplingRate", rate.as_str()));
		}
		el.push_attribute(("codecs", self.codecs.as_str()));
		if let Some(scan) = &self.scan_type {
			el.push_attribute(("scanType", scan.as_str()));
		}

		writer.write_event(Event::Empty(el))?;

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_no_open_close_pairs() {
		let mpd = Mpd {
			kind: "static".into(),
			min_buffer_time: "PT2S".into(),
			availability_start_time: "1970-01-01T00:00:00Z".into(),
			publish_time: "2025-01-01T00:00:00Z".into(),
			periods: vec![Period {
				id: "0".into(),
				start: "PT0S".into(),
				adaptation_sets: vec![AdaptationSet {
					id: "0".into(),
					mime_type: "video/mp4".into(),
					content_type: "video".into(),
					lang: "und".into(),
					start_with_sap: 1,
					segment_alignment: true,
					segment_template: Some(SegmentTemplate {
						timescale: 10_000_000,
						initialization: "$RepresentationID$/init.mp4".into(),
						media: "$RepresentationID$/$Time$/x".into(),
						timeline: vec![
							TimelineSegment {
								t: Some(0),
								d: 20_000_000,
							},
							TimelineSegment {
								t: None,
								d: 20_000_000,
							},
						],
					}),
					representations: vec![Representation {
						id: "video_0".into(),
						width: 1280,
						height: 720,
						bandwidth: 2_000_000,
						codecs: "avc1.4d4020".into(),
						scan_type: Some("progressive".into()),
						..Default::default()
					}],
					..Default::default()
				}],
			}],
			utc_timing: Some(UtcTiming {
				scheme_id_uri: "urn:mpeg:dash:utc:direct:2014".into(),
				value: "2025-01-01T00:00:00Z".into(),
			}),
			..Default::default()
		};

		let xml = String::from_utf8(mpd.encode().unwrap()).unwrap();

		assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
		// Every empty element must be self-closing.
		assert!(!xml.contains("></"), "{xml}");
		assert!(xml.contains("<S t=\"0\" d=\"20000000\"/>"));
		assert!(xml.contains("<S d=\"20000000\"/>"));
		assert!(xml.contains("<Representation id=\"video_0\""));
		assert!(xml.contains("<UTCTiming"));
	}

	#[test]
	fn test_protection_namespaces() {
		let mpd = Mpd {
			kind: "dynamic".into(),
			protection_namespaces: true,
			min_buffer_time: "PT2S".into(),
			availability_start_time: "1970-01-01T00:00:00Z".into(),
			publish_time: "2025-01-01T00:00:00Z".into(),
			..Default::default()
		};

		let xml = String::from_utf8(mpd.encode().unwrap()).unwrap();
		assert!(xml.contains(r#"xmlns:cenc="urn:mpeg:cenc:2013""#));
		assert!(xml.contains(r#"xmlns:mspr="urn:microsoft:playready""#));
	}
}
