use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

#[derive(thiserror::Error, Debug)]
pub enum TtmlError {
	#[error("ttml xml: {0}")]
	Xml(String),

	#[error("ttml write: {0}")]
	Io(#[from] std::io::Error),

	#[error("ttml is not valid utf-8")]
	Utf8,
}

impl From<quick_xml::Error> for TtmlError {
	fn from(err: quick_xml::Error) -> Self {
		TtmlError::Xml(err.to_string())
	}
}

/// Shift the begin/end attributes of every `<p>` element by the segment
/// start, turning segment-relative TTML timestamps into the absolute
/// ones DASH players expect.
///
/// Everything else, namespaces, comments and processing instructions
/// included, is copied through verbatim.
pub fn rebase_timestamps(input: &[u8], offset_seconds: f64) -> Result<Vec<u8>, TtmlError> {
	let text = std::str::from_utf8(input).map_err(|_| TtmlError::Utf8)?;

	let mut reader = Reader::from_str(text);
	let mut writer = Writer::new(Vec::new());
	let mut buf = Vec::new();

	loop {
		let event = reader
			.read_event_into(&mut buf)
			.map_err(TtmlError::from)?;

		match event {
			Event::Start(e) if is_p(&e) => {
				writer.write_event(Event::Start(shift_attrs(&e, offset_seconds)?))?;
			}
			Event::Empty(e) if is_p(&e) => {
				writer.write_event(Event::Empty(shift_attrs(&e, offset_seconds)?))?;
			}
			Event::Eof => break,
			event => writer.write_event(event)?,
		}

		buf.clear();
	}

	Ok(writer.into_inner())
}

fn is_p(e: &BytesStart) -> bool {
	e.local_name().as_ref() == b"p"
}

fn shift_attrs(e: &BytesStart, offset: f64) -> Result<BytesStart<'static>, TtmlError> {
	let mut out = BytesStart::new(
		std::str::from_utf8(e.name().as_ref())
			.map_err(|_| TtmlError::Utf8)?
			.to_string(),
	);

	for attr in e.attributes() {
		let attr = attr.map_err(|e| TtmlError::Xml(e.to_string()))?;
		let key = std::str::from_utf8(attr.key.as_ref()).map_err(|_| TtmlError::Utf8)?;
		let value = attr
			.unescape_value()
			.map_err(|e| TtmlError::Xml(e.to_string()))?;

		let shifted = match attr.key.local_name().as_ref() {
			b"begin" | b"end" => match parse_time(&value) {
				Some(seconds) => Some(format_time(seconds + offset)),
				None => None,
			},
			_ => None,
		};

		match shifted {
			Some(shifted) => out.push_attribute((key, shifted.as_str())),
			None => out.push_attribute((key, value.as_ref())),
		}
	}

	Ok(out)
}

/// Accepts "HH:MM:SS.fff" and bare seconds.
fn parse_time(value: &str) -> Option<f64> {
	if !value.contains(':') {
		return value.parse().ok();
	}

	let mut parts = value.splitn(3, ':');
	let hours: f64 = parts.next()?.parse().ok()?;
	let minutes: f64 = parts.next()?.parse().ok()?;
	let seconds: f64 = parts.next()?.parse().ok()?;

	Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

fn format_time(seconds: f64) -> String {
	let hours = (seconds as u64) / 3600;
	let minutes = ((seconds as u64) % 3600) / 60;
	let seconds = seconds - (hours * 3600 + minutes * 60) as f64;

	format!("{hours:02}:{minutes:02}:{seconds:06.3}")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_rebase() {
		let input = br#"<tt xmlns="http://www.w3.org/ns/ttml"><body><div><p begin="00:00:01.000" end="00:00:03.500">hi</p></div></body></tt>"#;

		// time=100000000 ticks at timescale 10000000 -> +10s.
		let output = rebase_timestamps(input, 10.0).unwrap();
		let output = String::from_utf8(output).unwrap();

		assert!(output.contains(r#"begin="00:00:11.000""#), "{output}");
		assert!(output.contains(r#"end="00:00:13.500""#), "{output}");
		assert!(output.contains(r#"xmlns="http://www.w3.org/ns/ttml""#));
	}

	#[test]
	fn test_bare_seconds() {
		let input = br#"<tt><body><p begin="1.5" end="2">x</p></body></tt>"#;
		let output = String::from_utf8(rebase_timestamps(input, 60.0).unwrap()).unwrap();

		assert!(output.contains(r#"begin="00:01:01.500""#), "{output}");
		assert!(output.contains(r#"end="00:01:02.000""#), "{output}");
	}

	#[test]
	fn test_preserves_other_content() {
		let input = br#"<?xml version="1.0"?><!-- note --><tt><styling foo="bar"/><p begin="00:00:00.000" end="00:00:01.000" region="r1">text</p></tt>"#;
		let output = String::from_utf8(rebase_timestamps(input, 0.0).unwrap()).unwrap();

		assert!(output.contains("<!-- note -->"));
		assert!(output.contains(r#"<styling foo="bar"/>"#));
		assert!(output.contains(r#"region="r1""#));
	}

	#[test]
	fn test_unparseable_times_left_alone() {
		let input = br#"<tt><p begin="when-ready" end="later">x</p></tt>"#;
		let output = String::from_utf8(rebase_timestamps(input, 5.0).unwrap()).unwrap();

		assert!(output.contains(r#"begin="when-ready""#));
	}

	#[test]
	fn test_format_time() {
		assert_eq!(format_time(11.0), "00:00:11.000");
		assert_eq!(format_time(3723.25), "01:02:03.250");
	}
}
