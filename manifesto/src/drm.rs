use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use fmp4::Encode;
use regex::Regex;
use std::sync::OnceLock;

use crate::config::Channel;
use crate::mss::SmoothStream;

/// The PlayReady protection system id, as it appears in MSS manifests.
pub const PLAYREADY_SYSTEM_ID: &str = "9a04f079-9840-4286-ab92-e65be0885f95";

/// The same id as raw bytes, for pssh boxes.
pub const PLAYREADY_SYSTEM_ID_BYTES: [u8; 16] = [
	0x9a, 0x04, 0xf0, 0x79, 0x98, 0x40, 0x42, 0x86, 0xab, 0x92, 0xe6, 0x5b, 0xe0, 0x88, 0x5f,
	0x95,
];

#[derive(thiserror::Error, Debug)]
pub enum DrmError {
	#[error("no PlayReady protection header")]
	MissingHeader,

	#[error("invalid protection data: {0}")]
	InvalidData(String),

	#[error("no <KID> in PlayReady header")]
	MissingKid,

	#[error("key id must be 16 bytes")]
	KidLength,

	#[error("key not found for key id")]
	KeyNotFound,
}

/// How segments of a channel should be handled, resolved from the
/// manifest's protection headers and the channel's configured keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
	/// No protection header; serve everything as-is.
	Unprotected,

	/// Protected upstream, but we have no key. Init segments carry the
	/// encryption descriptors so the player can do its own licensing.
	Passthrough { kid: [u8; 16], pssh: Vec<u8> },

	/// Protected upstream and the key is known; decrypt on the way out.
	Decrypt {
		kid: [u8; 16],
		key: [u8; 16],
		pssh: Vec<u8>,
	},
}

impl KeySource {
	/// Resolve the key situation for a channel against a parsed manifest.
	pub fn resolve(manifest: &SmoothStream, channel: &Channel) -> Result<Self, DrmError> {
		let header = match manifest.protection(PLAYREADY_SYSTEM_ID) {
			Some(header) => header,
			None if manifest.protection.is_empty() => return Ok(KeySource::Unprotected),
			None => return Err(DrmError::MissingHeader),
		};

		let pssh = BASE64
			.decode(&header.custom_data)
			.map_err(|e| DrmError::InvalidData(e.to_string()))?;

		// Some providers pad the header with a pile of NULs.
		let pssh = trim_nul(&pssh).to_vec();

		let kid = extract_kid(&pssh)?;

		match channel.key(&kid).map_err(|_| DrmError::KeyNotFound)? {
			Some(key) => Ok(KeySource::Decrypt { kid, key, pssh }),
			None => Ok(KeySource::Passthrough { kid, pssh }),
		}
	}

	/// The key id, but only when segments are served still encrypted.
	/// Inits for decrypted content come out clear, so they must not
	/// carry protection metadata.
	pub fn passthrough_kid(&self) -> Option<&[u8; 16]> {
		match self {
			KeySource::Passthrough { kid, .. } => Some(kid),
			_ => None,
		}
	}
}

fn kid_regex() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| Regex::new(r"<KID>([a-zA-Z0-9+/=]+)</KID>").unwrap())
}

/// Extract the content key id from a PlayReady header.
///
/// The bytes from offset 10 are the WRMHEADER, little-endian UTF-16 XML.
/// The KID within is base64 of the GUID in little-endian byte order; the
/// returned id is converted to big-endian UUID order.
pub fn extract_kid(data: &[u8]) -> Result<[u8; 16], DrmError> {
	if data.len() < 10 {
		return Err(DrmError::InvalidData("header too short".into()));
	}

	let utf16: Vec<u16> = data[10..]
		.chunks_exact(2)
		.map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
		.collect();
	let xml = String::from_utf16_lossy(&utf16);

	let captures = kid_regex().captures(&xml).ok_or(DrmError::MissingKid)?;
	let kid = BASE64
		.decode(&captures[1])
		.map_err(|e| DrmError::InvalidData(e.to_string()))?;

	let b: [u8; 16] = kid.try_into().map_err(|_| DrmError::KidLength)?;

	// GUID fields are little-endian on the wire; flip to UUID order.
	Ok([
		b[3], b[2], b[1], b[0], b[5], b[4], b[7], b[6], b[8], b[9], b[10], b[11], b[12], b[13],
		b[14], b[15],
	])
}

/// Build the CENC pssh box for the DASH manifest, carrying the PlayReady
/// header verbatim, and return its base64 serialization.
pub fn pssh_base64(custom_data: &str) -> Result<String, DrmError> {
	let data = BASE64
		.decode(custom_data)
		.map_err(|e| DrmError::InvalidData(e.to_string()))?;

	let pssh = fmp4::Pssh {
		system_id: PLAYREADY_SYSTEM_ID_BYTES,
		kids: vec![],
		data,
	};

	let mut buf = Vec::new();
	pssh.encode(&mut buf)
		.map_err(|e| DrmError::InvalidData(e.to_string()))?;

	Ok(BASE64.encode(buf))
}

fn trim_nul(data: &[u8]) -> &[u8] {
	let end = data
		.iter()
		.rposition(|&b| b != 0)
		.map(|p| p + 1)
		.unwrap_or(0);
	&data[..end]
}

#[cfg(test)]
mod tests {
	use super::*;

	/// Build a minimal PlayReady object: 10 bytes of framing followed by
	/// the UTF-16LE WRMHEADER.
	fn playready_object(kid_le: &[u8; 16]) -> Vec<u8> {
		let xml = format!(
			"<WRMHEADER><DATA><KID>{}</KID></DATA></WRMHEADER>",
			BASE64.encode(kid_le)
		);

		let mut data = vec![0u8; 10];
		for unit in xml.encode_utf16() {
			data.extend_from_slice(&unit.to_le_bytes());
		}
		data
	}

	#[test]
	fn test_kid_byte_order() {
		let le: [u8; 16] = [
			0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d,
			0x0e, 0x0f,
		];

		let kid = extract_kid(&playready_object(&le)).unwrap();
		assert_eq!(
			kid,
			[
				0x03, 0x02, 0x01, 0x00, 0x05, 0x04, 0x07, 0x06, 0x08, 0x09, 0x0a, 0x0b, 0x0c,
				0x0d, 0x0e, 0x0f
			]
		);
	}

	#[test]
	fn test_missing_kid() {
		let mut data = vec![0u8; 10];
		for unit in "<WRMHEADER></WRMHEADER>".encode_utf16() {
			data.extend_from_slice(&unit.to_le_bytes());
		}

		assert!(matches!(extract_kid(&data), Err(DrmError::MissingKid)));
	}

	#[test]
	fn test_trim_nul() {
		assert_eq!(trim_nul(&[1, 2, 0, 0]), &[1, 2]);
		assert_eq!(trim_nul(&[0, 0]), &[] as &[u8]);
		assert_eq!(trim_nul(&[1]), &[1]);
	}

	#[test]
	fn test_pssh_base64() {
		let custom = BASE64.encode(b"payload");
		let pssh = BASE64.decode(pssh_base64(&custom).unwrap()).unwrap();

		// 32 byte header + payload, PlayReady system id at offset 12.
		assert_eq!(&pssh[4..8], b"pssh");
		assert_eq!(&pssh[12..28], &PLAYREADY_SYSTEM_ID_BYTES);
		assert_eq!(&pssh[32..], b"payload");
	}
}
