use std::time::Instant;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use crate::config::Channel;
use crate::dash;
use crate::drm::KeySource;
use crate::error::ServeError;
use crate::init::{build_aac_init, build_avc_init, build_ec3_init, build_stpp_init, InitParams};
use crate::mss::SmoothStream;
use crate::segment;

use super::AppState;

pub const SERVER_TIMING: HeaderName = HeaderName::from_static("server-timing");

/// Wall-clock phases of one request, rendered into a Server-Timing
/// header.
pub struct Timing {
	start: Instant,
	phases: Vec<(&'static str, f64)>,
}

impl Timing {
	pub fn start() -> Self {
		Self {
			start: Instant::now(),
			phases: Vec::new(),
		}
	}

	/// Time one phase of the request.
	pub async fn phase<T, F: std::future::Future<Output = T>>(
		&mut self,
		name: &'static str,
		fut: F,
	) -> T {
		let begin = Instant::now();
		let out = fut.await;
		self.phases.push((name, begin.elapsed().as_secs_f64() * 1000.0));
		out
	}

	pub fn measure<T>(&mut self, name: &'static str, f: impl FnOnce() -> T) -> T {
		let begin = Instant::now();
		let out = f();
		self.phases.push((name, begin.elapsed().as_secs_f64() * 1000.0));
		out
	}

	pub fn header(&self) -> HeaderValue {
		let mut parts: Vec<String> = self
			.phases
			.iter()
			.map(|(name, ms)| format!("{name};dur={ms:.3}"))
			.collect();
		parts.push(format!(
			"total;dur={:.3}",
			self.start.elapsed().as_secs_f64() * 1000.0
		));

		HeaderValue::from_str(&parts.join(","))
			.unwrap_or_else(|_| HeaderValue::from_static("total;dur=0"))
	}
}

/// Split a representation id into stream name-or-type and quality index.
///
/// The split is on the last underscore: "audio_deu_0" names the stream
/// "audio_deu", quality 0.
pub fn parse_rep_id(rep_id: &str) -> Result<(&str, u32), ServeError> {
	let (name, index) = rep_id
		.rsplit_once('_')
		.ok_or_else(|| ServeError::Input(format!("invalid representation id: {rep_id:?}")))?;

	if name.is_empty() || index.is_empty() {
		return Err(ServeError::Input(format!(
			"invalid representation id: {rep_id:?}"
		)));
	}

	let index = index
		.parse()
		.map_err(|_| ServeError::Input(format!("invalid quality index: {index:?}")))?;

	Ok((name, index))
}

async fn fetch_manifest(
	state: &AppState,
	channel: &Channel,
	timing: &mut Timing,
) -> Result<SmoothStream, ServeError> {
	let body = timing
		.phase("manifest-fetch", async {
			state.cache.fetch(&channel.url, None).await?.text().await
		})
		.await?;

	Ok(SmoothStream::parse(&body)?)
}

/// GET .../manifest.mpd
pub async fn serve_manifest(state: &AppState, channel: &Channel) -> Result<Response, ServeError> {
	let mut timing = Timing::start();

	let manifest = fetch_manifest(state, channel, &mut timing).await?;

	let allow_subs = state.config.get().allow_subs;
	let xml = timing.measure("manifest-transform", || {
		let mpd = dash::smooth_to_dash(
			&manifest,
			channel.has_keys(),
			allow_subs,
			channel,
			Utc::now(),
		)?;
		mpd.encode().map_err(|e| ServeError::Encode(e.to_string()))
	})?;

	let mut headers = HeaderMap::new();
	headers.insert(
		header::CONTENT_TYPE,
		HeaderValue::from_static("application/dash+xml"),
	);
	headers.insert(SERVER_TIMING, timing.header());

	Ok((StatusCode::OK, headers, xml).into_response())
}

/// The per-codec init build, shared by the init and segment paths.
fn build_init(
	manifest: &SmoothStream,
	stream: &crate::mss::StreamIndex,
	quality: &crate::mss::QualityLevel,
	keys: &KeySource,
) -> Result<crate::init::BuiltInit, ServeError> {
	let params = InitParams {
		time_scale: manifest.time_scale as u32,
		language: stream.language_or_und(),
		codec_private_data: &quality.codec_private_data,
		keys,
	};

	match stream.kind.as_str() {
		"video" => build_avc_init(&params),
		"audio" => match quality.four_cc.to_lowercase().as_str() {
			"aacl" => build_aac_init(&params),
			"ec-3" => build_ec3_init(&params),
			other => Err(ServeError::UnsupportedCodec(other.to_string())),
		},
		"text" => match quality.four_cc.to_lowercase().as_str() {
			"ttml" => build_stpp_init(&params),
			other => Err(ServeError::UnsupportedCodec(other.to_string())),
		},
		other => Err(ServeError::UnsupportedCodec(other.to_string())),
	}
}

/// GET .../{qualityId}/init.mp4
pub async fn serve_init(
	state: &AppState,
	channel: &Channel,
	quality_id: &str,
) -> Result<Response, ServeError> {
	let mut timing = Timing::start();

	let (stream_name, quality_index) = parse_rep_id(quality_id)?;

	let manifest = fetch_manifest(state, channel, &mut timing).await?;
	let stream = manifest.stream_index_by_name_or_type(stream_name)?;
	let quality = stream.quality_level_by_index(quality_index)?;

	let keys = KeySource::resolve(&manifest, channel)?;

	let body = timing.measure("init-gen", || {
		build_init(&manifest, stream, quality, &keys)?
			.encode_to_vec()
			.map_err(ServeError::from)
	})?;

	let mut headers = HeaderMap::new();
	headers.insert(
		header::CONTENT_TYPE,
		HeaderValue::from_static(stream.mime_type()),
	);
	headers.insert(
		header::CONTENT_DISPOSITION,
		HeaderValue::from_static("attachment; filename=init.mp4"),
	);
	headers.insert(SERVER_TIMING, timing.header());

	Ok((StatusCode::OK, headers, body).into_response())
}

/// GET .../{qualityId}/{time}/{rest...}
pub async fn serve_segment(
	state: &AppState,
	channel: &Channel,
	quality_id: &str,
	time: &str,
	rest: &str,
) -> Result<Response, ServeError> {
	let mut timing = Timing::start();

	if rest.is_empty() {
		return Err(ServeError::Input("no chunk specified".to_string()));
	}

	let time: u64 = time
		.parse()
		.map_err(|_| ServeError::Input(format!("invalid time: {time:?}")))?;

	let (stream_name, quality_index) = parse_rep_id(quality_id)?;

	let manifest = fetch_manifest(state, channel, &mut timing).await?;
	let stream = manifest.stream_index_by_name_or_type(stream_name)?;
	let quality = stream.quality_level_by_index(quality_index)?;

	let keys = KeySource::resolve(&manifest, channel)?;

	// Building the init as a side effect yields the decrypt info the
	// repackager needs; subtitles never need it.
	let decrypt = match stream.kind.as_str() {
		"video" | "audio" => {
			timing.measure("init-gen", || build_init(&manifest, stream, quality, &keys))?
				.decrypt
		}
		_ => None,
	};

	// The chunk lives next to the upstream manifest: drop the last path
	// segment and append whatever the template produced.
	let base = match channel.url.rfind('/') {
		Some(pos) => &channel.url[..pos + 1],
		None => channel.url.as_str(),
	};
	let chunk_url = format!("{base}{rest}");

	let chunk = timing
		.phase("chunk-fetch", async {
			state.cache.fetch(&chunk_url, None).await?.bytes().await
		})
		.await?;

	let body = timing.measure("segment-process", || match stream.kind.as_str() {
		"video" => segment::repackage_video(&chunk, decrypt.as_ref(), time),
		"audio" => segment::repackage_audio(&chunk, decrypt.as_ref(), time),
		"text" => {
			let first_chunk_duration = stream
				.chunk_infos
				.first()
				.map(|c| c.duration as u32)
				.unwrap_or(0);

			segment::repackage_subtitle(
				&chunk,
				time,
				manifest.time_scale as u32,
				first_chunk_duration,
			)
		}
		other => Err(ServeError::UnsupportedCodec(other.to_string())),
	})?;

	let mut headers = HeaderMap::new();
	headers.insert(
		header::CONTENT_TYPE,
		HeaderValue::from_static(stream.mime_type()),
	);
	headers.insert(SERVER_TIMING, timing.header());

	Ok((StatusCode::OK, headers, body).into_response())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_rep_id() {
		assert_eq!(parse_rep_id("video_0").unwrap(), ("video", 0));
		assert_eq!(parse_rep_id("audio_deu_3").unwrap(), ("audio_deu", 3));

		assert!(parse_rep_id("video").is_err());
		assert!(parse_rep_id("video_").is_err());
		assert!(parse_rep_id("_0").is_err());
		assert!(parse_rep_id("video_x").is_err());
		assert!(parse_rep_id("video_-1").is_err());
	}

	#[test]
	fn test_rep_id_round_trip() {
		for name in ["video", "audio_deu", "textstream_und"] {
			for index in [0u32, 1, 12] {
				let rep_id = format!("{name}_{index}");
				assert_eq!(parse_rep_id(&rep_id).unwrap(), (name, index));
			}
		}
	}

	#[test]
	fn test_timing_header() {
		let mut timing = Timing::start();
		timing.measure("init-gen", || {});

		let header = timing.header().to_str().unwrap().to_string();
		assert!(header.starts_with("init-gen;dur="), "{header}");
		assert!(header.contains("total;dur="), "{header}");
	}
}
