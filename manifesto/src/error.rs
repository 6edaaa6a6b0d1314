use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::codec::CodecError;
use crate::drm::DrmError;
use crate::fetch::FetchError;
use crate::mss::MssError;
use crate::segment::DecryptError;
use crate::segment::TtmlError;

/// Everything that can go wrong while answering a stream request.
///
/// The variants map onto HTTP statuses: client-caused input problems are
/// 400, unknown channels are 404, everything upstream/crypto/parsing is
/// a 500.
#[derive(thiserror::Error, Debug)]
pub enum ServeError {
	#[error("bad request: {0}")]
	Input(String),

	#[error("channel not found")]
	ChannelNotFound,

	#[error("unsupported codec: {0}")]
	UnsupportedCodec(String),

	#[error("{0}")]
	Mss(#[from] MssError),

	#[error("codec private data: {0}")]
	Codec(#[from] CodecError),

	#[error("drm: {0}")]
	Drm(#[from] DrmError),

	#[error("upstream: {0}")]
	Upstream(#[from] FetchError),

	#[error("mp4: {0}")]
	Mp4(#[from] fmp4::Error),

	#[error("ttml: {0}")]
	Ttml(#[from] TtmlError),

	#[error("decrypt: {0}")]
	Crypto(#[from] DecryptError),

	#[error("manifest encode: {0}")]
	Encode(String),
}

impl ServeError {
	pub fn status(&self) -> StatusCode {
		match self {
			ServeError::Input(_) => StatusCode::BAD_REQUEST,
			ServeError::ChannelNotFound => StatusCode::NOT_FOUND,
			ServeError::UnsupportedCodec(_) => StatusCode::BAD_REQUEST,
			// Asking for a stream or quality the manifest doesn't have is
			// the client's fault; a manifest we can't parse is ours.
			ServeError::Mss(err) => match err {
				MssError::UnknownStream(_) | MssError::UnknownQuality(_) => StatusCode::BAD_REQUEST,
				_ => StatusCode::INTERNAL_SERVER_ERROR,
			},
			ServeError::Codec(_)
			| ServeError::Drm(_)
			| ServeError::Upstream(_)
			| ServeError::Mp4(_)
			| ServeError::Ttml(_)
			| ServeError::Crypto(_)
			| ServeError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for ServeError {
	fn into_response(self) -> Response {
		let status = self.status();
		if status.is_server_error() {
			tracing::error!(error = %self, "request failed");
		}

		(status, self.to_string()).into_response()
	}
}
