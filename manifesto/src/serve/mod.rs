pub mod handlers;
pub mod log;
mod tls;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::{ConnectInfo, Path, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::config::{Channel, ConfigStore};
use crate::error::ServeError;
use crate::fetch::Cache;

/// Shared state handed to every request handler.
pub struct AppState {
	pub config: Arc<ConfigStore>,
	pub cache: Arc<Cache>,
	pub log: log::RequestLog,
}

/// Grace period for in-flight responses on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Build the route table. When users are configured every route requires
/// a token prefix; the split is decided at startup, like the rest of the
/// listener setup.
pub fn router(state: Arc<AppState>) -> Router {
	let with_auth = !state.config.get().users.is_empty();

	let routes = match with_auth {
		true => Router::new()
			.route(
				"/{token}/stream/{group}/{channel}/manifest.mpd",
				get(manifest_auth),
			)
			.route(
				"/{token}/stream/{group}/{channel}/{quality}/init.mp4",
				get(init_auth),
			)
			.route(
				"/{token}/stream/{group}/{channel}/{quality}/{time}/{*rest}",
				get(segment_auth),
			),
		false => Router::new()
			.route("/stream/{group}/{channel}/manifest.mpd", get(manifest))
			.route(
				"/stream/{group}/{channel}/{quality}/init.mp4",
				get(init),
			)
			.route(
				"/stream/{group}/{channel}/{quality}/{time}/{*rest}",
				get(segment),
			),
	};

	routes
		.fallback(not_found)
		.layer(middleware::from_fn_with_state(state.clone(), log_request))
		.layer(middleware::from_fn(powered_by))
		.layer(CorsLayer::new().allow_origin(Any))
		.with_state(state)
}

async fn powered_by(request: Request, next: Next) -> Response {
	let mut response = next.run(request).await;
	response
		.headers_mut()
		.insert("x-powered-by", HeaderValue::from_static("manifesto"));
	response
}

/// Log the request line: client IP, user (when authenticated), redacted
/// path and user agent.
async fn log_request(
	State(state): State<Arc<AppState>>,
	ConnectInfo(addr): ConnectInfo<SocketAddr>,
	request: Request,
	next: Next,
) -> Response {
	let config = state.config.get();

	let mut path = request.uri().path().to_string();
	let mut user_info = String::new();

	if !config.users.is_empty() {
		let token = path.split('/').nth(1).unwrap_or_default().to_string();
		if !token.is_empty() {
			if let Some(user) = config.user_by_token(&token) {
				user_info = format!(" user={}", user.username);
			}
			path = path.replacen(&token, "***", 1);
		}
	}

	let agent = request
		.headers()
		.get(header::USER_AGENT)
		.and_then(|v| v.to_str().ok())
		.unwrap_or_default()
		.to_string();

	state.log.submit(format!(
		"IP={}{} path={:?} user-agent={:?}",
		addr.ip(),
		user_info,
		path,
		agent
	));

	next.run(request).await
}

/// Unmatched paths are 404, or 204 when the instance prefers to stay
/// quiet about what it serves.
async fn not_found(State(state): State<Arc<AppState>>) -> StatusCode {
	match state.config.get().hide_not_found {
		true => StatusCode::NO_CONTENT,
		false => StatusCode::NOT_FOUND,
	}
}

fn authorize(state: &AppState, token: &str) -> Result<(), Response> {
	match state.config.get().user_by_token(token) {
		Some(_) => Ok(()),
		None => Err((StatusCode::UNAUTHORIZED, "Unauthorized").into_response()),
	}
}

fn resolve_channel(state: &AppState, group: &str, channel: &str) -> Result<Channel, ServeError> {
	state
		.config
		.get()
		.channel(group, channel)
		.cloned()
		.ok_or(ServeError::ChannelNotFound)
}

async fn manifest(
	State(state): State<Arc<AppState>>,
	Path((group, channel)): Path<(String, String)>,
) -> Response {
	match resolve_channel(&state, &group, &channel) {
		Ok(channel) => handlers::serve_manifest(&state, &channel)
			.await
			.unwrap_or_else(IntoResponse::into_response),
		Err(err) => err.into_response(),
	}
}

async fn manifest_auth(
	State(state): State<Arc<AppState>>,
	Path((token, group, channel)): Path<(String, String, String)>,
) -> Response {
	if let Err(response) = authorize(&state, &token) {
		return response;
	}

	manifest(State(state), Path((group, channel))).await
}

async fn init(
	State(state): State<Arc<AppState>>,
	Path((group, channel, quality)): Path<(String, String, String)>,
) -> Response {
	match resolve_channel(&state, &group, &channel) {
		Ok(channel) => handlers::serve_init(&state, &channel, &quality)
			.await
			.unwrap_or_else(IntoResponse::into_response),
		Err(err) => err.into_response(),
	}
}

async fn init_auth(
	State(state): State<Arc<AppState>>,
	Path((token, group, channel, quality)): Path<(String, String, String, String)>,
) -> Response {
	if let Err(response) = authorize(&state, &token) {
		return response;
	}

	init(State(state), Path((group, channel, quality))).await
}

async fn segment(
	State(state): State<Arc<AppState>>,
	Path((group, channel, quality, time, rest)): Path<(String, String, String, String, String)>,
) -> Response {
	match resolve_channel(&state, &group, &channel) {
		Ok(channel) => handlers::serve_segment(&state, &channel, &quality, &time, &rest)
			.await
			.unwrap_or_else(IntoResponse::into_response),
		Err(err) => err.into_response(),
	}
}

async fn segment_auth(
	State(state): State<Arc<AppState>>,
	Path((token, group, channel, quality, time, rest)): Path<(
		String,
		String,
		String,
		String,
		String,
		String,
	)>,
) -> Response {
	if let Err(response) = authorize(&state, &token) {
		return response;
	}

	segment(State(state), Path((group, channel, quality, time, rest))).await
}

/// Run the configured listeners until a shutdown signal arrives, then
/// drain in-flight requests for up to the grace period.
pub async fn run(state: Arc<AppState>) -> anyhow::Result<()> {
	let config = state.config.get();
	let app = router(state.clone());

	let handle = hyper_serve::Handle::new();
	tokio::spawn(shutdown_signal(handle.clone()));

	let mut servers = Vec::new();

	if config.http_port != 0 {
		let addr: SocketAddr = format!("{}:{}", config.bind_addr, config.http_port)
			.parse()
			.context("invalid bind address")?;

		let server = hyper_serve::bind(addr)
			.handle(handle.clone())
			.serve(app.clone().into_make_service_with_connect_info::<SocketAddr>());

		tracing::info!(%addr, "manifesto listening on HTTP");
		servers.push(tokio::spawn(server));
	} else {
		tracing::info!("HTTP listener disabled");
	}

	if config.https_port != 0 {
		let addr: SocketAddr = format!("{}:{}", config.bind_addr, config.https_port)
			.parse()
			.context("invalid bind address")?;

		let tls = tls::server_config(&config)?;
		let rustls_config = hyper_serve::tls_rustls::RustlsConfig::from_config(Arc::new(tls));

		let server = hyper_serve::bind_rustls(addr, rustls_config)
			.handle(handle.clone())
			.serve(app.into_make_service_with_connect_info::<SocketAddr>());

		tracing::info!(%addr, "manifesto listening on HTTPS");
		servers.push(tokio::spawn(server));
	} else {
		tracing::info!("HTTPS listener disabled");
	}

	anyhow::ensure!(!servers.is_empty(), "no listeners configured");

	for server in servers {
		server.await?.context("server error")?;
	}

	tracing::info!("all listeners shut down cleanly");

	Ok(())
}

async fn shutdown_signal(handle: hyper_serve::Handle) {
	let ctrl_c = async {
		tokio::signal::ctrl_c().await.ok();
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(_) => std::future::pending().await,
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {}
		_ = terminate => {}
	}

	tracing::info!("shutting down");
	handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}
