use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use sha1::{Digest, Sha1};
use tokio::io::AsyncReadExt;
use tokio::sync::Notify;

use crate::config::ConfigStore;

/// Default User-Agent for upstream requests, unless overridden by
/// global_headers or the caller.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36";

#[derive(thiserror::Error, Debug, Clone)]
pub enum FetchError {
	#[error("request failed: {0}")]
	Request(String),

	#[error("bad status: {0}")]
	Status(u16),

	#[error("cache io: {0}")]
	Io(String),
}

impl From<reqwest::Error> for FetchError {
	fn from(err: reqwest::Error) -> Self {
		FetchError::Request(err.to_string())
	}
}

impl From<std::io::Error> for FetchError {
	fn from(err: std::io::Error) -> Self {
		FetchError::Io(err.to_string())
	}
}

enum EntryState {
	/// A fetch is in flight; everyone else waits on `ready`.
	Pending,
	Ready { path: PathBuf, fetched_at: Instant },
	Failed(FetchError),
}

struct Entry {
	state: Mutex<EntryState>,
	ready: Notify,
	refs: AtomicI64,
}

impl Entry {
	fn new() -> Arc<Self> {
		Arc::new(Self {
			state: Mutex::new(EntryState::Pending),
			ready: Notify::new(),
			refs: AtomicI64::new(0),
		})
	}
}

/// A coalescing, TTL-bounded, disk-backed cache for upstream GETs.
///
/// At most one fetch per URL is in flight; concurrent callers wait for it
/// and then read the same file through independent handles. Entries stay
/// valid for the configured cache_duration and are swept once expired and
/// unreferenced.
pub struct Cache {
	config: Arc<ConfigStore>,
	client: reqwest::Client,
	entries: Mutex<HashMap<String, Arc<Entry>>>,
}

impl Cache {
	pub fn new(config: Arc<ConfigStore>, client: reqwest::Client) -> Arc<Self> {
		Arc::new(Self {
			config,
			client,
			entries: Mutex::new(HashMap::new()),
		})
	}

	/// Remove whatever a previous run left in the cache directory.
	pub fn clean_dir(&self) -> std::io::Result<()> {
		let dir = self.config.get().save_dir.clone();

		let entries = match std::fs::read_dir(&dir) {
			Ok(entries) => entries,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
			Err(err) => return Err(err),
		};

		for entry in entries.flatten() {
			if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
				let _ = std::fs::remove_file(entry.path());
			}
		}

		Ok(())
	}

	/// Fetch a URL, serving from the cache when fresh.
	pub async fn fetch(
		self: &Arc<Self>,
		url: &str,
		headers: Option<&HashMap<String, String>>,
	) -> Result<CachedBody, FetchError> {
		let ttl = self.config.get().cache_duration.get();

		loop {
			let (entry, fetcher) = self.claim(url, ttl);

			if fetcher {
				return self.fetch_and_store(url, headers, &entry).await;
			}

			// Register interest before re-checking the state, otherwise a
			// notify between the check and the await is lost.
			let notified = entry.ready.notified();
			tokio::pin!(notified);

			let ready = {
				let state = entry.state.lock().unwrap();
				match &*state {
					EntryState::Pending => None,
					EntryState::Ready { path, .. } => Some(path.clone()),
					EntryState::Failed(err) => return Err(err.clone()),
				}
			};
			if let Some(path) = ready {
				return self.open(&path, &entry).await;
			}

			notified.as_mut().await;

			let ready = {
				let state = entry.state.lock().unwrap();
				match &*state {
					// A refresh may have claimed the entry again; go around.
					EntryState::Pending => continue,
					EntryState::Ready { path, .. } => path.clone(),
					EntryState::Failed(err) => return Err(err.clone()),
				}
			};

			return self.open(&ready, &entry).await;
		}
	}

	/// Find or create the entry for a URL. Returns true when this caller
	/// is responsible for the upstream fetch.
	fn claim(self: &Arc<Self>, url: &str, ttl: Duration) -> (Arc<Entry>, bool) {
		let mut entries = self.entries.lock().unwrap();

		if let Some(entry) = entries.get(url).cloned() {
			let mut state = entry.state.lock().unwrap();
			match &*state {
				EntryState::Pending => {
					drop(state);
					(entry, false)
				}
				EntryState::Ready { path, fetched_at } => {
					if fetched_at.elapsed() < ttl {
						drop(state);
						return (entry, false);
					}

					// Expired: this caller refreshes, everyone else waits.
					let stale = path.clone();
					*state = EntryState::Pending;
					let _ = std::fs::remove_file(stale);
					drop(state);
					(entry, true)
				}
				// Failed entries are removed from the map before waiters
				// wake up, so a leftover means we raced; replace it.
				EntryState::Failed(_) => {
					drop(state);
					let entry = Entry::new();
					entries.insert(url.to_string(), entry.clone());
					(entry, true)
				}
			}
		} else {
			let entry = Entry::new();
			entries.insert(url.to_string(), entry.clone());
			(entry, true)
		}
	}

	async fn fetch_and_store(
		self: &Arc<Self>,
		url: &str,
		headers: Option<&HashMap<String, String>>,
		entry: &Arc<Entry>,
	) -> Result<CachedBody, FetchError> {
		match self.fetch_to_disk(url, headers).await {
			Ok(path) => {
				*entry.state.lock().unwrap() = EntryState::Ready {
					path: path.clone(),
					fetched_at: Instant::now(),
				};
				entry.ready.notify_waiters();

				self.open(&path, entry).await
			}
			Err(err) => {
				*entry.state.lock().unwrap() = EntryState::Failed(err.clone());

				// Drop the entry so the next caller retries, then wake the
				// current waiters into the error.
				self.entries.lock().unwrap().remove(url);
				entry.ready.notify_waiters();

				Err(err)
			}
		}
	}

	async fn fetch_to_disk(
		&self,
		url: &str,
		headers: Option<&HashMap<String, String>>,
	) -> Result<PathBuf, FetchError> {
		let config = self.config.get();

		tokio::fs::create_dir_all(&config.save_dir).await?;

		// Later layers replace earlier ones: defaults, then the process
		// wide overlay, then whatever the caller asked for.
		let mut merged = reqwest::header::HeaderMap::new();
		merged.insert(
			reqwest::header::USER_AGENT,
			reqwest::header::HeaderValue::from_static(DEFAULT_USER_AGENT),
		);

		let caller = headers.into_iter().flatten();
		for (name, value) in config.global_headers.iter().chain(caller) {
			let name = match reqwest::header::HeaderName::from_bytes(name.as_bytes()) {
				Ok(name) => name,
				Err(_) => {
					tracing::warn!(header = %name, "skipping invalid header name");
					continue;
				}
			};
			match reqwest::header::HeaderValue::from_str(value) {
				Ok(value) => {
					merged.insert(name, value);
				}
				Err(_) => tracing::warn!(header = %name, "skipping invalid header value"),
			}
		}

		let response = self.client.get(url).headers(merged).send().await?;
		if response.status() != reqwest::StatusCode::OK {
			return Err(FetchError::Status(response.status().as_u16()));
		}

		let path = config.save_dir.join(hash_url(url));
		let body = response.bytes().await?;

		match tokio::fs::write(&path, &body).await {
			Ok(()) => Ok(path),
			Err(err) => {
				let _ = tokio::fs::remove_file(&path).await;
				Err(err.into())
			}
		}
	}

	async fn open(&self, path: &std::path::Path, entry: &Arc<Entry>) -> Result<CachedBody, FetchError> {
		let file = tokio::fs::File::open(path).await?;

		entry.refs.fetch_add(1, Ordering::SeqCst);

		Ok(CachedBody {
			file,
			entry: entry.clone(),
		})
	}

	/// Periodically drop entries that have expired and are unreferenced.
	pub fn spawn_sweeper(self: &Arc<Self>) {
		let cache = self.clone();

		tokio::spawn(async move {
			loop {
				let ttl = cache.config.get().cache_duration.get();
				tokio::time::sleep(ttl).await;

				let mut entries = cache.entries.lock().unwrap();
				entries.retain(|_, entry| {
					if entry.refs.load(Ordering::SeqCst) > 0 {
						return true;
					}

					let state = entry.state.lock().unwrap();
					match &*state {
						EntryState::Ready { path, fetched_at } if fetched_at.elapsed() >= ttl => {
							let _ = std::fs::remove_file(path);
							false
						}
						_ => true,
					}
				});
			}
		});
	}
}

/// SHA-1 of the URL names the backing file. Collisions are treated as
/// impossible.
fn hash_url(url: &str) -> String {
	let mut hasher = Sha1::new();
	hasher.update(url.as_bytes());
	hex::encode(hasher.finalize())
}

/// An open handle onto a cached response body.
///
/// Holding one keeps the entry referenced so the sweeper leaves the
/// backing file alone.
pub struct CachedBody {
	file: tokio::fs::File,
	entry: Arc<Entry>,
}

impl CachedBody {
	pub async fn bytes(mut self) -> Result<Vec<u8>, FetchError> {
		let mut data = Vec::new();
		self.file.read_to_end(&mut data).await?;
		Ok(data)
	}

	pub async fn text(self) -> Result<String, FetchError> {
		let data = self.bytes().await?;
		String::from_utf8(data).map_err(|err| FetchError::Io(err.to_string()))
	}
}

impl Drop for CachedBody {
	fn drop(&mut self) {
		self.entry.refs.fetch_sub(1, Ordering::SeqCst);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{Config, JsonDuration};
	use std::sync::atomic::AtomicUsize;

	#[test]
	fn test_hash_url() {
		// Stable file names, hex encoded SHA-1.
		let hash = hash_url("https://example.com/manifest");
		assert_eq!(hash.len(), 40);
		assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
		assert_eq!(hash, hash_url("https://example.com/manifest"));
		assert_ne!(hash, hash_url("https://example.com/other"));
	}

	static DIR_SEQ: AtomicUsize = AtomicUsize::new(0);

	/// Spin up a throwaway origin that counts its hits.
	async fn origin() -> (String, Arc<AtomicUsize>) {
		let hits = Arc::new(AtomicUsize::new(0));

		let counter = hits.clone();
		let app = axum::Router::new()
			.route(
				"/body",
				axum::routing::get(move || {
					counter.fetch_add(1, Ordering::SeqCst);
					async { "upstream body" }
				}),
			)
			.route(
				"/missing",
				axum::routing::get(|| async { axum::http::StatusCode::NOT_FOUND }),
			);

		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});

		(format!("http://{addr}"), hits)
	}

	fn test_cache(ttl: Duration) -> Arc<Cache> {
		let seq = DIR_SEQ.fetch_add(1, Ordering::SeqCst);
		let dir = std::env::temp_dir().join(format!(
			"manifesto-cache-test-{}-{seq}",
			std::process::id()
		));

		let config = ConfigStore::with_config(Config {
			save_dir: dir,
			cache_duration: JsonDuration(ttl),
			..Default::default()
		});

		Cache::new(config, reqwest::Client::new())
	}

	#[tokio::test]
	async fn test_single_flight() {
		let (base, hits) = origin().await;
		let cache = test_cache(Duration::from_secs(60));
		let url = format!("{base}/body");

		let mut tasks = Vec::new();
		for _ in 0..8 {
			let cache = cache.clone();
			let url = url.clone();
			tasks.push(tokio::spawn(async move {
				cache.fetch(&url, None).await.unwrap().bytes().await.unwrap()
			}));
		}

		for task in tasks {
			assert_eq!(task.await.unwrap(), b"upstream body");
		}

		// All callers within the window observe exactly one fetch.
		assert_eq!(hits.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_ttl_boundary() {
		let (base, hits) = origin().await;
		let cache = test_cache(Duration::from_millis(50));
		let url = format!("{base}/body");

		cache.fetch(&url, None).await.unwrap().bytes().await.unwrap();
		assert_eq!(hits.load(Ordering::SeqCst), 1);

		// Still inside the window: served from disk.
		cache.fetch(&url, None).await.unwrap().bytes().await.unwrap();
		assert_eq!(hits.load(Ordering::SeqCst), 1);

		tokio::time::sleep(Duration::from_millis(80)).await;

		// Past the window: refreshed.
		cache.fetch(&url, None).await.unwrap().bytes().await.unwrap();
		assert_eq!(hits.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn test_non_200_not_cached() {
		let (base, _) = origin().await;
		let cache = test_cache(Duration::from_secs(60));
		let url = format!("{base}/missing");

		match cache.fetch(&url, None).await {
			Err(FetchError::Status(404)) => {}
			other => panic!("expected 404 error, got {other:?}"),
		}

		// The failure isn't cached; the entry is gone.
		assert!(cache.entries.lock().unwrap().is_empty());
	}
}
