use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};

use anyhow::Context;
use serde::Deserialize;

/// Root configuration, loaded from a JSON file.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
	/// Port for the plain HTTP listener. 0 disables it.
	pub http_port: u16,
	/// Port for the TLS listener. 0 disables it.
	pub https_port: u16,
	/// Address to bind the listeners to.
	pub bind_addr: String,
	/// Directory for transient cache files. Emptied on startup.
	pub save_dir: PathBuf,
	/// Whether to include text adaptation sets in generated manifests.
	/// Some players choke on stpp subtitles, hence the toggle.
	pub allow_subs: bool,
	/// Return 204 instead of 404 on unmatched paths.
	pub hide_not_found: bool,
	/// How long upstream responses are reused, e.g. "3s".
	pub cache_duration: JsonDuration,
	/// Append-only request log. Empty logs to stdout only.
	pub log_path: String,
	/// Headers applied to every upstream request. Caller headers win.
	pub global_headers: HashMap<String, String>,
	pub http_proxy: String,
	pub https_proxy: String,
	pub no_proxy: String,
	/// Skip upstream certificate verification.
	pub tls_client_insecure: bool,
	/// Per-SNI certificates, required when https_port is set.
	pub tls_domain_map: Vec<TlsDomain>,
	/// CN for the self-signed fallback certificate served to unknown SNI.
	pub bogus_domain: String,
	/// When non-empty, every route requires a token path prefix.
	pub users: Vec<User>,
	/// Channels, keyed by group id.
	pub channels: HashMap<String, Vec<Channel>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TlsDomain {
	pub domain: String,
	pub cert: PathBuf,
	pub key: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
	pub username: String,
	pub token: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Channel {
	/// Identifies the channel in URLs.
	pub id: String,
	/// Reserved; "ism" is the only recognized value.
	pub source_type: String,
	/// Reserved; "mpd" is the only recognized value.
	pub destination_type: String,
	/// Display name.
	pub name: String,
	/// Upstream manifest URL.
	pub url: String,
	/// "{kid_hex}:{key_hex}" pairs, 16 bytes each. Empty means no
	/// decryption is attempted.
	pub keys: Vec<String>,
}

impl Channel {
	/// Look up the content key for a key id. `Ok(None)` means the channel
	/// has no keys configured at all.
	pub fn key(&self, kid: &[u8; 16]) -> anyhow::Result<Option<[u8; 16]>> {
		for raw in &self.keys {
			let (parsed_kid, parsed_key) = parse_key(raw)?;
			if &parsed_kid == kid {
				return Ok(Some(parsed_key));
			}
		}

		match self.keys.is_empty() {
			true => Ok(None),
			false => anyhow::bail!("key not found"),
		}
	}

	pub fn has_keys(&self) -> bool {
		!self.keys.is_empty()
	}
}

fn parse_key(raw: &str) -> anyhow::Result<([u8; 16], [u8; 16])> {
	let (kid, key) = raw.split_once(':').context("expected 'kid:key'")?;

	let kid: [u8; 16] = hex::decode(kid)
		.context("invalid key id hex")?
		.try_into()
		.ok()
		.context("key id must be 16 bytes")?;

	let key: [u8; 16] = hex::decode(key)
		.context("invalid key hex")?
		.try_into()
		.ok()
		.context("key must be 16 bytes")?;

	Ok((kid, key))
}

/// A duration deserialized from a Go-style string like "3s" or "1m30s".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonDuration(pub Duration);

impl JsonDuration {
	pub fn get(&self) -> Duration {
		self.0
	}
}

impl<'de> Deserialize<'de> for JsonDuration {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;
		parse_duration(&raw)
			.map(JsonDuration)
			.ok_or_else(|| serde::de::Error::custom(format!("invalid duration: {raw:?}")))
	}
}

fn parse_duration(raw: &str) -> Option<Duration> {
	let mut total = Duration::ZERO;
	let mut rest = raw.trim();

	if rest.is_empty() {
		return None;
	}

	while !rest.is_empty() {
		let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.').len();
		if digits == 0 {
			return None;
		}

		let value: f64 = rest[..digits].parse().ok()?;
		rest = &rest[digits..];

		let unit = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()).len();
		let scale = match &rest[..unit] {
			"ns" => 1e-9,
			"us" => 1e-6,
			"ms" => 1e-3,
			"s" => 1.0,
			"m" => 60.0,
			"h" => 3600.0,
			_ => return None,
		};
		rest = &rest[unit..];

		total += Duration::from_secs_f64(value * scale);
	}

	Some(total)
}

fn validate(config: &Config) -> anyhow::Result<()> {
	if config.http_port == 0 && config.https_port == 0 {
		anyhow::bail!("at least one of http_port and https_port must be set");
	}
	if config.bind_addr.is_empty() {
		anyhow::bail!("bind_addr cannot be empty");
	}
	if config.save_dir.as_os_str().is_empty() {
		anyhow::bail!("save_dir cannot be empty");
	}
	if config.cache_duration.get().is_zero() {
		anyhow::bail!("cache_duration must be greater than 0");
	}
	if config.https_port != 0 && config.tls_domain_map.is_empty() {
		anyhow::bail!("tls_domain_map is required when https_port is set");
	}

	for (group, channels) in &config.channels {
		for channel in channels {
			if channel.id.is_empty() || channel.url.is_empty() {
				anyhow::bail!("channel in group {group:?} is missing id or url");
			}
			for key in &channel.keys {
				parse_key(key).with_context(|| format!("channel {:?}", channel.id))?;
			}
		}
	}

	Ok(())
}

/// The process-wide configuration snapshot.
///
/// Readers grab an Arc at operation start; reloads swap the Arc so
/// in-flight requests keep a consistent view.
pub struct ConfigStore {
	path: PathBuf,
	current: RwLock<Arc<Config>>,
}

impl ConfigStore {
	pub fn load(path: &Path) -> anyhow::Result<Arc<Self>> {
		let config = read_config(path)?;

		Ok(Arc::new(Self {
			path: path.to_path_buf(),
			current: RwLock::new(Arc::new(config)),
		}))
	}

	pub fn get(&self) -> Arc<Config> {
		self.current.read().unwrap().clone()
	}

	#[cfg(test)]
	pub(crate) fn with_config(config: Config) -> Arc<Self> {
		Arc::new(Self {
			path: PathBuf::new(),
			current: RwLock::new(Arc::new(config)),
		})
	}

	fn reload(&self) -> anyhow::Result<()> {
		let config = read_config(&self.path)?;
		*self.current.write().unwrap() = Arc::new(config);
		tracing::info!("config reloaded");
		Ok(())
	}

	/// Watch the config file for changes and reload it.
	///
	/// The file is polled for its modification time; a change is followed
	/// by a short debounce and a few retries to tolerate non-atomic
	/// writes.
	pub fn watch(self: &Arc<Self>) {
		let store = self.clone();

		tokio::spawn(async move {
			let mut last = modified(&store.path);
			let mut ticker = tokio::time::interval(Duration::from_secs(1));
			ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

			loop {
				ticker.tick().await;

				let now = modified(&store.path);
				if now == last {
					continue;
				}
				last = now;

				tokio::time::sleep(Duration::from_millis(200)).await;

				for attempt in 0..3 {
					match store.reload() {
						Ok(()) => break,
						Err(err) if attempt == 2 => {
							tracing::warn!(%err, "config reload failed");
						}
						Err(_) => tokio::time::sleep(Duration::from_millis(100)).await,
					}
				}
			}
		});
	}
}

fn modified(path: &Path) -> Option<SystemTime> {
	std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn read_config(path: &Path) -> anyhow::Result<Config> {
	let file = std::fs::File::open(path)
		.with_context(|| format!("failed to open config file {}", path.display()))?;

	let config: Config = serde_json::from_reader(file).context("failed to decode config file")?;
	validate(&config)?;

	Ok(config)
}

impl Config {
	pub fn channel(&self, group: &str, id: &str) -> Option<&Channel> {
		self.channels.get(group)?.iter().find(|c| c.id == id)
	}

	pub fn user_by_token(&self, token: &str) -> Option<&User> {
		self.users.iter().find(|u| u.token == token)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_duration() {
		assert_eq!(parse_duration("3s"), Some(Duration::from_secs(3)));
		assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
		assert_eq!(parse_duration("1m30s"), Some(Duration::from_secs(90)));
		assert_eq!(parse_duration("1.5s"), Some(Duration::from_millis(1500)));
		assert_eq!(parse_duration(""), None);
		assert_eq!(parse_duration("3"), None);
		assert_eq!(parse_duration("s"), None);
	}

	#[test]
	fn test_channel_keys() {
		let channel = Channel {
			keys: vec![format!("{}:{}", "00".repeat(16), "11".repeat(16))],
			..Default::default()
		};

		let hit = channel.key(&[0u8; 16]).unwrap();
		assert_eq!(hit, Some([0x11u8; 16]));

		assert!(channel.key(&[9u8; 16]).is_err());

		let empty = Channel::default();
		assert_eq!(empty.key(&[0u8; 16]).unwrap(), None);
	}

	#[test]
	fn test_config_decode() {
		let raw = r#"{
			"http_port": 8080,
			"bind_addr": "127.0.0.1",
			"save_dir": "/tmp/manifesto",
			"cache_duration": "3s",
			"allow_subs": true,
			"channels": {
				"tv": [
					{"id": "one", "source_type": "ism", "destination_type": "mpd",
					 "name": "Channel One", "url": "https://example.com/one.ism/Manifest"}
				]
			}
		}"#;

		let config: Config = serde_json::from_str(raw).unwrap();
		validate(&config).unwrap();

		assert_eq!(config.cache_duration.get(), Duration::from_secs(3));
		assert!(config.channel("tv", "one").is_some());
		assert!(config.channel("tv", "two").is_none());
		assert!(config.channel("radio", "one").is_none());
	}
}
