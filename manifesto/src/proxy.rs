use std::time::Duration;

use crate::config::Config;

/// Build the shared upstream HTTP client, honoring the configured proxy
/// selection and TLS settings.
pub fn build_client(config: &Config) -> reqwest::Result<reqwest::Client> {
	let mut builder = reqwest::Client::builder()
		.pool_max_idle_per_host(10)
		.pool_idle_timeout(Duration::from_secs(30))
		.connect_timeout(Duration::from_secs(10));

	if config.tls_client_insecure {
		builder = builder.danger_accept_invalid_certs(true);
	}

	if !config.http_proxy.is_empty() || !config.https_proxy.is_empty() {
		let http_proxy = config.http_proxy.clone();
		let https_proxy = config.https_proxy.clone();
		let no_proxy = config.no_proxy.clone();

		let proxy = reqwest::Proxy::custom(move |url| {
			let host = url.host_str().unwrap_or_default();

			if should_bypass(host, &no_proxy) {
				return None;
			}

			match url.scheme() {
				"http" if !http_proxy.is_empty() => url::Url::parse(&http_proxy).ok(),
				"https" if !https_proxy.is_empty() => url::Url::parse(&https_proxy).ok(),
				_ => None,
			}
		});

		builder = builder.proxy(proxy);
	}

	builder.build()
}

/// Check the no_proxy list for the given host. Entries may be "*", an
/// exact host, or a ".suffix" domain match.
fn should_bypass(host: &str, no_proxy: &str) -> bool {
	for entry in no_proxy.split(&[',', ':'][..]) {
		let entry = entry.trim();
		if entry.is_empty() {
			continue;
		}
		if entry == "*" || host == entry {
			return true;
		}
		if entry.starts_with('.') && host.ends_with(entry) {
			return true;
		}
	}

	false
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_should_bypass() {
		assert!(should_bypass("anything.example.com", "*"));
		assert!(should_bypass("cdn.example.com", ".example.com"));
		assert!(should_bypass("exact.host", "other.host,exact.host"));
		assert!(!should_bypass("example.com", ".example.com"));
		assert!(!should_bypass("example.com", ""));
	}
}
