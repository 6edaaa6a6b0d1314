use std::collections::HashMap;
use std::fs;
use std::io::{self, Cursor, Read};
use std::sync::Arc;

use anyhow::Context;
use rustls::crypto::ring::sign::any_supported_type;
use rustls::pki_types::{CertificateDer, PrivatePkcs8KeyDer};
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;

use crate::config::Config;

/// Per-SNI certificate selection with a self-signed fallback.
///
/// Clients asking for a configured domain get its certificate; everyone
/// else gets a throwaway cert for the bogus domain, so the handshake
/// never reveals which hostnames are actually served.
#[derive(Debug)]
struct ServeCerts {
	certs: HashMap<String, Arc<CertifiedKey>>,
	fallback: Arc<CertifiedKey>,
}

impl ResolvesServerCert for ServeCerts {
	fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
		if let Some(name) = client_hello.server_name() {
			if let Some(cert) = self.certs.get(&name.to_lowercase()) {
				return Some(cert.clone());
			}
		}

		Some(self.fallback.clone())
	}
}

/// Build the rustls server configuration from the configured domain map.
pub fn server_config(config: &Config) -> anyhow::Result<rustls::ServerConfig> {
	let mut certs = HashMap::new();

	for entry in &config.tls_domain_map {
		let cert = load_certified_key(&entry.cert, &entry.key)
			.with_context(|| format!("failed to load TLS certificate for {}", entry.domain))?;
		certs.insert(entry.domain.to_lowercase(), Arc::new(cert));
	}

	let bogus_domain = match config.bogus_domain.is_empty() {
		true => "localhost",
		false => &config.bogus_domain,
	};
	let fallback = Arc::new(generate_self_signed(bogus_domain)?);

	let provider = Arc::new(rustls::crypto::ring::default_provider());
	let mut tls = rustls::ServerConfig::builder_with_provider(provider)
		.with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])?
		.with_no_client_auth()
		.with_cert_resolver(Arc::new(ServeCerts { certs, fallback }));

	tls.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

	Ok(tls)
}

fn load_certified_key(
	cert_path: &std::path::Path,
	key_path: &std::path::Path,
) -> anyhow::Result<CertifiedKey> {
	let chain = fs::File::open(cert_path).context("failed to open cert file")?;
	let mut chain = io::BufReader::new(chain);

	let chain: Vec<CertificateDer> = rustls_pemfile::certs(&mut chain)
		.collect::<Result<_, _>>()
		.context("failed to read certs")?;

	anyhow::ensure!(!chain.is_empty(), "could not find certificate");

	let mut keys = fs::File::open(key_path).context("failed to open key file")?;

	let mut buf = Vec::new();
	keys.read_to_end(&mut buf)?;

	let key = rustls_pemfile::private_key(&mut Cursor::new(&buf))?.context("missing private key")?;
	let key = any_supported_type(&key)?;

	Ok(CertifiedKey::new(chain, key))
}

/// A short-lived self-signed certificate for unknown SNI.
fn generate_self_signed(domain: &str) -> anyhow::Result<CertifiedKey> {
	let key_pair = rcgen::KeyPair::generate()?;

	let mut params = rcgen::CertificateParams::new(vec![domain.to_string()])?;
	params
		.distinguished_name
		.push(rcgen::DnType::CommonName, domain);
	params.not_before = time::OffsetDateTime::now_utc() - time::Duration::days(1);
	params.not_after = time::OffsetDateTime::now_utc() + time::Duration::days(1);

	let cert = params.self_signed(&key_pair)?;

	let key = PrivatePkcs8KeyDer::from(key_pair.serialized_der());
	let key = any_supported_type(&key.into())?;

	Ok(CertifiedKey::new(vec![cert.into()], key))
}
