use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::ConfigStore;

/// How often the log path is re-checked for rotation.
const ROTATE_POLL: Duration = Duration::from_secs(10);

/// Handle for submitting request log lines.
///
/// Lines flow through a bounded channel; when it is full they are
/// dropped with a note on stderr rather than blocking the request.
#[derive(Clone)]
pub struct RequestLog {
	tx: mpsc::Sender<String>,
}

impl RequestLog {
	pub fn submit(&self, line: String) {
		if self.tx.try_send(line).is_err() {
			eprintln!("log channel full, dropping log");
		}
	}
}

/// Spawn the log worker. It mirrors every line to stdout and appends to
/// the configured log file, reopening it when the path changes.
pub fn start(config: Arc<ConfigStore>) -> (RequestLog, JoinHandle<()>) {
	let (tx, mut rx) = mpsc::channel::<String>(1000);

	let worker = tokio::spawn(async move {
		let mut ticker = tokio::time::interval(ROTATE_POLL);
		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

		let mut current_path = String::new();
		let mut current_file: Option<File> = None;

		loop {
			tokio::select! {
				line = rx.recv() => {
					let Some(line) = line else {
						// All senders gone; flush and exit.
						flush(&mut current_file);
						return;
					};

					tracing::info!(target: "manifesto::request", "{line}");

					if let Some(file) = &mut current_file {
						let stamp = chrono::Local::now().format("%Y/%m/%d %H:%M:%S");
						if let Err(err) = writeln!(file, "{stamp} {line}") {
							tracing::warn!(%err, "failed to write log file");
						}
					}
				}
				_ = ticker.tick() => {
					let path = config.get().log_path.clone();
					if path != current_path {
						flush(&mut current_file);
						current_file = open_log(&path);
						current_path = path;
					}
				}
			}
		}
	});

	(RequestLog { tx }, worker)
}

fn open_log(path: &str) -> Option<File> {
	if path.is_empty() {
		return None;
	}

	if let Some(parent) = Path::new(path).parent() {
		let _ = std::fs::create_dir_all(parent);
	}

	match OpenOptions::new().append(true).create(true).open(path) {
		Ok(file) => Some(file),
		Err(err) => {
			tracing::warn!(%err, path, "could not open log file");
			None
		}
	}
}

fn flush(file: &mut Option<File>) {
	if let Some(file) = file.take() {
		let _ = file.sync_all();
	}
}
