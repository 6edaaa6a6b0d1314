mod aac;
mod avc;
mod ec3;

pub use aac::*;
pub use avc::*;
pub use ec3::*;

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
	#[error("invalid hex: {0}")]
	Hex(#[from] hex::FromHexError),

	#[error("malformed codec private data: {0}")]
	Malformed(&'static str),
}
