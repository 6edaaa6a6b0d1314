use aes::cipher::{KeyIvInit, StreamCipher};
use aes::Aes128;
use fmp4::Fragment;

type Ctr64 = ctr::Ctr64BE<Aes128>;
type Ctr128 = ctr::Ctr128BE<Aes128>;

/// Everything needed to CENC-decrypt media fragments of one track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptInfo {
	pub kid: [u8; 16],
	pub key: [u8; 16],
	/// Size of the per-sample IVs in the senc box, 8 or 16.
	pub iv_size: u8,
}

#[derive(thiserror::Error, Debug)]
pub enum DecryptError {
	#[error("fragment has no sample encryption box")]
	MissingSenc,

	#[error("unsupported IV size: {0}")]
	IvSize(usize),

	#[error("sample encryption data: {0}")]
	Senc(#[from] fmp4::Error),

	#[error("sample data out of bounds")]
	SampleBounds,

	#[error("sample count mismatch between trun and senc")]
	SampleCount,
}

/// Decrypt one fragment in place, consuming its sample encryption boxes.
///
/// Must run after the track id rewrite so the emitted fragment is
/// consistent: the senc/saiz/saio boxes are removed and the payload
/// replaced with cleartext.
pub fn decrypt_fragment(fragment: &mut Fragment, info: &DecryptInfo) -> Result<(), DecryptError> {
	// MSS fragments carry a single traf; walk them all regardless.
	for traf in &mut fragment.moof.traf {
		let senc = traf.senc.take().ok_or(DecryptError::MissingSenc)?;
		traf.saiz = None;
		traf.saio = None;

		let samples = senc.samples(info.iv_size)?;

		let sizes = sample_sizes(traf);
		if sizes.len() != samples.len() {
			return Err(DecryptError::SampleCount);
		}

		let mut offset = 0usize;
		for (sample, size) in samples.iter().zip(sizes) {
			let size = size as usize;
			let data = fragment
				.mdat
				.data
				.get_mut(offset..offset + size)
				.ok_or(DecryptError::SampleBounds)?;

			decrypt_sample(data, &sample.iv, &sample.subsamples, &info.key)?;
			offset += size;
		}
	}

	Ok(())
}

fn sample_sizes(traf: &fmp4::Traf) -> Vec<u32> {
	let default = traf.tfhd.default_sample_size.unwrap_or(0);

	traf.trun
		.iter()
		.flat_map(|trun| trun.entries.iter().map(move |e| e.size.unwrap_or(default)))
		.collect()
}

/// AES-CTR over the protected ranges of one sample. The keystream is
/// continuous across subsamples; clear bytes don't consume it.
fn decrypt_sample(
	data: &mut [u8],
	iv: &[u8],
	subsamples: &[fmp4::SencSubsample],
	key: &[u8; 16],
) -> Result<(), DecryptError> {
	let mut counter = [0u8; 16];
	let mut cipher: CtrCipher = match iv.len() {
		8 => {
			counter[..8].copy_from_slice(iv);
			CtrCipher::C64(Ctr64::new(key.into(), &counter.into()))
		}
		16 => {
			counter.copy_from_slice(iv);
			CtrCipher::C128(Ctr128::new(key.into(), &counter.into()))
		}
		size => return Err(DecryptError::IvSize(size)),
	};

	if subsamples.is_empty() {
		cipher.apply(data);
		return Ok(());
	}

	let mut pos = 0usize;
	for sub in subsamples {
		pos += sub.clear as usize;
		let end = pos + sub.protected as usize;
		let range = data.get_mut(pos..end).ok_or(DecryptError::SampleBounds)?;
		cipher.apply(range);
		pos = end;
	}

	Ok(())
}

enum CtrCipher {
	C64(Ctr64),
	C128(Ctr128),
}

impl CtrCipher {
	fn apply(&mut self, data: &mut [u8]) {
		match self {
			CtrCipher::C64(c) => c.apply_keystream(data),
			CtrCipher::C128(c) => c.apply_keystream(data),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use fmp4::{Encode, Mdat, Mfhd, Moof, Senc, Tfhd, Traf, Trun, TrunEntry};

	fn encrypt(plain: &[u8], key: &[u8; 16], iv8: &[u8; 8]) -> Vec<u8> {
		let mut counter = [0u8; 16];
		counter[..8].copy_from_slice(iv8);
		let mut cipher = Ctr64::new(key.into(), &counter.into());

		let mut data = plain.to_vec();
		cipher.apply_keystream(&mut data);
		data
	}

	fn protected_fragment(payload: Vec<u8>, senc_data: Vec<u8>, sizes: &[u32]) -> Fragment {
		Fragment {
			moof: Moof {
				mfhd: Mfhd { sequence_number: 1 },
				traf: vec![Traf {
					tfhd: Tfhd {
						track_id: 1,
						..Default::default()
					},
					trun: vec![Trun {
						data_offset: Some(0),
						entries: sizes
							.iter()
							.map(|&size| TrunEntry {
								size: Some(size),
								..Default::default()
							})
							.collect(),
					}],
					senc: Some(Senc {
						subsamples: false,
						data: senc_data,
					}),
					..Default::default()
				}],
			},
			mdat: Mdat { data: payload },
		}
	}

	#[test]
	fn test_full_sample_decrypt() {
		let key = [0x42u8; 16];
		let iv = [7u8; 8];
		let plain = b"the quick brown fox jumps over the lazy dog";

		let mut senc_data = Vec::new();
		1u32.encode(&mut senc_data).unwrap();
		iv.encode(&mut senc_data).unwrap();

		let mut fragment = protected_fragment(
			encrypt(plain, &key, &iv),
			senc_data,
			&[plain.len() as u32],
		);

		let info = DecryptInfo {
			kid: [0u8; 16],
			key,
			iv_size: 8,
		};
		decrypt_fragment(&mut fragment, &info).unwrap();

		assert_eq!(fragment.mdat.data, plain);
		assert!(fragment.moof.traf[0].senc.is_none());
	}

	#[test]
	fn test_missing_senc() {
		let mut fragment = protected_fragment(vec![0u8; 4], vec![], &[4]);
		fragment.moof.traf[0].senc = None;

		let info = DecryptInfo {
			kid: [0u8; 16],
			key: [0u8; 16],
			iv_size: 8,
		};

		assert!(matches!(
			decrypt_fragment(&mut fragment, &info),
			Err(DecryptError::MissingSenc)
		));
	}

	#[test]
	fn test_sample_count_mismatch() {
		let mut senc_data = Vec::new();
		2u32.encode(&mut senc_data).unwrap();
		[1u8; 8].encode(&mut senc_data).unwrap();
		[2u8; 8].encode(&mut senc_data).unwrap();

		let mut fragment = protected_fragment(vec![0u8; 4], senc_data, &[4]);

		let info = DecryptInfo {
			kid: [0u8; 16],
			key: [0u8; 16],
			iv_size: 8,
		};

		assert!(matches!(
			decrypt_fragment(&mut fragment, &info),
			Err(DecryptError::SampleCount)
		));
	}
}
