//! # fmp4
//!
//! Encoding and decoding for the subset of the ISO Base Media File Format
//! (ISO/IEC 14496-12) that fragmented streaming touches: init segments
//! (`ftyp` + `moov`), media fragments (`moof` + `mdat`), segment indexes
//! (`sidx`) and the Common Encryption boxes (`pssh`, `senc`, `tenc`, ...).
//!
//! The library is deliberately low level. It performs binary
//! encoding/decoding without validation or interpretation of the data;
//! you have to know what boxes to expect.
//!
//! ## Atoms
//! MP4 files are made up of atoms, which are boxes of data with an upfront
//! size and a FourCC code identifying the type, ex. [Moov], [Mdat], [Trak].
//!
//! The simplest way to decode is [Any::decode], returning any supported
//! atom in a giant enum. For encoding you call encode on the atom
//! directly, ex. [Moov::encode].
//!
//! ## Traits
//! - [Atom] is primarily used for encoding/decoding but also provides
//!   [Atom::KIND].
//! - [Decode], [DecodeMaybe], [DecodeAtom] and [Encode] operate on
//!   contiguous byte slices via [Buf] and [BufMut].
//!
//! ## Segments
//! Two thin views sit on top of the raw atoms: [InitSegment] for
//! `ftyp`+`moov` pairs and [FragmentedFile] for `moof`+`mdat` runs. The
//! latter recomputes `trun` data offsets on encode, since rewriting a
//! fragment invalidates whatever offsets the origin produced.

mod any;
mod atom;
mod atom_ext;
mod buf;
mod coding;
mod error;
mod file;
mod ftyp;
mod header;
mod mdat;
mod moof;
mod moov;
mod pssh;
mod sidx;
mod styp;
mod types;

pub use any::*;
pub use atom::*;
pub(crate) use atom_ext::*;
pub use buf::*;
pub use coding::*;
pub use error::*;
pub use file::*;
pub use ftyp::*;
pub use header::*;
pub use mdat::*;
pub use moof::*;
pub use moov::*;
pub use pssh::*;
pub use sidx::*;
pub use styp::*;
pub use types::*;
