//! Top-level MP4 box headers

use serde::{Deserialize, Serialize};

use crate::error::{Result, SubtitleError};

/// Boxes the extractor never feeds to the engine
const FREE_SPACE: [&str; 3] = ["free", "skip", "wide"];

/// One top-level box of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Atom {
    /// Four-character tag, e.g. `moov`
    pub atom_type: String,
    /// Length in bytes, header included
    pub size: u64,
    /// Absolute offset of the first header byte
    pub pos: u64,
}

impl Atom {
    /// Offset of the first byte after this box
    pub fn end(&self) -> u64 {
        self.pos + self.size
    }

    pub fn is_media_data(&self) -> bool {
        self.atom_type == "mdat"
    }

    pub fn is_free_space(&self) -> bool {
        FREE_SPACE.contains(&self.atom_type.as_str())
    }
}

/// Result of indexing a remote file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mp4Metadata {
    /// Total file length from `Content-Length`
    pub size: u64,
    /// Contiguous, exhaustive list of top-level boxes
    pub atoms: Vec<Atom>,
}

impl Mp4Metadata {
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn find(&self, atom_type: &str) -> Option<&Atom> {
        self.atoms.iter().find(|atom| atom.atom_type == atom_type)
    }
}

/// Decoded box header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomHeader {
    pub atom_type: String,
    pub size: u64,
    /// 8, or 16 with a 64-bit size
    pub header_len: u64,
}

/// Decode the box header at the start of `buf`; `pos` is only used for errors
///
/// The 32-bit size is read as signed, so zero, negative values and values
/// below the header length are all rejected. A size of 1 means a 64-bit size
/// follows the tag.
pub fn parse_atom_header(buf: &[u8], pos: u64) -> Result<AtomHeader> {
    if buf.len() < 8 {
        return Err(SubtitleError::not_mp4(pos, "truncated box header"));
    }

    let size = i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let tag = &buf[4..8];

    if !tag.iter().all(|b| (0x20..=0x7e).contains(b)) {
        return Err(SubtitleError::not_mp4(pos, "box type is not ASCII"));
    }
    let atom_type = String::from_utf8_lossy(tag).into_owned();

    match size {
        1 => {
            let extended = buf
                .get(8..16)
                .ok_or_else(|| SubtitleError::not_mp4(pos, "truncated 64-bit box size"))?;
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(extended);
            let size = u64::from_be_bytes(bytes);
            if size < 16 {
                return Err(SubtitleError::not_mp4(pos, format!("64-bit box size {} below header length", size)));
            }
            Ok(AtomHeader {
                atom_type,
                size,
                header_len: 16,
            })
        }
        size if size <= 0 => Err(SubtitleError::not_mp4(pos, format!("non-positive box size {}", size))),
        size if size < 8 => Err(SubtitleError::not_mp4(pos, format!("box size {} below header length", size))),
        size => Ok(AtomHeader {
            atom_type,
            size: size as u64,
            header_len: 8,
        }),
    }
}
