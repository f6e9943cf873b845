//! Sub-file naming
//!
//! Containers never store names. An entry is addressed by a 32-bit hash of
//! its upper-cased name, so lookups by name go through [`name_hash`].

use serde::{Deserialize, Serialize};

/// Hash a sub-file name to its container id.
///
/// The name is upper-cased with full Unicode case mapping, then folded over
/// its UTF-16 code units as `acc * 61 + (unit - 32)`, seeded at zero, with
/// 32-bit two's-complement wrapping. Names differing only in case hash
/// identically, including non-ASCII letters.
pub fn name_hash(name: &str) -> i32 {
    name.to_uppercase().encode_utf16().fold(0i32, |acc, unit| {
        acc.wrapping_mul(61)
            .wrapping_add(i32::from(unit))
            .wrapping_sub(32)
    })
}

/// Well-known containers stored in the archive channel (channel 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ArchiveId {
    /// Title screen fonts and images
    Title = 1,
    /// Definition tables, including `obj.idx`/`obj.dat`
    Config = 2,
    /// Interface layouts
    Interface = 3,
    /// 2D media sprites
    Media = 4,
    /// Per-file version and CRC lists
    VersionList = 5,
    /// Textures
    Texture = 6,
    /// Chat filter word lists
    WordEnc = 7,
    /// Sound effects
    Sound = 8,
}

impl ArchiveId {
    /// All archive ids in record order.
    pub const ALL: [Self; 8] = [
        Self::Title,
        Self::Config,
        Self::Interface,
        Self::Media,
        Self::VersionList,
        Self::Texture,
        Self::WordEnc,
        Self::Sound,
    ];

    /// Record id of this container within the archive channel.
    pub const fn record_id(self) -> u32 {
        self as u32
    }

    /// Look up an archive id by record id.
    pub fn from_record_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.record_id() == id)
    }
}
