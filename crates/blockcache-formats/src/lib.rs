//! Binary codecs for the block cache file formats
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_possible_wrap)] // Intentional for binary operations
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::doc_markdown)] // Format names don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::similar_names)] // Domain-specific naming patterns
#![allow(clippy::return_self_not_must_use)] // Builder patterns
#![allow(clippy::use_self)] // Type clarity
//! This crate holds the pure, in-memory side of the cache: everything that
//! turns bytes into structured values and back, without touching the disk.
//!
//! # Supported Formats
//!
//! - **Container**: Archive of named sub-files with per-entry and whole-body
//!   compression
//! - **Item definitions**: Opcode-tagged attribute records stored as the
//!   `obj.idx`/`obj.dat` pair of the config archive
//! - **Compression**: Headerless bzip2 as used by both of the above
//! - **Medium integers**: The 24-bit big-endian integers used throughout
//!
//! # Design Principles
//!
//! - **Symmetric Operations**: Every format can be parsed and built
//! - **Round-Trip Guarantee**: parse(build(data)) == data
//! - **Permissive Where the Client Is**: Damage that the game client
//!   tolerates is reported as a warning, not an error

#![warn(missing_docs)]

pub mod compression;
pub mod container;
pub mod item;
pub mod medium;

pub use compression::{CompressionError, CompressionResult};
pub use container::{Container, ContainerError, ContainerResult, OuterCompression};
pub use item::{FemaleModelLayout, ItemArchive, ItemDefinition, ItemError, ItemResult};
