//! Owned byte container and cursor reader shared by the `.4v`, `.set`, and
//! `.4q` parsers.
//!
//! Quartet files were authored on big-endian 68k hardware, so every
//! multi-byte field in every format this workspace parses is big-endian;
//! [`Reader`] only ever reads big-endian integers.

mod bin;
mod error;
mod reader;

pub use bin::Bin;
pub use error::ContainerError;
pub use reader::Reader;
