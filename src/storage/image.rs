//! DatabaseImage file checks
//!
//! The on-disk image is a standard SQLite database file. Its layout is
//! opaque here except for the 16-byte header, which is enough to tell a
//! complete image from garbage or a truncated copy.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Magic string at offset 0 of every SQLite database file
pub const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// Smallest valid image: one page of the smallest SQLite page size
pub const MIN_IMAGE_SIZE: u64 = 512;

/// Why a file is not a usable image
#[derive(Debug)]
pub enum ImageDefect {
    /// No file at the path
    Missing,
    /// File shorter than the minimum image size
    TooSmall { size: u64, min: u64 },
    /// File size differs from the number of bytes written
    SizeMismatch { size: u64, expected: u64 },
    /// First bytes are not the SQLite header
    BadHeader,
    /// File could not be read
    Io(io::Error),
}

impl fmt::Display for ImageDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageDefect::Missing => write!(f, "file does not exist"),
            ImageDefect::TooSmall { size, min } => {
                write!(f, "file is {} bytes, expected at least {}", size, min)
            }
            ImageDefect::SizeMismatch { size, expected } => {
                write!(f, "file is {} bytes, expected exactly {}", size, expected)
            }
            ImageDefect::BadHeader => write!(f, "file does not start with the SQLite header"),
            ImageDefect::Io(e) => write!(f, "file could not be read: {}", e),
        }
    }
}

impl std::error::Error for ImageDefect {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImageDefect::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Checks existence, minimum size and header. Returns the file size.
pub fn verify_image(path: &Path) -> Result<u64, ImageDefect> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ImageDefect::Missing),
        Err(e) => return Err(ImageDefect::Io(e)),
    };

    let size = file.metadata().map_err(ImageDefect::Io)?.len();
    if size < MIN_IMAGE_SIZE {
        return Err(ImageDefect::TooSmall {
            size,
            min: MIN_IMAGE_SIZE,
        });
    }

    let mut header = [0u8; 16];
    file.read_exact(&mut header).map_err(ImageDefect::Io)?;
    if &header != SQLITE_HEADER {
        return Err(ImageDefect::BadHeader);
    }

    Ok(size)
}

/// Reads the whole image back and checks it has exactly `expected` bytes.
pub fn read_back(path: &Path, expected: u64) -> Result<(), ImageDefect> {
    let bytes = std::fs::read(path).map_err(ImageDefect::Io)?;
    if bytes.len() as u64 != expected {
        return Err(ImageDefect::SizeMismatch {
            size: bytes.len() as u64,
            expected,
        });
    }
    if bytes.len() < SQLITE_HEADER.len() || &bytes[..SQLITE_HEADER.len()] != SQLITE_HEADER {
        return Err(ImageDefect::BadHeader);
    }
    Ok(())
}
