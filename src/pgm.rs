//! PGM (Netpbm graymap) reading and writing.
//!
//! ## Supported Formats
//!
//! - **P2** (ASCII): whitespace-separated decimal samples
//! - **P5** (binary): 1 byte per sample when `max_val <= 255`, otherwise
//!   2 bytes big-endian
//!
//! Header fields may be separated by any whitespace and interleaved with
//! `#` comments running to the end of the line.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::FilterError;
use crate::grid::PixelGrid;

/// Largest `max_val` a PGM header can carry.
pub const PGM_MAX_VAL: i32 = 65535;

/// Errors raised while reading or writing PGM files.
#[derive(Debug, Error)]
pub enum PgmError {
    #[error("failed to access '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported magic number {0:?}, expected P2 or P5")]
    BadMagic(String),

    #[error("malformed header: {0}")]
    BadHeader(String),

    #[error("invalid sample {0:?}")]
    BadSample(String),

    #[error("raster holds {found} samples, expected {expected}")]
    Truncated { expected: usize, found: usize },

    #[error(transparent)]
    Grid(#[from] FilterError),
}

pub type Result<T> = std::result::Result<T, PgmError>;

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PgmFormat {
    /// P2
    #[default]
    Ascii,
    /// P5
    Binary,
}

// ============================================================================
// Reading
// ============================================================================

/// Byte cursor over a PGM file.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    /// Skip whitespace and `#` comments.
    fn skip_blank(&mut self) {
        while let Some(&b) = self.data.get(self.pos) {
            if b == b'#' {
                while let Some(&c) = self.data.get(self.pos) {
                    self.pos += 1;
                    if c == b'\n' {
                        break;
                    }
                }
            } else if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Next whitespace-delimited token, comments skipped.
    fn token(&mut self) -> Option<&'a str> {
        self.skip_blank();
        let start = self.pos;
        while let Some(&b) = self.data.get(self.pos) {
            if b.is_ascii_whitespace() || b == b'#' {
                break;
            }
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        std::str::from_utf8(&self.data[start..self.pos]).ok()
    }

    fn header_field(&mut self, name: &str) -> Result<usize> {
        let token = self
            .token()
            .ok_or_else(|| PgmError::BadHeader(format!("missing {}", name)))?;
        token
            .parse()
            .map_err(|_| PgmError::BadHeader(format!("{} {:?} is not a number", name, token)))
    }

    fn rest(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }
}

/// Parse a PGM image from memory.
pub fn decode(data: &[u8]) -> Result<PixelGrid> {
    let mut cursor = Cursor::new(data);
    let magic = cursor.token().unwrap_or_default();
    let binary = match magic {
        "P2" => false,
        "P5" => true,
        other => return Err(PgmError::BadMagic(other.to_string())),
    };

    let width = cursor.header_field("width")?;
    let height = cursor.header_field("height")?;
    let max_val = cursor.header_field("max value")?;
    if max_val == 0 || max_val > PGM_MAX_VAL as usize {
        return Err(PgmError::BadHeader(format!("max value {} out of range", max_val)));
    }
    let max_val = max_val as i32;
    let expected = width
        .checked_mul(height)
        .ok_or_else(|| PgmError::BadHeader(format!("size {}x{} overflows", width, height)))?;

    let pixels = if binary {
        // Exactly one whitespace byte separates the header from the raster
        cursor.pos += 1;
        let raster = cursor.rest();
        let bytes_per_sample = if max_val > 255 { 2 } else { 1 };
        let found = raster.len() / bytes_per_sample;
        if found < expected {
            return Err(PgmError::Truncated { expected, found });
        }
        raster
            .chunks_exact(bytes_per_sample)
            .take(expected)
            .map(|c| match c {
                [hi, lo] => i32::from(u16::from_be_bytes([*hi, *lo])),
                [b] => i32::from(*b),
                _ => 0,
            })
            .collect()
    } else {
        // Each ASCII sample takes at least two bytes, so the input bounds the reservation
        let mut pixels = Vec::with_capacity(expected.min(cursor.rest().len() / 2 + 1));
        while pixels.len() < expected {
            match cursor.token() {
                Some(tok) => pixels.push(
                    tok.parse::<i32>()
                        .map_err(|_| PgmError::BadSample(tok.to_string()))?,
                ),
                None => {
                    return Err(PgmError::Truncated {
                        expected,
                        found: pixels.len(),
                    })
                }
            }
        }
        pixels
    };

    Ok(PixelGrid::from_vec(width, height, max_val, pixels)?)
}

/// Read a PGM file.
pub fn read(path: &Path) -> Result<PixelGrid> {
    let data = fs::read(path).map_err(|e| PgmError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let grid = decode(&data)?;
    log::info!(
        "read '{}': {}x{}, max {}",
        path.display(),
        grid.width(),
        grid.height(),
        grid.max_val()
    );
    Ok(grid)
}

// ============================================================================
// Writing
// ============================================================================

/// Serialize a grid.
///
/// P2 writes samples verbatim. P5 clamps samples into `[0, max_val]`. The
/// header max value is at least 1.
pub fn encode(grid: &PixelGrid, format: PgmFormat) -> Vec<u8> {
    let max_val = grid.max_val().clamp(1, PGM_MAX_VAL);

    match format {
        PgmFormat::Ascii => {
            let mut out = format!("P2\n{} {}\n{}\n", grid.width(), grid.height(), max_val);
            for row in grid.pixels().rows() {
                let line: Vec<String> = row.iter().map(|p| p.to_string()).collect();
                out.push_str(&line.join(" "));
                out.push('\n');
            }
            out.into_bytes()
        }
        PgmFormat::Binary => {
            let mut out =
                format!("P5\n{} {}\n{}\n", grid.width(), grid.height(), max_val).into_bytes();
            let wide = max_val > 255;
            for &p in grid.pixels().iter() {
                let v = p.clamp(0, max_val) as u16;
                if wide {
                    out.extend_from_slice(&v.to_be_bytes());
                } else {
                    out.push(v as u8);
                }
            }
            out
        }
    }
}

/// Write a grid to a PGM file.
pub fn write(grid: &PixelGrid, path: &Path, format: PgmFormat) -> Result<()> {
    fs::write(path, encode(grid, format)).map_err(|e| PgmError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    log::info!("wrote '{}' ({:?})", path.display(), format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ascii_with_comments() {
        let text = b"P2\n# created by hand\n3 2 # size\n255\n0 1 2\n# mid-raster\n3 4 255\n";
        let grid = decode(text).unwrap();
        assert_eq!(grid.dims(), (3, 2));
        assert_eq!(grid.max_val(), 255);
        assert_eq!(grid.to_vec(), vec![0, 1, 2, 3, 4, 255]);
    }

    #[test]
    fn test_decode_binary() {
        let mut data = b"P5\n2 2\n255\n".to_vec();
        data.extend_from_slice(&[0, 10, 32, 255]);
        let grid = decode(&data).unwrap();
        assert_eq!(grid.to_vec(), vec![0, 10, 32, 255]);
    }

    #[test]
    fn test_decode_binary_wide() {
        let mut data = b"P5 2 1 1000\n".to_vec();
        data.extend_from_slice(&[0x03, 0xE8, 0x00, 0x07]);
        assert_eq!(decode(&data).unwrap().to_vec(), vec![1000, 7]);
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(decode(b"P6\n1 1\n255\n"), Err(PgmError::BadMagic(_))));
        assert!(matches!(decode(b"P2\nx 1\n255\n"), Err(PgmError::BadHeader(_))));
        assert!(matches!(
            decode(b"P2\n2 2\n255\n1 2 3"),
            Err(PgmError::Truncated { expected: 4, found: 3 })
        ));
        assert!(matches!(decode(b"P2\n1 1\n255\nabc"), Err(PgmError::BadSample(_))));
        assert!(matches!(decode(b"P2\n0 1\n255\n"), Err(PgmError::Grid(_))));
    }

    #[test]
    fn test_decode_oversized_header_is_truncated() {
        let err = decode(b"P2\n200000 200000\n255\n1 2 3\n").unwrap_err();
        assert!(matches!(err, PgmError::Truncated { found: 3, .. }));

        let mut data = b"P5\n200000 200000\n255\n".to_vec();
        data.extend_from_slice(&[1, 2, 3]);
        assert!(matches!(decode(&data), Err(PgmError::Truncated { found: 3, .. })));
    }

    #[test]
    fn test_decode_size_overflow() {
        let header = format!("P2\n{} 2\n255\n0 0\n", usize::MAX);
        assert!(matches!(decode(header.as_bytes()), Err(PgmError::BadHeader(_))));
    }

    #[test]
    fn test_encode_ascii_verbatim() {
        let grid = PixelGrid::from_vec(2, 2, 0, vec![-3, 0, 7, 300]).unwrap();
        let text = String::from_utf8(encode(&grid, PgmFormat::Ascii)).unwrap();
        assert_eq!(text, "P2\n2 2\n1\n-3 0\n7 300\n");
    }

    #[test]
    fn test_encode_binary_clamps() {
        let grid = PixelGrid::from_vec(3, 1, 200, vec![-5, 100, 250]).unwrap();
        let data = encode(&grid, PgmFormat::Binary);
        assert_eq!(&data[data.len() - 3..], &[0, 100, 200]);
        assert_eq!(decode(&data).unwrap().to_vec(), vec![0, 100, 200]);
    }
}
