//! Compact single-line encoding of obstacle layouts.
//!
//! A layout code looks like `haunt:v1:<columns>x<rows>:<payload>`, where the
//! payload is unpadded base64 over the obstacle bits packed row-major, least
//! significant bit first.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use glam::Vec3;
use maze_haunt_core::GridSpec;
use thiserror::Error;

const CODE_DOMAIN: &str = "haunt";
const CODE_VERSION: &str = "v1";
const FIELD_DELIMITER: char = ':';

/// Tile marking an obstacle in ASCII layouts.
pub(crate) const WALL_TILE: char = '#';
/// Tile marking a walkable cell in ASCII layouts.
pub(crate) const FLOOR_TILE: char = '.';

/// Reasons a layout code or ASCII layout was rejected.
#[derive(Debug, Error)]
pub(crate) enum LayoutCodeError {
    /// The provided string was empty or contained only whitespace.
    #[error("layout code was empty")]
    EmptyPayload,
    /// A colon-separated field was missing.
    #[error("layout code is missing the {0}")]
    MissingField(&'static str),
    /// The code did not start with the expected domain.
    #[error("layout prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The code used an unknown version.
    #[error("layout version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed or were zero.
    #[error("could not parse grid dimensions '{0}'")]
    InvalidDimensions(String),
    /// The payload was not valid base64.
    #[error("could not decode layout payload: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    /// The payload length did not match the dimensions.
    #[error("layout payload holds {actual} bytes, expected {expected}")]
    PayloadLength {
        /// Bytes required by the dimensions.
        expected: usize,
        /// Bytes actually decoded.
        actual: usize,
    },
    /// ASCII rows had different widths.
    #[error("layout row {row} has {actual} tiles, expected {expected}")]
    RaggedRow {
        /// Offending row.
        row: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        actual: usize,
    },
    /// An ASCII row contained a character other than `#` or `.`.
    #[error("unknown tile '{tile}' at column {column} of row {row}")]
    UnknownTile {
        /// Row of the tile.
        row: usize,
        /// Column of the tile.
        column: usize,
        /// Unrecognised character.
        tile: char,
    },
}

/// Row-major obstacle flags for a rectangular grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ObstacleMask {
    columns: u32,
    rows: u32,
    blocked: Vec<bool>,
}

impl ObstacleMask {
    /// Parses ASCII rows of `#` (obstacle) and `.` (floor); row 0 comes first.
    pub(crate) fn from_rows<S: AsRef<str>>(lines: &[S]) -> Result<Self, LayoutCodeError> {
        let Some(first) = lines.first() else {
            return Err(LayoutCodeError::InvalidDimensions("0x0".to_owned()));
        };
        let width = first.as_ref().chars().count();
        if width == 0 {
            return Err(LayoutCodeError::InvalidDimensions(format!(
                "0x{}",
                lines.len()
            )));
        }

        let mut blocked = Vec::with_capacity(width * lines.len());
        for (row, line) in lines.iter().enumerate() {
            let line = line.as_ref();
            let actual = line.chars().count();
            if actual != width {
                return Err(LayoutCodeError::RaggedRow {
                    row,
                    expected: width,
                    actual,
                });
            }
            for (column, tile) in line.chars().enumerate() {
                match tile {
                    WALL_TILE => blocked.push(true),
                    FLOOR_TILE => blocked.push(false),
                    tile => return Err(LayoutCodeError::UnknownTile { row, column, tile }),
                }
            }
        }

        Ok(Self {
            columns: dimension(width)?,
            rows: dimension(lines.len())?,
            blocked,
        })
    }

    /// Number of columns.
    pub(crate) const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows.
    pub(crate) const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the cell is an obstacle; out-of-range cells are open.
    pub(crate) fn is_blocked(&self, column: u32, row: u32) -> bool {
        if column >= self.columns || row >= self.rows {
            return false;
        }
        let index = row as usize * self.columns as usize + column as usize;
        self.blocked.get(index).copied().unwrap_or(false)
    }

    /// Obstacle query for a grid laid out by `spec`: maps a probe point back to its cell.
    pub(crate) fn blocks(&self, spec: &GridSpec, probe: Vec3) -> bool {
        let column = ((probe.x - spec.origin.x) / spec.cell_size).floor();
        let row = ((probe.z - spec.origin.z) / spec.cell_size).floor();
        if column < 0.0 || row < 0.0 {
            return false;
        }
        self.is_blocked(column as u32, row as u32)
    }

    /// Renders the mask back into ASCII rows.
    pub(crate) fn to_rows(&self) -> Vec<String> {
        (0..self.rows)
            .map(|row| {
                (0..self.columns)
                    .map(|column| {
                        if self.is_blocked(column, row) {
                            WALL_TILE
                        } else {
                            FLOOR_TILE
                        }
                    })
                    .collect()
            })
            .collect()
    }

    /// Encodes the mask into a single-line layout code.
    pub(crate) fn encode(&self) -> String {
        let mut bytes = vec![0_u8; self.blocked.len().div_ceil(8)];
        for (index, _) in self.blocked.iter().enumerate().filter(|(_, blocked)| **blocked) {
            bytes[index / 8] |= 1 << (index % 8);
        }
        let payload = STANDARD_NO_PAD.encode(bytes);
        format!(
            "{CODE_DOMAIN}:{CODE_VERSION}:{}x{}:{payload}",
            self.columns, self.rows
        )
    }

    /// Decodes a layout code produced by [`ObstacleMask::encode`].
    pub(crate) fn decode(value: &str) -> Result<Self, LayoutCodeError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LayoutCodeError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(LayoutCodeError::MissingField("prefix"))?;
        let version = parts
            .next()
            .ok_or(LayoutCodeError::MissingField("version"))?;
        let dimensions = parts
            .next()
            .ok_or(LayoutCodeError::MissingField("grid dimensions"))?;
        let payload = parts
            .next()
            .ok_or(LayoutCodeError::MissingField("payload"))?;

        if domain != CODE_DOMAIN {
            return Err(LayoutCodeError::InvalidPrefix(domain.to_owned()));
        }
        if version != CODE_VERSION {
            return Err(LayoutCodeError::UnsupportedVersion(version.to_owned()));
        }

        let (columns, rows) = parse_dimensions(dimensions)?;
        let cells = columns as usize * rows as usize;
        let bytes = STANDARD_NO_PAD.decode(payload.as_bytes())?;
        let expected = cells.div_ceil(8);
        if bytes.len() != expected {
            return Err(LayoutCodeError::PayloadLength {
                expected,
                actual: bytes.len(),
            });
        }

        let blocked = (0..cells)
            .map(|index| bytes[index / 8] & (1 << (index % 8)) != 0)
            .collect();
        Ok(Self {
            columns,
            rows,
            blocked,
        })
    }
}

fn dimension(value: usize) -> Result<u32, LayoutCodeError> {
    u32::try_from(value).map_err(|_| LayoutCodeError::InvalidDimensions(value.to_string()))
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), LayoutCodeError> {
    let invalid = || LayoutCodeError::InvalidDimensions(dimensions.to_owned());
    let (columns, rows) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;

    let columns = columns.trim().parse::<u32>().map_err(|_| invalid())?;
    let rows = rows.trim().parse::<u32>().map_err(|_| invalid())?;

    if columns == 0 || rows == 0 {
        return Err(invalid());
    }

    Ok((columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAZE: [&str; 3] = ["#..#.", ".#...", "....#"];

    #[test]
    fn code_carries_header_and_dimensions() {
        let mask = ObstacleMask::from_rows(&MAZE).expect("valid rows");

        let code = mask.encode();

        assert!(code.starts_with("haunt:v1:5x3:"));
        assert_eq!(ObstacleMask::decode(&code).expect("decodes"), mask);
        assert_eq!(mask.to_rows(), MAZE.map(str::to_owned).to_vec());
    }

    #[test]
    fn bits_are_packed_row_major_lsb_first() {
        let mask = ObstacleMask::from_rows(&["#.......", ".#......"]).expect("valid rows");
        let code = mask.encode();
        let payload = code.rsplit(':').next().expect("payload");

        let bytes = STANDARD_NO_PAD.decode(payload).expect("base64");
        assert_eq!(bytes, vec![0b0000_0001, 0b0000_0010]);
    }

    #[test]
    fn rejects_malformed_codes() {
        assert!(matches!(
            ObstacleMask::decode("   "),
            Err(LayoutCodeError::EmptyPayload)
        ));
        assert!(matches!(
            ObstacleMask::decode("maze:v1:2x2:AA"),
            Err(LayoutCodeError::InvalidPrefix(prefix)) if prefix == "maze"
        ));
        assert!(matches!(
            ObstacleMask::decode("haunt:v2:2x2:AA"),
            Err(LayoutCodeError::UnsupportedVersion(_))
        ));
        assert!(matches!(
            ObstacleMask::decode("haunt:v1:0x2:AA"),
            Err(LayoutCodeError::InvalidDimensions(_))
        ));
        assert!(matches!(
            ObstacleMask::decode("haunt:v1:4x4"),
            Err(LayoutCodeError::MissingField("payload"))
        ));
        assert!(matches!(
            ObstacleMask::decode("haunt:v1:4x4:AA"),
            Err(LayoutCodeError::PayloadLength {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn rejects_malformed_rows() {
        assert!(matches!(
            ObstacleMask::from_rows(&["...", ".."]),
            Err(LayoutCodeError::RaggedRow { row: 1, .. })
        ));
        assert!(matches!(
            ObstacleMask::from_rows(&["..x"]),
            Err(LayoutCodeError::UnknownTile {
                row: 0,
                column: 2,
                tile: 'x'
            })
        ));
        assert!(ObstacleMask::from_rows::<&str>(&[]).is_err());
    }

    #[test]
    fn probes_map_back_to_cells() {
        let mask = ObstacleMask::from_rows(&MAZE).expect("valid rows");
        let spec = GridSpec::new(3, 5, 2.0, Vec3::new(10.0, 0.0, -4.0));

        assert!(mask.blocks(&spec, Vec3::new(11.0, 10.0, -3.0)));
        assert!(!mask.blocks(&spec, Vec3::new(13.0, 10.0, -3.0)));
        assert!(mask.blocks(&spec, Vec3::new(13.0, 10.0, -1.0)));
        assert!(!mask.blocks(&spec, Vec3::new(0.0, 10.0, 0.0)));
    }
}
