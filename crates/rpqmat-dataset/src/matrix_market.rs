//! Reader for matrix-market coordinate files.
//!
//! Accepted input:
//!
//! ```text
//! %%MatrixMarket matrix coordinate pattern general
//! % comment
//! 4 4 3
//! 1 2
//! 2 3
//! 3 4
//! ```
//!
//! - field `pattern`, `integer`, `real` or `double`; values are checked to
//!   parse but otherwise ignored, so every listed coordinate is an edge
//!   (a stored `0` included)
//! - symmetry `general` or `symmetric` (off-diagonal entries are mirrored)
//! - the `%%MatrixMarket` banner is optional; without it the file is read as
//!   a `pattern general` edge list
//!
//! Coordinates are 1-based on disk and 0-based in [`CoordinateMatrix`].

use std::fs;
use std::path::Path;

use rpqmat_sparse::{BoolMatrix, Index, MatrixError};
use serde::Serialize;

use crate::error::{DatasetError, MatrixMarketError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Pattern,
    Integer,
    Real,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Self::Pattern => "pattern",
            Self::Integer => "integer",
            Self::Real => "real",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Symmetry {
    General,
    Symmetric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Header {
    pub field: Field,
    pub symmetry: Symmetry,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            field: Field::Pattern,
            symmetry: Symmetry::General,
        }
    }
}

/// Nonzero coordinates of a boolean matrix, 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoordinateMatrix {
    pub nrows: Index,
    pub ncols: Index,
    pub rows: Vec<Index>,
    pub cols: Vec<Index>,
}

impl CoordinateMatrix {
    /// Stored coordinates, duplicates included.
    pub fn nvals(&self) -> usize {
        self.rows.len()
    }

    pub fn into_bool_matrix(self) -> Result<BoolMatrix, MatrixError> {
        BoolMatrix::from_coordinates(self.nrows, self.ncols, &self.rows, &self.cols)
    }
}

/// Read and parse `path`.
pub fn read_matrix_market(path: &Path) -> Result<CoordinateMatrix, DatasetError> {
    let text = fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_matrix_market(&text).map_err(|source| DatasetError::MatrixMarket {
        path: path.to_path_buf(),
        source,
    })
}

/// Read `path` straight into a [`BoolMatrix`].
pub fn read_bool_matrix(path: &Path) -> Result<BoolMatrix, DatasetError> {
    read_matrix_market(path)?
        .into_bool_matrix()
        .map_err(|source| DatasetError::Matrix {
            path: path.to_path_buf(),
            source,
        })
}

pub fn parse_matrix_market(text: &str) -> Result<CoordinateMatrix, MatrixMarketError> {
    let mut header = Header::default();
    let mut size: Option<(Index, Index, u64)> = None;
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut entries = 0u64;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();

        if let Some(banner) = line.strip_prefix("%%") {
            if size.is_none() && rows.is_empty() {
                header = parse_banner(banner).map_err(|message| MatrixMarketError::Line {
                    line: line_no,
                    message,
                })?;
            }
            continue;
        }
        if line.is_empty() || line.starts_with('%') {
            continue;
        }

        let Some((nrows, ncols, _)) = size else {
            let parsed = parse_size(line, header).map_err(|message| MatrixMarketError::Line {
                line: line_no,
                message,
            })?;
            size = Some(parsed);
            continue;
        };

        entries += 1;
        let (row, col) = parse_entry(line, header.field, nrows, ncols).map_err(|message| {
            MatrixMarketError::Line {
                line: line_no,
                message,
            }
        })?;
        rows.push(row);
        cols.push(col);
        if header.symmetry == Symmetry::Symmetric && row != col {
            rows.push(col);
            cols.push(row);
        }
    }

    let (nrows, ncols, expected) = size.ok_or(MatrixMarketError::MissingSize)?;
    if entries != expected {
        return Err(MatrixMarketError::EntryCount {
            expected,
            found: entries,
        });
    }

    Ok(CoordinateMatrix {
        nrows,
        ncols,
        rows,
        cols,
    })
}

fn parse_banner(banner: &str) -> Result<Header, String> {
    let tokens: Vec<String> = banner
        .split_whitespace()
        .map(|t| t.to_ascii_lowercase())
        .collect();
    let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();

    match tokens.as_slice() {
        ["matrixmarket", "matrix", "coordinate", field, symmetry] => {
            let field = match *field {
                "pattern" => Field::Pattern,
                "integer" => Field::Integer,
                "real" | "double" => Field::Real,
                other => return Err(format!("unsupported field `{other}`")),
            };
            let symmetry = match *symmetry {
                "general" => Symmetry::General,
                "symmetric" => Symmetry::Symmetric,
                other => return Err(format!("unsupported symmetry `{other}`")),
            };
            Ok(Header { field, symmetry })
        }
        ["matrixmarket", "matrix", format, ..] if *format != "coordinate" => {
            Err(format!("unsupported format `{format}` (only `coordinate`)"))
        }
        _ => Err(format!("malformed banner `%%{}`", banner.trim())),
    }
}

fn parse_size(line: &str, header: Header) -> Result<(Index, Index, u64), String> {
    let mut tokens = line.split_whitespace();
    let mut next = |what: &str| -> Result<u64, String> {
        let token = tokens
            .next()
            .ok_or_else(|| format!("size line is missing {what}"))?;
        token
            .parse::<u64>()
            .map_err(|_| format!("invalid {what} `{token}`"))
    };
    let nrows = to_index(next("row count")?, "row count")?;
    let ncols = to_index(next("column count")?, "column count")?;
    let nnz = next("entry count")?;

    if header.symmetry == Symmetry::Symmetric && nrows != ncols {
        return Err(format!("symmetric matrix must be square, got {nrows}x{ncols}"));
    }
    Ok((nrows, ncols, nnz))
}

fn parse_entry(
    line: &str,
    field: Field,
    nrows: Index,
    ncols: Index,
) -> Result<(Index, Index), String> {
    let mut tokens = line.split_whitespace();
    let row = parse_coordinate(tokens.next(), "row", nrows)?;
    let col = parse_coordinate(tokens.next(), "column", ncols)?;

    let value = match field {
        Field::Pattern => return Ok((row, col)),
        Field::Integer | Field::Real => tokens
            .next()
            .ok_or_else(|| "entry is missing its value".to_string())?,
    };
    let valid = match field {
        Field::Integer => value.parse::<i64>().is_ok(),
        _ => value.parse::<f64>().is_ok(),
    };
    if !valid {
        return Err(format!("invalid {} value `{value}`", field.name()));
    }
    Ok((row, col))
}

fn parse_coordinate(token: Option<&str>, what: &str, bound: Index) -> Result<Index, String> {
    let token = token.ok_or_else(|| format!("entry is missing its {what}"))?;
    let value: u64 = token
        .parse()
        .map_err(|_| format!("invalid {what} `{token}`"))?;
    if value == 0 || value > u64::from(bound) {
        return Err(format!("{what} {value} outside 1..={bound}"));
    }
    to_index(value - 1, what)
}

fn to_index(value: u64, what: &str) -> Result<Index, String> {
    Index::try_from(value).map_err(|_| format!("{what} {value} does not fit a 32-bit index"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pattern_general() {
        let text = "%%MatrixMarket matrix coordinate pattern general\n\
                    % edges of label 3\n\
                    4 5 3\n\
                    1 2\n\
                    2 3\n\
                    4 5\n";
        let m = parse_matrix_market(text).unwrap();
        assert_eq!((m.nrows, m.ncols), (4, 5));
        assert_eq!(m.rows, vec![0, 1, 3]);
        assert_eq!(m.cols, vec![1, 2, 4]);
    }

    #[test]
    fn banner_is_optional() {
        let m = parse_matrix_market("2 2 1\n2 1\n").unwrap();
        assert_eq!((m.rows.as_slice(), m.cols.as_slice()), (&[1][..], &[0][..]));
    }

    #[test]
    fn symmetric_entries_are_mirrored() {
        let text = "%%MatrixMarket matrix coordinate pattern symmetric\n3 3 2\n2 1\n3 3\n";
        let m = parse_matrix_market(text).unwrap();
        let pairs: Vec<_> = m.rows.iter().copied().zip(m.cols.iter().copied()).collect();
        assert_eq!(pairs, vec![(1, 0), (0, 1), (2, 2)]);
    }

    #[test]
    fn zero_values_are_still_edges() {
        let text = "%%MatrixMarket matrix coordinate real general\n2 2 3\n1 1 1.5\n1 2 0.0\n2 2 -2\n";
        let m = parse_matrix_market(text).unwrap();
        assert_eq!(m.rows, vec![0, 0, 1]);
        assert_eq!(m.cols, vec![0, 1, 1]);

        let text = "%%MatrixMarket matrix coordinate integer general\n2 2 2\n1 2 0\n2 1 7\n";
        let m = parse_matrix_market(text).unwrap();
        assert_eq!((m.rows, m.cols), (vec![0, 1], vec![1, 0]));
    }

    #[test]
    fn values_must_parse() {
        let text = "%%MatrixMarket matrix coordinate integer general\n2 2 1\n1 2 1.5\n";
        assert_eq!(
            parse_matrix_market(text),
            Err(MatrixMarketError::Line {
                line: 3,
                message: "invalid integer value `1.5`".to_string()
            })
        );

        let text = "%%MatrixMarket matrix coordinate real general\n2 2 1\n1 2\n";
        assert!(matches!(
            parse_matrix_market(text),
            Err(MatrixMarketError::Line { line: 3, .. })
        ));
    }

    #[test]
    fn errors_carry_line_numbers() {
        let text = "%%MatrixMarket matrix coordinate pattern general\n2 2 2\n1 1\n3 1\n";
        assert_eq!(
            parse_matrix_market(text),
            Err(MatrixMarketError::Line {
                line: 4,
                message: "row 3 outside 1..=2".to_string()
            })
        );

        let text = "%%MatrixMarket matrix coordinate pattern general\n2 2 1\n0 1\n";
        assert!(matches!(
            parse_matrix_market(text),
            Err(MatrixMarketError::Line { line: 3, .. })
        ));
    }

    #[test]
    fn rejects_unsupported_headers() {
        for banner in [
            "%%MatrixMarket matrix array real general",
            "%%MatrixMarket matrix coordinate complex general",
            "%%MatrixMarket matrix coordinate pattern hermitian",
            "%%MatrixMarket vector",
        ] {
            let text = format!("{banner}\n1 1 0\n");
            assert!(
                matches!(
                    parse_matrix_market(&text),
                    Err(MatrixMarketError::Line { line: 1, .. })
                ),
                "{banner}"
            );
        }
    }

    #[test]
    fn entry_count_must_match_size_line() {
        let text = "3 3 2\n1 1\n";
        assert_eq!(
            parse_matrix_market(text),
            Err(MatrixMarketError::EntryCount {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            parse_matrix_market("% only comments\n"),
            Err(MatrixMarketError::MissingSize)
        );
    }

    #[test]
    fn builds_bool_matrix_collapsing_duplicates() {
        let m = parse_matrix_market("2 2 3\n1 2\n1 2\n2 1\n").unwrap();
        assert_eq!(m.nvals(), 3);
        let matrix = m.into_bool_matrix().unwrap();
        assert_eq!(matrix.nvals(), 2);
        assert!(matrix.get(0, 1) && matrix.get(1, 0));
    }
}
