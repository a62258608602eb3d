//! Minimal reader and writer for NumPy `.npy` arrays.
//!
//! Supports format versions 1.0 to 3.0, C and Fortran order (the latter only
//! for 2-D arrays) and the numeric dtypes the piano-roll shards are stored in.
//! Every element is converted to `f32`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Result, VaeError};
use crate::math::Matrix;

const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// An n-dimensional array read from disk, stored row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct NpyArray {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl NpyArray {
    /// View the array as one sample per row: the first axis indexes samples,
    /// all remaining axes are flattened into the feature vector.
    pub fn into_matrix(self) -> Matrix {
        let (rows, cols) = match self.shape.as_slice() {
            [] => (1, 1),
            [n] => (1, *n),
            [rows, rest @ ..] => (*rows, rest.iter().product()),
        };
        Matrix::from_vec(rows, cols, self.data)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Endian {
    Little,
    Big,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Kind {
    Float,
    Int,
    Uint,
    Bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Dtype {
    endian: Endian,
    kind: Kind,
    size: usize,
}

#[derive(Debug, PartialEq)]
struct Header {
    dtype: Dtype,
    fortran_order: bool,
    shape: Vec<usize>,
}

fn malformed(path: &Path, reason: impl Into<String>) -> VaeError {
    VaeError::Npy {
        path: path.display().to_string(),
        reason: reason.into(),
    }
}

fn parse_descr(descr: &str) -> Option<Dtype> {
    let mut chars = descr.chars();
    let endian = match chars.next()? {
        '<' | '|' | '=' => Endian::Little,
        '>' => Endian::Big,
        _ => return None,
    };
    let kind = match chars.next()? {
        'f' => Kind::Float,
        'i' => Kind::Int,
        'u' => Kind::Uint,
        'b' => Kind::Bool,
        _ => return None,
    };
    let size: usize = chars.as_str().parse().ok()?;
    let supported = match kind {
        Kind::Float => matches!(size, 4 | 8),
        Kind::Int | Kind::Uint => matches!(size, 1 | 2 | 4 | 8),
        Kind::Bool => size == 1,
    };
    supported.then_some(Dtype { endian, kind, size })
}

/// Value following `'key':` in the python dict literal of the header.
fn dict_value<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let start = header.find(&format!("'{key}'"))? + key.len() + 2;
    let rest = header[start..].trim_start().strip_prefix(':')?.trim_start();
    Some(rest)
}

fn parse_header(header: &str) -> Option<Header> {
    let descr_val = dict_value(header, "descr")?;
    let descr_val = descr_val.strip_prefix('\'')?;
    let descr = &descr_val[..descr_val.find('\'')?];
    let dtype = parse_descr(descr)?;

    let fortran_val = dict_value(header, "fortran_order")?;
    let fortran_order = if fortran_val.starts_with("True") {
        true
    } else if fortran_val.starts_with("False") {
        false
    } else {
        return None;
    };

    let shape_val = dict_value(header, "shape")?.strip_prefix('(')?;
    let shape_str = &shape_val[..shape_val.find(')')?];
    let shape = shape_str
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().ok())
        .collect::<Option<Vec<_>>>()?;

    Some(Header {
        dtype,
        fortran_order,
        shape,
    })
}

fn read_element<R: Read, B: ByteOrder>(r: &mut R, dtype: Dtype) -> std::io::Result<f32> {
    Ok(match (dtype.kind, dtype.size) {
        (Kind::Float, 4) => r.read_f32::<B>()?,
        (Kind::Float, _) => r.read_f64::<B>()? as f32,
        (Kind::Int, 1) => r.read_i8()? as f32,
        (Kind::Int, 2) => r.read_i16::<B>()? as f32,
        (Kind::Int, 4) => r.read_i32::<B>()? as f32,
        (Kind::Int, _) => r.read_i64::<B>()? as f32,
        (Kind::Uint, 1) | (Kind::Bool, _) => r.read_u8()? as f32,
        (Kind::Uint, 2) => r.read_u16::<B>()? as f32,
        (Kind::Uint, 4) => r.read_u32::<B>()? as f32,
        (Kind::Uint, _) => r.read_u64::<B>()? as f32,
    })
}

/// Upper bound on elements reserved before any data has been read.
const MAX_PREALLOC: usize = 1 << 20;

/// Read an `.npy` file from any reader. `path` is only used in errors.
pub fn read_npy_from<R: Read>(mut r: R, path: &Path) -> Result<NpyArray> {
    let mut magic = [0u8; 6];
    r.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(malformed(path, "missing NUMPY magic string"));
    }
    let major = r.read_u8()?;
    let _minor = r.read_u8()?;
    let header_len = match major {
        1 => r.read_u16::<LittleEndian>()? as usize,
        2 | 3 => r.read_u32::<LittleEndian>()? as usize,
        v => return Err(malformed(path, format!("unsupported format version {v}"))),
    };
    let mut header_bytes = vec![0u8; header_len];
    r.read_exact(&mut header_bytes)?;
    let header_str = String::from_utf8_lossy(&header_bytes);
    let header = parse_header(&header_str)
        .ok_or_else(|| malformed(path, format!("unsupported header {}", header_str.trim())))?;

    let count = header
        .shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| malformed(path, format!("shape {:?} overflows", header.shape)))?;
    // a corrupt shape must fail on the short read, not on allocation
    let mut data = Vec::with_capacity(count.min(MAX_PREALLOC));
    for i in 0..count {
        let v = match header.dtype.endian {
            Endian::Little => read_element::<_, LittleEndian>(&mut r, header.dtype),
            Endian::Big => read_element::<_, BigEndian>(&mut r, header.dtype),
        };
        match v {
            Ok(v) => data.push(v),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(malformed(
                    path,
                    format!("data ends after {i} of {count} elements"),
                ));
            }
            Err(e) => return Err(e.into()),
        }
    }

    if header.fortran_order && header.shape.len() > 1 {
        if header.shape.len() != 2 {
            return Err(malformed(path, "Fortran order is only supported for 2-D arrays"));
        }
        let (rows, cols) = (header.shape[0], header.shape[1]);
        // column-major storage is the transpose laid out row-major
        data = Matrix::from_vec(cols, rows, data).transpose().data;
    }

    Ok(NpyArray {
        shape: header.shape,
        data,
    })
}

pub fn read_npy(path: impl AsRef<Path>) -> Result<NpyArray> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read_npy_from(BufReader::new(file), path)
}

/// Write `m` as a little-endian `f32` array of shape `(rows, cols)`.
pub fn write_npy(path: impl AsRef<Path>, m: &Matrix) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    let mut header = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
        m.rows, m.cols
    );
    // magic + version + length field + header + newline is padded to 64 bytes
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    header.push_str(&" ".repeat((64 - unpadded % 64) % 64));
    header.push('\n');
    w.write_all(MAGIC)?;
    w.write_all(&[1, 0])?;
    w.write_u16::<LittleEndian>(header.len() as u16)?;
    w.write_all(header.as_bytes())?;
    for &v in &m.data {
        w.write_f32::<LittleEndian>(v)?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numpy_header_literal() {
        let h = parse_header("{'descr': '<f8', 'fortran_order': False, 'shape': (10, 14, 32), }")
            .unwrap();
        assert_eq!(h.shape, vec![10, 14, 32]);
        assert_eq!(h.dtype.kind, Kind::Float);
        assert_eq!(h.dtype.size, 8);
        assert!(!h.fortran_order);
    }

    #[test]
    fn parses_one_dimensional_shape() {
        let h = parse_header("{'descr': '|u1', 'fortran_order': True, 'shape': (7,), }").unwrap();
        assert_eq!(h.shape, vec![7]);
        assert!(h.fortran_order);
        assert_eq!(h.dtype.kind, Kind::Uint);
    }

    fn header_only(shape: &str) -> Vec<u8> {
        let header = format!("{{'descr': '<f4', 'fortran_order': False, 'shape': {shape}, }}\n");
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        bytes
    }

    #[test]
    fn huge_shape_is_malformed_not_an_abort() {
        let mut bytes = header_only("(4611686018427387904, 448)");
        bytes.extend_from_slice(&1.0f32.to_le_bytes());
        let res = read_npy_from(&bytes[..], Path::new("corrupt.npy"));
        assert!(matches!(res, Err(VaeError::Npy { .. })));

        let bytes = header_only("(1000000000, 448)");
        let res = read_npy_from(&bytes[..], Path::new("short.npy"));
        assert!(matches!(res, Err(VaeError::Npy { .. })));
    }

    #[test]
    fn rejects_unknown_dtype() {
        assert!(parse_descr("<c16").is_none());
        assert!(parse_descr("<f2").is_none());
    }
}
