//! NumPy `.npy` encoding for temperature maps.
//!
//! Writes format version 1.0 with a little-endian `<f8` payload in C order.
//! The header is padded with spaces so the payload starts on a 64-byte
//! boundary.

use crate::error::{IngestionError, Result};

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const ALIGNMENT: usize = 64;
/// Magic, two version bytes and the u16 header length.
const PREAMBLE_LEN: usize = MAGIC.len() + 2 + 2;

/// Encode a row-major 2-D `f64` array.
pub fn encode_f64_2d(rows: usize, cols: usize, values: &[f64]) -> Result<Vec<u8>> {
    if values.len() != rows * cols {
        return Err(IngestionError::publish(format!(
            "array of {}x{} needs {} values, got {}",
            rows,
            cols,
            rows * cols,
            values.len()
        )));
    }

    let dict = format!(
        "{{'descr': '<f8', 'fortran_order': False, 'shape': ({}, {}), }}",
        rows, cols
    );
    // Header text plus its terminating newline, padded to the alignment.
    let unpadded = PREAMBLE_LEN + dict.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    let header_len = dict.len() + padding + 1;
    let header_len = u16::try_from(header_len)
        .map_err(|_| IngestionError::publish("npy header too long"))?;

    let mut out = Vec::with_capacity(PREAMBLE_LEN + header_len as usize + values.len() * 8);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(dict.as_bytes());
    out.extend(std::iter::repeat(b' ').take(padding));
    out.push(b'\n');
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
    Ok(out)
}

/// Decoded 2-D `f64` array.
#[derive(Debug, Clone, PartialEq)]
pub struct NpyArray {
    pub shape: (usize, usize),
    pub values: Vec<f64>,
}

impl NpyArray {
    /// Decode what [`encode_f64_2d`] writes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let invalid = |msg: &str| IngestionError::publish(format!("invalid npy data: {}", msg));

        if bytes.len() < PREAMBLE_LEN || &bytes[..MAGIC.len()] != MAGIC {
            return Err(invalid("bad magic"));
        }
        if bytes[6] != 1 {
            return Err(invalid("unsupported version"));
        }
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        let data_start = PREAMBLE_LEN + header_len;
        let header = bytes
            .get(PREAMBLE_LEN..data_start)
            .and_then(|h| std::str::from_utf8(h).ok())
            .ok_or_else(|| invalid("truncated header"))?;

        if !header.contains("'descr': '<f8'") || !header.contains("'fortran_order': False") {
            return Err(invalid("only C-order <f8 arrays are supported"));
        }
        let shape = header
            .split("'shape': (")
            .nth(1)
            .and_then(|rest| rest.split(')').next())
            .ok_or_else(|| invalid("missing shape"))?;
        let dims: Vec<usize> = shape
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse().map_err(|_| invalid("bad shape")))
            .collect::<Result<_>>()?;
        let (rows, cols) = match dims.as_slice() {
            [rows, cols] => (*rows, *cols),
            _ => return Err(invalid("expected a 2-D array")),
        };

        let payload = &bytes[data_start..];
        if payload.len() != rows * cols * 8 {
            return Err(invalid("payload length does not match shape"));
        }
        let values = payload
            .chunks_exact(8)
            .map(|chunk| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(chunk);
                f64::from_le_bytes(buf)
            })
            .collect();

        Ok(Self {
            shape: (rows, cols),
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let bytes = encode_f64_2d(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(&bytes[..6], b"\x93NUMPY");
        assert_eq!(&bytes[6..8], &[1, 0]);

        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        let data_start = 10 + header_len;
        assert_eq!(data_start % 64, 0);
        assert_eq!(bytes[data_start - 1], b'\n');
        assert_eq!(bytes.len(), data_start + 6 * 8);

        let header = std::str::from_utf8(&bytes[10..data_start]).unwrap();
        assert!(header.starts_with("{'descr': '<f8', 'fortran_order': False, 'shape': (2, 3), }"));
    }

    #[test]
    fn test_parse_encoded() {
        let values = vec![1500.25, -1.0, 930.5, f64::INFINITY];
        let bytes = encode_f64_2d(2, 2, &values).unwrap();
        let array = NpyArray::parse(&bytes).unwrap();
        assert_eq!(array.shape, (2, 2));
        assert_eq!(array.values, values);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(encode_f64_2d(2, 2, &[1.0]).is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(NpyArray::parse(b"not an npy file").is_err());
        let mut bytes = encode_f64_2d(1, 2, &[1.0, 2.0]).unwrap();
        bytes.pop();
        assert!(NpyArray::parse(&bytes).is_err());
    }
}
