//! Binary cube decoding.

use std::path::Path;

use tracing::debug;

use crate::error::{EnviError, EnviResult};
use crate::header::{ByteOrder, DataType, EnviHeader, Interleave};

/// A decoded ENVI cube.
///
/// Samples are stored as `f64` in (line, sample, band) order regardless of
/// the interleave used on disk.
#[derive(Debug, Clone)]
pub struct EnviCube {
    header: EnviHeader,
    data: Vec<f64>,
}

impl EnviCube {
    /// Read a header file and its binary payload.
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(header_path: P, data_path: Q) -> EnviResult<Self> {
        let header = EnviHeader::from_path(header_path.as_ref())?;
        let bytes = std::fs::read(data_path.as_ref())?;

        debug!(
            header = %header_path.as_ref().display(),
            lines = header.lines,
            samples = header.samples,
            bands = header.bands,
            interleave = header.interleave.as_str(),
            "Reading ENVI cube"
        );

        Self::from_bytes(header, &bytes)
    }

    /// Decode a payload already in memory.
    pub fn from_bytes(header: EnviHeader, bytes: &[u8]) -> EnviResult<Self> {
        let expected = header
            .header_offset
            .checked_add(header.payload_len()?)
            .ok_or_else(|| EnviError::header("header offset plus payload overflows"))?;
        if bytes.len() < expected {
            return Err(EnviError::SizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }

        let payload = &bytes[header.header_offset..expected];
        let file_order: Vec<f64> = payload
            .chunks_exact(header.data_type.size())
            .map(|chunk| decode_sample(chunk, header.data_type, header.byte_order))
            .collect();

        let data = reorder(&file_order, &header);
        Ok(Self { header, data })
    }

    pub fn header(&self) -> &EnviHeader {
        &self.header
    }

    /// Number of lines (rows).
    pub fn rows(&self) -> usize {
        self.header.lines
    }

    /// Number of samples per line (columns).
    pub fn cols(&self) -> usize {
        self.header.samples
    }

    pub fn bands(&self) -> usize {
        self.header.bands
    }

    /// Sample at (row, col, band).
    pub fn get(&self, row: usize, col: usize, band: usize) -> Option<f64> {
        if row >= self.rows() || col >= self.cols() || band >= self.bands() {
            return None;
        }
        self.data
            .get((row * self.cols() + col) * self.bands() + band)
            .copied()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }
}

macro_rules! decode_as {
    ($ty:ty, $chunk:expr, $order:expr) => {{
        let mut buf = [0u8; std::mem::size_of::<$ty>()];
        buf.copy_from_slice($chunk);
        match $order {
            ByteOrder::LittleEndian => <$ty>::from_le_bytes(buf) as f64,
            ByteOrder::BigEndian => <$ty>::from_be_bytes(buf) as f64,
        }
    }};
}

fn decode_sample(chunk: &[u8], data_type: DataType, order: ByteOrder) -> f64 {
    match data_type {
        DataType::U8 => chunk[0] as f64,
        DataType::I16 => decode_as!(i16, chunk, order),
        DataType::U16 => decode_as!(u16, chunk, order),
        DataType::I32 => decode_as!(i32, chunk, order),
        DataType::U32 => decode_as!(u32, chunk, order),
        DataType::F32 => decode_as!(f32, chunk, order),
        DataType::F64 => decode_as!(f64, chunk, order),
        DataType::I64 => decode_as!(i64, chunk, order),
        DataType::U64 => decode_as!(u64, chunk, order),
    }
}

/// Convert file-order samples to (line, sample, band) order.
fn reorder(file_order: &[f64], header: &EnviHeader) -> Vec<f64> {
    let (lines, samples, bands) = (header.lines, header.samples, header.bands);
    if header.interleave == Interleave::Bip {
        return file_order.to_vec();
    }

    let mut out = vec![0.0; file_order.len()];
    for line in 0..lines {
        for sample in 0..samples {
            for band in 0..bands {
                let src = match header.interleave {
                    Interleave::Bsq => band * lines * samples + line * samples + sample,
                    Interleave::Bil => line * bands * samples + band * samples + sample,
                    Interleave::Bip => (line * samples + sample) * bands + band,
                };
                out[(line * samples + sample) * bands + band] = file_order[src];
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(interleave: &str, data_type: u32, byte_order: u8, offset: usize) -> EnviHeader {
        EnviHeader::parse(&format!(
            "ENVI\nsamples = 2\nlines = 2\nbands = 3\nheader offset = {}\ndata type = {}\ninterleave = {}\nbyte order = {}\n",
            offset, data_type, interleave, byte_order
        ))
        .unwrap()
    }

    /// Value at (line, sample, band) used by every layout test.
    fn value(line: usize, sample: usize, band: usize) -> u16 {
        (line * 100 + sample * 10 + band) as u16
    }

    fn encode_u16(interleave: Interleave, big_endian: bool) -> Vec<u8> {
        let mut order = Vec::new();
        match interleave {
            Interleave::Bsq => {
                for b in 0..3 {
                    for l in 0..2 {
                        for s in 0..2 {
                            order.push(value(l, s, b));
                        }
                    }
                }
            }
            Interleave::Bil => {
                for l in 0..2 {
                    for b in 0..3 {
                        for s in 0..2 {
                            order.push(value(l, s, b));
                        }
                    }
                }
            }
            Interleave::Bip => {
                for l in 0..2 {
                    for s in 0..2 {
                        for b in 0..3 {
                            order.push(value(l, s, b));
                        }
                    }
                }
            }
        }
        order
            .into_iter()
            .flat_map(|v| {
                if big_endian {
                    v.to_be_bytes()
                } else {
                    v.to_le_bytes()
                }
            })
            .collect()
    }

    fn assert_layout(cube: &EnviCube) {
        for l in 0..2 {
            for s in 0..2 {
                for b in 0..3 {
                    assert_eq!(cube.get(l, s, b), Some(value(l, s, b) as f64));
                }
            }
        }
    }

    #[test]
    fn test_all_interleaves_decode_to_same_layout() {
        for (name, interleave) in [
            ("bsq", Interleave::Bsq),
            ("bil", Interleave::Bil),
            ("bip", Interleave::Bip),
        ] {
            let cube = EnviCube::from_bytes(header(name, 12, 0, 0), &encode_u16(interleave, false))
                .unwrap();
            assert_layout(&cube);
        }
    }

    #[test]
    fn test_big_endian_and_offset() {
        let mut bytes = vec![0xAA; 7];
        bytes.extend(encode_u16(Interleave::Bil, true));
        let cube = EnviCube::from_bytes(header("bil", 12, 1, 7), &bytes).unwrap();
        assert_layout(&cube);
    }

    #[test]
    fn test_float_samples() {
        let values: Vec<f32> = (0..12).map(|i| i as f32 * 0.5).collect();
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let cube = EnviCube::from_bytes(header("bip", 4, 0, 0), &bytes).unwrap();
        assert_eq!(cube.get(1, 1, 2), Some(5.5));
        assert_eq!(cube.data().len(), 12);
    }

    #[test]
    fn test_short_payload() {
        let err = EnviCube::from_bytes(header("bsq", 12, 0, 0), &[0u8; 10]).unwrap_err();
        assert!(matches!(
            err,
            EnviError::SizeMismatch {
                expected: 24,
                actual: 10
            }
        ));
    }

    #[test]
    fn test_huge_declared_lines_do_not_panic() {
        let header = EnviHeader::parse(
            "ENVI\nsamples = 4\nlines = 4611686018427387904\nbands = 1\ndata type = 1\n",
        )
        .unwrap();
        let err = EnviCube::from_bytes(header, &[0u8; 64]).unwrap_err();
        assert!(matches!(err, EnviError::HeaderParse(_)));
    }

    #[test]
    fn test_offset_overflow_is_an_error() {
        let header = EnviHeader::parse(&format!(
            "ENVI\nsamples = 1\nlines = 1\nbands = 1\ndata type = 1\nheader offset = {}\n",
            usize::MAX
        ))
        .unwrap();
        assert!(EnviCube::from_bytes(header, &[0u8; 4]).is_err());
    }

    #[test]
    fn test_out_of_range_get() {
        let cube =
            EnviCube::from_bytes(header("bsq", 12, 0, 0), &encode_u16(Interleave::Bsq, false))
                .unwrap();
        assert_eq!(cube.get(2, 0, 0), None);
        assert_eq!(cube.get(0, 0, 3), None);
    }
}
