//! ENVI header grammar.
//!
//! A header starts with the literal line `ENVI`, followed by `key = value`
//! fields. Values wrapped in `{ ... }` may span several lines. Lines that
//! start with `;` are comments (the camera software writes its own
//! bookkeeping there, e.g. `;AOI height = 512`).

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{EnviError, EnviResult};

/// Numeric encoding of the binary samples (`data type` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    U8,
    I16,
    I32,
    F32,
    F64,
    U16,
    U32,
    I64,
    U64,
}

impl DataType {
    /// Map an ENVI `data type` code to a decoder.
    pub fn from_code(code: u32) -> EnviResult<Self> {
        match code {
            1 => Ok(Self::U8),
            2 => Ok(Self::I16),
            3 => Ok(Self::I32),
            4 => Ok(Self::F32),
            5 => Ok(Self::F64),
            12 => Ok(Self::U16),
            13 => Ok(Self::U32),
            14 => Ok(Self::I64),
            15 => Ok(Self::U64),
            other => Err(EnviError::UnsupportedDataType(other)),
        }
    }

    /// ENVI code for this data type.
    pub fn code(&self) -> u32 {
        match self {
            Self::U8 => 1,
            Self::I16 => 2,
            Self::I32 => 3,
            Self::F32 => 4,
            Self::F64 => 5,
            Self::U16 => 12,
            Self::U32 => 13,
            Self::I64 => 14,
            Self::U64 => 15,
        }
    }

    /// Bytes per sample.
    pub fn size(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::F64 | Self::I64 | Self::U64 => 8,
        }
    }
}

/// Sample layout of the binary payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interleave {
    /// Band sequential: every band is a full image.
    #[default]
    Bsq,
    /// Band interleaved by line: each line holds all bands in turn.
    Bil,
    /// Band interleaved by pixel: each pixel holds its full spectrum.
    Bip,
}

impl Interleave {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> EnviResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "bsq" => Ok(Self::Bsq),
            "bil" => Ok(Self::Bil),
            "bip" => Ok(Self::Bip),
            other => Err(EnviError::UnsupportedInterleave(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bsq => "bsq",
            Self::Bil => "bil",
            Self::Bip => "bip",
        }
    }
}

/// Endianness of the binary payload (`byte order` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

/// Parsed ENVI header.
#[derive(Debug, Clone)]
pub struct EnviHeader {
    /// Number of samples per line (columns).
    pub samples: usize,
    /// Number of lines (rows).
    pub lines: usize,
    /// Number of spectral bands.
    pub bands: usize,
    pub data_type: DataType,
    pub interleave: Interleave,
    pub byte_order: ByteOrder,
    /// Bytes to skip at the start of the binary file.
    pub header_offset: usize,
    /// Every field, keyed by lowercase name, braces stripped.
    pub fields: BTreeMap<String, String>,
}

impl EnviHeader {
    /// Read and parse a header file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> EnviResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse header text.
    pub fn parse(text: &str) -> EnviResult<Self> {
        let fields = parse_fields(text)?;

        let samples = required_usize(&fields, "samples")?;
        let lines = required_usize(&fields, "lines")?;
        let bands = required_usize(&fields, "bands")?;

        let data_type_code = fields
            .get("data type")
            .ok_or(EnviError::MissingField("data type"))?;
        let data_type = DataType::from_code(parse_number(data_type_code, "data type")?)?;

        let interleave = match fields.get("interleave") {
            Some(value) => Interleave::from_str(value)?,
            None => Interleave::default(),
        };

        let byte_order = match fields.get("byte order") {
            Some(value) => match parse_number::<u32>(value, "byte order")? {
                0 => ByteOrder::LittleEndian,
                1 => ByteOrder::BigEndian,
                other => {
                    return Err(EnviError::header(format!("invalid byte order {}", other)));
                }
            },
            None => ByteOrder::default(),
        };

        let header_offset = match fields.get("header offset") {
            Some(value) => parse_number(value, "header offset")?,
            None => 0,
        };

        Ok(Self {
            samples,
            lines,
            bands,
            data_type,
            interleave,
            byte_order,
            header_offset,
            fields,
        })
    }

    /// Raw string value of a field.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Total number of samples in the cube.
    ///
    /// Fails if the declared dimensions overflow `usize`.
    pub fn element_count(&self) -> EnviResult<usize> {
        self.lines
            .checked_mul(self.samples)
            .and_then(|n| n.checked_mul(self.bands))
            .ok_or_else(|| {
                EnviError::header(format!(
                    "dimensions {} x {} x {} are too large",
                    self.lines, self.samples, self.bands
                ))
            })
    }

    /// Payload size in bytes, excluding the header offset.
    pub fn payload_len(&self) -> EnviResult<usize> {
        self.element_count()?
            .checked_mul(self.data_type.size())
            .ok_or_else(|| EnviError::header("payload size overflows"))
    }
}

fn parse_fields(text: &str) -> EnviResult<BTreeMap<String, String>> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    match lines.next() {
        Some(first) if first.eq_ignore_ascii_case("ENVI") => {}
        _ => return Err(EnviError::header("missing ENVI signature")),
    }

    let mut fields = BTreeMap::new();
    while let Some(line) = lines.next() {
        if line.starts_with(';') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let mut value = value.trim().to_string();

        if value.starts_with('{') {
            while !value.contains('}') {
                match lines.next() {
                    Some(next) => {
                        value.push('\n');
                        value.push_str(next);
                    }
                    None => {
                        return Err(EnviError::header(format!("unterminated block for '{}'", key)));
                    }
                }
            }
            value = value
                .trim_start_matches('{')
                .trim_end()
                .trim_end_matches('}')
                .trim()
                .to_string();
        }

        fields.insert(key, value);
    }

    Ok(fields)
}

fn required_usize(fields: &BTreeMap<String, String>, key: &'static str) -> EnviResult<usize> {
    let value = fields.get(key).ok_or(EnviError::MissingField(key))?;
    parse_number(value, key)
}

fn parse_number<T: std::str::FromStr>(value: &str, key: &str) -> EnviResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| EnviError::header(format!("field '{}' is not a valid number: '{}'", key, value)))
}
