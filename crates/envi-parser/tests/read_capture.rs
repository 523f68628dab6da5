//! Reading a capture written to disk the way the camera lays it out.

use envi_parser::{parse_band_metadata, EnviCube, EnviError};

const HEADER: &str = "ENVI
description = {
bench capture}
samples = 3
lines = 2
bands = 4
header offset = 0
file type = ENVI Standard
data type = 4
interleave = bil
sensor type = Unknown
byte order = 0
wavelength units = nm
wavelength = {
450.5
,550.5
,650.5
,750.5
}
;AOI height = 2
;AOI width = 3
";

fn write_capture(dir: &std::path::Path) -> (std::path::PathBuf, std::path::PathBuf) {
    // BIL: for each line, each band holds one value per sample.
    let mut bytes = Vec::new();
    for line in 0..2 {
        for band in 0..4 {
            for sample in 0..3 {
                let v = (line * 100 + band * 10 + sample) as f32;
                bytes.extend_from_slice(&v.to_le_bytes());
            }
        }
    }

    let hdr = dir.join("raw.hdr");
    let raw = dir.join("raw");
    std::fs::write(&hdr, HEADER).expect("write header");
    std::fs::write(&raw, bytes).expect("write payload");
    (hdr, raw)
}

#[test]
fn test_open_capture_from_disk() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let (hdr, raw) = write_capture(temp_dir.path());

    let cube = EnviCube::open(&hdr, &raw).expect("open cube");
    assert_eq!(cube.rows(), 2);
    assert_eq!(cube.cols(), 3);
    assert_eq!(cube.bands(), 4);

    for line in 0..2 {
        for sample in 0..3 {
            for band in 0..4 {
                let expected = (line * 100 + band * 10 + sample) as f64;
                assert_eq!(cube.get(line, sample, band), Some(expected));
            }
        }
    }
}

#[test]
fn test_band_metadata_matches_cube() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let (hdr, raw) = write_capture(temp_dir.path());

    let cube = EnviCube::open(&hdr, &raw).expect("open cube");
    let text = std::fs::read_to_string(&hdr).expect("read header");
    let bands = parse_band_metadata(&text).expect("parse bands");

    assert_eq!(bands.unit, "nm");
    assert_eq!(bands.wavelengths, vec![450.5, 550.5, 650.5, 750.5]);
    bands.ensure_band_count(cube.bands()).expect("band count");
}

#[test]
fn test_missing_payload_is_io_error() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let (hdr, _) = write_capture(temp_dir.path());

    let err = EnviCube::open(&hdr, temp_dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, EnviError::Io(_)));
}
