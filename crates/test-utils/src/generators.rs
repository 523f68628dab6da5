//! Synthetic spectra and cubes with known temperatures.
//!
//! The radiance model here is written out independently of
//! `cube-processor`, so a fitting bug cannot hide behind a matching bug in
//! the data generator.

const H: f64 = 6.62607015e-34;
const C: f64 = 299_792_458.0;
const K: f64 = 1.380649e-23;

/// Evenly spaced wavelengths in nanometers from `start` to `end` inclusive.
///
/// # Example
///
/// ```
/// use test_utils::wavelength_grid_nm;
///
/// let grid = wavelength_grid_nm(400.0, 1000.0, 4);
/// assert_eq!(grid, vec![400.0, 600.0, 800.0, 1000.0]);
/// ```
pub fn wavelength_grid_nm(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => (0..count)
            .map(|i| start + (end - start) * i as f64 / (count - 1) as f64)
            .collect(),
    }
}

/// Model intensity at `nm` for `[a0, a1, a2, offset, T]`.
///
/// Emissivity coefficients apply to the wavelength in meters.
pub fn blackbody_intensity(params: [f64; 5], nm: f64) -> f64 {
    let [a0, a1, a2, offset, t] = params;
    let l = nm * 1e-9;
    let emissivity = a0 + a1 * l + a2 * l * l;
    let radiance = 2.0 * H * C * C / l.powi(5) / ((H * C / (l * K * t)).exp() - 1.0);
    emissivity * radiance + offset
}

/// Spectrum of a body at `temperature` with the default emissivity terms
/// `a0 = a1 = a2 = 1` and offset `0.1`.
pub fn blackbody_spectrum(temperature: f64, wavelengths_nm: &[f64]) -> Vec<f64> {
    blackbody_spectrum_with([1.0, 1.0, 1.0, 0.1, temperature], wavelengths_nm)
}

/// Spectrum for arbitrary model parameters.
pub fn blackbody_spectrum_with(params: [f64; 5], wavelengths_nm: &[f64]) -> Vec<f64> {
    wavelengths_nm
        .iter()
        .map(|&nm| blackbody_intensity(params, nm))
        .collect()
}

/// Row-major (row, col, band) samples where every pixel holds the same
/// spectrum.
pub fn uniform_cube(rows: usize, cols: usize, spectrum: &[f64]) -> Vec<f64> {
    let mut data = Vec::with_capacity(rows * cols * spectrum.len());
    for _ in 0..rows * cols {
        data.extend_from_slice(spectrum);
    }
    data
}

/// Row-major (row, col, band) samples where each value encodes its
/// position as `row * 10000 + col * 100 + band`.
///
/// Makes it easy to verify interleave handling and averaging.
pub fn indexed_cube(rows: usize, cols: usize, bands: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(rows * cols * bands);
    for row in 0..rows {
        for col in 0..cols {
            for band in 0..bands {
                data.push((row * 10000 + col * 100 + band) as f64);
            }
        }
    }
    data
}

/// Deterministic pseudo-random permutation of `0..n` driven by `seed`.
///
/// Used to shuffle arrival orders reproducibly without a rand dependency.
pub fn shuffled_indices(n: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    for i in (1..n).rev() {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let j = ((state >> 33) as usize) % (i + 1);
        indices.swap(i, j);
    }
    indices
}
