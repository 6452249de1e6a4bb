//! Safetensors I/O for recordings and cleaned output.
//!
//! Input layout (e.g. written by a small MNE export script):
//!
//! ```text
//! data            [C, T]  F32 | F64   continuous signal
//! sfreq           [1]     F32 | F64   sampling rate (Hz)
//! ch_names        [n]     U8          newline-joined channel names (optional)
//! marker_samples  [N]     I32 | I64   trigger onsets in samples
//! marker_labels   [n]     U8          newline-joined labels, one per marker
//! ```
//!
//! Output layout ([`write_cleaned`]):
//!
//! ```text
//! cleaned         [C, T]     cleaned recording
//! cleaned_cycles  [E, C, L]  cleaned cycles
//! cycle_starts    [E]   I64  cycle onsets
//! cycle_len       [1]   I64
//! sfreq           [1]   F64
//! ```
use anyhow::{bail, Context, Result};
use ndarray::{Array, Array2, Dimension};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::events::TriggerMarker;
use crate::signal::ContinuousSignal;
use crate::GradientOutput;

// ── Low-level safetensors parser (raw bytes → ndarray, no tensor crate) ──────

fn parse_header(bytes: &[u8]) -> Result<(HashMap<String, serde_json::Value>, usize)> {
    let Some((len, rest)) = bytes.split_first_chunk::<8>() else {
        bail!("safetensors file too small");
    };
    let n = usize::try_from(u64::from_le_bytes(*len))
        .context("safetensors header length does not fit in memory")?;
    let Some(json) = rest.get(..n) else {
        bail!("safetensors header truncated ({} of {n} bytes)", rest.len());
    };
    let header: HashMap<String, serde_json::Value> =
        serde_json::from_slice(json).context("failed to parse safetensors header")?;
    // n <= rest.len() < bytes.len(), so this cannot overflow.
    Ok((header, 8 + n))
}

fn tensor_bytes<'a>(
    bytes: &'a [u8],
    data_start: usize,
    entry: &serde_json::Value,
) -> Result<&'a [u8]> {
    let offsets = entry["data_offsets"]
        .as_array()
        .context("tensor entry without data_offsets")?;
    let offset = |i: usize| -> Option<usize> {
        let rel = usize::try_from(offsets.get(i)?.as_u64()?).ok()?;
        data_start.checked_add(rel)
    };
    let (Some(start), Some(end)) = (offset(0), offset(1)) else {
        bail!("malformed data_offsets {offsets:?}");
    };
    bytes
        .get(start..end)
        .with_context(|| format!("tensor data [{start}, {end}) out of file bounds"))
}

fn shape_of(entry: &serde_json::Value) -> Result<Vec<usize>> {
    entry["shape"]
        .as_array()
        .context("tensor entry without shape")?
        .iter()
        .map(|v| v.as_u64().map(|n| n as usize).context("non-integer dimension"))
        .collect()
}

/// Read a numeric tensor of any supported dtype as `f64`.
fn read_f64_tensor(bytes: &[u8], data_start: usize, entry: &serde_json::Value) -> Result<Vec<f64>> {
    let raw = tensor_bytes(bytes, data_start, entry)?;
    let dtype = entry["dtype"].as_str().context("tensor entry without dtype")?;
    let vals = match dtype {
        "F32" => raw.chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect(),
        "F64" => raw.chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect(),
        "I32" => raw.chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect(),
        "I64" => raw.chunks_exact(8)
            .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f64)
            .collect(),
        other => bail!("unsupported dtype {other}"),
    };
    Ok(vals)
}

fn read_i64_tensor(bytes: &[u8], data_start: usize, entry: &serde_json::Value) -> Result<Vec<i64>> {
    let raw = tensor_bytes(bytes, data_start, entry)?;
    match entry["dtype"].as_str() {
        Some("I32") => Ok(raw.chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64)
            .collect()),
        Some("I64") => Ok(raw.chunks_exact(8)
            .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect()),
        other => bail!("expected I32 or I64 tensor, got {other:?}"),
    }
}

fn read_lines(bytes: &[u8], data_start: usize, entry: &serde_json::Value) -> Result<Vec<String>> {
    let raw = std::str::from_utf8(tensor_bytes(bytes, data_start, entry)?)?;
    Ok(raw.split('\n').filter(|s| !s.is_empty()).map(String::from).collect())
}

// ── Public structs ────────────────────────────────────────────────────────────

/// A recording plus its trigger markers, loaded from safetensors.
#[derive(Debug, Clone)]
pub struct RawRecording {
    /// [C, T], original units.
    pub data: Array2<f64>,
    /// Sampling rate (Hz).
    pub sfreq: f64,
    /// Channel names (may be empty if not saved).
    pub ch_names: Vec<String>,
    pub markers: Vec<TriggerMarker>,
}

impl RawRecording {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let (header, data_start) = parse_header(&bytes)?;

        let data_entry = header.get("data").context("missing 'data' key")?;
        let data_shape = shape_of(data_entry)?;
        if data_shape.len() != 2 {
            bail!("'data' must be 2-D [C, T], got shape {data_shape:?}");
        }
        let data_vec = read_f64_tensor(&bytes, data_start, data_entry)?;
        let data = Array2::from_shape_vec((data_shape[0], data_shape[1]), data_vec)?;

        let sfreq_entry = header.get("sfreq").context("missing 'sfreq' key")?;
        let sfreq = *read_f64_tensor(&bytes, data_start, sfreq_entry)?
            .first()
            .context("empty 'sfreq' tensor")?;

        // Channel names are optional.
        let ch_names = match header.get("ch_names") {
            Some(e) => read_lines(&bytes, data_start, e)?,
            None => vec![],
        };

        let samples_entry = header.get("marker_samples").context("missing 'marker_samples' key")?;
        let samples = read_i64_tensor(&bytes, data_start, samples_entry)?;
        let labels_entry = header.get("marker_labels").context("missing 'marker_labels' key")?;
        let labels = read_lines(&bytes, data_start, labels_entry)?;
        if samples.len() != labels.len() {
            bail!("{} marker samples but {} marker labels", samples.len(), labels.len());
        }
        let markers = samples
            .into_iter()
            .zip(labels)
            .map(|(s, label)| {
                let sample = usize::try_from(s)
                    .with_context(|| format!("negative marker sample {s}"))?;
                Ok(TriggerMarker { sample, label })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RawRecording { data, sfreq, ch_names, markers })
    }

    /// Write in the layout accepted by [`RawRecording::load`].
    pub fn save(&self, path: &Path) -> Result<()> {
        let samples: Vec<i64> = self.markers.iter().map(|m| m.sample as i64).collect();
        let labels: Vec<String> = self.markers.iter().map(|m| m.label.clone()).collect();

        let mut w = StWriter::new();
        w.add_array("data", &self.data, Precision::F64)
            .add("sfreq", &[self.sfreq], &[1])
            .add("marker_samples", &samples, &[samples.len()])
            .add_lines("marker_labels", &labels);
        if !self.ch_names.is_empty() {
            w.add_lines("ch_names", &self.ch_names);
        }
        w.write(path)
    }

    /// Split into the signal and its markers.
    pub fn into_parts(self) -> Result<(ContinuousSignal, Vec<TriggerMarker>)> {
        let signal = ContinuousSignal::new(self.data, self.sfreq)?;
        Ok((signal, self.markers))
    }
}

// ── Tensor writer ─────────────────────────────────────────────────────────────

/// Scalar types that can be stored as a safetensors tensor.
pub trait Element: Copy {
    const DTYPE: &'static str;
    fn put_le(self, out: &mut Vec<u8>);
}

macro_rules! impl_element {
    ($($t:ty => $dtype:literal),* $(,)?) => {$(
        impl Element for $t {
            const DTYPE: &'static str = $dtype;
            #[inline]
            fn put_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        }
    )*};
}

impl_element!(f32 => "F32", f64 => "F64", i32 => "I32", i64 => "I64", u8 => "U8");

/// On-disk precision for floating-point arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    #[default]
    F32,
    F64,
}

struct Tensor {
    name: String,
    dtype: &'static str,
    shape: Vec<usize>,
    bytes: Vec<u8>,
}

/// Accumulates named tensors and writes them as one safetensors file.
///
/// ```rust,no_run
/// use gradclean::io::{Precision, StWriter};
/// use ndarray::Array2;
/// use std::path::Path;
///
/// let mut w = StWriter::new();
/// w.add("cycle_len", &[6000_i64], &[1])
///  .add_array("cleaned", &Array2::<f64>::zeros((2, 8)), Precision::F32);
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Default)]
pub struct StWriter {
    tensors: Vec<Tensor>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a flat slice with an explicit shape.
    pub fn add<T: Element>(&mut self, name: &str, data: &[T], shape: &[usize]) -> &mut Self {
        let mut bytes = Vec::with_capacity(data.len() * std::mem::size_of::<T>());
        for &v in data {
            v.put_le(&mut bytes);
        }
        self.tensors.push(Tensor {
            name: name.to_string(),
            dtype: T::DTYPE,
            shape: shape.to_vec(),
            bytes,
        });
        self
    }

    /// Add an `f64` array of any dimension in logical (row-major) order.
    pub fn add_array<D: Dimension>(&mut self, name: &str, arr: &Array<f64, D>, precision: Precision) -> &mut Self {
        match precision {
            Precision::F64 => {
                let data: Vec<f64> = arr.iter().copied().collect();
                self.add(name, &data, arr.shape())
            }
            Precision::F32 => {
                let data: Vec<f32> = arr.iter().map(|&v| v as f32).collect();
                self.add(name, &data, arr.shape())
            }
        }
    }

    /// Newline-joined strings stored as a U8 tensor.
    pub fn add_lines(&mut self, name: &str, lines: &[String]) -> &mut Self {
        let joined = lines.join("\n");
        self.add(name, joined.as_bytes(), &[joined.len()])
    }

    /// JSON header, space-padded to a multiple of 8 bytes.
    fn header(&self) -> Result<Vec<u8>> {
        let mut map = serde_json::Map::new();
        let mut offset = 0usize;
        for t in &self.tensors {
            let end = offset + t.bytes.len();
            map.insert(t.name.clone(), serde_json::json!({
                "dtype": t.dtype,
                "shape": t.shape,
                "data_offsets": [offset, end],
            }));
            offset = end;
        }
        let mut header = serde_json::to_vec(&map)?;
        header.resize(header.len().next_multiple_of(8), b' ');
        Ok(header)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let header = self.header()?;
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut out = BufWriter::new(file);
        out.write_all(&(header.len() as u64).to_le_bytes())?;
        out.write_all(&header)?;
        for t in &self.tensors {
            out.write_all(&t.bytes)?;
        }
        out.flush()?;
        Ok(())
    }
}

// ── Cleaned-output writer ─────────────────────────────────────────────────────

/// Write the result of [`remove_gradients`](crate::remove_gradients).
///
/// The cleaned signal and cycles use `precision`; indices are always I64.
pub fn write_cleaned(out: &GradientOutput, path: &Path, precision: Precision) -> Result<()> {
    use crate::signal::Recording;

    let starts: Vec<i64> = out.cycle_starts.iter().map(|&s| s as i64).collect();
    let mut w = StWriter::new();
    w.add_array("cleaned", &out.signal.data().to_owned(), precision)
        .add_array("cleaned_cycles", &out.cleaned_cycles, precision)
        .add("cycle_starts", &starts, &[starts.len()])
        .add("cycle_len", &[out.repetition.samples as i64], &[1])
        .add("sfreq", &[out.signal.sfreq()], &[1]);
    w.write(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawRecording {
        RawRecording {
            data: Array2::from_shape_fn((2, 12), |(c, t)| c as f64 * 0.5 + t as f64),
            sfreq: 250.0,
            ch_names: vec!["Fz".into(), "Cz".into()],
            markers: vec![
                TriggerMarker::new(0, "Gradient/G  1"),
                TriggerMarker::new(4, "Gradient/G  1"),
                TriggerMarker::new(6, "Stimulus/S  2"),
            ],
        }
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rec.safetensors");
        let rec = sample();
        rec.save(&path).unwrap();

        let back = RawRecording::load(&path).unwrap();
        assert_eq!(back.data, rec.data);
        assert_eq!(back.sfreq, 250.0);
        assert_eq!(back.ch_names, rec.ch_names);
        assert_eq!(back.markers, rec.markers);
    }

    #[test]
    fn f32_data_is_widened() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f32.safetensors");
        let mut w = StWriter::new();
        w.add("data", &[1.5_f32, 2.5, 3.5, 4.5], &[1, 4])
            .add("sfreq", &[100.0_f32], &[1])
            .add("marker_samples", &[0_i32, 2], &[2])
            .add_lines("marker_labels", &["TR".to_string(), "TR".to_string()]);
        w.write(&path).unwrap();

        let rec = RawRecording::load(&path).unwrap();
        assert_eq!(rec.data.dim(), (1, 4));
        assert_eq!(rec.data[[0, 3]], 4.5);
        assert_eq!(rec.sfreq, 100.0);
        assert!(rec.ch_names.is_empty());
        assert_eq!(rec.markers[1], TriggerMarker::new(2, "TR"));
    }

    #[test]
    fn missing_markers_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nomarkers.safetensors");
        let mut w = StWriter::new();
        w.add("data", &[0.0_f64; 4], &[1, 4]).add("sfreq", &[100.0_f64], &[1]);
        w.write(&path).unwrap();

        let err = RawRecording::load(&path).unwrap_err();
        assert!(err.to_string().contains("marker_samples"));
    }

    #[test]
    fn header_is_8_byte_aligned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("align.safetensors");
        let mut w = StWriter::new();
        w.add("x", &[1_i32], &[1]);
        w.write(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let n = u64::from_le_bytes(bytes[..8].try_into().unwrap()) as usize;
        assert_eq!(n % 8, 0);
    }

    fn write_raw(path: &Path, header_len: u64, header: &[u8]) {
        let mut bytes = header_len.to_le_bytes().to_vec();
        bytes.extend_from_slice(header);
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn oversized_header_length_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.safetensors");
        write_raw(&path, u64::MAX, b"{}      ");

        let err = RawRecording::load(&path).unwrap_err();
        assert!(err.to_string().contains("safetensors header"), "{err}");
    }

    #[test]
    fn overflowing_data_offsets_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("offsets.safetensors");
        let header = serde_json::to_vec(&serde_json::json!({
            "data": { "dtype": "F64", "shape": [1, 1], "data_offsets": [u64::MAX - 1, u64::MAX] },
        }))
        .unwrap();
        write_raw(&path, header.len() as u64, &header);

        let err = RawRecording::load(&path).unwrap_err();
        assert!(err.to_string().contains("data_offsets"), "{err}");
    }

    #[test]
    fn offsets_past_end_of_file_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.safetensors");
        let header = serde_json::to_vec(&serde_json::json!({
            "data": { "dtype": "F64", "shape": [1, 4], "data_offsets": [0, 32] },
        }))
        .unwrap();
        write_raw(&path, header.len() as u64, &header);

        let err = RawRecording::load(&path).unwrap_err();
        assert!(err.to_string().contains("out of file bounds"), "{err}");
    }

    #[test]
    fn precision_selects_dtype() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prec.safetensors");
        let arr = ndarray::Array3::<f64>::from_elem((2, 1, 3), 0.25);
        let mut w = StWriter::new();
        w.add_array("a32", &arr, Precision::F32).add_array("a64", &arr, Precision::F64);
        w.write(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let (header, _) = parse_header(&bytes).unwrap();
        assert_eq!(header["a32"]["dtype"], "F32");
        assert_eq!(header["a64"]["dtype"], "F64");
        assert_eq!(header["a64"]["shape"], serde_json::json!([2, 1, 3]));
        assert_eq!(header["a64"]["data_offsets"], serde_json::json!([24, 72]));
    }
}
