//! Command handlers
//!
//! - `extract`: audio file to envelope
//! - `envelope`: resample, info and convert on existing envelope files

pub mod envelope;
pub mod extract;

use std::fs;
use std::path::Path;

use anyhow::Context;
use just_waveform::{decode, encode, from_json, to_json, Envelope};

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Read an envelope in the form its extension names.
pub fn read_envelope(path: &Path) -> anyhow::Result<Envelope> {
    let envelope = if is_json(path) {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        from_json(&text)
    } else {
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        decode(&bytes)
    };
    envelope.with_context(|| format!("Failed to decode {}", path.display()))
}

/// Write an envelope in the form its extension names.
pub fn write_envelope(path: &Path, envelope: &Envelope) -> anyhow::Result<()> {
    let bytes = if is_json(path) {
        to_json(envelope)?.into_bytes()
    } else {
        encode(envelope)?
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Wrote {} points to {}", envelope.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use just_waveform::BitDepth;

    fn sample() -> Envelope {
        Envelope::new(44100, 256, 2, BitDepth::Sixteen, vec![-1, 1, -2, 2, -9, 3, 0, 4]).unwrap()
    }

    #[test]
    fn test_is_json() {
        assert!(is_json(Path::new("a.json")));
        assert!(is_json(Path::new("a.JSON")));
        assert!(!is_json(Path::new("a.wave")));
        assert!(!is_json(Path::new("a")));
    }

    #[test]
    fn test_write_then_read_both_forms() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["env.wave", "nested/env.json"] {
            let path = dir.path().join(name);
            write_envelope(&path, &sample()).unwrap();
            assert_eq!(read_envelope(&path).unwrap(), sample());
        }
    }

    #[test]
    fn test_read_reports_decode_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.wave");
        fs::write(&path, b"nope").unwrap();
        let err = read_envelope(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to decode"));
    }
}
