//! Commands over existing envelope files.

use std::path::Path;

use just_waveform::{resample, resample_to};

use super::{read_envelope, write_envelope};

pub fn handle_resample(
    input: &Path,
    output: &Path,
    factor: Option<u32>,
    samples_per_pixel: Option<u32>,
) -> anyhow::Result<()> {
    let source = read_envelope(input)?;
    let coarse = match (factor, samples_per_pixel) {
        (Some(factor), _) => resample(&source, factor)?,
        (None, Some(spp)) => resample_to(&source, spp)?,
        (None, None) => anyhow::bail!("Pass either --factor or --samples-per-pixel"),
    };
    tracing::info!(
        "Resampled {} points at {} to {} points at {} samples per pixel",
        source.len(),
        source.samples_per_point(),
        coarse.len(),
        coarse.samples_per_point()
    );
    write_envelope(output, &coarse)
}

pub fn handle_info(input: &Path, json: bool) -> anyhow::Result<()> {
    let envelope = read_envelope(input)?;
    if json {
        let info = serde_json::json!({
            "sample_rate": envelope.sample_rate(),
            "samples_per_pixel": envelope.samples_per_point(),
            "channels": envelope.channels(),
            "bits": envelope.bits().bits(),
            "length": envelope.len(),
            "duration": envelope.duration_secs(),
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("Sample rate:       {} Hz", envelope.sample_rate());
        println!("Samples per pixel: {}", envelope.samples_per_point());
        println!("Channels:          {}", envelope.channels());
        println!("Bits:              {}", envelope.bits().bits());
        println!("Length:            {} points", envelope.len());
        println!("Duration:          {:.3} s", envelope.duration_secs());
    }
    Ok(())
}

pub fn handle_convert(input: &Path, output: &Path) -> anyhow::Result<()> {
    let envelope = read_envelope(input)?;
    write_envelope(output, &envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use just_waveform::{BitDepth, Envelope};

    fn write_sample(dir: &Path) -> std::path::PathBuf {
        let env = Envelope::new(8000, 2, 1, BitDepth::Sixteen, vec![-1, 1, -4, 2, 0, 7]).unwrap();
        let path = dir.join("in.wave");
        write_envelope(&path, &env).unwrap();
        path
    }

    #[test]
    fn test_resample_by_factor_and_target() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_sample(dir.path());

        let by_factor = dir.path().join("f.wave");
        handle_resample(&input, &by_factor, Some(2), None).unwrap();
        let by_target = dir.path().join("t.json");
        handle_resample(&input, &by_target, None, Some(4)).unwrap();

        let a = read_envelope(&by_factor).unwrap();
        assert_eq!(a.samples_per_point(), 4);
        assert_eq!(a.data(), &[-4, 2, 0, 7]);
        assert_eq!(read_envelope(&by_target).unwrap(), a);
    }

    #[test]
    fn test_resample_errors() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_sample(dir.path());
        let out = dir.path().join("x.wave");
        assert!(handle_resample(&input, &out, None, None).is_err());
        assert!(handle_resample(&input, &out, Some(0), None).is_err());
        assert!(handle_resample(&input, &out, None, Some(1)).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn test_convert_and_info() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_sample(dir.path());
        let json = dir.path().join("out.json");
        handle_convert(&input, &json).unwrap();
        assert_eq!(read_envelope(&json).unwrap(), read_envelope(&input).unwrap());
        handle_info(&json, true).unwrap();
        handle_info(&input, false).unwrap();
    }
}
