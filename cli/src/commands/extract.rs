//! Extract an envelope from an audio file.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, ValueEnum};
use just_waveform::{BitDepth, Downmix};
use just_waveform_extract::{ExtractOptions, WaveformExtractor, Zoom};

use super::write_envelope;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DownmixArg {
    Average,
    Drop,
}

impl From<DownmixArg> for Downmix {
    fn from(arg: DownmixArg) -> Self {
        match arg {
            DownmixArg::Average => Downmix::Average,
            DownmixArg::Drop => Downmix::Drop,
        }
    }
}

#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// Audio file (wav, mp3, m4a, aac, flac, ogg)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output envelope (.json for JSON, binary otherwise)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Source frames per point
    #[arg(long, conflicts_with = "pixels_per_second")]
    pub samples_per_pixel: Option<u32>,

    /// Points per second of audio
    #[arg(long)]
    pub pixels_per_second: Option<u32>,

    /// Output bits per value (8 or 16)
    #[arg(long)]
    pub bits: Option<u8>,

    /// Output channels (1 or 2)
    #[arg(long)]
    pub channels: Option<u16>,

    /// Policy for source channels beyond the output channels
    #[arg(long, value_enum)]
    pub downmix: Option<DownmixArg>,

    /// JSON file with extraction options; flags take precedence
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Skip the waveform cache
    #[arg(long)]
    pub no_cache: bool,
}

impl ExtractArgs {
    pub fn options(&self) -> anyhow::Result<ExtractOptions> {
        let mut options = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => ExtractOptions::default(),
        };

        if let Some(spp) = self.samples_per_pixel {
            options.zoom = Zoom::SamplesPerPixel(spp);
        }
        if let Some(pps) = self.pixels_per_second {
            options.zoom = Zoom::PixelsPerSecond(pps);
        }
        if let Some(bits) = self.bits {
            options.bits = BitDepth::try_from(bits)?;
        }
        if let Some(channels) = self.channels {
            options.channels = channels;
        }
        if let Some(downmix) = self.downmix {
            options.downmix = downmix.into();
        }
        if self.no_cache {
            options.use_cache = false;
        }
        Ok(options)
    }
}

pub async fn handle_extract(args: ExtractArgs) -> anyhow::Result<()> {
    let options = args.options()?;
    tracing::debug!("Extract options: {:?}", options);

    let input = args
        .input
        .to_str()
        .with_context(|| format!("Path is not valid UTF-8: {}", args.input.display()))?;

    let envelope = WaveformExtractor::new()
        .extract(input, &options, |progress| {
            tracing::debug!("Progress: {:.0}%", progress * 100.0);
        })
        .await
        .with_context(|| format!("Failed to extract waveform from {}", input))?;

    write_envelope(&args.output, &envelope)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ExtractArgs {
        ExtractArgs {
            input: PathBuf::from("in.wav"),
            output: PathBuf::from("out.wave"),
            samples_per_pixel: None,
            pixels_per_second: None,
            bits: None,
            channels: None,
            downmix: None,
            config: None,
            no_cache: false,
        }
    }

    #[test]
    fn test_default_options() {
        assert_eq!(args().options().unwrap(), ExtractOptions::default());
    }

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("options.json");
        fs::write(&config, r#"{"zoom": {"samples_per_pixel": 512}, "channels": 2, "bits": 8}"#)
            .unwrap();

        let options = ExtractArgs {
            config: Some(config),
            pixels_per_second: Some(50),
            downmix: Some(DownmixArg::Drop),
            no_cache: true,
            ..args()
        }
        .options()
        .unwrap();

        assert_eq!(options.zoom, Zoom::PixelsPerSecond(50));
        assert_eq!(options.channels, 2);
        assert_eq!(options.bits, BitDepth::Eight);
        assert_eq!(options.downmix, Downmix::Drop);
        assert!(!options.use_cache);
    }

    #[test]
    fn test_rejects_bad_bits() {
        let err = ExtractArgs {
            bits: Some(24),
            ..args()
        }
        .options()
        .unwrap_err();
        assert!(err.to_string().contains("8 or 16"));
    }
}
