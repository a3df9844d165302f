//! Audio header probing
//!
//! Reads the header of an attached audio file without decoding samples.
//! WAV files go through hound; anything hound rejects is handed to symphonia's
//! format probe, which covers FLAC, MP3, OGG, AIFF and friends.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Header fields of an audio file; unknown values are `None`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioHeader {
    /// Container or codec name, e.g. `wav`, `flac`, `mp3`
    pub format: String,
    pub frame_rate: Option<u32>,
    pub channels: Option<u16>,
    pub frames: Option<u64>,
    /// Bits per sample
    pub sample_width: Option<u32>,
}

fn or_none<T: fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "None".to_string(),
    }
}

impl fmt::Display for AudioHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "filetype: {}, framerate: {}, nchannels: {}, nframes: {}, sampwidth: {}",
            self.format,
            or_none(&self.frame_rate),
            or_none(&self.channels),
            or_none(&self.frames),
            or_none(&self.sample_width),
        )
    }
}

/// Outcome of probing a recording's audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioProbe {
    Success(AudioHeader),
    /// No audio file, or its header could not be read
    Unavailable,
}

impl AudioProbe {
    pub fn header(&self) -> Option<&AudioHeader> {
        match self {
            AudioProbe::Success(header) => Some(header),
            AudioProbe::Unavailable => None,
        }
    }
}

impl fmt::Display for AudioProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioProbe::Success(header) => fmt::Display::fmt(header, f),
            AudioProbe::Unavailable => f.write_str("None"),
        }
    }
}

pub trait AudioHeaderProbe {
    fn probe(&self, path: &Path) -> Result<AudioHeader>;
}

/// Default probe: hound for WAV, symphonia for everything else
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderSniffer;

impl HeaderSniffer {
    pub fn new() -> Self {
        Self
    }

    fn probe_wav(path: &Path) -> Result<AudioHeader> {
        let reader = hound::WavReader::open(path)
            .with_context(|| format!("Failed to read WAV header: {}", path.display()))?;
        let spec = reader.spec();

        Ok(AudioHeader {
            format: "wav".to_string(),
            frame_rate: Some(spec.sample_rate),
            channels: Some(spec.channels),
            frames: Some(u64::from(reader.duration())),
            sample_width: Some(u32::from(spec.bits_per_sample)),
        })
    }

    fn probe_container(path: &Path) -> Result<AudioHeader> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .with_context(|| format!("Failed to probe audio file: {}", path.display()))?;

        let track = probed
            .format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .context("No audio track found in file")?;
        let params = &track.codec_params;

        let format = symphonia::default::get_codecs()
            .get_codec(params.codec)
            .map(|descriptor| descriptor.short_name.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Ok(AudioHeader {
            format,
            frame_rate: params.sample_rate,
            channels: params.channels.map(|c| c.count() as u16),
            frames: params.n_frames,
            sample_width: params.bits_per_sample.or(params.bits_per_coded_sample),
        })
    }
}

impl AudioHeaderProbe for HeaderSniffer {
    fn probe(&self, path: &Path) -> Result<AudioHeader> {
        match Self::probe_wav(path) {
            Ok(header) => Ok(header),
            Err(wav_err) => {
                log::debug!("Not a WAV file, probing container: {:#}", wav_err);
                Self::probe_container(path)
            }
        }
    }
}
