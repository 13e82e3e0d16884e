//! Deep inspection backed by Symphonia.
//!
//! Opens the file with Symphonia's probe, walks the audio tracks and tries to
//! instantiate a decoder for each of them. Probing is blocking I/O, so every
//! call runs on Tokio's blocking pool and concurrent calls never wait on each
//! other.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    introspection::{AudioIntrospector, AudioTrackInfo, IntrospectionReport},
};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use symphonia::core::codecs::{CodecParameters, CodecType, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, instrument};

/// Symphonia-based [`AudioIntrospector`].
#[derive(Debug, Clone, Default)]
pub struct SymphoniaIntrospector;

impl SymphoniaIntrospector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioIntrospector for SymphoniaIntrospector {
    #[instrument(skip(self, path), fields(file = ?path.file_name()))]
    async fn introspect(&self, path: &Path) -> Result<IntrospectionReport> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || probe_file(&path))
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Introspection task failed: {}", e)))?
    }
}

fn probe_file(path: &Path) -> Result<IntrospectionReport> {
    let file = File::open(path)?;
    let file_size = file.metadata().ok().map(|m| m.len());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let probed = match symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    ) {
        Ok(probed) => probed,
        Err(e) => {
            debug!(error = %e, "Symphonia could not probe file");
            return Ok(IntrospectionReport::unplayable());
        }
    };

    let mut report = IntrospectionReport::default();

    for track in probed
        .format
        .tracks()
        .iter()
        .filter(|t| t.codec_params.codec != CODEC_TYPE_NULL)
    {
        let params = &track.codec_params;
        let duration = track_duration(params);
        if report.duration.is_none() {
            report.duration = duration;
        }

        let mut info = AudioTrackInfo::new(codec_id(params.codec));
        info.sample_rate = params.sample_rate;
        info.channels = params.channels.map(|ch| ch.count() as u16);
        info.bit_depth = params.bits_per_sample.map(|b| b as u16);
        info.estimated_bitrate = match (file_size, duration) {
            (Some(size), Some(d)) if d.as_secs_f64() > 0.0 => {
                Some((size as f64 * 8.0 / d.as_secs_f64()) as u32)
            }
            _ => None,
        };

        if is_decodable(params) {
            report.is_playable = true;
        }

        debug!(codec = %info.format_id, sample_rate = ?info.sample_rate, "Found audio track");
        report.audio_tracks.push(info);
    }

    Ok(report)
}

fn track_duration(params: &CodecParameters) -> Option<Duration> {
    let frames = params.n_frames?;
    if let Some(time_base) = params.time_base {
        let time = time_base.calc_time(frames);
        return Some(Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac));
    }
    params
        .sample_rate
        .filter(|rate| *rate > 0)
        .map(|rate| Duration::from_secs_f64(frames as f64 / rate as f64))
}

fn is_decodable(params: &CodecParameters) -> bool {
    use symphonia::core::codecs::CODEC_TYPE_OPUS;

    // Symphonia demuxes Opus but ships no Opus decoder.
    params.codec == CODEC_TYPE_OPUS
        || symphonia::default::get_codecs()
            .make(params, &DecoderOptions::default())
            .is_ok()
}

/// Maps a Symphonia codec type to the identifier reported to the core.
fn codec_id(codec: CodecType) -> String {
    use symphonia::core::codecs::*;

    let id = if codec == CODEC_TYPE_MP3 {
        "mp3"
    } else if codec == CODEC_TYPE_MP2 || codec == CODEC_TYPE_MP1 {
        "mpeg"
    } else if codec == CODEC_TYPE_AAC {
        "aac"
    } else if codec == CODEC_TYPE_ALAC {
        "alac"
    } else if codec == CODEC_TYPE_FLAC {
        "flac"
    } else if codec == CODEC_TYPE_VORBIS {
        "vorbis"
    } else if codec == CODEC_TYPE_OPUS {
        "opus"
    } else if codec == CODEC_TYPE_PCM_S16LE
        || codec == CODEC_TYPE_PCM_S24LE
        || codec == CODEC_TYPE_PCM_S32LE
        || codec == CODEC_TYPE_PCM_F32LE
        || codec == CODEC_TYPE_PCM_F64LE
        || codec == CODEC_TYPE_PCM_U8
    {
        "pcm_le"
    } else if codec == CODEC_TYPE_PCM_S16BE
        || codec == CODEC_TYPE_PCM_S24BE
        || codec == CODEC_TYPE_PCM_S32BE
        || codec == CODEC_TYPE_PCM_F32BE
        || codec == CODEC_TYPE_PCM_F64BE
    {
        "pcm_be"
    } else {
        return symphonia::default::get_codecs()
            .get_codec(codec)
            .map(|descriptor| descriptor.short_name.to_string())
            .unwrap_or_else(|| "unknown".to_string());
    };

    id.to_string()
}
