//! MPEG audio frame header decoding.
//!
//! Header layout (32 bits, big-endian):
//!
//! ```text
//! AAAAAAAA AAABBCCD EEEEFFGH IIJJKLMM
//! A sync, B version, C layer, D protection,
//! E bitrate index, F sample-rate index, G padding, ...
//! ```

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    V1,
    V2,
    V25,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    I,
    II,
    III,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: MpegVersion,
    pub layer: Layer,
    /// kbit/s; 0 means free format.
    pub bitrate_kbps: u32,
    pub sample_rate: u32,
    pub padding: bool,
    pub channels: u16,
}

// Indexed by bitrate index 0..=14; index 15 is invalid.
const BITRATES_V1_L1: [u32; 15] = [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448];
const BITRATES_V1_L2: [u32; 15] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384];
const BITRATES_V1_L3: [u32; 15] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
const BITRATES_V2_L1: [u32; 15] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256];
const BITRATES_V2_L23: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

const SAMPLE_RATES_V1: [u32; 3] = [44100, 48000, 32000];
const SAMPLE_RATES_V2: [u32; 3] = [22050, 24000, 16000];
const SAMPLE_RATES_V25: [u32; 3] = [11025, 12000, 8000];

impl FrameHeader {
    /// Decodes the four bytes at the start of `bytes`, or `None` if they are
    /// not a valid header.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let header = bytes.get(..4)?;
        if header[0] != 0xFF || header[1] & 0xE0 != 0xE0 {
            return None;
        }

        let version = match (header[1] >> 3) & 0x03 {
            0b00 => MpegVersion::V25,
            0b10 => MpegVersion::V2,
            0b11 => MpegVersion::V1,
            _ => return None,
        };
        let layer = match (header[1] >> 1) & 0x03 {
            0b01 => Layer::III,
            0b10 => Layer::II,
            0b11 => Layer::I,
            _ => return None,
        };

        let bitrate_index = (header[2] >> 4) as usize;
        let sample_rate_index = ((header[2] >> 2) & 0x03) as usize;
        if bitrate_index == 0x0F || sample_rate_index == 0x03 {
            return None;
        }

        let bitrates = match (version, layer) {
            (MpegVersion::V1, Layer::I) => &BITRATES_V1_L1,
            (MpegVersion::V1, Layer::II) => &BITRATES_V1_L2,
            (MpegVersion::V1, Layer::III) => &BITRATES_V1_L3,
            (_, Layer::I) => &BITRATES_V2_L1,
            (_, _) => &BITRATES_V2_L23,
        };
        let sample_rates = match version {
            MpegVersion::V1 => &SAMPLE_RATES_V1,
            MpegVersion::V2 => &SAMPLE_RATES_V2,
            MpegVersion::V25 => &SAMPLE_RATES_V25,
        };

        let channel_mode = header[3] >> 6;

        Some(Self {
            version,
            layer,
            bitrate_kbps: bitrates[bitrate_index],
            sample_rate: sample_rates[sample_rate_index],
            padding: header[2] & 0x02 != 0,
            channels: if channel_mode == 0b11 { 1 } else { 2 },
        })
    }

    pub fn samples_per_frame(&self) -> u32 {
        match (self.layer, self.version) {
            (Layer::I, _) => 384,
            (Layer::II, _) => 1152,
            (Layer::III, MpegVersion::V1) => 1152,
            (Layer::III, _) => 576,
        }
    }

    /// Frame length in bytes including the header. `None` for free-format
    /// streams, whose length is not encoded in the header.
    pub fn frame_len(&self) -> Option<usize> {
        if self.bitrate_kbps == 0 {
            return None;
        }
        let bitrate = self.bitrate_kbps * 1000;
        let padding = u32::from(self.padding);
        let len = match self.layer {
            Layer::I => (12 * bitrate / self.sample_rate + padding) * 4,
            Layer::II => 144 * bitrate / self.sample_rate + padding,
            Layer::III => match self.version {
                MpegVersion::V1 => 144 * bitrate / self.sample_rate + padding,
                _ => 72 * bitrate / self.sample_rate + padding,
            },
        };
        Some(len as usize)
    }

    /// Playback time estimated from the audio payload size, assuming a
    /// constant bitrate.
    pub fn estimate_duration(&self, audio_bytes: u64) -> Option<Duration> {
        if self.bitrate_kbps == 0 {
            return None;
        }
        let millis = audio_bytes * 8 / u64::from(self.bitrate_kbps);
        Some(Duration::from_millis(millis))
    }
}

/// ADTS header check: 12-bit sync plus a zero layer field.
pub fn is_adts_header(bytes: &[u8]) -> bool {
    match bytes.get(..2) {
        Some(header) => header[0] == 0xFF && header[1] & 0xF6 == 0xF0,
        None => false,
    }
}

/// ADTS frame length from the 13-bit field spanning bytes 3..6.
pub fn adts_frame_len(bytes: &[u8]) -> Option<usize> {
    let header = bytes.get(..7)?;
    let len = ((usize::from(header[3]) & 0x03) << 11)
        | (usize::from(header[4]) << 3)
        | (usize::from(header[5]) >> 5);
    (len >= 7).then_some(len)
}
