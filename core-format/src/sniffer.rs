//! Magic-byte sniffing over a short header sample.

use crate::detector::{DetectionMethod, DetectionResult};
use crate::registry::{AudioFormat, FormatRegistry, SNIFF_PRIORITY};

/// Confidence for a signature that identifies exactly one format.
pub const UNAMBIGUOUS_CONFIDENCE: f64 = 0.95;
/// Confidence once the codec inside a container has been guessed.
pub const CONTAINER_CONFIDENCE: f64 = 0.9;

const MIN_SAMPLE: usize = 4;

#[derive(Debug, Clone)]
pub struct MagicByteSniffer {
    sample_len: usize,
}

impl Default for MagicByteSniffer {
    fn default() -> Self {
        Self::new(64)
    }
}

impl MagicByteSniffer {
    pub fn new(sample_len: usize) -> Self {
        Self { sample_len }
    }

    /// Classifies `data` by its leading bytes. Only the first `sample_len`
    /// bytes are considered.
    pub fn sniff(&self, data: &[u8]) -> DetectionResult {
        let sample = &data[..data.len().min(self.sample_len)];
        if sample.len() < MIN_SAMPLE {
            return DetectionResult::unknown(DetectionMethod::MagicBytes);
        }

        for format in SNIFF_PRIORITY {
            if !FormatRegistry::by_kind(format).matches_signature(sample) {
                continue;
            }

            return match format {
                AudioFormat::M4a => DetectionResult::new(
                    disambiguate_mp4(sample),
                    CONTAINER_CONFIDENCE,
                    DetectionMethod::MagicBytes,
                )
                .with_container(AudioFormat::M4a),
                AudioFormat::Ogg => DetectionResult::new(
                    disambiguate_ogg(sample),
                    CONTAINER_CONFIDENCE,
                    DetectionMethod::MagicBytes,
                )
                .with_container(AudioFormat::Ogg),
                other => {
                    DetectionResult::new(other, UNAMBIGUOUS_CONFIDENCE, DetectionMethod::MagicBytes)
                }
            };
        }

        DetectionResult::unknown(DetectionMethod::MagicBytes)
    }
}

fn disambiguate_mp4(sample: &[u8]) -> AudioFormat {
    if contains(sample, b"alac") {
        AudioFormat::Alac
    } else {
        // "mp4a" and unmarked files both default to AAC.
        AudioFormat::Aac
    }
}

fn disambiguate_ogg(sample: &[u8]) -> AudioFormat {
    if contains(sample, b"OpusHead") {
        AudioFormat::Opus
    } else {
        AudioFormat::Ogg
    }
}

pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sniff(data: &[u8]) -> DetectionResult {
        MagicByteSniffer::default().sniff(data)
    }

    #[test]
    fn short_input_is_unknown() {
        let result = sniff(b"fLa");
        assert_eq!(result.format, AudioFormat::Unknown);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn unambiguous_signatures() {
        let cases: [(&[u8], AudioFormat); 6] = [
            (b"fLaC\x00\x00\x00\x22", AudioFormat::Flac),
            (b"RIFF\x00\x00\x00\x00WAVEfmt ", AudioFormat::Wav),
            (b"FORM\x00\x00\x00\x00AIFFCOMM", AudioFormat::Aiff),
            (b"ID3\x04\x00\x00\x00\x00\x00\x00", AudioFormat::Mp3),
            (&[0xFF, 0xFB, 0x90, 0x00], AudioFormat::Mp3),
            (&[0xFF, 0xF1, 0x50, 0x80], AudioFormat::Aac),
        ];

        for (data, expected) in cases {
            let result = sniff(data);
            assert_eq!(result.format, expected);
            assert_eq!(result.confidence, UNAMBIGUOUS_CONFIDENCE);
            assert_eq!(result.container, None);
            assert_eq!(result.method, DetectionMethod::MagicBytes);
        }
    }

    #[test]
    fn mp4_codec_disambiguation() {
        let alac = b"\x00\x00\x00\x18ftypM4A \x00\x00\x00\x00\x00\x00\x00\x10stsdalac";
        let result = sniff(alac);
        assert_eq!(result.format, AudioFormat::Alac);
        assert_eq!(result.container, Some(AudioFormat::M4a));
        assert_eq!(result.confidence, CONTAINER_CONFIDENCE);

        let aac = b"\x00\x00\x00\x18ftypM4A \x00\x00\x00\x00\x00\x00\x00\x10stsdmp4a";
        assert_eq!(sniff(aac).format, AudioFormat::Aac);

        let plain = b"\x00\x00\x00\x18ftypisom\x00\x00\x00\x00";
        assert_eq!(sniff(plain).format, AudioFormat::Aac);
    }

    #[test]
    fn ogg_codec_disambiguation() {
        let mut opus = b"OggS\x00\x02".to_vec();
        opus.extend_from_slice(&[0u8; 22]);
        opus.extend_from_slice(b"OpusHead");
        let result = sniff(&opus);
        assert_eq!(result.format, AudioFormat::Opus);
        assert_eq!(result.container, Some(AudioFormat::Ogg));

        let mut vorbis = b"OggS\x00\x02".to_vec();
        vorbis.extend_from_slice(&[0u8; 22]);
        vorbis.extend_from_slice(b"\x01vorbis");
        assert_eq!(sniff(&vorbis).format, AudioFormat::Ogg);
    }

    #[test]
    fn disambiguation_only_searches_the_sample() {
        let mut data = b"\x00\x00\x00\x18ftypM4A ".to_vec();
        data.extend_from_slice(&[0u8; 100]);
        data.extend_from_slice(b"alac");
        assert_eq!(sniff(&data).format, AudioFormat::Aac);
    }

    #[test]
    fn unrecognised_bytes() {
        let result = sniff(b"just some text that is not audio");
        assert_eq!(result.format, AudioFormat::Unknown);
        assert_eq!(result.confidence, 0.0);
    }
}
