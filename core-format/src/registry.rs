//! Static format descriptor table.
//!
//! Every supported format is described once: its extensions, MIME types,
//! magic-byte signatures and whether it is lossy. Lookups are pure and never
//! fail; anything unrecognised resolves to [`AudioFormat::Unknown`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Audio formats the engine can classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Aac,
    M4a,
    Flac,
    Ogg,
    Wav,
    Aiff,
    Alac,
    Opus,
    Unknown,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Aac => "aac",
            AudioFormat::M4a => "m4a",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Wav => "wav",
            AudioFormat::Aiff => "aiff",
            AudioFormat::Alac => "alac",
            AudioFormat::Opus => "opus",
            AudioFormat::Unknown => "unknown",
        }
    }

    /// Outer container family for codecs that usually travel inside one.
    pub fn container(&self) -> Option<AudioFormat> {
        match self {
            AudioFormat::Aac | AudioFormat::Alac => Some(AudioFormat::M4a),
            AudioFormat::Opus => Some(AudioFormat::Ogg),
            _ => None,
        }
    }

    /// Whether the format can carry more than one codec.
    pub fn is_container(&self) -> bool {
        matches!(self, AudioFormat::M4a | AudioFormat::Ogg)
    }

    /// `true` if `self` is `expected` or lives inside the `expected` container.
    pub fn matches(&self, expected: AudioFormat) -> bool {
        *self == expected || self.container() == Some(expected)
    }

    /// Confidence attached to a guess made from the file extension alone.
    ///
    /// Containers and formats sharing an extension with other codecs score
    /// lower than unambiguous ones.
    pub fn extension_confidence(&self) -> f64 {
        match self {
            AudioFormat::Mp3
            | AudioFormat::Flac
            | AudioFormat::Wav
            | AudioFormat::Aiff
            | AudioFormat::Aac
            | AudioFormat::Opus => 0.8,
            AudioFormat::Ogg | AudioFormat::M4a | AudioFormat::Alac => 0.7,
            AudioFormat::Unknown => 0.0,
        }
    }

    pub fn descriptor(&self) -> &'static FormatDescriptor {
        FormatRegistry::by_kind(*self)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extra bytes that must appear at a fixed offset for a signature to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Qualifier {
    pub offset: usize,
    pub any_of: &'static [&'static [u8]],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicSignature {
    pub offset: usize,
    pub bytes: &'static [u8],
    pub qualifier: Option<Qualifier>,
}

impl MagicSignature {
    const fn at_start(bytes: &'static [u8]) -> Self {
        Self {
            offset: 0,
            bytes,
            qualifier: None,
        }
    }

    const fn qualified(bytes: &'static [u8], qualifier: Qualifier) -> Self {
        Self {
            offset: 0,
            bytes,
            qualifier: Some(qualifier),
        }
    }

    /// Tests the signature against `data` without reading past its end.
    pub fn matches(&self, data: &[u8]) -> bool {
        let end = self.offset + self.bytes.len();
        if data.get(self.offset..end) != Some(self.bytes) {
            return false;
        }

        match self.qualifier {
            None => true,
            Some(qualifier) => qualifier.any_of.iter().any(|candidate| {
                data.get(qualifier.offset..qualifier.offset + candidate.len()) == Some(*candidate)
            }),
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct FormatDescriptor {
    pub format: AudioFormat,
    pub display_name: &'static str,
    pub extensions: &'static [&'static str],
    pub mime_types: &'static [&'static str],
    /// Ordered; the first matching signature wins.
    pub signatures: &'static [MagicSignature],
    pub lossy: bool,
}

impl FormatDescriptor {
    pub fn is_lossless(&self) -> bool {
        !self.lossy && self.format != AudioFormat::Unknown
    }

    pub fn primary_extension(&self) -> Option<&'static str> {
        self.extensions.first().copied()
    }

    pub fn matches_signature(&self, data: &[u8]) -> bool {
        self.signatures.iter().any(|sig| sig.matches(data))
    }
}

static DESCRIPTORS: [FormatDescriptor; 10] = [
    FormatDescriptor {
        format: AudioFormat::Mp3,
        display_name: "MPEG Layer III",
        extensions: &["mp3"],
        mime_types: &["audio/mpeg", "audio/mp3"],
        signatures: &[
            MagicSignature::at_start(b"ID3"),
            MagicSignature::at_start(&[0xFF, 0xFB]),
            MagicSignature::at_start(&[0xFF, 0xF3]),
            MagicSignature::at_start(&[0xFF, 0xF2]),
            MagicSignature::at_start(&[0xFF, 0xFA]),
        ],
        lossy: true,
    },
    FormatDescriptor {
        format: AudioFormat::Aac,
        display_name: "Advanced Audio Coding",
        extensions: &["aac"],
        mime_types: &["audio/aac", "audio/aacp", "audio/x-aac"],
        signatures: &[
            MagicSignature::at_start(&[0xFF, 0xF1]),
            MagicSignature::at_start(&[0xFF, 0xF9]),
        ],
        lossy: true,
    },
    FormatDescriptor {
        format: AudioFormat::M4a,
        display_name: "MPEG-4 Audio",
        extensions: &["m4a", "mp4", "m4b"],
        mime_types: &["audio/mp4", "audio/x-m4a", "audio/m4a"],
        signatures: &[MagicSignature {
            offset: 4,
            bytes: b"ftyp",
            qualifier: None,
        }],
        lossy: true,
    },
    FormatDescriptor {
        format: AudioFormat::Flac,
        display_name: "Free Lossless Audio Codec",
        extensions: &["flac"],
        mime_types: &["audio/flac", "audio/x-flac"],
        signatures: &[MagicSignature::at_start(b"fLaC")],
        lossy: false,
    },
    FormatDescriptor {
        format: AudioFormat::Ogg,
        display_name: "Ogg Vorbis",
        extensions: &["ogg", "oga"],
        mime_types: &["audio/ogg", "audio/vorbis", "audio/x-vorbis+ogg"],
        signatures: &[MagicSignature::at_start(b"OggS")],
        lossy: true,
    },
    FormatDescriptor {
        format: AudioFormat::Wav,
        display_name: "Waveform Audio",
        extensions: &["wav", "wave"],
        mime_types: &["audio/wav", "audio/x-wav", "audio/wave", "audio/vnd.wave"],
        signatures: &[MagicSignature::qualified(
            b"RIFF",
            Qualifier {
                offset: 8,
                any_of: &[b"WAVE"],
            },
        )],
        lossy: false,
    },
    FormatDescriptor {
        format: AudioFormat::Aiff,
        display_name: "Audio Interchange File Format",
        extensions: &["aiff", "aif", "aifc"],
        mime_types: &["audio/aiff", "audio/x-aiff"],
        signatures: &[MagicSignature::qualified(
            b"FORM",
            Qualifier {
                offset: 8,
                any_of: &[b"AIFF", b"AIFC"],
            },
        )],
        lossy: false,
    },
    FormatDescriptor {
        format: AudioFormat::Alac,
        display_name: "Apple Lossless",
        extensions: &["alac"],
        mime_types: &["audio/alac"],
        signatures: &[],
        lossy: false,
    },
    FormatDescriptor {
        format: AudioFormat::Opus,
        display_name: "Opus",
        extensions: &["opus"],
        mime_types: &["audio/opus"],
        signatures: &[],
        lossy: true,
    },
    FormatDescriptor {
        format: AudioFormat::Unknown,
        display_name: "Unknown",
        extensions: &[],
        mime_types: &[],
        signatures: &[],
        lossy: true,
    },
];

/// Order in which the sniffer tries signatures.
pub const SNIFF_PRIORITY: [AudioFormat; 7] = [
    AudioFormat::Flac,
    AudioFormat::Ogg,
    AudioFormat::Wav,
    AudioFormat::Aiff,
    AudioFormat::M4a,
    AudioFormat::Aac,
    AudioFormat::Mp3,
];

pub struct FormatRegistry;

impl FormatRegistry {
    pub fn all() -> &'static [FormatDescriptor] {
        &DESCRIPTORS
    }

    pub fn by_kind(format: AudioFormat) -> &'static FormatDescriptor {
        DESCRIPTORS
            .iter()
            .find(|d| d.format == format)
            .unwrap_or(&DESCRIPTORS[DESCRIPTORS.len() - 1])
    }

    /// Case-insensitive; a leading dot is tolerated.
    pub fn by_extension(ext: &str) -> &'static FormatDescriptor {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        DESCRIPTORS
            .iter()
            .find(|d| d.extensions.contains(&ext.as_str()))
            .unwrap_or_else(|| Self::by_kind(AudioFormat::Unknown))
    }

    /// Parameters such as `; codecs=...` are ignored.
    pub fn by_mime(mime: &str) -> &'static FormatDescriptor {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        DESCRIPTORS
            .iter()
            .find(|d| d.mime_types.contains(&essence.as_str()))
            .unwrap_or_else(|| Self::by_kind(AudioFormat::Unknown))
    }

    pub fn by_path(path: &std::path::Path) -> &'static FormatDescriptor {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => Self::by_extension(ext),
            None => Self::by_kind(AudioFormat::Unknown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn extension_lookup_is_case_insensitive() {
        assert_eq!(FormatRegistry::by_extension("MP3").format, AudioFormat::Mp3);
        assert_eq!(FormatRegistry::by_extension(".Flac").format, AudioFormat::Flac);
        assert_eq!(FormatRegistry::by_extension("m4b").format, AudioFormat::M4a);
        assert_eq!(FormatRegistry::by_extension("xyz").format, AudioFormat::Unknown);
    }

    #[test]
    fn mime_lookup_ignores_parameters() {
        assert_eq!(FormatRegistry::by_mime("audio/mpeg").format, AudioFormat::Mp3);
        assert_eq!(
            FormatRegistry::by_mime("Audio/Ogg; codecs=vorbis").format,
            AudioFormat::Ogg
        );
        assert_eq!(FormatRegistry::by_mime("video/webm").format, AudioFormat::Unknown);
    }

    #[test]
    fn path_lookup() {
        assert_eq!(
            FormatRegistry::by_path(Path::new("/music/song.wav")).format,
            AudioFormat::Wav
        );
        assert_eq!(
            FormatRegistry::by_path(Path::new("/music/README")).format,
            AudioFormat::Unknown
        );
    }

    #[test]
    fn every_kind_has_one_descriptor() {
        for descriptor in FormatRegistry::all() {
            assert_eq!(FormatRegistry::by_kind(descriptor.format), descriptor);
        }
    }

    #[test]
    fn qualified_signatures() {
        let wav = FormatRegistry::by_kind(AudioFormat::Wav);
        assert!(wav.matches_signature(b"RIFF\x24\x00\x00\x00WAVEfmt "));
        assert!(!wav.matches_signature(b"RIFF\x24\x00\x00\x00AVI LIST"));

        let aiff = FormatRegistry::by_kind(AudioFormat::Aiff);
        assert!(aiff.matches_signature(b"FORM\x00\x00\x00\x10AIFC"));
        assert!(!aiff.matches_signature(b"FORM\x00\x00"));
    }

    #[test]
    fn signature_never_reads_past_buffer() {
        let m4a = FormatRegistry::by_kind(AudioFormat::M4a);
        assert!(!m4a.matches_signature(b"\x00\x00\x00\x20ft"));
        assert!(m4a.matches_signature(b"\x00\x00\x00\x20ftyp"));
    }

    #[test]
    fn container_relationships() {
        assert!(AudioFormat::Alac.matches(AudioFormat::M4a));
        assert!(AudioFormat::Aac.matches(AudioFormat::M4a));
        assert!(AudioFormat::Opus.matches(AudioFormat::Ogg));
        assert!(!AudioFormat::Ogg.matches(AudioFormat::Opus));
        assert!(!AudioFormat::Mp3.matches(AudioFormat::Flac));
    }

    #[test]
    fn lossless_flags() {
        assert!(FormatRegistry::by_kind(AudioFormat::Flac).is_lossless());
        assert!(FormatRegistry::by_kind(AudioFormat::Alac).is_lossless());
        assert!(!FormatRegistry::by_kind(AudioFormat::Mp3).is_lossless());
        assert!(!FormatRegistry::by_kind(AudioFormat::Unknown).is_lossless());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&AudioFormat::M4a).unwrap();
        assert_eq!(json, "\"m4a\"");
    }
}
