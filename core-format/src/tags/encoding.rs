//! ID3 text encodings.

/// Text encoding byte found at the start of ID3v2 text frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Latin1,
    /// UTF-16 with a byte order mark.
    Utf16,
    Utf16Be,
    Utf8,
}

impl TextEncoding {
    /// Unknown encoding bytes are treated as Latin-1.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            1 => TextEncoding::Utf16,
            2 => TextEncoding::Utf16Be,
            3 => TextEncoding::Utf8,
            _ => TextEncoding::Latin1,
        }
    }

    /// Width of the string terminator in bytes.
    pub fn terminator_len(&self) -> usize {
        match self {
            TextEncoding::Utf16 | TextEncoding::Utf16Be => 2,
            TextEncoding::Latin1 | TextEncoding::Utf8 => 1,
        }
    }

    /// Decodes and trims `bytes`, dropping embedded terminators.
    pub fn decode(&self, bytes: &[u8]) -> String {
        let text = match self {
            TextEncoding::Latin1 => decode_latin1(bytes),
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            TextEncoding::Utf16 => decode_utf16_bom(bytes),
            TextEncoding::Utf16Be => decode_utf16(bytes, u16::from_be_bytes),
        };
        text.trim_matches(|c: char| c == '\0' || c.is_whitespace())
            .to_string()
    }

    /// Splits at the first terminator, returning the text before it and the
    /// bytes after it. Without a terminator everything is text.
    pub fn split_terminated<'a>(&self, bytes: &'a [u8]) -> (&'a [u8], &'a [u8]) {
        let width = self.terminator_len();
        let mut index = 0;
        while index + width <= bytes.len() {
            if bytes[index..index + width].iter().all(|b| *b == 0) {
                return (&bytes[..index], &bytes[index + width..]);
            }
            index += width;
        }
        (bytes, &[])
    }
}

pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn decode_utf16_bom(bytes: &[u8]) -> String {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        // Missing BOM; little-endian is what most writers produce.
        _ => decode_utf16(bytes, u16::from_le_bytes),
    }
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}
