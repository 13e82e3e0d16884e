//! Legacy ID3v1 genre table (the original 80 entries).

pub const GENRES: [&str; 80] = [
    "Blues", "Classic Rock", "Country", "Dance", "Disco", "Funk", "Grunge", "Hip-Hop",
    "Jazz", "Metal", "New Age", "Oldies", "Other", "Pop", "R&B", "Rap",
    "Reggae", "Rock", "Techno", "Industrial", "Alternative", "Ska", "Death Metal", "Pranks",
    "Soundtrack", "Euro-Techno", "Ambient", "Trip-Hop", "Vocal", "Jazz+Funk", "Fusion", "Trance",
    "Classical", "Instrumental", "Acid", "House", "Game", "Sound Clip", "Gospel", "Noise",
    "AlternRock", "Bass", "Soul", "Punk", "Space", "Meditative", "Instrumental Pop", "Instrumental Rock",
    "Ethnic", "Gothic", "Darkwave", "Techno-Industrial", "Electronic", "Pop-Folk", "Eurodance", "Dream",
    "Southern Rock", "Comedy", "Cult", "Gangsta", "Top 40", "Christian Rap", "Pop/Funk", "Jungle",
    "Native American", "Cabaret", "New Wave", "Psychadelic", "Rave", "Showtunes", "Trailer", "Lo-Fi",
    "Tribal", "Acid Punk", "Acid Jazz", "Polka", "Retro", "Musical", "Rock & Roll", "Hard Rock",
];

pub fn genre_name(index: u8) -> Option<&'static str> {
    GENRES.get(usize::from(index)).copied()
}

/// Resolves a TCON value. `"(17)"` and `"(17)Rock"` map through the table;
/// a bare number is also accepted. Anything else is returned as written.
pub fn resolve(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(rest) = value.strip_prefix('(') {
        if let Some((number, refinement)) = rest.split_once(')') {
            if let Some(name) = number.parse::<u8>().ok().and_then(genre_name) {
                return Some(name.to_string());
            }
            let refinement = refinement.trim();
            if !refinement.is_empty() {
                return Some(refinement.to_string());
            }
        }
    }

    if let Some(name) = value.parse::<u8>().ok().and_then(genre_name) {
        return Some(name.to_string());
    }

    Some(value.to_string())
}
