//! Program images: the hex text produced by the assembler and the 16-bit
//! little-endian binary form.

use std::fmt::Write as _;

/// Text the assembler front end emits instead of words when assembly failed.
pub const ASSEMBLY_FAILED: &str = "Error";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    #[error("program length {len} is not a multiple of 4 hex digits")]
    MalformedInput { len: usize },
    #[error("instruction {index} is not a hex word: {text}")]
    InvalidWord { index: usize, text: String },
    #[error("program was not assembled")]
    AssemblyFailed,
    #[error("binary image has an odd number of bytes ({len})")]
    OddByteCount { len: usize },
}

/// Parse a hex program.
///
/// `/` separates segments and a segment starting with `*` is skipped. All
/// whitespace is dropped, then every four characters form one word.
pub fn parse_hex_program(text: &str) -> Result<Vec<u16>, ProgramError> {
    let mut digits = String::new();
    for segment in text.split('/') {
        if segment.trim_start().starts_with('*') {
            continue;
        }
        digits.extend(segment.chars().filter(|c| !c.is_whitespace() && !c.is_control()));
    }
    if digits.contains(ASSEMBLY_FAILED) {
        return Err(ProgramError::AssemblyFailed);
    }
    if digits.len() % 4 != 0 {
        return Err(ProgramError::MalformedInput { len: digits.len() });
    }
    let chars: Vec<char> = digits.chars().collect();
    chars
        .chunks(4)
        .enumerate()
        .map(|(i, chunk)| {
            let word: String = chunk.iter().collect();
            u16::from_str_radix(&word, 16).map_err(|_| ProgramError::InvalidWord { index: i + 1, text: word })
        })
        .collect()
}

/// One uppercase four-digit word per line.
pub fn to_hex_listing(words: &[u16]) -> String {
    let mut out = String::with_capacity(words.len() * 5);
    for w in words {
        let _ = writeln!(out, "{w:04X}");
    }
    out
}

pub fn to_le_bytes(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

pub fn from_le_bytes(bytes: &[u8]) -> Result<Vec<u16>, ProgramError> {
    if bytes.len() % 2 != 0 {
        return Err(ProgramError::OddByteCount { len: bytes.len() });
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hex_listing_parses_back() {
        let text = to_hex_listing(&[0x21ff, 0x0049]);
        assert_eq!(text, "21FF\n0049\n");
        assert_eq!(parse_hex_program(&text).unwrap(), vec![0x21ff, 0x0049]);
    }

    #[test]
    fn skipped_segments_and_whitespace() {
        let words = parse_hex_program("*comment/21ff 3901\r\n/ d1fd").unwrap();
        assert_eq!(words, vec![0x21ff, 0x3901, 0xd1fd]);
    }

    #[test]
    fn rejects_bad_programs() {
        assert_eq!(parse_hex_program("Error"), Err(ProgramError::AssemblyFailed));
        assert_eq!(parse_hex_program("21f"), Err(ProgramError::MalformedInput { len: 3 }));
        assert_eq!(
            parse_hex_program("21ffzz01"),
            Err(ProgramError::InvalidWord {
                index: 2,
                text: "zz01".into()
            })
        );
    }

    #[test]
    fn little_endian_image() {
        assert_eq!(to_le_bytes(&[0x4770]), vec![0x70, 0x47]);
        assert_eq!(from_le_bytes(&[0x70, 0x47]).unwrap(), vec![0x4770]);
        assert_eq!(from_le_bytes(&[1]), Err(ProgramError::OddByteCount { len: 1 }));
    }
}
