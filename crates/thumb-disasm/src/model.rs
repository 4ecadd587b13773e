use anyhow::Result;
use clap::ValueEnum;
use std::path::Path;

use thumb_rs::program::{from_le_bytes, parse_hex_program};

/// On-disk form of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImageFormat {
    /// One hex word per line, as the assembler prints it
    Hex,
    /// Raw 16-bit little-endian words
    Bin,
}

#[derive(Debug, Clone)]
pub struct Image {
    pub name: String,
    /// Address (in words) of the first loaded word.
    pub base: usize,
    pub words: Vec<u16>,
}

pub fn load_image(path: &Path, format: ImageFormat, skip: usize, len: Option<usize>) -> Result<Image> {
    let words = match format {
        ImageFormat::Hex => parse_hex_program(&std::fs::read_to_string(path)?)?,
        ImageFormat::Bin => from_le_bytes(&std::fs::read(path)?)?,
    };
    anyhow::ensure!(skip <= words.len(), "--skip exceeds program size");
    let mut payload = &words[skip..];
    if let Some(lim) = len {
        anyhow::ensure!(lim <= payload.len(), "--len exceeds remaining words after skip");
        payload = &payload[..lim];
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".into());
    Ok(Image { name, base: skip, words: payload.to_vec() })
}

pub fn read_u16(img: &Image, addr: usize) -> Option<u16> {
    addr.checked_sub(img.base).and_then(|i| img.words.get(i)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loader_maps_skip_and_len() {
        let cwd = std::env::current_dir().unwrap();
        let path = cwd.join("_test_image.bin");
        std::fs::write(&path, [0xff, 0x21, 0x49, 0x00, 0x01, 0x39, 0xfd, 0xd1]).unwrap();
        let img = load_image(&path, ImageFormat::Bin, 1, Some(2)).unwrap();
        assert_eq!(img.base, 1);
        assert_eq!(img.words, vec![0x0049, 0x3901]);
        assert_eq!(read_u16(&img, 2), Some(0x3901));
        assert_eq!(read_u16(&img, 0), None);
        assert!(load_image(&path, ImageFormat::Bin, 5, None).is_err());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn loader_reads_hex_listing() {
        let cwd = std::env::current_dir().unwrap();
        let path = cwd.join("_test_image.hex");
        std::fs::write(&path, "21FF\n0049\n").unwrap();
        let img = load_image(&path, ImageFormat::Hex, 0, None).unwrap();
        assert_eq!(img.words, vec![0x21ff, 0x0049]);
        let _ = std::fs::remove_file(&path);
    }
}
