use serde::Serialize;

use thumb_rs::decoder::{classify, Decoder, Format};
use thumb_rs::disasm::fmt_decoded;
use thumb_rs::isa::thumb::{link_offset, ThumbDecoder};

use crate::model::Image;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingLine {
    pub addr: usize,
    pub word: u16,
    pub format: Option<u8>,
    pub text: String,
    /// Resolved destination of a branch, in words.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifyLine {
    pub addr: usize,
    pub word: u16,
    pub format: Option<u8>,
    pub kind: Option<Format>,
    /// Resolved by the scheduler rather than the device.
    pub control_flow: bool,
}

pub fn list_image(img: &Image) -> Vec<ListingLine> {
    let dec = ThumbDecoder::new();
    let mut link_high = 0;
    let mut out = Vec::with_capacity(img.words.len());
    for (i, &word) in img.words.iter().enumerate() {
        let addr = img.base + i;
        let Some(d) = dec.decode(word) else {
            out.push(ListingLine { addr, word, format: None, text: format!(".hword {word:#06x}"), target: None });
            continue;
        };
        let (text, target) = match d.format {
            Format::CondBranch | Format::Branch => (fmt_decoded(&d), Some(addr as i64 + 2 + d.offset as i64)),
            Format::BranchLink if !d.flag => {
                link_high = d.offset;
                (fmt_decoded(&d), None)
            }
            Format::BranchLink => {
                let off = link_offset(link_high, d.offset);
                (format!("bl (1) {off}"), Some(addr as i64 + off as i64 + 1))
            }
            _ => (fmt_decoded(&d), None),
        };
        out.push(ListingLine { addr, word, format: Some(d.format.id()), text, target });
    }
    out
}

pub fn classify_image(img: &Image) -> Vec<ClassifyLine> {
    img.words
        .iter()
        .enumerate()
        .map(|(i, &word)| {
            let kind = classify(word);
            ClassifyLine {
                addr: img.base + i,
                word,
                format: kind.map(Format::id),
                kind,
                control_flow: kind.is_some_and(Format::is_control_flow),
            }
        })
        .collect()
}
