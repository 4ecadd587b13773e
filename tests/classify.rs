use thumb_rs::decoder::{classify, Format, FORMAT_TABLE};

#[test]
fn narrow_masks_win_over_numeric_order() {
    // also matches the conditional branch pattern
    assert_eq!(classify(0xdf00), Some(Format::SoftwareInterrupt));
    // also matches move-shifted
    assert_eq!(classify(0x1800), Some(Format::AddSubtract));
    // also matches the ALU pattern family
    assert_eq!(classify(0x4770), Some(Format::HiRegister));
    assert_eq!(classify(0x4800), Some(Format::PcRelativeLoad));
    assert_eq!(classify(0x5200), Some(Format::SignExtendedLoad));
}

#[test]
fn every_format_reachable() {
    let samples: [(u16, u8); 21] = [
        (0x0049, 1),
        (0x1c48, 2),
        (0x21ff, 3),
        (0x4008, 4),
        (0x4770, 5),
        (0x4802, 6),
        (0x5888, 7),
        (0x5e88, 8),
        (0x6fc8, 9),
        (0x8848, 10),
        (0x9aff, 11),
        (0xa102, 12),
        (0xb082, 13),
        (0xb506, 14),
        (0xc006, 15),
        (0xd1fd, 16),
        (0xdf05, 17),
        (0xe7fe, 18),
        (0xf801, 19),
        (0xba40, 20),
        (0xb2c8, 21),
    ];
    for (word, id) in samples {
        assert_eq!(classify(word).map(Format::id), Some(id), "word {word:#06x}");
    }
}

#[test]
fn unassigned_encodings_are_unclassified() {
    assert_eq!(classify(0xb100), None);
    assert_eq!(classify(0xe800), None);
}

#[test]
fn table_runs_from_21_down_to_1() {
    let ids: Vec<u8> = FORMAT_TABLE.iter().map(|e| e.format.id()).collect();
    assert_eq!(ids, (1..=21).rev().collect::<Vec<u8>>());
    assert_eq!(Format::from_id(13), Some(Format::AdjustSp));
    assert_eq!(Format::from_id(22), None);
}
