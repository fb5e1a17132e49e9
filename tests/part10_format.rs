// Byte-level checks of the Part-10 output: file meta layout, pixel-data
// encapsulation, and the round-trip law between writer and reader.

use dicompress::{
    codec_for, parse_dicom, transfer_syntax, CompressionCodec, CompressionConfig,
    CompressionMode, DicomInstance, DicomWriter, ImageData,
};

fn source_instance() -> DicomInstance {
    DicomInstance {
        transfer_syntax: transfer_syntax::EXPLICIT_VR_LITTLE_ENDIAN.into(),
        sop_class_uid: "1.2.840.10008.5.1.4.1.1.2".into(),
        sop_instance_uid: "1.2.826.0.1.3680043.10.1453.2024.9.3".into(),
        modality: "CT".into(),
        rows: 4,
        columns: 4,
        bits_allocated: 8,
        bits_stored: 8,
        high_bit: 7,
        samples_per_pixel: 1,
        photometric_interpretation: "MONOCHROME2".into(),
        pixel_data: (0u8..16).collect(),
        source_len: 256,
        ..Default::default()
    }
}

fn read_u16_le(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32_le(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[test]
fn preamble_magic_and_group_length() {
    let source = source_instance();
    let bytes = DicomWriter::new(&source).write(&[1, 2, 3, 4], transfer_syntax::JPEG_2000_LOSSLESS);

    assert!(bytes[..128].iter().all(|&b| b == 0));
    assert_eq!(&bytes[128..132], b"DICM");

    // (0002,0000) UL, length 4.
    assert_eq!(read_u16_le(&bytes, 132), 0x0002);
    assert_eq!(read_u16_le(&bytes, 134), 0x0000);
    assert_eq!(&bytes[136..138], b"UL");
    assert_eq!(read_u16_le(&bytes, 138), 4);

    // The group length points exactly at the first dataset element.
    let group_length = read_u32_le(&bytes, 140) as usize;
    let dataset_start = 144 + group_length;
    assert_eq!(read_u16_le(&bytes, dataset_start), 0x0008);
}

#[test]
fn encapsulation_layout() {
    let source = source_instance();
    let payload = [0xDEu8, 0xAD, 0xBE];
    let bytes = DicomWriter::new(&source).write(&payload, transfer_syntax::JPEG_LS_LOSSLESS);

    // Locate the pixel-data element.
    let pos = bytes
        .windows(4)
        .position(|w| w == [0xE0, 0x7F, 0x10, 0x00])
        .expect("pixel data element present");

    assert_eq!(&bytes[pos + 4..pos + 6], b"OB");
    assert_eq!(&bytes[pos + 6..pos + 8], &[0, 0]);
    assert_eq!(read_u32_le(&bytes, pos + 8), 0xFFFF_FFFF);

    // Basic offset table: empty item.
    let bot = pos + 12;
    assert_eq!(read_u16_le(&bytes, bot), 0xFFFE);
    assert_eq!(read_u16_le(&bytes, bot + 2), 0xE000);
    assert_eq!(read_u32_le(&bytes, bot + 4), 0);

    // Fragment item: declared length is the true payload length.
    let frag = bot + 8;
    assert_eq!(read_u16_le(&bytes, frag), 0xFFFE);
    assert_eq!(read_u16_le(&bytes, frag + 2), 0xE000);
    assert_eq!(read_u32_le(&bytes, frag + 4), payload.len() as u32);
    assert_eq!(&bytes[frag + 8..frag + 11], &payload);

    // One pad byte after the odd-length fragment, then the delimiter.
    assert_eq!(bytes[frag + 11], 0);
    let delim = frag + 12;
    assert_eq!(read_u16_le(&bytes, delim), 0xFFFE);
    assert_eq!(read_u16_le(&bytes, delim + 2), 0xE0DD);
    assert_eq!(read_u32_le(&bytes, delim + 4), 0);
    assert_eq!(bytes.len(), delim + 8);
}

#[test]
fn roundtrip_law_fragment_equals_encoded_payload() {
    let source = source_instance();
    let image = source.get_image_data().unwrap();

    for (codec_kind, config) in [
        (
            CompressionCodec::Jpeg2000,
            CompressionConfig::lossless(CompressionCodec::Jpeg2000),
        ),
        (
            CompressionCodec::JpegLs,
            CompressionConfig::near_lossless(1),
        ),
    ] {
        let codec = codec_for(codec_kind);
        let encoded = codec.encode(&image, &config).unwrap();
        let lossless = config.mode == CompressionMode::Lossless;
        let uid = codec.transfer_syntax_uid(lossless).unwrap();

        let bytes = DicomWriter::new(&source).write(&encoded, uid);
        let parsed = parse_dicom(&bytes).unwrap();

        assert_eq!(parsed.transfer_syntax, uid);
        assert_eq!(parsed.pixel_fragments.len(), 1);
        assert_eq!(parsed.pixel_fragments[0], encoded, "{codec_kind:?}");
    }
}

#[test]
fn config_derived_syntax_is_lossless_iff_mode_is() {
    let image = ImageData::new(2, 2, 8, 1, vec![9; 4]);

    for codec_kind in [CompressionCodec::Jpeg2000, CompressionCodec::JpegLs] {
        let codec = codec_for(codec_kind);
        assert!(codec.can_encode(&image));

        let lossless_uid = codec.transfer_syntax_uid(true).unwrap();
        assert!(transfer_syntax::is_lossless(lossless_uid));

        let lossy_uid = codec.transfer_syntax_uid(false).unwrap();
        assert!(!transfer_syntax::is_lossless(lossy_uid));
    }
}

#[test]
fn writer_output_attributes_survive_reparse() {
    let source = source_instance();
    let bytes = DicomWriter::new(&source).write(&[0u8; 8], transfer_syntax::JPEG_2000_LOSSY);
    let parsed = parse_dicom(&bytes).unwrap();

    assert_eq!(parsed.sop_class_uid, source.sop_class_uid);
    assert_eq!(parsed.sop_instance_uid, source.sop_instance_uid);
    assert_eq!(parsed.modality, source.modality);
    assert_eq!(parsed.rows, source.rows);
    assert_eq!(parsed.columns, source.columns);
    assert_eq!(parsed.bits_allocated, source.bits_allocated);
    assert_eq!(parsed.bits_stored, source.bits_stored);
    assert_eq!(parsed.high_bit, source.high_bit);
    assert_eq!(parsed.pixel_representation, source.pixel_representation);
    assert_eq!(parsed.samples_per_pixel, source.samples_per_pixel);
    assert_eq!(
        parsed.photometric_interpretation,
        source.photometric_interpretation
    );
    assert!(parsed.is_compressed());
}
