// End-to-end pipeline tests: synthetic DICOM in, compressed DICOM out,
// parsed and decoded back to the original pixels.

use dicompress::pipeline::decompress_instance;
use dicompress::{
    parse_dicom, transfer_syntax, CompressionCodec, CompressionConfig, CompressionPipeline, Error,
};

/// Serialize one explicit-VR little-endian element.
fn push_element(out: &mut Vec<u8>, group: u16, element: u16, vr: &[u8; 2], value: &[u8]) {
    out.extend_from_slice(&group.to_le_bytes());
    out.extend_from_slice(&element.to_le_bytes());
    out.extend_from_slice(vr);
    let long_form = matches!(vr, b"OB" | b"OW" | b"SQ" | b"UN" | b"UT" | b"UC" | b"UR");
    if long_form {
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    } else {
        out.extend_from_slice(&(value.len() as u16).to_le_bytes());
    }
    out.extend_from_slice(value);
}

fn push_str(out: &mut Vec<u8>, group: u16, element: u16, vr: &[u8; 2], value: &str) {
    let mut bytes = value.as_bytes().to_vec();
    if bytes.len() % 2 == 1 {
        bytes.push(0);
    }
    push_element(out, group, element, vr, &bytes);
}

fn push_u16(out: &mut Vec<u8>, group: u16, element: u16, value: u16) {
    push_element(out, group, element, b"US", &value.to_le_bytes());
}

/// Build a native (uncompressed, explicit VR LE) Part-10 file with a
/// realistic set of patient/study elements.
fn build_native_dicom(
    modality: &str,
    rows: u16,
    columns: u16,
    bits: u16,
    samples_per_pixel: u16,
    pixels: &[u8],
) -> Vec<u8> {
    let mut out = vec![0u8; 128];
    out.extend_from_slice(b"DICM");

    push_element(&mut out, 0x0002, 0x0001, b"OB", &[0x00, 0x01]);
    push_str(&mut out, 0x0002, 0x0002, b"UI", "1.2.840.10008.5.1.4.1.1.7");
    push_str(&mut out, 0x0002, 0x0003, b"UI", "1.2.826.0.1.3680043.10.1453.2024.1.1");
    push_str(
        &mut out,
        0x0002,
        0x0010,
        b"UI",
        transfer_syntax::EXPLICIT_VR_LITTLE_ENDIAN,
    );

    push_str(&mut out, 0x0008, 0x0016, b"UI", "1.2.840.10008.5.1.4.1.1.7");
    push_str(
        &mut out,
        0x0008,
        0x0018,
        b"UI",
        "1.2.826.0.1.3680043.10.1453.2024.1.1",
    );
    push_str(&mut out, 0x0008, 0x0020, b"DA", "20240115");
    push_str(&mut out, 0x0008, 0x0030, b"TM", "120000");
    push_str(&mut out, 0x0008, 0x0050, b"SH", "ACC0001");
    push_str(&mut out, 0x0008, 0x0060, b"CS", modality);
    push_str(&mut out, 0x0008, 0x0090, b"PN", "SMITH^ROBERT^MD");
    push_str(&mut out, 0x0010, 0x0010, b"PN", "DOE^JANE");
    push_str(&mut out, 0x0010, 0x0020, b"LO", "PAT-000123");
    push_str(&mut out, 0x0010, 0x0030, b"DA", "19751003");
    push_str(&mut out, 0x0010, 0x0040, b"CS", "F");
    push_str(
        &mut out,
        0x0020,
        0x000D,
        b"UI",
        "1.2.826.0.1.3680043.10.1453.2024.2.7",
    );
    push_str(
        &mut out,
        0x0020,
        0x000E,
        b"UI",
        "1.2.826.0.1.3680043.10.1453.2024.3.9",
    );
    push_str(&mut out, 0x0020, 0x0011, b"IS", "1");
    push_str(&mut out, 0x0020, 0x0013, b"IS", "42");

    push_u16(&mut out, 0x0028, 0x0002, samples_per_pixel);
    push_str(
        &mut out,
        0x0028,
        0x0004,
        b"CS",
        if samples_per_pixel > 1 {
            "RGB"
        } else {
            "MONOCHROME2"
        },
    );
    push_u16(&mut out, 0x0028, 0x0010, rows);
    push_u16(&mut out, 0x0028, 0x0011, columns);
    push_u16(&mut out, 0x0028, 0x0100, bits);
    push_u16(&mut out, 0x0028, 0x0101, bits);
    push_u16(&mut out, 0x0028, 0x0102, bits - 1);
    push_u16(&mut out, 0x0028, 0x0103, 0);

    push_element(&mut out, 0x7FE0, 0x0010, b"OB", pixels);
    out
}

const GRADIENT_4X4: [u8; 16] = [
    0x00, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70, 0x80, 0x90, 0xA0, 0xB0, 0xC0, 0xD0, 0xE0,
    0xF0,
];

#[test]
fn jpeg2000_lossless_roundtrip() {
    let input = build_native_dicom("CT", 4, 4, 8, 1, &GRADIENT_4X4);
    let pipeline = CompressionPipeline::new(CompressionConfig::lossless(CompressionCodec::Jpeg2000));

    let result = pipeline.compress_bytes(&input, None).unwrap();
    assert!(result.is_lossless);
    assert_eq!(result.transfer_syntax, transfer_syntax::JPEG_2000_LOSSLESS);

    let output = parse_dicom(result.output_bytes.as_ref().unwrap()).unwrap();
    assert!(output.is_encapsulated());

    let fragment = output.pixel_payload().unwrap();
    assert_eq!(&fragment[..4], &[0xFF, 0x4F, 0xFF, 0x51]);
    assert_eq!(&fragment[fragment.len() - 2..], &[0xFF, 0xD9]);

    let decoded = decompress_instance(&output).unwrap();
    assert_eq!(decoded.pixel_data, GRADIENT_4X4);
}

#[test]
fn jpegls_lossless_roundtrip() {
    let input = build_native_dicom("CT", 4, 4, 8, 1, &GRADIENT_4X4);
    let pipeline = CompressionPipeline::new(CompressionConfig::lossless(CompressionCodec::JpegLs));

    let result = pipeline.compress_bytes(&input, None).unwrap();
    assert_eq!(result.transfer_syntax, transfer_syntax::JPEG_LS_LOSSLESS);

    let output = parse_dicom(result.output_bytes.as_ref().unwrap()).unwrap();
    let fragment = output.pixel_payload().unwrap();
    assert_eq!(&fragment[..4], &[0xFF, 0xD8, 0xFF, 0xF7]);

    let decoded = decompress_instance(&output).unwrap();
    assert_eq!(decoded.pixel_data, GRADIENT_4X4);
}

#[test]
fn jpegls_near_lossless_stays_within_tolerance() {
    let input = build_native_dicom("CT", 4, 4, 8, 1, &GRADIENT_4X4);
    let pipeline = CompressionPipeline::new(CompressionConfig::near_lossless(2));

    let result = pipeline.compress_bytes(&input, None).unwrap();
    assert!(!result.is_lossless);
    assert_eq!(result.transfer_syntax, transfer_syntax::JPEG_LS_NEAR_LOSSLESS);

    let output = parse_dicom(result.output_bytes.as_ref().unwrap()).unwrap();
    let decoded = decompress_instance(&output).unwrap();

    assert_eq!(decoded.pixel_data.len(), GRADIENT_4X4.len());
    for (&orig, &dec) in GRADIENT_4X4.iter().zip(&decoded.pixel_data) {
        assert!(orig.abs_diff(dec) <= 2, "{orig} vs {dec}");
    }
}

#[test]
fn mammography_lossy_is_rejected_with_clear_message() {
    let input = build_native_dicom("MG", 4, 4, 8, 1, &GRADIENT_4X4);
    let pipeline =
        CompressionPipeline::new(CompressionConfig::lossy(CompressionCodec::Jpeg2000, 10.0));

    let err = pipeline.compress_bytes(&input, None).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    let msg = err.to_string();
    assert!(msg.contains("MG"), "message was: {msg}");
    assert!(msg.contains("lossless"), "message was: {msg}");
}

#[test]
fn parsed_attributes_match_synthetic_input() {
    let pixels = [1u8, 2, 3, 4];
    let input = build_native_dicom("CT", 2, 2, 8, 1, &pixels);
    let instance = parse_dicom(&input).unwrap();

    assert_eq!(instance.rows, 2);
    assert_eq!(instance.columns, 2);
    assert_eq!(instance.bits_allocated, 8);
    assert_eq!(instance.bits_stored, 8);
    assert_eq!(instance.samples_per_pixel, 1);
    assert_eq!(instance.photometric_interpretation, "MONOCHROME2");
    assert_eq!(instance.modality, "CT");

    // Size invariant: declared geometry never exceeds the stored payload.
    let needed = instance.rows as usize
        * instance.columns as usize
        * instance.samples_per_pixel as usize
        * ((instance.bits_stored as usize + 7) / 8);
    assert!(needed <= instance.pixel_payload().unwrap().len());
}

#[test]
fn analyze_style_ratios_for_constant_image() {
    let pixels = vec![0x80u8; 256 * 256];
    let input = build_native_dicom("CT", 256, 256, 8, 1, &pixels);

    for codec in [CompressionCodec::Jpeg2000, CompressionCodec::JpegLs] {
        let pipeline = CompressionPipeline::new(CompressionConfig::lossless(codec));
        let result = pipeline.compress_bytes(&input, None).unwrap();
        assert!(
            result.ratio() >= 1.0,
            "{codec:?} ratio {} below 1.0",
            result.ratio()
        );

        let output = parse_dicom(result.output_bytes.as_ref().unwrap()).unwrap();
        let decoded = decompress_instance(&output).unwrap();
        assert_eq!(decoded.pixel_data, pixels, "{codec:?} reconstruction");
    }
}

#[test]
fn sixteen_bit_lossless_roundtrip() {
    let pixels: Vec<u8> = (0..8u32 * 8 * 2).map(|i| (i * 37 % 256) as u8).collect();
    let input = build_native_dicom("MR", 8, 8, 16, 1, &pixels);

    for codec in [CompressionCodec::Jpeg2000, CompressionCodec::JpegLs] {
        let pipeline = CompressionPipeline::new(CompressionConfig::lossless(codec));
        let result = pipeline.compress_bytes(&input, None).unwrap();
        let output = parse_dicom(result.output_bytes.as_ref().unwrap()).unwrap();
        let decoded = decompress_instance(&output).unwrap();
        assert_eq!(decoded.pixel_data, pixels, "{codec:?}");
    }
}

#[test]
fn uncompressed_codec_roundtrip() {
    let input = build_native_dicom("US", 4, 4, 8, 1, &GRADIENT_4X4);
    let pipeline =
        CompressionPipeline::new(CompressionConfig::lossless(CompressionCodec::Uncompressed));

    let result = pipeline.compress_bytes(&input, None).unwrap();
    assert_eq!(
        result.transfer_syntax,
        transfer_syntax::EXPLICIT_VR_LITTLE_ENDIAN
    );

    let output = parse_dicom(result.output_bytes.as_ref().unwrap()).unwrap();
    let decoded = decompress_instance(&output).unwrap();
    assert_eq!(decoded.pixel_data, GRADIENT_4X4);
}

#[test]
fn short_input_fails_invalid_format() {
    let pipeline = CompressionPipeline::new(CompressionConfig::default());
    let err = pipeline.compress_bytes(&[0u8; 64], None).unwrap_err();
    assert!(matches!(err, Error::InvalidFormat(_)));
}
