//! Writer for DICOM Part-10 files with encapsulated pixel data.
//!
//! Emits the preamble, an explicit-VR little-endian file-meta group with a
//! patched group length, the minimal image-pixel dataset, and the pixel
//! data as an encapsulated item sequence with an empty basic offset table.

use byteorder::{ByteOrder, LittleEndian};

use crate::dicom::reader::is_long_length_vr;
use crate::dicom::{tags, DicomInstance, Tag};

/// Implementation Class UID written to every output file.
pub const IMPLEMENTATION_CLASS_UID: &str = "1.2.826.0.1.3680043.10.1453.1";
/// Implementation Version Name written to every output file.
pub const IMPLEMENTATION_VERSION_NAME: &str = "DICOMPRESS_01";

const UNDEFINED_LENGTH: u32 = 0xFFFF_FFFF;

/// Builder that emits a complete DICOM file from source metadata and an
/// already-encoded pixel payload.
pub struct DicomWriter<'a> {
    source: &'a DicomInstance,
}

impl<'a> DicomWriter<'a> {
    pub fn new(source: &'a DicomInstance) -> Self {
        Self { source }
    }

    /// Serialize a complete Part-10 file carrying `pixel_payload` under
    /// `transfer_syntax_uid`.
    pub fn write(&self, pixel_payload: &[u8], transfer_syntax_uid: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(pixel_payload.len() + 512);

        out.extend_from_slice(&[0u8; 128]);
        out.extend_from_slice(b"DICM");

        self.write_file_meta(&mut out, transfer_syntax_uid);
        self.write_dataset(&mut out);
        write_encapsulated_pixel_data(&mut out, pixel_payload);

        out
    }

    fn write_file_meta(&self, out: &mut Vec<u8>, transfer_syntax_uid: &str) {
        // Group length placeholder, patched once the group is complete.
        write_element(out, tags::FILE_META_GROUP_LENGTH, b"UL", &[0u8; 4]);
        let length_value_pos = out.len() - 4;
        let group_start = out.len();

        write_element(out, tags::FILE_META_VERSION, b"OB", &[0x00, 0x01]);
        write_str_element(
            out,
            tags::MEDIA_STORAGE_SOP_CLASS_UID,
            b"UI",
            &self.source.sop_class_uid,
        );
        write_str_element(
            out,
            tags::MEDIA_STORAGE_SOP_INSTANCE_UID,
            b"UI",
            &self.source.sop_instance_uid,
        );
        write_str_element(out, tags::TRANSFER_SYNTAX_UID, b"UI", transfer_syntax_uid);
        write_str_element(
            out,
            tags::IMPLEMENTATION_CLASS_UID,
            b"UI",
            IMPLEMENTATION_CLASS_UID,
        );
        write_str_element(
            out,
            tags::IMPLEMENTATION_VERSION_NAME,
            b"SH",
            IMPLEMENTATION_VERSION_NAME,
        );

        let group_length = (out.len() - group_start) as u32;
        LittleEndian::write_u32(&mut out[length_value_pos..length_value_pos + 4], group_length);
    }

    fn write_dataset(&self, out: &mut Vec<u8>) {
        write_str_element(out, tags::SOP_CLASS_UID, b"UI", &self.source.sop_class_uid);
        write_str_element(
            out,
            tags::SOP_INSTANCE_UID,
            b"UI",
            &self.source.sop_instance_uid,
        );
        write_str_element(out, tags::MODALITY, b"CS", &self.source.modality);
        write_u16_element(out, tags::SAMPLES_PER_PIXEL, self.source.samples_per_pixel);
        write_str_element(
            out,
            tags::PHOTOMETRIC_INTERPRETATION,
            b"CS",
            &self.source.photometric_interpretation,
        );
        write_u16_element(out, tags::ROWS, self.source.rows);
        write_u16_element(out, tags::COLUMNS, self.source.columns);
        write_u16_element(out, tags::BITS_ALLOCATED, self.source.bits_allocated);
        write_u16_element(out, tags::BITS_STORED, self.source.bits_stored);
        write_u16_element(out, tags::HIGH_BIT, self.source.high_bit);
        write_u16_element(
            out,
            tags::PIXEL_REPRESENTATION,
            self.source.pixel_representation,
        );
    }
}

/// Emit an element header followed by its value bytes.
fn write_element(out: &mut Vec<u8>, tag: Tag, vr: &[u8; 2], value: &[u8]) {
    out.extend_from_slice(&tag.group().to_le_bytes());
    out.extend_from_slice(&tag.element().to_le_bytes());
    out.extend_from_slice(vr);
    if is_long_length_vr(vr) {
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    } else {
        out.extend_from_slice(&(value.len() as u16).to_le_bytes());
    }
    out.extend_from_slice(value);
}

/// Emit a string element, NUL-padded to even length.
fn write_str_element(out: &mut Vec<u8>, tag: Tag, vr: &[u8; 2], value: &str) {
    let mut bytes = value.as_bytes().to_vec();
    if bytes.len() % 2 == 1 {
        bytes.push(0);
    }
    write_element(out, tag, vr, &bytes);
}

fn write_u16_element(out: &mut Vec<u8>, tag: Tag, value: u16) {
    write_element(out, tag, b"US", &value.to_le_bytes());
}

/// Emit the `(7FE0,0010)` element as an encapsulated sequence: empty basic
/// offset table, one fragment with the payload, sequence delimiter. An
/// odd-length payload gets one pad byte after the item; the declared item
/// length stays the true payload length.
fn write_encapsulated_pixel_data(out: &mut Vec<u8>, payload: &[u8]) {
    out.extend_from_slice(&tags::PIXEL_DATA.group().to_le_bytes());
    out.extend_from_slice(&tags::PIXEL_DATA.element().to_le_bytes());
    out.extend_from_slice(b"OB");
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(&UNDEFINED_LENGTH.to_le_bytes());

    write_item_header(out, tags::ITEM, 0);

    write_item_header(out, tags::ITEM, payload.len() as u32);
    out.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        out.push(0);
    }

    write_item_header(out, tags::SEQUENCE_DELIMITER, 0);
}

fn write_item_header(out: &mut Vec<u8>, tag: Tag, length: u32) {
    out.extend_from_slice(&tag.group().to_le_bytes());
    out.extend_from_slice(&tag.element().to_le_bytes());
    out.extend_from_slice(&length.to_le_bytes());
}
