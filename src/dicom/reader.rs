//! Streaming parser for DICOM Part-10 files.
//!
//! The parser assumes explicit VR little endian for the file-meta group
//! and the dataset alike; implicit VR inputs are not negotiated. Parsing
//! is best-effort: a malformed or truncated tail stops the element loop
//! cleanly, keeping everything parsed up to that point.

use byteorder::{ByteOrder, LittleEndian};

use crate::dicom::{tags, DicomInstance, Tag};
use crate::error::{Error, Result};

const PREAMBLE_LEN: usize = 128;
const MAGIC: &[u8; 4] = b"DICM";
const UNDEFINED_LENGTH: u32 = 0xFFFF_FFFF;

/// VRs whose element header carries 2 reserved bytes and a 32-bit length.
const LONG_LENGTH_VRS: [[u8; 2]; 10] = [
    *b"OB", *b"OD", *b"OF", *b"OL", *b"OW", *b"SQ", *b"UC", *b"UN", *b"UR", *b"UT",
];

pub(crate) fn is_long_length_vr(vr: &[u8; 2]) -> bool {
    LONG_LENGTH_VRS.contains(vr)
}

/// Parse a whole DICOM file from memory.
///
/// Fails with `InvalidFormat` when the preamble or `DICM` prefix is
/// missing; element-level damage after that only truncates the result.
pub fn parse_dicom(bytes: &[u8]) -> Result<DicomInstance> {
    if bytes.len() < PREAMBLE_LEN + MAGIC.len() {
        return Err(Error::InvalidFormat(format!(
            "file too short for a DICOM preamble: {} bytes",
            bytes.len()
        )));
    }
    if &bytes[PREAMBLE_LEN..PREAMBLE_LEN + MAGIC.len()] != MAGIC {
        return Err(Error::InvalidFormat("missing DICM prefix".into()));
    }

    let mut instance = DicomInstance {
        source_len: bytes.len(),
        ..Default::default()
    };

    parse_elements(bytes, PREAMBLE_LEN + MAGIC.len(), &mut instance);
    populate_attributes(&mut instance);

    Ok(instance)
}

/// Best-effort element loop over `buf[pos..]`.
fn parse_elements(buf: &[u8], mut pos: usize, instance: &mut DicomInstance) {
    while pos + 8 <= buf.len() {
        let group = LittleEndian::read_u16(&buf[pos..]);
        let element = LittleEndian::read_u16(&buf[pos + 2..]);
        let tag = Tag(group, element);

        // Item and delimiter tags carry no VR, only a 32-bit length.
        if group == 0xFFFE {
            let length = LittleEndian::read_u32(&buf[pos + 4..]);
            pos += 8;
            if tag == tags::ITEM && length != UNDEFINED_LENGTH {
                pos = pos.saturating_add(length as usize);
            }
            continue;
        }

        let vr: [u8; 2] = [buf[pos + 4], buf[pos + 5]];
        let (length, header_len) = if is_long_length_vr(&vr) {
            if pos + 12 > buf.len() {
                break;
            }
            (LittleEndian::read_u32(&buf[pos + 8..]), 12)
        } else {
            (u32::from(LittleEndian::read_u16(&buf[pos + 6..])), 8)
        };

        if length == UNDEFINED_LENGTH {
            pos += header_len;
            if tag == tags::PIXEL_DATA {
                pos = parse_encapsulated_items(buf, pos, instance);
            }
            // Other undefined-length elements are skipped; their inner
            // items are consumed by the 0xFFFE branch above.
            continue;
        }

        let length = length as usize;
        if pos + header_len + length > buf.len() {
            break;
        }
        let value = buf[pos + header_len..pos + header_len + length].to_vec();
        pos += header_len + length;

        if tag == tags::PIXEL_DATA {
            instance.pixel_data = value;
        } else {
            instance.elements.insert(tag, value);
        }
    }
}

/// Walk the item sequence of an encapsulated pixel-data element.
///
/// The first item is the basic offset table and is not a fragment. An
/// odd-length fragment may be followed by a single pad byte outside the
/// declared item length; the pad is consumed here so the next item header
/// aligns.
fn parse_encapsulated_items(buf: &[u8], mut pos: usize, instance: &mut DicomInstance) -> usize {
    let mut item_index = 0usize;

    while pos + 8 <= buf.len() {
        let group = LittleEndian::read_u16(&buf[pos..]);
        let element = LittleEndian::read_u16(&buf[pos + 2..]);
        let length = LittleEndian::read_u32(&buf[pos + 4..]);

        if group != 0xFFFE {
            break;
        }
        pos += 8;

        if Tag(group, element) == tags::SEQUENCE_DELIMITER {
            break;
        }
        if Tag(group, element) != tags::ITEM || length == UNDEFINED_LENGTH {
            break;
        }

        let length = length as usize;
        if pos + length > buf.len() {
            break;
        }
        if item_index > 0 {
            instance
                .pixel_fragments
                .push(buf[pos..pos + length].to_vec());
        }
        item_index += 1;
        pos += length;

        if length % 2 == 1
            && pos < buf.len()
            && buf[pos] == 0
            && (pos + 2 > buf.len() || LittleEndian::read_u16(&buf[pos..]) != 0xFFFE)
        {
            pos += 1;
        }
    }

    pos
}

/// Decode the known image attributes out of the element map.
fn populate_attributes(instance: &mut DicomInstance) {
    instance.transfer_syntax = instance
        .element_str(tags::TRANSFER_SYNTAX_UID)
        .unwrap_or_default();
    instance.sop_class_uid = instance
        .element_str(tags::SOP_CLASS_UID)
        .or_else(|| instance.element_str(tags::MEDIA_STORAGE_SOP_CLASS_UID))
        .unwrap_or_default();
    instance.sop_instance_uid = instance
        .element_str(tags::SOP_INSTANCE_UID)
        .or_else(|| instance.element_str(tags::MEDIA_STORAGE_SOP_INSTANCE_UID))
        .unwrap_or_default();
    instance.modality = instance.element_str(tags::MODALITY).unwrap_or_default();

    instance.rows = instance.element_u16(tags::ROWS).unwrap_or(0);
    instance.columns = instance.element_u16(tags::COLUMNS).unwrap_or(0);
    instance.bits_allocated = instance.element_u16(tags::BITS_ALLOCATED).unwrap_or(0);
    instance.bits_stored = instance
        .element_u16(tags::BITS_STORED)
        .unwrap_or(instance.bits_allocated);
    instance.high_bit = instance.element_u16(tags::HIGH_BIT).unwrap_or_else(|| {
        instance.bits_stored.saturating_sub(1)
    });
    instance.pixel_representation = instance
        .element_u16(tags::PIXEL_REPRESENTATION)
        .unwrap_or(0);
    instance.samples_per_pixel = instance
        .element_u16(tags::SAMPLES_PER_PIXEL)
        .unwrap_or(1)
        .max(1);
    instance.photometric_interpretation = instance
        .element_str(tags::PHOTOMETRIC_INTERPRETATION)
        .unwrap_or_else(|| "MONOCHROME2".into());
}
