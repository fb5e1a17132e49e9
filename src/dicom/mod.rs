//! DICOM container handling.
//!
//! This module provides the subset of DICOM needed by the compression
//! pipeline: a Part-10 parser that extracts image attributes and pixel
//! data, and a writer that emits a conformant file with encapsulated
//! pixel data under a chosen transfer syntax.

pub mod reader;
pub mod writer;

pub use reader::parse_dicom;
pub use writer::DicomWriter;

use std::collections::BTreeMap;
use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

use crate::config::Modality;
use crate::error::{Error, Result};
use crate::transfer_syntax;
use crate::ImageData;

/// DICOM data element tag, split as (group, element).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(pub u16, pub u16);

impl Tag {
    pub fn group(&self) -> u16 {
        self.0
    }

    pub fn element(&self) -> u16 {
        self.1
    }

    /// Join group and element into the packed 32-bit form.
    pub fn as_u32(&self) -> u32 {
        (u32::from(self.0) << 16) | u32::from(self.1)
    }

    /// Split a packed 32-bit value into a tag.
    pub fn from_u32(value: u32) -> Self {
        Tag((value >> 16) as u16, value as u16)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.0, self.1)
    }
}

/// Well-known tags used by the pixel-data pipeline.
pub mod tags {
    use super::Tag;

    pub const FILE_META_GROUP_LENGTH: Tag = Tag(0x0002, 0x0000);
    pub const FILE_META_VERSION: Tag = Tag(0x0002, 0x0001);
    pub const MEDIA_STORAGE_SOP_CLASS_UID: Tag = Tag(0x0002, 0x0002);
    pub const MEDIA_STORAGE_SOP_INSTANCE_UID: Tag = Tag(0x0002, 0x0003);
    pub const TRANSFER_SYNTAX_UID: Tag = Tag(0x0002, 0x0010);
    pub const IMPLEMENTATION_CLASS_UID: Tag = Tag(0x0002, 0x0012);
    pub const IMPLEMENTATION_VERSION_NAME: Tag = Tag(0x0002, 0x0013);

    pub const SOP_CLASS_UID: Tag = Tag(0x0008, 0x0016);
    pub const SOP_INSTANCE_UID: Tag = Tag(0x0008, 0x0018);
    pub const MODALITY: Tag = Tag(0x0008, 0x0060);

    pub const SAMPLES_PER_PIXEL: Tag = Tag(0x0028, 0x0002);
    pub const PHOTOMETRIC_INTERPRETATION: Tag = Tag(0x0028, 0x0004);
    pub const ROWS: Tag = Tag(0x0028, 0x0010);
    pub const COLUMNS: Tag = Tag(0x0028, 0x0011);
    pub const BITS_ALLOCATED: Tag = Tag(0x0028, 0x0100);
    pub const BITS_STORED: Tag = Tag(0x0028, 0x0101);
    pub const HIGH_BIT: Tag = Tag(0x0028, 0x0102);
    pub const PIXEL_REPRESENTATION: Tag = Tag(0x0028, 0x0103);

    pub const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

    pub const ITEM: Tag = Tag(0xFFFE, 0xE000);
    pub const ITEM_DELIMITER: Tag = Tag(0xFFFE, 0xE00D);
    pub const SEQUENCE_DELIMITER: Tag = Tag(0xFFFE, 0xE0DD);
}

/// Parsed, read-only view of a DICOM file.
///
/// Produced by [`parse_dicom`]; consumed as source metadata by
/// [`DicomWriter`]. Unknown elements are preserved verbatim in
/// `elements` but are not re-emitted by the writer.
#[derive(Debug, Clone, Default)]
pub struct DicomInstance {
    /// Raw element values keyed by tag (pixel data excluded).
    pub elements: BTreeMap<Tag, Vec<u8>>,
    /// Transfer syntax UID from the file-meta group.
    pub transfer_syntax: String,
    /// SOP class UID.
    pub sop_class_uid: String,
    /// SOP instance UID.
    pub sop_instance_uid: String,
    /// Modality code string (e.g. "CT").
    pub modality: String,
    /// Image height.
    pub rows: u16,
    /// Image width.
    pub columns: u16,
    /// Bits allocated per sample.
    pub bits_allocated: u16,
    /// Bits stored per sample.
    pub bits_stored: u16,
    /// High bit position.
    pub high_bit: u16,
    /// 0 = unsigned, 1 = signed.
    pub pixel_representation: u16,
    /// Samples per pixel (1 = grayscale, 3 = RGB).
    pub samples_per_pixel: u16,
    /// Photometric interpretation (e.g. "MONOCHROME2").
    pub photometric_interpretation: String,
    /// Contiguous pixel payload for native transfer syntaxes.
    pub pixel_data: Vec<u8>,
    /// Pixel-data fragments for encapsulated transfer syntaxes.
    pub pixel_fragments: Vec<Vec<u8>>,
    /// Length of the parsed input in bytes.
    pub source_len: usize,
}

impl DicomInstance {
    /// Raw bytes of an element, if present.
    pub fn element(&self, tag: Tag) -> Option<&[u8]> {
        self.elements.get(&tag).map(|v| v.as_slice())
    }

    /// Element decoded as an ASCII string, with trailing NULs and spaces
    /// trimmed.
    pub fn element_str(&self, tag: Tag) -> Option<String> {
        self.element(tag).map(decode_string)
    }

    /// Element decoded as a little-endian `u16` (first value).
    pub fn element_u16(&self, tag: Tag) -> Option<u16> {
        self.element(tag)
            .filter(|v| v.len() >= 2)
            .map(|v| LittleEndian::read_u16(v))
    }

    /// Parsed modality.
    pub fn modality(&self) -> Modality {
        Modality::from_code(&self.modality)
    }

    /// Whether the pixel data is stored as encapsulated fragments.
    pub fn is_encapsulated(&self) -> bool {
        !self.pixel_fragments.is_empty()
    }

    /// Whether the instance uses a compressed transfer syntax.
    pub fn is_compressed(&self) -> bool {
        !self.transfer_syntax.is_empty() && !transfer_syntax::is_native(&self.transfer_syntax)
    }

    /// The pixel payload: the contiguous run for native syntaxes, the
    /// first fragment for encapsulated ones.
    pub fn pixel_payload(&self) -> Option<&[u8]> {
        if !self.pixel_data.is_empty() {
            Some(&self.pixel_data)
        } else {
            self.pixel_fragments.first().map(|f| f.as_slice())
        }
    }

    /// Effective sample precision: bits stored when present, bits
    /// allocated otherwise.
    pub fn effective_bits_per_sample(&self) -> u16 {
        if self.bits_stored > 0 {
            self.bits_stored
        } else {
            self.bits_allocated
        }
    }

    /// Build an [`ImageData`] record from the parsed attributes and pixel
    /// payload.
    pub fn get_image_data(&self) -> Result<ImageData> {
        let payload = self
            .pixel_payload()
            .ok_or_else(|| Error::DicomParse("no pixel data".into()))?;

        Ok(ImageData {
            width: u32::from(self.columns),
            height: u32::from(self.rows),
            bits_per_sample: self.effective_bits_per_sample(),
            samples_per_pixel: self.samples_per_pixel,
            pixel_data: payload.to_vec(),
            photometric_interpretation: self.photometric_interpretation.clone(),
            is_signed: self.pixel_representation == 1,
        })
    }
}

/// Decode an element value as ASCII, trimming trailing padding.
fn decode_string(value: &[u8]) -> String {
    String::from_utf8_lossy(value)
        .trim_end_matches(|c| c == '\0' || c == ' ')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_split_and_join() {
        let tag = Tag::from_u32(0x7FE0_0010);
        assert_eq!(tag, tags::PIXEL_DATA);
        assert_eq!(tag.group(), 0x7FE0);
        assert_eq!(tag.element(), 0x0010);
        assert_eq!(tag.as_u32(), 0x7FE0_0010);
        assert_eq!(tag.to_string(), "(7FE0,0010)");
    }

    #[test]
    fn string_decoding_trims_padding() {
        assert_eq!(decode_string(b"CT\0"), "CT");
        assert_eq!(decode_string(b"MONOCHROME2 "), "MONOCHROME2");
        assert_eq!(decode_string(b"1.2.3\0"), "1.2.3");
    }
}
