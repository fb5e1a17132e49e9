/*!
# dicompress

`dicompress` compresses and decompresses medical images stored in the
DICOM container format. An input instance with uncompressed pixel data is
re-emitted with its pixel data encapsulated under a JPEG 2000 or JPEG-LS
family transfer syntax, and the transformation reverses symmetrically.

The codecs produce *framed* bitstreams: valid marker sequences with
standard segment layouts, carrying this crate's internal differential or
quantized payload instead of standards-conformant entropy coding. Files
round-trip within this crate but will not decode in third-party tools.

## Quick start

```rust,ignore
use dicompress::{CompressionCodec, CompressionConfig, CompressionPipeline};

let config = CompressionConfig::lossless(CompressionCodec::Jpeg2000);
let pipeline = CompressionPipeline::new(config);
let result = pipeline.compress_file("input.dcm", Some("output.dcm".as_ref()))?;
println!("compression ratio: {:.2}:1", result.ratio());
```

## Modality safety

Mammography (MG) instances are restricted to lossless compression; a
non-lossless request fails validation unless `override_safety` is set, in
which case a warning is surfaced instead.
*/

pub mod codec;
pub mod config;
pub mod dicom;
pub mod error;
pub mod pipeline;
pub mod transfer_syntax;

pub mod jpeg_marker_code;
pub mod jpeg_stream_reader;
pub mod jpeg_stream_writer;

pub use codec::{codec_for, Codec, CodecCapabilities, CodecFactory, CodecInfo};
pub use config::{
    CompressionCodec, CompressionConfig, CompressionMode, Modality, QualityPreset,
};
pub use dicom::{parse_dicom, DicomInstance, DicomWriter, Tag};
pub use error::{Error, Result};
pub use pipeline::{decompress, decompress_instance, CompressionPipeline, CompressionResult};

/// In-memory uncompressed frame plus descriptive attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Bits per sample (8 or 16 for medical images).
    pub bits_per_sample: u16,
    /// Samples per pixel (1 = grayscale, 3 = RGB).
    pub samples_per_pixel: u16,
    /// Raw pixel bytes, little-endian sample order, rows first.
    pub pixel_data: Vec<u8>,
    /// Photometric interpretation (e.g. "MONOCHROME2", "RGB").
    pub photometric_interpretation: String,
    /// Whether pixel values are signed.
    pub is_signed: bool,
}

impl ImageData {
    /// Create an image record with default interpretation attributes.
    pub fn new(
        width: u32,
        height: u32,
        bits_per_sample: u16,
        samples_per_pixel: u16,
        pixel_data: Vec<u8>,
    ) -> Self {
        Self {
            width,
            height,
            bits_per_sample,
            samples_per_pixel,
            pixel_data,
            photometric_interpretation: String::new(),
            is_signed: false,
        }
    }

    /// Expected pixel buffer size in bytes.
    pub fn expected_size(&self) -> usize {
        let bytes_per_sample = usize::from((self.bits_per_sample + 7) / 8);
        self.width as usize
            * self.height as usize
            * self.samples_per_pixel as usize
            * bytes_per_sample
    }

    /// Validate that the pixel buffer matches the declared geometry.
    pub fn validate(&self) -> Result<()> {
        let expected = self.expected_size();
        if self.pixel_data.len() != expected {
            return Err(Error::ImageData(format!(
                "pixel data size mismatch: expected {} bytes, got {}",
                expected,
                self.pixel_data.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_data_expected_size() {
        let image = ImageData::new(512, 512, 16, 1, vec![0; 512 * 512 * 2]);
        assert_eq!(image.expected_size(), 512 * 512 * 2);
        assert!(image.validate().is_ok());
    }

    #[test]
    fn image_data_size_mismatch() {
        let image = ImageData::new(64, 64, 8, 1, vec![0; 100]);
        assert!(image.validate().is_err());
    }
}
