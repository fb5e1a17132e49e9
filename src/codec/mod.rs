//! Codec implementations for the pixel-data pipeline.
//!
//! Three codecs are provided: a JPEG-2000-family codec, a JPEG-LS-family
//! codec, and an identity passthrough for the native transfer syntax.

mod jpeg2000;
mod jpegls;
mod traits;

pub use jpeg2000::Jpeg2000Codec;
pub use jpegls::JpegLsCodec;
pub use traits::{Codec, CodecCapabilities, CodecInfo};

use crate::config::{CompressionCodec, CompressionConfig};
use crate::error::Result;
use crate::transfer_syntax;
use crate::ImageData;

/// Factory for creating codec instances.
pub struct CodecFactory;

impl CodecFactory {
    /// Create a codec instance for the given kind.
    pub fn create(codec_kind: CompressionCodec) -> Box<dyn Codec> {
        match codec_kind {
            CompressionCodec::Jpeg2000 => Box::new(Jpeg2000Codec::new()),
            CompressionCodec::JpegLs => Box::new(JpegLsCodec::new()),
            CompressionCodec::Uncompressed => Box::new(UncompressedCodec),
        }
    }

    /// Create the codec selected by a configuration.
    pub fn for_config(config: &CompressionConfig) -> Box<dyn Codec> {
        Self::create(config.codec)
    }
}

/// Convenience alias for [`CodecFactory::create`].
pub fn codec_for(codec_kind: CompressionCodec) -> Box<dyn Codec> {
    CodecFactory::create(codec_kind)
}

/// Passthrough codec for uncompressed pixel data.
struct UncompressedCodec;

impl Codec for UncompressedCodec {
    fn encode(&self, image: &ImageData, _config: &CompressionConfig) -> Result<Vec<u8>> {
        Ok(image.pixel_data.clone())
    }

    fn decode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        bits_per_sample: u16,
        samples_per_pixel: u16,
    ) -> Result<ImageData> {
        Ok(ImageData {
            width,
            height,
            bits_per_sample,
            samples_per_pixel,
            pixel_data: data.to_vec(),
            photometric_interpretation: String::new(),
            is_signed: false,
        })
    }

    fn info(&self) -> CodecInfo {
        CodecInfo {
            name: "Uncompressed",
            version: "1.0",
            supports_lossless: true,
            supports_lossy: false,
            supports_progressive: false,
            supports_roi: false,
            transfer_syntax_lossless: Some(transfer_syntax::EXPLICIT_VR_LITTLE_ENDIAN),
            transfer_syntax_lossy: None,
        }
    }

    fn capabilities(&self) -> CodecCapabilities {
        CodecCapabilities {
            max_bits_per_sample: 16,
            supports_signed: true,
            supports_color: true,
            supports_multiframe: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_is_identity() {
        let image = ImageData::new(2, 2, 8, 1, vec![1, 2, 3, 4]);
        let codec = codec_for(CompressionCodec::Uncompressed);
        let encoded = codec.encode(&image, &CompressionConfig::default()).unwrap();
        assert_eq!(encoded, image.pixel_data);
        let decoded = codec.decode(&encoded, 2, 2, 8, 1).unwrap();
        assert_eq!(decoded.pixel_data, image.pixel_data);
    }

    #[test]
    fn passthrough_has_no_lossy_syntax() {
        let codec = codec_for(CompressionCodec::Uncompressed);
        assert_eq!(
            codec.transfer_syntax_uid(true),
            Some(transfer_syntax::EXPLICIT_VR_LITTLE_ENDIAN)
        );
        assert_eq!(codec.transfer_syntax_uid(false), None);
    }
}
