//! Codec trait definitions.

use crate::config::CompressionConfig;
use crate::error::Result;
use crate::ImageData;

/// Declarative information about a codec.
#[derive(Debug, Clone)]
pub struct CodecInfo {
    /// Human-readable codec name.
    pub name: &'static str,
    /// Codec version string.
    pub version: &'static str,
    /// Whether lossless compression is supported.
    pub supports_lossless: bool,
    /// Whether lossy (or near-lossless) compression is supported.
    pub supports_lossy: bool,
    /// Whether progressive/multi-resolution decoding is supported.
    pub supports_progressive: bool,
    /// Whether region-of-interest encoding is supported.
    pub supports_roi: bool,
    /// DICOM transfer syntax UID for lossless mode.
    pub transfer_syntax_lossless: Option<&'static str>,
    /// DICOM transfer syntax UID for lossy mode.
    pub transfer_syntax_lossy: Option<&'static str>,
}

/// Image format limits of a codec.
#[derive(Debug, Clone)]
pub struct CodecCapabilities {
    /// Maximum supported bits per sample.
    pub max_bits_per_sample: u16,
    /// Whether signed pixel values are supported.
    pub supports_signed: bool,
    /// Whether color images are supported.
    pub supports_color: bool,
    /// Whether multi-frame images are supported.
    pub supports_multiframe: bool,
}

/// Image compression/decompression codec.
pub trait Codec: Send + Sync {
    /// Encode image data into the codec's framed bitstream.
    fn encode(&self, image: &ImageData, config: &CompressionConfig) -> Result<Vec<u8>>;

    /// Decode a framed bitstream back into pixel data.
    ///
    /// The caller supplies the image geometry; the bitstream's own frame
    /// header is trusted only for codec-internal parameters.
    fn decode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        bits_per_sample: u16,
        samples_per_pixel: u16,
    ) -> Result<ImageData>;

    /// Codec information.
    fn info(&self) -> CodecInfo;

    /// Codec capabilities.
    fn capabilities(&self) -> CodecCapabilities;

    /// Whether the codec can handle the given image.
    fn can_encode(&self, image: &ImageData) -> bool {
        let caps = self.capabilities();
        image.bits_per_sample <= caps.max_bits_per_sample
            && (image.samples_per_pixel == 1 || caps.supports_color)
            && (!image.is_signed || caps.supports_signed)
    }

    /// Transfer syntax UID for the requested mode, if the codec has one.
    fn transfer_syntax_uid(&self, lossless: bool) -> Option<&'static str> {
        let info = self.info();
        if lossless {
            info.transfer_syntax_lossless
        } else {
            info.transfer_syntax_lossy
        }
    }
}
