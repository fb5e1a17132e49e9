//! Compression pipeline orchestration.
//!
//! Wires the reader, modality policy, codecs and writer together:
//! parse, validate, encode, encapsulate, emit. The reverse path picks the
//! codec from the transfer syntax (or the codestream magic) and decodes.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::codec::{Codec, CodecFactory};
use crate::config::{CompressionConfig, CompressionMode};
use crate::dicom::{parse_dicom, DicomInstance, DicomWriter};
use crate::error::{Error, Result};
use crate::transfer_syntax;
use crate::{CompressionCodec, ImageData};

/// Result of a compression operation.
#[derive(Debug)]
pub struct CompressionResult {
    /// Size of the input in bytes.
    pub original_size: usize,
    /// Size of the produced file in bytes.
    pub compressed_size: usize,
    /// Name of the codec used.
    pub codec_name: String,
    /// Transfer syntax UID of the output.
    pub transfer_syntax: String,
    /// Whether the compression was lossless.
    pub is_lossless: bool,
    /// Wall-clock time spent, in milliseconds.
    pub elapsed_ms: u64,
    /// Output path, when one was written.
    pub output_path: Option<PathBuf>,
    /// Output bytes, when no path was supplied.
    pub output_bytes: Option<Vec<u8>>,
    /// Warnings raised along the way.
    pub warnings: Vec<String>,
}

impl CompressionResult {
    /// Compression ratio (original / compressed).
    pub fn ratio(&self) -> f64 {
        if self.compressed_size == 0 {
            0.0
        } else {
            self.original_size as f64 / self.compressed_size as f64
        }
    }

    /// Space savings as a percentage of the original size.
    pub fn savings_percent(&self) -> f64 {
        if self.original_size == 0 {
            0.0
        } else {
            (1.0 - self.compressed_size as f64 / self.original_size as f64) * 100.0
        }
    }
}

/// Compression pipeline bound to one configuration.
pub struct CompressionPipeline {
    config: CompressionConfig,
}

impl CompressionPipeline {
    /// Create a pipeline with the given configuration.
    pub fn new(config: CompressionConfig) -> Self {
        Self { config }
    }

    /// The pipeline's configuration.
    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Compress a DICOM file on disk, optionally writing the result.
    pub fn compress_file(&self, input: &Path, output: Option<&Path>) -> Result<CompressionResult> {
        let bytes = fs::read(input)?;
        log::info!("processing {} ({} bytes)", input.display(), bytes.len());
        self.compress_bytes(&bytes, output)
    }

    /// Compress an in-memory DICOM file, optionally writing the result.
    pub fn compress_bytes(
        &self,
        input: &[u8],
        output: Option<&Path>,
    ) -> Result<CompressionResult> {
        let instance = parse_dicom(input)?;
        self.compress_instance(&instance, output)
    }

    /// Compress an already-parsed instance, optionally writing the result.
    pub fn compress_instance(
        &self,
        instance: &DicomInstance,
        output: Option<&Path>,
    ) -> Result<CompressionResult> {
        let start = Instant::now();
        let mut warnings = Vec::new();

        self.config.validate()?;

        let modality = instance.modality();
        self.config.validate_for_modality(modality)?;
        if modality.requires_lossless()
            && self.config.mode != CompressionMode::Lossless
            && self.config.override_safety
        {
            warnings.push(format!(
                "safety check overridden: {modality:?} requires lossless compression"
            ));
        }

        if instance.is_compressed() {
            warnings.push(format!(
                "source is already compressed ({})",
                instance.transfer_syntax
            ));
        }

        let image = instance.get_image_data()?;
        let codec = CodecFactory::for_config(&self.config);

        if !codec.can_encode(&image) {
            return Err(Error::Pipeline(format!(
                "codec {} cannot encode this image ({}x{}, {} bits, {} samples/pixel)",
                codec.info().name,
                image.width,
                image.height,
                image.bits_per_sample,
                image.samples_per_pixel
            )));
        }

        let lossless = self.config.mode == CompressionMode::Lossless;
        let target_syntax = codec.transfer_syntax_uid(lossless).ok_or_else(|| {
            Error::Pipeline(format!(
                "codec {} has no transfer syntax for {:?} mode",
                codec.info().name,
                self.config.mode
            ))
        })?;

        let encoded = codec.encode(&image, &self.config)?;

        if self.config.verify_roundtrip && lossless {
            self.verify_lossless(codec.as_ref(), &encoded, &image)?;
        }

        let output_bytes = DicomWriter::new(instance).write(&encoded, target_syntax);
        let compressed_size = output_bytes.len();
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let mut result = CompressionResult {
            original_size: instance.source_len,
            compressed_size,
            codec_name: codec.info().name.to_string(),
            transfer_syntax: target_syntax.to_string(),
            is_lossless: lossless,
            elapsed_ms,
            output_path: None,
            output_bytes: None,
            warnings,
        };

        if let Some(path) = output {
            fs::write(path, &output_bytes)?;
            log::info!("wrote {} ({} bytes)", path.display(), compressed_size);
            result.output_path = Some(path.to_path_buf());
        } else {
            result.output_bytes = Some(output_bytes);
        }

        Ok(result)
    }

    /// Round-trip decode and compare against the original pixels.
    fn verify_lossless(
        &self,
        codec: &dyn Codec,
        encoded: &[u8],
        original: &ImageData,
    ) -> Result<()> {
        let decoded = codec.decode(
            encoded,
            original.width,
            original.height,
            original.bits_per_sample,
            original.samples_per_pixel,
        )?;

        if decoded.pixel_data != original.pixel_data {
            return Err(Error::Validation(
                "lossless verification failed: decoded pixels differ from original".into(),
            ));
        }
        log::debug!("lossless verification passed");
        Ok(())
    }
}

/// Decode a compressed pixel codestream back into an image.
///
/// The codec is detected from the codestream magic: `FF 4F` for JPEG 2000,
/// `FF D8` for the JPEG-LS family; anything else is treated as a native
/// (uncompressed) payload.
pub fn decompress(
    data: &[u8],
    width: u32,
    height: u32,
    bits_per_sample: u16,
    samples_per_pixel: u16,
) -> Result<ImageData> {
    let kind = if data.starts_with(&[0xFF, 0x4F]) {
        CompressionCodec::Jpeg2000
    } else if data.starts_with(&[0xFF, 0xD8]) {
        CompressionCodec::JpegLs
    } else {
        CompressionCodec::Uncompressed
    };

    CodecFactory::create(kind).decode(data, width, height, bits_per_sample, samples_per_pixel)
}

/// Decode the pixel data of a parsed instance using the codec its
/// transfer syntax names.
pub fn decompress_instance(instance: &DicomInstance) -> Result<ImageData> {
    let uid = instance.transfer_syntax.as_str();
    let kind = match uid {
        transfer_syntax::JPEG_2000_LOSSLESS | transfer_syntax::JPEG_2000_LOSSY => {
            CompressionCodec::Jpeg2000
        }
        transfer_syntax::JPEG_LS_LOSSLESS | transfer_syntax::JPEG_LS_NEAR_LOSSLESS => {
            CompressionCodec::JpegLs
        }
        _ if transfer_syntax::is_native(uid) || uid.is_empty() => CompressionCodec::Uncompressed,
        _ => return Err(Error::UnsupportedTransferSyntax(uid.to_string())),
    };

    let payload = instance
        .pixel_payload()
        .ok_or_else(|| Error::DicomParse("no pixel data".into()))?;

    let mut image = CodecFactory::create(kind).decode(
        payload,
        u32::from(instance.columns),
        u32::from(instance.rows),
        instance.effective_bits_per_sample(),
        instance.samples_per_pixel,
    )?;

    image.photometric_interpretation = instance.photometric_interpretation.clone();
    image.is_signed = instance.pixel_representation == 1;
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native_instance(modality: &str) -> DicomInstance {
        DicomInstance {
            transfer_syntax: transfer_syntax::EXPLICIT_VR_LITTLE_ENDIAN.into(),
            sop_class_uid: "1.2.840.10008.5.1.4.1.1.2".into(),
            sop_instance_uid: "1.2.3.4".into(),
            modality: modality.into(),
            rows: 4,
            columns: 4,
            bits_allocated: 8,
            bits_stored: 8,
            high_bit: 7,
            samples_per_pixel: 1,
            photometric_interpretation: "MONOCHROME2".into(),
            pixel_data: (0u8..16).collect(),
            source_len: 400,
            ..Default::default()
        }
    }

    #[test]
    fn mammography_lossy_is_rejected() {
        let pipeline =
            CompressionPipeline::new(CompressionConfig::lossy(CompressionCodec::Jpeg2000, 10.0));
        let err = pipeline
            .compress_instance(&native_instance("MG"), None)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let msg = err.to_string();
        assert!(msg.contains("MG") && msg.contains("lossless"));
    }

    #[test]
    fn mammography_override_carries_warning() {
        let mut config = CompressionConfig::lossy(CompressionCodec::Jpeg2000, 10.0);
        config.override_safety = true;
        let pipeline = CompressionPipeline::new(config);
        let result = pipeline
            .compress_instance(&native_instance("MG"), None)
            .unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("overridden")));
        assert!(!result.is_lossless);
    }

    #[test]
    fn uncompressed_codec_has_no_lossy_mode() {
        let pipeline = CompressionPipeline::new(CompressionConfig::lossy(
            CompressionCodec::Uncompressed,
            10.0,
        ));
        let err = pipeline
            .compress_instance(&native_instance("CT"), None)
            .unwrap_err();
        assert!(matches!(err, Error::Pipeline(_)));
    }

    #[test]
    fn compress_and_reverse_through_instance() {
        let source = native_instance("CT");
        let pipeline =
            CompressionPipeline::new(CompressionConfig::lossless(CompressionCodec::JpegLs));
        let result = pipeline.compress_instance(&source, None).unwrap();
        assert!(result.is_lossless);
        assert_eq!(result.transfer_syntax, transfer_syntax::JPEG_LS_LOSSLESS);

        let reparsed = parse_dicom(result.output_bytes.as_ref().unwrap()).unwrap();
        assert!(reparsed.is_encapsulated());
        let image = decompress_instance(&reparsed).unwrap();
        assert_eq!(image.pixel_data, source.pixel_data);
        assert_eq!(image.photometric_interpretation, "MONOCHROME2");
    }

    #[test]
    fn verify_roundtrip_passes_for_lossless() {
        let mut config = CompressionConfig::lossless(CompressionCodec::Jpeg2000);
        config.verify_roundtrip = true;
        let pipeline = CompressionPipeline::new(config);
        assert!(pipeline
            .compress_instance(&native_instance("CT"), None)
            .is_ok());
    }

    #[test]
    fn decompress_sniffs_codec_from_magic() {
        let image = ImageData::new(4, 4, 8, 1, (0u8..16).collect());
        let config = CompressionConfig::lossless(CompressionCodec::Jpeg2000);
        let encoded = CodecFactory::create(CompressionCodec::Jpeg2000)
            .encode(&image, &config)
            .unwrap();
        let decoded = decompress(&encoded, 4, 4, 8, 1).unwrap();
        assert_eq!(decoded.pixel_data, image.pixel_data);
    }

    #[test]
    fn ratio_and_savings() {
        let result = CompressionResult {
            original_size: 1000,
            compressed_size: 250,
            codec_name: "JPEG 2000".into(),
            transfer_syntax: transfer_syntax::JPEG_2000_LOSSLESS.into(),
            is_lossless: true,
            elapsed_ms: 1,
            output_path: None,
            output_bytes: None,
            warnings: vec![],
        };
        assert_eq!(result.ratio(), 4.0);
        assert_eq!(result.savings_percent(), 75.0);
    }
}
