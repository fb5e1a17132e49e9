//! Compression configuration and modality-specific policy rules.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Supported compression codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CompressionCodec {
    /// JPEG 2000 family (lossless or lossy).
    #[default]
    Jpeg2000,
    /// JPEG-LS family (lossless or near-lossless).
    JpegLs,
    /// No compression (native transfer syntax).
    Uncompressed,
}

/// Compression mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CompressionMode {
    /// Exact reconstruction guaranteed.
    #[default]
    Lossless,
    /// Lossy compression steered by a target ratio.
    Lossy,
    /// Bounded per-sample error (JPEG-LS family only).
    NearLossless,
}

/// Medical imaging modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modality {
    /// Computed Tomography
    CT,
    /// Magnetic Resonance Imaging
    MR,
    /// Computed Radiography
    CR,
    /// Digital X-Ray
    DX,
    /// Mammography - lossless only per regulatory policy
    MG,
    /// Ultrasound
    US,
    /// Nuclear Medicine
    NM,
    /// Positron Emission Tomography
    PT,
    /// Slide Microscopy (pathology)
    SM,
    /// Other/unknown
    Other,
}

impl Modality {
    /// Parse a modality from its DICOM code string.
    pub fn from_code(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "CT" => Modality::CT,
            "MR" | "MRI" => Modality::MR,
            "CR" => Modality::CR,
            "DX" => Modality::DX,
            "MG" => Modality::MG,
            "US" => Modality::US,
            "NM" => Modality::NM,
            "PT" | "PET" => Modality::PT,
            "SM" => Modality::SM,
            _ => Modality::Other,
        }
    }

    /// Whether regulatory policy restricts this modality to lossless compression.
    pub fn requires_lossless(&self) -> bool {
        matches!(self, Modality::MG)
    }

    /// Recommended codec for this modality.
    pub fn recommended_codec(&self) -> CompressionCodec {
        match self {
            Modality::NM => CompressionCodec::JpegLs, // lower resolution, favor speed
            _ => CompressionCodec::Jpeg2000,
        }
    }

    /// Default quality preset for this modality.
    pub fn default_preset(&self) -> QualityPreset {
        match self {
            Modality::MG | Modality::CT | Modality::MR => QualityPreset::Diagnostic,
            Modality::CR | Modality::DX | Modality::NM | Modality::PT => {
                QualityPreset::HighQuality
            }
            Modality::US | Modality::SM | Modality::Other => QualityPreset::Standard,
        }
    }
}

/// Quality preset for lossy compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    /// Maximum quality - lossless.
    #[default]
    Diagnostic,
    /// High quality lossy, suitable for primary review.
    HighQuality,
    /// Medium quality, suitable for reference viewing.
    Standard,
    /// Low quality for thumbnails and previews.
    Preview,
}

impl QualityPreset {
    /// Target compression ratio for lossy compression, if any.
    pub fn target_ratio(&self) -> Option<f32> {
        match self {
            QualityPreset::Diagnostic => None,
            QualityPreset::HighQuality => Some(10.0),
            QualityPreset::Standard => Some(20.0),
            QualityPreset::Preview => Some(50.0),
        }
    }

    /// Number of JPEG 2000 quality layers.
    pub fn quality_layers(&self) -> u32 {
        match self {
            QualityPreset::Diagnostic => 1,
            QualityPreset::HighQuality => 5,
            QualityPreset::Standard => 3,
            QualityPreset::Preview => 2,
        }
    }
}

/// Parameter bundle for a compression operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Codec to use.
    pub codec: CompressionCodec,
    /// Compression mode.
    pub mode: CompressionMode,
    /// Quality preset.
    pub quality: QualityPreset,
    /// Target compression ratio (lossy mode only).
    pub target_ratio: Option<f32>,
    /// JPEG 2000: number of quality layers.
    pub quality_layers: u32,
    /// JPEG 2000: tile size, 0 = single tile (reserved).
    pub tile_size: u32,
    /// JPEG-LS: near-lossless error tolerance (0 = lossless).
    pub near_lossless_error: u8,
    /// Preserve original DICOM metadata exactly.
    pub preserve_metadata: bool,
    /// Verify lossless compression by round-trip decode.
    pub verify_roundtrip: bool,
    /// Override modality safety checks (use with caution).
    pub override_safety: bool,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::Jpeg2000,
            mode: CompressionMode::Lossless,
            quality: QualityPreset::Diagnostic,
            target_ratio: None,
            quality_layers: 1,
            tile_size: 0,
            near_lossless_error: 0,
            preserve_metadata: true,
            verify_roundtrip: false,
            override_safety: false,
        }
    }
}

impl CompressionConfig {
    /// Lossless configuration with the given codec.
    pub fn lossless(codec: CompressionCodec) -> Self {
        Self {
            codec,
            mode: CompressionMode::Lossless,
            quality: QualityPreset::Diagnostic,
            ..Default::default()
        }
    }

    /// Lossy configuration with a target ratio.
    pub fn lossy(codec: CompressionCodec, ratio: f32) -> Self {
        Self {
            codec,
            mode: CompressionMode::Lossy,
            quality: QualityPreset::Standard,
            target_ratio: Some(ratio),
            ..Default::default()
        }
    }

    /// JPEG-LS near-lossless configuration with the given error tolerance.
    pub fn near_lossless(tolerance: u8) -> Self {
        Self {
            codec: CompressionCodec::JpegLs,
            mode: CompressionMode::NearLossless,
            quality: QualityPreset::HighQuality,
            near_lossless_error: tolerance,
            ..Default::default()
        }
    }

    /// Check the structural invariants of the parameter bundle.
    pub fn validate(&self) -> Result<()> {
        if self.mode == CompressionMode::Lossless && self.near_lossless_error != 0 {
            return Err(Error::Configuration(
                "near-lossless tolerance must be 0 in lossless mode".into(),
            ));
        }
        if self.mode == CompressionMode::NearLossless && self.codec != CompressionCodec::JpegLs {
            return Err(Error::Configuration(format!(
                "near-lossless mode is only supported by the JPEG-LS codec, not {:?}",
                self.codec
            )));
        }
        if let Some(ratio) = self.target_ratio {
            if self.mode == CompressionMode::Lossy && ratio < 1.0 {
                return Err(Error::CompressionConstraint(format!(
                    "target ratio {ratio} must be at least 1.0"
                )));
            }
        }
        Ok(())
    }

    /// Validate this configuration against modality policy.
    ///
    /// Returns `Error::Validation` when the modality requires lossless
    /// compression, a non-lossless mode was requested, and safety overrides
    /// are not enabled.
    pub fn validate_for_modality(&self, modality: Modality) -> Result<()> {
        if modality.requires_lossless() && self.mode != CompressionMode::Lossless {
            if self.override_safety {
                log::warn!(
                    "safety check overridden: {:?} normally requires lossless compression",
                    modality
                );
            } else {
                return Err(Error::Validation(format!(
                    "modality {:?} requires lossless compression (FDA/ACR requirement); \
                     set override_safety to bypass",
                    modality
                )));
            }
        }
        Ok(())
    }
}
