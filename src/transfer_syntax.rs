//! DICOM transfer syntax registry.
//!
//! Maps the transfer syntax UIDs handled by this crate to human-readable
//! names and a lossless predicate.

/// Implicit VR Little Endian.
pub const IMPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2";
/// Explicit VR Little Endian.
pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
/// Explicit VR Big Endian.
pub const EXPLICIT_VR_BIG_ENDIAN: &str = "1.2.840.10008.1.2.2";
/// JPEG Lossless (Process 14, first-order prediction).
pub const JPEG_LOSSLESS: &str = "1.2.840.10008.1.2.4.70";
/// JPEG-LS Lossless.
pub const JPEG_LS_LOSSLESS: &str = "1.2.840.10008.1.2.4.80";
/// JPEG-LS Near-Lossless.
pub const JPEG_LS_NEAR_LOSSLESS: &str = "1.2.840.10008.1.2.4.81";
/// JPEG 2000 Image Compression (Lossless Only).
pub const JPEG_2000_LOSSLESS: &str = "1.2.840.10008.1.2.4.90";
/// JPEG 2000 Image Compression.
pub const JPEG_2000_LOSSY: &str = "1.2.840.10008.1.2.4.91";
/// RLE Lossless.
pub const RLE_LOSSLESS: &str = "1.2.840.10008.1.2.5";

/// Check whether a transfer syntax preserves pixel data bit-exactly.
pub fn is_lossless(uid: &str) -> bool {
    matches!(
        uid,
        IMPLICIT_VR_LITTLE_ENDIAN
            | EXPLICIT_VR_LITTLE_ENDIAN
            | EXPLICIT_VR_BIG_ENDIAN
            | JPEG_LOSSLESS
            | JPEG_LS_LOSSLESS
            | JPEG_2000_LOSSLESS
            | RLE_LOSSLESS
    )
}

/// Check whether a transfer syntax stores pixel data as a contiguous,
/// uncompressed byte run.
pub fn is_native(uid: &str) -> bool {
    matches!(
        uid,
        IMPLICIT_VR_LITTLE_ENDIAN | EXPLICIT_VR_LITTLE_ENDIAN | EXPLICIT_VR_BIG_ENDIAN
    )
}

/// Human-readable name for a transfer syntax UID.
pub fn name_of(uid: &str) -> &'static str {
    match uid {
        IMPLICIT_VR_LITTLE_ENDIAN => "Implicit VR Little Endian",
        EXPLICIT_VR_LITTLE_ENDIAN => "Explicit VR Little Endian",
        EXPLICIT_VR_BIG_ENDIAN => "Explicit VR Big Endian",
        JPEG_LOSSLESS => "JPEG Lossless",
        JPEG_LS_LOSSLESS => "JPEG-LS Lossless",
        JPEG_LS_NEAR_LOSSLESS => "JPEG-LS Near-Lossless",
        JPEG_2000_LOSSLESS => "JPEG 2000 Lossless",
        JPEG_2000_LOSSY => "JPEG 2000 Lossy",
        RLE_LOSSLESS => "RLE Lossless",
        _ => "Unknown",
    }
}
