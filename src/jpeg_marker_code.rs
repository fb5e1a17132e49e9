use crate::error::Error;

/// Marker codes used by the JPEG-family codestreams this crate emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JpegMarkerCode {
    /// SOI: Marks the start of an image.
    StartOfImage = 0xD8,

    /// EOI: Marks the end of an image. Doubles as EOC in JPEG 2000.
    EndOfImage = 0xD9,

    /// SOS: Marks the start of scan.
    StartOfScan = 0xDA,

    // The following markers are defined in ISO/IEC 14495-1 | ITU T.87. (JPEG-LS standard)
    /// SOF_55: Marks the start of a JPEG-LS encoded frame.
    StartOfFrameJpegls = 0xF7,

    /// LSE: Marks the start of a JPEG-LS preset parameters segment.
    JpeglsPresetParameters = 0xF8,

    // JPEG 2000 (ISO/IEC 15444-1) Markers
    /// SOC: Start of Codestream
    StartOfCodestream = 0x4F,
    /// SIZ: Image and tile size
    ImageAndTileSize = 0x51,
    /// COD: Coding style default
    CodingStyleDefault = 0x52,
    /// QCD: Quantization default
    QuantizationDefault = 0x5C,
    /// SOT: Start of Tile
    StartOfTile = 0x90,
    /// SOD: Start of Data
    StartOfData = 0x93,
}

impl std::convert::TryFrom<u8> for JpegMarkerCode {
    type Error = Error;
    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0xD8 => Ok(Self::StartOfImage),
            0xD9 => Ok(Self::EndOfImage),
            0xDA => Ok(Self::StartOfScan),
            0xF7 => Ok(Self::StartOfFrameJpegls),
            0xF8 => Ok(Self::JpeglsPresetParameters),
            0x4F => Ok(Self::StartOfCodestream),
            0x51 => Ok(Self::ImageAndTileSize),
            0x52 => Ok(Self::CodingStyleDefault),
            0x5C => Ok(Self::QuantizationDefault),
            0x90 => Ok(Self::StartOfTile),
            0x93 => Ok(Self::StartOfData),
            _ => Err(Error::InvalidFormat(format!("unknown JPEG marker 0x{v:02X}"))),
        }
    }
}

pub const JPEG_MARKER_START_BYTE: u8 = 0xFF;
