//! JPEG-2000-family codec.
//!
//! Emits a framed J2K codestream (SOC/SIZ/COD/QCD/SOT/SOD/EOC marker
//! segments with standard field layouts) around this crate's internal
//! payload: horizontal differential coding when reversible, shift
//! quantization when not. Streams round-trip within this crate only.

use crate::config::{CompressionConfig, CompressionMode};
use crate::error::{Error, Result};
use crate::jpeg_marker_code::JpegMarkerCode;
use crate::jpeg_stream_reader::JpegStreamReader;
use crate::jpeg_stream_writer::JpegStreamWriter;
use crate::transfer_syntax;
use crate::ImageData;

use super::traits::{Codec, CodecCapabilities, CodecInfo};

/// JPEG 2000 codec with reversible (lossless) and quantized (lossy) modes.
#[derive(Debug, Default)]
pub struct Jpeg2000Codec;

impl Jpeg2000Codec {
    pub fn new() -> Self {
        Self
    }

    fn encode_codestream(&self, image: &ImageData, config: &CompressionConfig) -> Result<Vec<u8>> {
        if image.width == 0 || image.height == 0 {
            return Err(Error::ImageData("invalid image dimensions".into()));
        }
        image.validate()?;

        let lossless = config.mode == CompressionMode::Lossless;

        let payload = if lossless {
            lossless_encode(&image.pixel_data, image.bits_per_sample)
        } else {
            let ratio = config.target_ratio.unwrap_or(10.0);
            lossy_encode(&image.pixel_data, image.bits_per_sample, ratio)
        };

        let mut writer = JpegStreamWriter::with_capacity(payload.len() + 128);
        writer.write_marker(JpegMarkerCode::StartOfCodestream);
        write_siz_segment(&mut writer, image);
        write_cod_segment(&mut writer, config.quality_layers as u16, lossless);
        write_qcd_segment(&mut writer, lossless);
        write_sot_segment(&mut writer, payload.len());
        writer.write_marker(JpegMarkerCode::StartOfData);
        writer.write_bytes(&payload);
        writer.write_marker(JpegMarkerCode::EndOfImage);

        let codestream = writer.into_bytes();
        log::debug!(
            "encoded {}x{} image to {} byte J2K codestream (lossless: {})",
            image.width,
            image.height,
            codestream.len(),
            lossless
        );
        Ok(codestream)
    }

    fn decode_codestream(&self, data: &[u8], bits_per_sample: u16) -> Result<Vec<u8>> {
        if data.len() < 4 {
            return Err(Error::CodecFailure("J2K codestream too short".into()));
        }

        let mut reader = JpegStreamReader::new(data);
        if reader.read_marker()? != JpegMarkerCode::StartOfCodestream {
            return Err(Error::CodecFailure("missing SOC marker".into()));
        }

        // Walk the main header; the COD transform byte decides whether the
        // payload is reversible. The SOT tile header is not trusted for
        // lengths, so the payload is located by scanning for SOD.
        let mut reversible: Option<bool> = None;
        let payload_start = loop {
            let marker = reader.read_marker()?;
            match marker {
                JpegMarkerCode::CodingStyleDefault => {
                    let length = reader.read_u16()? as usize;
                    if length < 12 {
                        return Err(Error::CodecFailure("truncated COD segment".into()));
                    }
                    reader.advance(9); // style, order, layers, MCT, levels, block exps/style
                    let transform = reader.read_byte()?;
                    reversible = Some(transform == 1);
                    reader.advance(length - 12);
                }
                JpegMarkerCode::StartOfTile | JpegMarkerCode::StartOfData => {
                    let start = if marker == JpegMarkerCode::StartOfTile {
                        reader
                            .scan_for_marker(JpegMarkerCode::StartOfData)
                            .ok_or_else(|| Error::CodecFailure("missing SOD marker".into()))?
                    } else {
                        reader.position()
                    };
                    break start;
                }
                JpegMarkerCode::EndOfImage => {
                    return Err(Error::CodecFailure("no tile data found".into()));
                }
                _ => reader.skip_segment()?,
            }
        };

        let mut end = data.len();
        if end >= 2 && data[end - 2] == 0xFF && data[end - 1] == 0xD9 {
            end -= 2;
        }
        if payload_start >= end {
            return Err(Error::CodecFailure("no tile data found".into()));
        }
        let payload = &data[payload_start..end];

        // Reversible flag from COD; first-byte sniff as fallback for
        // codestreams without a main header.
        let lossless = reversible.unwrap_or(payload[0] >= 16);

        if lossless {
            Ok(lossless_decode(payload, bits_per_sample))
        } else {
            Ok(lossy_decode(payload, bits_per_sample))
        }
    }
}

/// SIZ: image geometry, single whole-image tile, per-component precision.
fn write_siz_segment(writer: &mut JpegStreamWriter, image: &ImageData) {
    let components = image.samples_per_pixel as usize;

    writer.write_marker(JpegMarkerCode::ImageAndTileSize);
    writer.write_u16((38 + 3 * components) as u16);
    writer.write_u16(0); // Rsiz: unrestricted profile
    writer.write_u32(image.width);
    writer.write_u32(image.height);
    writer.write_u32(0); // XOsiz
    writer.write_u32(0); // YOsiz
    writer.write_u32(image.width); // tile spans the whole image
    writer.write_u32(image.height);
    writer.write_u32(0); // XTOsiz
    writer.write_u32(0); // YTOsiz
    writer.write_u16(image.samples_per_pixel);

    for _ in 0..components {
        let mut ssiz = (image.bits_per_sample.saturating_sub(1) as u8) & 0x7F;
        if image.is_signed {
            ssiz |= 0x80;
        }
        writer.write_byte(ssiz);
        writer.write_byte(0x01); // XRsiz
        writer.write_byte(0x01); // YRsiz
    }
}

/// COD: LRCP progression, 5 decomposition levels, 64x64 code-blocks.
fn write_cod_segment(writer: &mut JpegStreamWriter, quality_layers: u16, lossless: bool) {
    writer.write_marker(JpegMarkerCode::CodingStyleDefault);
    writer.write_u16(12);
    writer.write_byte(0x00); // Scod
    writer.write_byte(0x00); // LRCP
    writer.write_u16(quality_layers);
    writer.write_byte(0x00); // no MCT
    writer.write_byte(0x05); // decomposition levels
    writer.write_byte(0x04); // code-block width exponent
    writer.write_byte(0x04); // code-block height exponent
    writer.write_byte(0x00); // code-block style
    writer.write_byte(if lossless { 0x01 } else { 0x00 }); // 5/3 or 9/7
}

/// QCD: reversible (no quantization) or scalar-derived base step.
fn write_qcd_segment(writer: &mut JpegStreamWriter, lossless: bool) {
    writer.write_marker(JpegMarkerCode::QuantizationDefault);
    if lossless {
        writer.write_u16(4);
        writer.write_byte(0x22); // Sqcd: reversible, 2 guard bits
        writer.write_byte(0x00);
    } else {
        writer.write_u16(5);
        writer.write_byte(0x42); // Sqcd: scalar derived, 2 guard bits
        writer.write_u16(0x0088); // base step size
    }
}

/// SOT tile header carrying the payload length, followed by SOD.
fn write_sot_segment(writer: &mut JpegStreamWriter, payload_len: usize) {
    let tile_length = 10 + payload_len;
    writer.write_marker(JpegMarkerCode::StartOfTile);
    writer.write_u16(tile_length as u16);
    writer.write_u16(0); // tile index
    writer.write_u32(tile_length as u32);
    writer.write_byte(0); // tile-part index
    writer.write_byte(1); // number of tile-parts
}

/// Horizontal differential coding with wrapping subtraction.
fn lossless_encode(data: &[u8], bits_per_sample: u16) -> Vec<u8> {
    let mut output = Vec::with_capacity(data.len());

    if bits_per_sample <= 8 {
        if let Some((&first, rest)) = data.split_first() {
            output.push(first);
            let mut prev = first;
            for &byte in rest {
                output.push(byte.wrapping_sub(prev));
                prev = byte;
            }
        }
    } else {
        let samples = data.len() / 2;
        if samples > 0 {
            output.extend_from_slice(&data[0..2]);
            for i in 1..samples {
                let curr = u16::from_le_bytes([data[i * 2], data[i * 2 + 1]]);
                let prev = u16::from_le_bytes([data[(i - 1) * 2], data[(i - 1) * 2 + 1]]);
                output.extend_from_slice(&curr.wrapping_sub(prev).to_le_bytes());
            }
        }
    }

    output
}

fn lossless_decode(data: &[u8], bits_per_sample: u16) -> Vec<u8> {
    let mut output = Vec::with_capacity(data.len());

    if bits_per_sample <= 8 {
        if let Some((&first, rest)) = data.split_first() {
            output.push(first);
            let mut prev = first;
            for &delta in rest {
                prev = prev.wrapping_add(delta);
                output.push(prev);
            }
        }
    } else if data.len() >= 2 {
        output.extend_from_slice(&data[0..2]);
        let mut prev = u16::from_le_bytes([data[0], data[1]]);
        for i in 1..data.len() / 2 {
            let delta = u16::from_le_bytes([data[i * 2], data[i * 2 + 1]]);
            prev = prev.wrapping_add(delta);
            output.extend_from_slice(&prev.to_le_bytes());
        }
    }

    output
}

/// Shift quantization: one leading byte with the shift amount, then every
/// sample right-shifted in its native width.
fn lossy_encode(data: &[u8], bits_per_sample: u16, target_ratio: f32) -> Vec<u8> {
    let quant_bits =
        ((target_ratio.log2() * 0.5) as u8).min(bits_per_sample.saturating_sub(1) as u8);
    let shift = quant_bits as usize;

    let mut output = Vec::with_capacity(data.len() + 1);
    output.push(quant_bits);

    if bits_per_sample <= 8 {
        for &byte in data {
            output.push(byte >> shift.min(7));
        }
    } else {
        for chunk in data.chunks_exact(2) {
            let value = u16::from_le_bytes([chunk[0], chunk[1]]);
            output.extend_from_slice(&(value >> shift.min(15)).to_le_bytes());
        }
    }

    output
}

fn lossy_decode(data: &[u8], bits_per_sample: u16) -> Vec<u8> {
    let Some((&quant_bits, data)) = data.split_first() else {
        return Vec::new();
    };
    let shift = (quant_bits as usize).min(15);

    let mut output = Vec::with_capacity(data.len());
    if bits_per_sample <= 8 {
        for &byte in data {
            output.push(byte << shift.min(7));
        }
    } else {
        for chunk in data.chunks_exact(2) {
            let value = u16::from_le_bytes([chunk[0], chunk[1]]);
            output.extend_from_slice(&(value << shift).to_le_bytes());
        }
    }

    output
}

impl Codec for Jpeg2000Codec {
    fn encode(&self, image: &ImageData, config: &CompressionConfig) -> Result<Vec<u8>> {
        self.encode_codestream(image, config)
    }

    fn decode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        bits_per_sample: u16,
        samples_per_pixel: u16,
    ) -> Result<ImageData> {
        let pixel_data = self.decode_codestream(data, bits_per_sample)?;

        let expected = ImageData::new(width, height, bits_per_sample, samples_per_pixel, vec![])
            .expected_size();
        if pixel_data.len() != expected {
            log::warn!(
                "decoded size {} differs from expected {}",
                pixel_data.len(),
                expected
            );
        }

        Ok(ImageData {
            width,
            height,
            bits_per_sample,
            samples_per_pixel,
            pixel_data,
            photometric_interpretation: String::new(),
            is_signed: false,
        })
    }

    fn info(&self) -> CodecInfo {
        CodecInfo {
            name: "JPEG 2000",
            version: "0.1",
            supports_lossless: true,
            supports_lossy: true,
            supports_progressive: true,
            supports_roi: false,
            transfer_syntax_lossless: Some(transfer_syntax::JPEG_2000_LOSSLESS),
            transfer_syntax_lossy: Some(transfer_syntax::JPEG_2000_LOSSY),
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
