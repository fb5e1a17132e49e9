//! JPEG-LS-family codec.
//!
//! Emits a framed JPEG-LS codestream (SOI/SOF55/LSE/SOS/EOI) around raw
//! median-edge-detector residuals, quantized when a near-lossless
//! tolerance is set. There is no entropy coding stage; streams round-trip
//! within this crate only.

use crate::config::{CompressionConfig, CompressionMode};
use crate::error::{Error, Result};
use crate::jpeg_marker_code::JpegMarkerCode;
use crate::jpeg_stream_writer::JpegStreamWriter;
use crate::transfer_syntax;
use crate::ImageData;

use super::traits::{Codec, CodecCapabilities, CodecInfo};

/// JPEG-LS codec with lossless and near-lossless modes.
#[derive(Debug, Default)]
pub struct JpegLsCodec;

impl JpegLsCodec {
    pub fn new() -> Self {
        Self
    }

    fn encode_codestream(&self, image: &ImageData, config: &CompressionConfig) -> Result<Vec<u8>> {
        if image.width == 0 || image.height == 0 {
            return Err(Error::ImageData("invalid image dimensions".into()));
        }
        image.validate()?;

        let near = if config.mode == CompressionMode::NearLossless {
            config.near_lossless_error
        } else {
            0
        };

        let mut writer = JpegStreamWriter::with_capacity(image.pixel_data.len() + 64);
        writer.write_marker(JpegMarkerCode::StartOfImage);
        write_sof55_segment(&mut writer, image);
        if near > 0 {
            write_lse_segment(&mut writer);
        }
        write_sos_segment(&mut writer, image.samples_per_pixel, near);

        let width = image.width as usize;
        if image.bits_per_sample <= 8 {
            encode_residuals_8(&image.pixel_data, width, near, &mut writer);
        } else {
            encode_residuals_16(&image.pixel_data, width, near, &mut writer);
        }

        writer.write_marker(JpegMarkerCode::EndOfImage);

        let codestream = writer.into_bytes();
        log::debug!(
            "encoded {}x{} image to {} byte JPEG-LS codestream (NEAR={})",
            image.width,
            image.height,
            codestream.len(),
            near
        );
        Ok(codestream)
    }

    fn decode_codestream(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        bits_per_sample: u16,
        samples_per_pixel: u16,
    ) -> Result<Vec<u8>> {
        if data.len() < 4 {
            return Err(Error::CodecFailure("JPEG-LS codestream too short".into()));
        }
        if data[0] != 0xFF || data[1] != 0xD8 {
            return Err(Error::CodecFailure("missing SOI marker".into()));
        }

        let (near, payload_start) = parse_scan_header(data)?;

        let payload_end = if data.ends_with(&[0xFF, 0xD9]) {
            data.len() - 2
        } else {
            data.len()
        };
        if payload_start >= payload_end {
            return Err(Error::CodecFailure("no entropy data found".into()));
        }
        let payload = &data[payload_start..payload_end];

        // Components are interleaved in the sample sequence, so the
        // residual pass sees samples_per_pixel extra rows per image row.
        let width = width as usize;
        let rows = height as usize * samples_per_pixel as usize;

        if bits_per_sample <= 8 {
            Ok(decode_residuals_8(payload, width, rows, near))
        } else {
            Ok(decode_residuals_16(payload, width, rows, near))
        }
    }
}

/// SOF55: precision, geometry and per-component parameters.
fn write_sof55_segment(writer: &mut JpegStreamWriter, image: &ImageData) {
    let components = image.samples_per_pixel;

    writer.write_marker(JpegMarkerCode::StartOfFrameJpegls);
    writer.write_u16(8 + 3 * components);
    writer.write_byte(image.bits_per_sample as u8);
    writer.write_u16(image.height as u16);
    writer.write_u16(image.width as u16);
    writer.write_byte(components as u8);

    for i in 0..components {
        writer.write_byte(i as u8 + 1); // component ID
        writer.write_byte(0x11); // H=1, V=1
        writer.write_byte(0x00); // Tq
    }
}

/// LSE preset parameters with the defaults for MAXVAL=255.
fn write_lse_segment(writer: &mut JpegStreamWriter) {
    writer.write_marker(JpegMarkerCode::JpeglsPresetParameters);
    writer.write_u16(0x000D);
    writer.write_byte(0x01); // type 1: preset coding parameters
    writer.write_u16(0x00FF); // MAXVAL
    writer.write_u16(3); // T1
    writer.write_u16(7); // T2
    writer.write_u16(21); // T3
    writer.write_u16(64); // RESET
}

/// SOS: component selectors, NEAR, interleave mode, point transform.
fn write_sos_segment(writer: &mut JpegStreamWriter, components: u16, near: u8) {
    writer.write_marker(JpegMarkerCode::StartOfScan);
    writer.write_u16(6 + 2 * components);
    writer.write_byte(components as u8);

    for i in 0..components {
        writer.write_byte(i as u8 + 1); // component selector
        writer.write_byte(0x00); // mapping table
    }

    writer.write_byte(near);
    writer.write_byte(if components > 1 { 2 } else { 0 }); // interleave
    writer.write_byte(0x00); // point transform
}

/// Walk marker segments after SOI until SOS, returning the NEAR value and
/// the offset where the entropy payload starts.
fn parse_scan_header(data: &[u8]) -> Result<(u8, usize)> {
    let mut pos = 2;

    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = data[pos + 1];
        pos += 2;

        match marker {
            0xDA => {
                // SOS: NEAR sits after the component selectors.
                if pos + 2 > data.len() {
                    break;
                }
                let length = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
                if length < 6 || pos + length > data.len() {
                    break;
                }
                let components = data[pos + 2] as usize;
                let near_offset = pos + 3 + 2 * components;
                let near = if near_offset < data.len() {
                    data[near_offset]
                } else {
                    0
                };
                return Ok((near, pos + length));
            }
            0xD9 => break,
            0x00 => continue, // stuffed byte
            _ => {
                if pos + 2 > data.len() {
                    break;
                }
                let length = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
                pos += length;
            }
        }
    }

    Err(Error::CodecFailure(
        "start of scan marker not found".into(),
    ))
}

/// Median edge detector over the reconstruction plane.
///
/// The top-left sample predicts from mid-range; edge samples copy the one
/// defined neighbour.
fn predict_8(plane: &[u8], idx: usize, x: usize, y: usize, width: usize) -> u8 {
    if x == 0 && y == 0 {
        128
    } else if y == 0 {
        plane[idx - 1]
    } else if x == 0 {
        plane[idx - width]
    } else {
        let a = i16::from(plane[idx - 1]);
        let b = i16::from(plane[idx - width]);
        let c = i16::from(plane[idx - width - 1]);

        if c >= a.max(b) {
            a.min(b) as u8
        } else if c <= a.min(b) {
            a.max(b) as u8
        } else {
            (a + b - c).clamp(0, 255) as u8
        }
    }
}

fn predict_16(plane: &[u16], idx: usize, x: usize, y: usize, width: usize) -> u16 {
    if x == 0 && y == 0 {
        32768
    } else if y == 0 {
        plane[idx - 1]
    } else if x == 0 {
        plane[idx - width]
    } else {
        let a = i32::from(plane[idx - 1]);
        let b = i32::from(plane[idx - width]);
        let c = i32::from(plane[idx - width - 1]);

        if c >= a.max(b) {
            a.min(b) as u16
        } else if c <= a.min(b) {
            a.max(b) as u16
        } else {
            (a + b - c).clamp(0, 65535) as u16
        }
    }
}

/// Quantize a wrapped 8-bit prediction error with floor division.
fn quantize_error_8(error: u8, near: u8) -> i16 {
    let e = i16::from(error as i8);
    let near = i16::from(near);
    let step = 2 * near + 1;
    if e >= 0 {
        (e + near) / step
    } else {
        (e - near) / step
    }
}

/// Apply a dequantized residual to the prediction, clamped to the sample
/// range so the error bound survives out-of-range residuals.
fn reconstruct_8(prediction: u8, quantized: i16, near: u8) -> u8 {
    let step = 2 * i16::from(near) + 1;
    (i16::from(prediction) + quantized * step).clamp(0, 255) as u8
}

/// 16-bit quantizer. The tolerance is scaled by 256, so NEAR keeps the
/// same relative magnitude it has for 8-bit samples.
fn quantize_error_16(error: u16, near: u8) -> i32 {
    let n = i32::from(near) * 256;
    let e = i32::from(error as i16);
    let step = 2 * n + 1;
    if e >= 0 {
        (e + n) / step
    } else {
        (e - n) / step
    }
}

fn reconstruct_16(prediction: u16, quantized: i32, near: u8) -> u16 {
    let n = i32::from(near) * 256;
    (i32::from(prediction) + quantized * (2 * n + 1)).clamp(0, 65535) as u16
}

/// Residual pass over 8-bit samples. Predictions always come from the
/// reconstruction plane so encoder and decoder stay aligned under
/// quantization.
fn encode_residuals_8(data: &[u8], width: usize, near: u8, writer: &mut JpegStreamWriter) {
    let rows = data.len() / width;
    let mut reconstructed = vec![0u8; data.len()];

    for y in 0..rows {
        for x in 0..width {
            let idx = y * width + x;
            let current = data[idx];
            let prediction = predict_8(&reconstructed, idx, x, y, width);
            let error = current.wrapping_sub(prediction);

            if near == 0 {
                writer.write_byte(error);
                reconstructed[idx] = current;
            } else {
                let quantized = quantize_error_8(error, near);
                writer.write_byte(quantized as u8);
                reconstructed[idx] = reconstruct_8(prediction, quantized, near);
            }
        }
    }
}

fn decode_residuals_8(data: &[u8], width: usize, rows: usize, near: u8) -> Vec<u8> {
    let mut output = vec![0u8; width * rows];

    for y in 0..rows {
        for x in 0..width {
            let idx = y * width + x;
            if idx >= data.len() {
                return output;
            }
            let error = data[idx];
            let prediction = predict_8(&output, idx, x, y, width);

            output[idx] = if near == 0 {
                prediction.wrapping_add(error)
            } else {
                reconstruct_8(prediction, i16::from(error as i8), near)
            };
        }
    }

    output
}

fn encode_residuals_16(data: &[u8], width: usize, near: u8, writer: &mut JpegStreamWriter) {
    let samples = data.len() / 2;
    let rows = samples / width;
    let mut reconstructed = vec![0u16; samples];

    for y in 0..rows {
        for x in 0..width {
            let idx = y * width + x;
            let current = u16::from_le_bytes([data[idx * 2], data[idx * 2 + 1]]);
            let prediction = predict_16(&reconstructed, idx, x, y, width);
            let error = current.wrapping_sub(prediction);

            if near == 0 {
                writer.write_bytes(&error.to_le_bytes());
                reconstructed[idx] = current;
            } else {
                let quantized = quantize_error_16(error, near);
                writer.write_bytes(&(quantized as u16).to_le_bytes());
                reconstructed[idx] = reconstruct_16(prediction, quantized, near);
            }
        }
    }
}

fn decode_residuals_16(data: &[u8], width: usize, rows: usize, near: u8) -> Vec<u8> {
    let samples = width * rows;
    let mut plane = vec![0u16; samples];

    for y in 0..rows {
        for x in 0..width {
            let idx = y * width + x;
            if idx * 2 + 1 >= data.len() {
                break;
            }
            let error = u16::from_le_bytes([data[idx * 2], data[idx * 2 + 1]]);
            let prediction = predict_16(&plane, idx, x, y, width);

            plane[idx] = if near == 0 {
                prediction.wrapping_add(error)
            } else {
                reconstruct_16(prediction, i32::from(error as i16), near)
            };
        }
    }

    let mut output = Vec::with_capacity(samples * 2);
    for value in plane {
        output.extend_from_slice(&value.to_le_bytes());
    }
    output
}

impl Codec for JpegLsCodec {
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
        let pixel_data =
            self.decode_codestream(data, width, height, bits_per_sample, samples_per_pixel)?;

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
            name: "JPEG-LS",
            version: "0.1",
            supports_lossless: true,
            supports_lossy: true, // near-lossless
            supports_progressive: false,
            supports_roi: false,
            transfer_syntax_lossless: Some(transfer_syntax::JPEG_LS_LOSSLESS),
            transfer_syntax_lossy: Some(transfer_syntax::JPEG_LS_NEAR_LOSSLESS),
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
