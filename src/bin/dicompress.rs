//! dicompress CLI - DICOM medical image compression utility.
//!
//! Compresses DICOM files with the JPEG 2000 or JPEG-LS family codecs,
//! inspects file attributes, and analyzes compression potential.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use dicompress::pipeline::decompress_instance;
use dicompress::{
    parse_dicom, transfer_syntax, CompressionCodec, CompressionConfig, CompressionMode,
    CompressionPipeline, CompressionResult, QualityPreset,
};

/// DICOM image compression supporting JPEG 2000 and JPEG-LS
#[derive(Parser)]
#[command(name = "dicompress")]
#[command(author = "dicompress contributors")]
#[command(version)]
#[command(about = "Compress and inspect DICOM medical images", long_about = None)]
#[command(after_help = "EXAMPLES:
    dicompress compress input.dcm output.dcm -c jpeg2000 -m lossless
    dicompress compress input.dcm output.dcm -c jpegls -m nearlossless -n 2
    dicompress info input.dcm
    dicompress analyze input.dcm")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a DICOM file
    Compress {
        /// Input DICOM file
        input: PathBuf,

        /// Output DICOM file
        output: PathBuf,

        /// Compression codec
        #[arg(short, long, value_enum, default_value = "jpeg2000")]
        codec: CodecArg,

        /// Compression mode
        #[arg(short, long, value_enum, default_value = "lossless")]
        mode: ModeArg,

        /// Target compression ratio (lossy mode)
        #[arg(short = 'r', long)]
        ratio: Option<f32>,

        /// Near-lossless error tolerance (JPEG-LS, 0-255)
        #[arg(short = 'n', long, default_value = "0")]
        near: u8,

        /// Verify lossless compression by round-trip decode
        #[arg(long)]
        verify: bool,

        /// Override modality safety checks (use with caution)
        #[arg(long)]
        force: bool,
    },

    /// Show information about a DICOM file
    Info {
        /// Input DICOM file
        input: PathBuf,
    },

    /// Analyze compression potential with every codec and mode
    Analyze {
        /// Input DICOM file
        input: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum CodecArg {
    /// JPEG 2000 family
    #[value(name = "jpeg2000", alias = "j2k")]
    Jpeg2000,
    /// JPEG-LS family
    #[value(name = "jpegls", alias = "jls")]
    JpegLs,
    /// No compression
    #[value(name = "uncompressed", alias = "raw")]
    Uncompressed,
}

impl From<CodecArg> for CompressionCodec {
    fn from(arg: CodecArg) -> Self {
        match arg {
            CodecArg::Jpeg2000 => CompressionCodec::Jpeg2000,
            CodecArg::JpegLs => CompressionCodec::JpegLs,
            CodecArg::Uncompressed => CompressionCodec::Uncompressed,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum ModeArg {
    /// Exact reconstruction
    #[value(name = "lossless")]
    Lossless,
    /// Ratio-steered lossy compression
    #[value(name = "lossy")]
    Lossy,
    /// Bounded per-sample error (JPEG-LS)
    #[value(name = "nearlossless")]
    NearLossless,
}

impl From<ModeArg> for CompressionMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Lossless => CompressionMode::Lossless,
            ModeArg::Lossy => CompressionMode::Lossy,
            ModeArg::NearLossless => CompressionMode::NearLossless,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let quiet = cli.quiet;
    let result = match cli.command {
        Commands::Compress {
            input,
            output,
            codec,
            mode,
            ratio,
            near,
            verify,
            force,
        } => run_compress(
            input,
            output,
            codec.into(),
            mode.into(),
            ratio,
            near,
            verify,
            force,
            quiet,
        ),
        Commands::Info { input } => run_info(input, quiet),
        Commands::Analyze { input } => run_analyze(input, quiet),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn run_compress(
    input: PathBuf,
    output: PathBuf,
    codec: CompressionCodec,
    mode: CompressionMode,
    ratio: Option<f32>,
    near: u8,
    verify: bool,
    force: bool,
    quiet: bool,
) -> dicompress::Result<()> {
    let quality = match mode {
        CompressionMode::Lossless => QualityPreset::Diagnostic,
        CompressionMode::Lossy => QualityPreset::Standard,
        CompressionMode::NearLossless => QualityPreset::HighQuality,
    };

    let config = CompressionConfig {
        codec,
        mode,
        quality,
        target_ratio: ratio.or_else(|| quality.target_ratio()),
        quality_layers: quality.quality_layers(),
        near_lossless_error: near,
        verify_roundtrip: verify,
        override_safety: force,
        ..Default::default()
    };

    let pipeline = CompressionPipeline::new(config);
    let result = pipeline.compress_file(&input, Some(&output))?;

    if !quiet {
        print_result(&result);
    }
    Ok(())
}

fn run_info(input: PathBuf, quiet: bool) -> dicompress::Result<()> {
    let bytes = std::fs::read(&input)?;
    let instance = parse_dicom(&bytes)?;

    if quiet {
        return Ok(());
    }

    println!("DICOM File Information");
    println!("======================");
    println!("File: {}", input.display());
    println!();
    println!("Image Properties:");
    println!("  Rows: {}", instance.rows);
    println!("  Columns: {}", instance.columns);
    println!("  Bits Allocated: {}", instance.bits_allocated);
    println!("  Bits Stored: {}", instance.bits_stored);
    println!("  High Bit: {}", instance.high_bit);
    println!("  Samples per Pixel: {}", instance.samples_per_pixel);
    println!("  Photometric: {}", instance.photometric_interpretation);
    println!(
        "  Signed: {}",
        if instance.pixel_representation == 1 {
            "Yes"
        } else {
            "No"
        }
    );
    println!();
    println!("Transfer Syntax:");
    println!("  UID: {}", instance.transfer_syntax);
    println!(
        "  Name: {}",
        transfer_syntax::name_of(&instance.transfer_syntax)
    );
    println!(
        "  Compressed: {}",
        if instance.is_compressed() { "Yes" } else { "No" }
    );
    println!();
    println!("Modality: {}", instance.modality);
    if instance.modality().requires_lossless() {
        println!("  Note: this modality requires lossless compression (FDA/ACR)");
    }

    if instance.sop_class_uid.is_empty() && instance.sop_instance_uid.is_empty() {
        return Ok(());
    }
    println!();
    println!("DICOM UIDs:");
    if !instance.sop_class_uid.is_empty() {
        println!("  SOP Class UID: {}", instance.sop_class_uid);
    }
    if !instance.sop_instance_uid.is_empty() {
        println!("  SOP Instance UID: {}", instance.sop_instance_uid);
    }

    Ok(())
}

fn run_analyze(input: PathBuf, quiet: bool) -> dicompress::Result<()> {
    let bytes = std::fs::read(&input)?;
    let instance = parse_dicom(&bytes)?;

    if !quiet {
        println!("Compression Analysis: {}", input.display());
        println!("========================================");
    }

    let combinations: [(CompressionCodec, CompressionMode); 5] = [
        (CompressionCodec::Jpeg2000, CompressionMode::Lossless),
        (CompressionCodec::Jpeg2000, CompressionMode::Lossy),
        (CompressionCodec::JpegLs, CompressionMode::Lossless),
        (CompressionCodec::JpegLs, CompressionMode::NearLossless),
        (CompressionCodec::Uncompressed, CompressionMode::Lossless),
    ];

    for (codec, mode) in combinations {
        let config = match mode {
            CompressionMode::Lossless => CompressionConfig::lossless(codec),
            CompressionMode::Lossy => CompressionConfig::lossy(codec, 10.0),
            CompressionMode::NearLossless => CompressionConfig::near_lossless(2),
        };

        println!();
        println!("{codec:?} / {mode:?}:");
        let pipeline = CompressionPipeline::new(config);
        match pipeline.compress_instance(&instance, None) {
            Ok(result) => {
                print_result(&result);
                // Confirm the lossless paths reconstruct the input.
                if mode == CompressionMode::Lossless {
                    if let Some(out) = &result.output_bytes {
                        let reparsed = parse_dicom(out)?;
                        let decoded = decompress_instance(&reparsed)?;
                        let original = instance.get_image_data()?;
                        if decoded.pixel_data != original.pixel_data {
                            println!("  Warning: reconstruction differs from input");
                        }
                    }
                }
            }
            Err(e) => println!("  Error: {e}"),
        }
    }

    Ok(())
}

fn print_result(result: &CompressionResult) {
    println!("  Codec: {}", result.codec_name);
    println!(
        "  Transfer Syntax: {} ({})",
        result.transfer_syntax,
        transfer_syntax::name_of(&result.transfer_syntax)
    );
    println!(
        "  Mode: {}",
        if result.is_lossless { "Lossless" } else { "Lossy" }
    );
    println!("  Original Size: {} bytes", result.original_size);
    println!("  Compressed Size: {} bytes", result.compressed_size);
    println!("  Compression Ratio: {:.2}:1", result.ratio());
    println!("  Space Savings: {:.1}%", result.savings_percent());
    println!("  Time: {} ms", result.elapsed_ms);

    for warning in &result.warnings {
        println!("  Warning: {warning}");
    }
}
