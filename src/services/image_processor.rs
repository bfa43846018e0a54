use anyhow::{Result, anyhow};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageEncoder};
use std::path::Path;

/// Encodings the normalizer writes; chosen from the stored file's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
    /// Images wider than this are scaled down, keeping the aspect ratio
    pub max_width: u32,
    /// JPEG quality (1-100). PNG output is always lossless at maximum compression.
    pub quality: u8,
}

/// Decodes the file at `path`, downsizes it and rewrites it in place in
/// `format`. Returns the final dimensions. Blocking; run it on the blocking
/// pool.
pub fn normalize_image(path: &Path, format: OutputFormat, opts: EncodeOptions) -> Result<(u32, u32)> {
    let img = image::io::Reader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| anyhow!("Failed to load image: {}", e))?;

    let img = downsize(img, opts.max_width);
    let data = encode(&img, format, opts.quality)?;
    std::fs::write(path, data)?;

    Ok((img.width(), img.height()))
}

fn downsize(img: DynamicImage, max_width: u32) -> DynamicImage {
    if max_width == 0 || img.width() <= max_width {
        return img;
    }
    let height = (u64::from(img.height()) * u64::from(max_width) / u64::from(img.width())).max(1) as u32;
    img.resize_exact(max_width, height, FilterType::Lanczos3)
}

pub fn encode(img: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match format {
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = img.to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
            encoder
                .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
                .map_err(|e| anyhow!("Failed to encode JPEG: {}", e))?;
        }
        OutputFormat::Png => {
            let encoder =
                PngEncoder::new_with_quality(&mut out, CompressionType::Best, PngFilterType::Adaptive);
            let written = if img.color().has_alpha() {
                let rgba = img.to_rgba8();
                encoder.write_image(rgba.as_raw(), rgba.width(), rgba.height(), ColorType::Rgba8)
            } else {
                let rgb = img.to_rgb8();
                encoder.write_image(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
            };
            written.map_err(|e| anyhow!("Failed to encode PNG: {}", e))?;
        }
    }
    Ok(out)
}
