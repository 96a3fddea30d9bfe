//! Image renditions: scaled copies of image attachments.

use std::io::Cursor;
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Limits, Rgba, RgbaImage};

use crate::error::{Result, SiteError};
use crate::model::rendition::Rendition;

/// Produces the encoded bytes of one rendition of an image file.
///
/// The sink only depends on this trait so tests can substitute a resizer
/// that records calls or fails on demand.
pub trait Resizer {
    fn render(&self, source: &Path, rendition: &Rendition) -> Result<Vec<u8>>;
}

/// [`Resizer`] backed by the `image` crate.
///
/// Output keeps the source's encoding. Decoding is bounded by `max_alloc`
/// bytes; an image that needs more fails with a limits error instead of
/// exhausting memory.
#[derive(Debug, Clone)]
pub struct ImageResizer {
    max_alloc: u64,
}

impl ImageResizer {
    pub fn new(max_alloc: u64) -> Self {
        Self { max_alloc }
    }

    fn decode(&self, source: &Path) -> Result<(DynamicImage, ImageFormat)> {
        let mut reader = ImageReader::open(source)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| SiteError::io(source, e))?;
        let format = reader.format().ok_or_else(|| SiteError::Rendition {
            name: source.display().to_string(),
            reason: "unrecognized image format".to_string(),
        })?;

        let mut limits = Limits::default();
        limits.max_alloc = Some(self.max_alloc);
        reader.limits(limits);

        Ok((reader.decode()?, format))
    }
}

impl Resizer for ImageResizer {
    fn render(&self, source: &Path, rendition: &Rendition) -> Result<Vec<u8>> {
        let (image, format) = self.decode(source)?;

        let scaled = if rendition.fill {
            let cropped =
                image.resize_to_fill(rendition.width, rendition.height, FilterType::Lanczos3);
            centre_on_white(&cropped, rendition.width, rendition.height)
        } else {
            image.resize(rendition.width, rendition.height, FilterType::Lanczos3)
        };

        // JPEG has no alpha channel and GIF wants 8-bit RGBA.
        let encodable = match format {
            ImageFormat::Jpeg => flatten_on_white(&scaled),
            ImageFormat::Gif => DynamicImage::ImageRgba8(scaled.to_rgba8()),
            _ => scaled,
        };

        let mut out = Vec::new();
        encodable.write_to(&mut Cursor::new(&mut out), format)?;
        Ok(out)
    }
}

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Composite onto an opaque white background.
fn flatten_on_white(image: &DynamicImage) -> DynamicImage {
    if !image.color().has_alpha() {
        return DynamicImage::ImageRgb8(image.to_rgb8());
    }
    centre_on_white(image, image.width(), image.height())
}

/// Centre `image` on an opaque white `width`×`height` canvas.
fn centre_on_white(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let mut canvas = RgbaImage::from_pixel(width, height, WHITE);
    let x = i64::from(width.saturating_sub(image.width()) / 2);
    let y = i64::from(height.saturating_sub(image.height()) / 2);
    image::imageops::overlay(&mut canvas, &image.to_rgba8(), x, y);
    DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
}
