//! Full-bleed page background.
//!
//! The background image is prepared once per batch: decoded, downscaled to the
//! page at [`BACKGROUND_DPI`], flattened over white and written to a temporary
//! PNG that every certificate then embeds. When the image cannot be used a small
//! solid image in the fallback colour takes its place, so a certificate is never
//! lost to a missing background.

use crate::config::HexColor;
use genpdf::elements::Image;
use genpdf::error::Error;
use genpdf::render::Area;
use genpdf::style::Style;
use genpdf::{Context, Element, Margins, PageDecorator, Scale};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use log::{error, warn};
use png::{BitDepth as PngBitDepth, ColorType as PngColorType, Encoder as PngEncoder};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const BACKGROUND_DPI: f64 = 150.0;
const MM_PER_INCH: f64 = 25.4;
const FILL_SIDE_PX: u32 = 8;

/// What ends up behind the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundKind {
    Image(PathBuf),
    SolidFill(HexColor),
}

pub struct Background {
    kind: BackgroundKind,
    /// Kept alive until the renderer is dropped.
    file: Option<NamedTempFile>,
    pixels: (u32, u32),
    page_mm: (f64, f64),
}

impl Background {
    /// Never fails: an unusable image is replaced by `fill`.
    pub fn prepare(path: &Path, fill: HexColor, page_mm: (f64, f64)) -> Self {
        let (kind, image) = match load_flattened(path, page_mm) {
            Ok(image) => (BackgroundKind::Image(path.to_path_buf()), image),
            Err(e) => {
                warn!(
                    "Could not load background image '{}': {}. Using a solid {} fill instead",
                    path.display(),
                    e,
                    fill
                );
                (BackgroundKind::SolidFill(fill), solid_fill(fill))
            }
        };

        let file = match write_png(&image) {
            Ok(file) => Some(file),
            Err(e) => {
                error!("Could not prepare the page background: {}. Certificates will have none", e);
                None
            }
        };

        Self {
            kind,
            file,
            pixels: image.dimensions(),
            page_mm,
        }
    }

    pub fn kind(&self) -> &BackgroundKind {
        &self.kind
    }

    /// Page decorator drawing this background and applying `margin_mm` on every page.
    pub fn decorator(&self, margin_mm: f64) -> PageBackground {
        let image = self.file.as_ref().and_then(|file| match Image::from_path(file.path()) {
            Ok(image) => Some(image.with_dpi(BACKGROUND_DPI).with_scale(self.scale())),
            Err(e) => {
                warn!("Could not embed the page background: {}", e);
                None
            }
        });
        PageBackground { image, margin_mm }
    }

    fn scale(&self) -> Scale {
        let (x, y) = self.scale_factors();
        Scale::new(x, y)
    }

    /// Horizontal and vertical factors that stretch the prepared pixels over the whole page.
    fn scale_factors(&self) -> (f64, f64) {
        let (width_px, height_px) = self.pixels;
        let natural_mm = |px: u32| f64::from(px) / BACKGROUND_DPI * MM_PER_INCH;
        (
            self.page_mm.0 / natural_mm(width_px),
            self.page_mm.1 / natural_mm(height_px),
        )
    }
}

/// Draws the background beneath the content, then hands the content a margined area.
pub struct PageBackground {
    image: Option<Image>,
    margin_mm: f64,
}

impl PageDecorator for PageBackground {
    fn decorate_page<'a>(
        &mut self,
        context: &Context,
        mut area: Area<'a>,
        style: Style,
    ) -> Result<Area<'a>, Error> {
        if let Some(image) = self.image.as_mut() {
            image.render(context, area.clone(), style)?;
        }
        area.add_margins(Margins::all(self.margin_mm));
        Ok(area)
    }
}

/// Loads the image, shrinks it to at most [`BACKGROUND_DPI`] over the page and
/// flattens any alpha channel over white.
fn load_flattened(path: &Path, page_mm: (f64, f64)) -> Result<RgbImage, image::ImageError> {
    let img = image::open(path)?;
    let (orig_w, orig_h) = img.dimensions();
    let target_px = |mm: f64| mm / MM_PER_INCH * BACKGROUND_DPI;

    let scale = (target_px(page_mm.0) / f64::from(orig_w))
        .min(target_px(page_mm.1) / f64::from(orig_h))
        .min(1.0);

    let resized: DynamicImage = if scale >= 1.0 {
        img
    } else {
        let new_w = (f64::from(orig_w) * scale).max(1.0).round() as u32;
        let new_h = (f64::from(orig_h) * scale).max(1.0).round() as u32;
        img.resize_exact(new_w, new_h, FilterType::Lanczos3)
    };

    let rgba = resized.to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut background = image::RgbaImage::from_pixel(w, h, image::Rgba([255, 255, 255, 255]));
    image::imageops::overlay(&mut background, &rgba, 0, 0);
    Ok(DynamicImage::ImageRgba8(background).to_rgb8())
}

fn solid_fill(color: HexColor) -> RgbImage {
    RgbImage::from_pixel(FILL_SIDE_PX, FILL_SIDE_PX, Rgb([color.r, color.g, color.b]))
}

fn write_png(image: &RgbImage) -> Result<NamedTempFile, Box<dyn std::error::Error>> {
    let mut tmp = tempfile::Builder::new()
        .prefix("certificate-background-")
        .suffix(".png")
        .tempfile()?;
    {
        let (w, h) = image.dimensions();
        let file = tmp.as_file_mut();
        let mut encoder = PngEncoder::new(file, w, h);
        encoder.set_color(PngColorType::Rgb);
        encoder.set_depth(PngBitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(image.as_raw())?;
    }
    Ok(tmp)
}
