//! Image file IO for rasters.
//!
//! 2-D images load into axes `[X, Y, Channel]`. Grayscale images have one
//! channel, gray+alpha two, RGB three and RGBA four. Sample values keep the
//! source bit depth, so `max_value` is 255, 65535 or 1.0 for float images.

use std::io::ErrorKind;
use std::path::Path;

use image::{DynamicImage, ImageBuffer, ImageError, Luma, LumaA, Rgb, Rgba};
use ndarray::Array3;

use super::{AxisKind, Raster};
use crate::error::SlideSetError;

/// Read a PNG, JPEG or TIFF file.
pub fn read_raster(path: &Path) -> Result<Raster, SlideSetError> {
    let image = image::open(path).map_err(|source| match source {
        ImageError::IoError(err) if err.kind() == ErrorKind::NotFound => {
            SlideSetError::DataUnavailable {
                path: path.to_path_buf(),
            }
        }
        source => SlideSetError::ImageRead {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let raster = from_dynamic_image(&image);
    log::debug!(
        "loaded {} as {:?} with {} channel(s)",
        path.display(),
        raster.spatial_dims(),
        raster.channel_count()
    );
    Ok(raster)
}

/// Convert a decoded image into a raster.
pub fn from_dynamic_image(image: &DynamicImage) -> Raster {
    let color = image.color();
    let components: &[usize] = match (color.has_color(), color.has_alpha()) {
        (false, false) => &[0],
        (false, true) => &[0, 3],
        (true, false) => &[0, 1, 2],
        (true, true) => &[0, 1, 2, 3],
    };
    let (width, height) = (image.width() as usize, image.height() as usize);
    let mut data = Array3::<f64>::zeros((width, height, components.len()));

    let bytes_per_component = color.bytes_per_pixel() / color.channel_count().max(1);
    let max_value = match bytes_per_component {
        1 => {
            let rgba = image.to_rgba8();
            for (x, y, pixel) in rgba.enumerate_pixels() {
                for (c, component) in components.iter().enumerate() {
                    data[[x as usize, y as usize, c]] = f64::from(pixel.0[*component]);
                }
            }
            f64::from(u8::MAX)
        }
        2 => {
            let rgba = image.to_rgba16();
            for (x, y, pixel) in rgba.enumerate_pixels() {
                for (c, component) in components.iter().enumerate() {
                    data[[x as usize, y as usize, c]] = f64::from(pixel.0[*component]);
                }
            }
            f64::from(u16::MAX)
        }
        _ => {
            let rgba = image.to_rgba32f();
            for (x, y, pixel) in rgba.enumerate_pixels() {
                for (c, component) in components.iter().enumerate() {
                    data[[x as usize, y as usize, c]] = f64::from(pixel.0[*component]);
                }
            }
            1.0
        }
    };

    Raster {
        data: data.into_dyn(),
        axes: vec![AxisKind::X, AxisKind::Y, AxisKind::Channel],
        max_value,
    }
}

/// Write a 2-D raster as an image; the format follows the file extension.
///
/// Rasters whose `max_value` exceeds 255 are written with 16 bits per
/// component, everything else with 8. Samples are rescaled from
/// `[0, max_value]` and clamped.
///
/// # Errors
/// [`SlideSetError::Unsupported`] for rasters with more than two non-trivial
/// spatial axes or a channel count other than 1 to 4.
pub fn write_raster(path: &Path, raster: &Raster) -> Result<(), SlideSetError> {
    let dims = raster.spatial_dims();
    if dims.len() < 2 || dims[2..].iter().any(|d| *d > 1) {
        return Err(SlideSetError::Unsupported(format!(
            "writing a raster with spatial shape {dims:?} as a 2-D image"
        )));
    }
    let to_u32 = |n: usize| {
        u32::try_from(n).map_err(|_| SlideSetError::Unsupported(format!("image size {n}")))
    };
    let (width, height) = (to_u32(dims[0])?, to_u32(dims[1])?);

    let wide = raster.max_value() > f64::from(u8::MAX);
    let scale = if raster.max_value() > 0.0 {
        if wide {
            f64::from(u16::MAX) / raster.max_value()
        } else {
            f64::from(u8::MAX) / raster.max_value()
        }
    } else {
        1.0
    };
    let narrow = |x: u32, y: u32, c: usize| -> u8 {
        let v = raster.sample(&[i64::from(x), i64::from(y)], c) * scale;
        v.round().clamp(0.0, f64::from(u8::MAX)) as u8
    };
    let wide_px = |x: u32, y: u32, c: usize| -> u16 {
        let v = raster.sample(&[i64::from(x), i64::from(y)], c) * scale;
        v.round().clamp(0.0, f64::from(u16::MAX)) as u16
    };

    let image = match (raster.channel_count(), wide) {
        (1, false) => DynamicImage::ImageLuma8(ImageBuffer::from_fn(width, height, |x, y| {
            Luma([narrow(x, y, 0)])
        })),
        (2, false) => DynamicImage::ImageLumaA8(ImageBuffer::from_fn(width, height, |x, y| {
            LumaA([narrow(x, y, 0), narrow(x, y, 1)])
        })),
        (3, false) => DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([narrow(x, y, 0), narrow(x, y, 1), narrow(x, y, 2)])
        })),
        (4, false) => DynamicImage::ImageRgba8(ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([narrow(x, y, 0), narrow(x, y, 1), narrow(x, y, 2), narrow(x, y, 3)])
        })),
        (1, true) => DynamicImage::ImageLuma16(ImageBuffer::from_fn(width, height, |x, y| {
            Luma([wide_px(x, y, 0)])
        })),
        (2, true) => DynamicImage::ImageLumaA16(ImageBuffer::from_fn(width, height, |x, y| {
            LumaA([wide_px(x, y, 0), wide_px(x, y, 1)])
        })),
        (3, true) => DynamicImage::ImageRgb16(ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([wide_px(x, y, 0), wide_px(x, y, 1), wide_px(x, y, 2)])
        })),
        (4, true) => DynamicImage::ImageRgba16(ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([
                wide_px(x, y, 0),
                wide_px(x, y, 1),
                wide_px(x, y, 2),
                wide_px(x, y, 3),
            ])
        })),
        (n, _) => {
            return Err(SlideSetError::Unsupported(format!(
                "writing an image with {n} channel(s)"
            )))
        }
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    image.save(path).map_err(|source| SlideSetError::ImageWrite {
        path: path.to_path_buf(),
        source,
    })
}
