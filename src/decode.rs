use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::ExtractError;

const JPEG_END_OF_IMAGE: [u8; 2] = [0xFF, 0xD9];

/// Decode JPEG or PNG bytes into an RGB bitmap.
///
/// Streams cut short are decoded best-effort: JPEG gets its end-of-image
/// marker appended and is decoded again, PNG keeps the rows that arrived
/// and leaves the rest black.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ExtractError> {
    let format = image::guess_format(bytes)?;
    let decoded = match image::load_from_memory_with_format(bytes, format) {
        Ok(img) => img,
        Err(err) if format == ImageFormat::Jpeg && !bytes.ends_with(&JPEG_END_OF_IMAGE) => {
            warn!(error = %err, "JPEG stream looks truncated, retrying with end-of-image marker");
            let mut patched = Vec::with_capacity(bytes.len() + JPEG_END_OF_IMAGE.len());
            patched.extend_from_slice(bytes);
            patched.extend_from_slice(&JPEG_END_OF_IMAGE);
            image::load_from_memory_with_format(&patched, format).map_err(|_| err)?
        }
        Err(err) if format == ImageFormat::Png => match decode_partial_png(bytes) {
            Some(img) => {
                warn!(error = %err, "PNG stream looks truncated, keeping the rows that decoded");
                img
            }
            None => return Err(err.into()),
        },
        Err(err) => return Err(err.into()),
    };
    Ok(DynamicImage::ImageRgb8(decoded.to_rgb8()))
}

/// Row-by-row PNG decode that stops at the first unreadable row.
///
/// Interlaced images are not handled since their early passes cover the
/// whole frame sparsely. Returns `None` when not even one row decodes.
fn decode_partial_png(bytes: &[u8]) -> Option<DynamicImage> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::normalize_to_color8());
    let mut reader = decoder.read_info().ok()?;

    let (width, height, interlaced) = {
        let info = reader.info();
        (info.width, info.height, info.interlaced)
    };
    let (color, depth) = reader.output_color_type();
    if interlaced || depth != png::BitDepth::Eight {
        return None;
    }
    let channels = color.samples();

    let mut canvas = RgbImage::new(width, height);
    let mut rows = 0;
    while rows < height {
        let Ok(Some(row)) = reader.next_row() else {
            break;
        };
        for (x, sample) in row.data().chunks_exact(channels).take(width as usize).enumerate() {
            let pixel = match channels {
                1 | 2 => [sample[0]; 3],
                _ => [sample[0], sample[1], sample[2]],
            };
            canvas.put_pixel(x as u32, rows, Rgb(pixel));
        }
        rows += 1;
    }

    if rows == 0 {
        return None;
    }
    if rows < height {
        debug!(rows, height, "PNG rows missing, filled with black");
    }
    Some(DynamicImage::ImageRgb8(canvas))
}

pub fn open_image(path: &Path) -> Result<DynamicImage, ExtractError> {
    let bytes = std::fs::read(path)?;
    decode_image(&bytes)
}
