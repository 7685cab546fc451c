//! Image encoding for task records.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use crate::config::ImageFormat;
use crate::error::Result;
use crate::parser::BoundingBox;

/// Encode `image` as a base64 data URI.
///
/// JPEG drops the alpha channel; PDFium renders onto an opaque white page
/// so nothing visible is lost.
pub fn encode_data_uri(image: &DynamicImage, format: ImageFormat, jpeg_quality: u8) -> Result<String> {
    let mut buffer = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            let rgb = image.to_rgb8();
            JpegEncoder::new_with_quality(&mut buffer, jpeg_quality).encode_image(&rgb)?;
        }
        ImageFormat::Png => {
            image.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)?;
        }
    }
    Ok(format!(
        "data:{};base64,{}",
        format.mime_type(),
        BASE64.encode(&buffer)
    ))
}

/// Whether `value` is an inline `data:` URI.
pub fn is_data_uri(value: &str) -> bool {
    value.starts_with("data:")
}

/// Crop the region `bbox`, given in source pixels, out of an image rendered
/// `scale` times larger. The region is clamped to the image; an empty
/// intersection yields a 1x1 crop at the nearest edge.
pub fn crop_scaled(image: &DynamicImage, bbox: &BoundingBox, scale: f32) -> DynamicImage {
    let region = bbox.scaled(scale);
    let max_x = image.width().saturating_sub(1);
    let max_y = image.height().saturating_sub(1);

    let x = (region.x.max(0.0).round() as u32).min(max_x);
    let y = (region.y.max(0.0).round() as u32).min(max_y);
    let width = (region.width.max(0.0).round() as u32)
        .min(image.width() - x)
        .max(1);
    let height = (region.height.max(0.0).round() as u32)
        .min(image.height() - y)
        .max(1);

    image.crop_imm(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, image::Rgba([255; 4])))
    }

    #[test]
    fn test_jpeg_data_uri() {
        let uri = encode_data_uri(&blank(8, 4), ImageFormat::Jpeg, 80).unwrap();
        assert!(uri.starts_with("data:image/jpeg;base64,"));
        assert!(is_data_uri(&uri));

        let payload = uri.split_once(',').unwrap().1;
        let bytes = BASE64.decode(payload).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
    }

    #[test]
    fn test_png_data_uri() {
        let uri = encode_data_uri(&blank(3, 5), ImageFormat::Png, 80).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_crop_scales_region() {
        let image = blank(300, 200);
        let bbox = BoundingBox {
            x: 10.0,
            y: 20.0,
            width: 30.0,
            height: 15.0,
        };
        let cropped = crop_scaled(&image, &bbox, 3.0);
        assert_eq!((cropped.width(), cropped.height()), (90, 45));
    }

    #[test]
    fn test_crop_clamps_to_image() {
        let image = blank(100, 100);
        let bbox = BoundingBox {
            x: 90.0,
            y: -10.0,
            width: 50.0,
            height: 500.0,
        };
        let cropped = crop_scaled(&image, &bbox, 1.0);
        assert_eq!((cropped.width(), cropped.height()), (10, 100));

        let outside = BoundingBox {
            x: 400.0,
            y: 400.0,
            width: 5.0,
            height: 5.0,
        };
        let cropped = crop_scaled(&image, &outside, 1.0);
        assert_eq!((cropped.width(), cropped.height()), (1, 1));
    }
}
