//! Conversions between sensor scans and host-side images

use std::path::Path;

use image::{GrayImage, Luma};

use fpm10_types::ImageScan;

use crate::error::Result;

/// Render a scan as an 8-bit grayscale image.
pub fn scan_to_image(scan: &ImageScan) -> GrayImage {
    GrayImage::from_fn(
        ImageScan::COLS as u32,
        ImageScan::ROWS as u32,
        |x, y| Luma([scan.pixel(y as usize, x as usize)]),
    )
}

/// Build a scan from an 8-bit grayscale image.
///
/// # Errors
///
/// Fails unless the image is exactly 256 x 288 pixels.
pub fn image_to_scan(image: &GrayImage) -> Result<ImageScan> {
    if image.width() as usize != ImageScan::COLS || image.height() as usize != ImageScan::ROWS {
        return Err(fpm10_types::Error::WrongScanSize {
            expected: ImageScan::PIXEL_COUNT,
            actual: (image.width() * image.height()) as usize,
        }
        .into());
    }

    Ok(ImageScan::from_pixels(image.as_raw().clone())?)
}

/// Save a scan as a PNG file.
pub fn save_scan(scan: &ImageScan, path: impl AsRef<Path>) -> Result<()> {
    scan_to_image(scan).save(path)?;
    Ok(())
}

/// Load a scan from an image file, converting to grayscale if needed.
pub fn load_scan(path: impl AsRef<Path>) -> Result<ImageScan> {
    let image = image::open(path)?.to_luma8();
    image_to_scan(&image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scan_image_round_trip() {
        let mut scan = ImageScan::blank();
        scan.set_pixel(0, 0, 0xA0);
        scan.set_pixel(17, 200, 0x30);
        scan.set_pixel(287, 255, 0xF0);

        let image = scan_to_image(&scan);
        assert_eq!(image.width(), 256);
        assert_eq!(image.height(), 288);
        assert_eq!(image.get_pixel(0, 0).0[0], 0xA0);
        assert_eq!(image.get_pixel(200, 17).0[0], 0x30);

        let restored = image_to_scan(&image).unwrap();
        assert_eq!(restored, scan);
    }

    #[test]
    fn test_image_to_scan_rejects_wrong_dimensions() {
        let image = GrayImage::new(256, 144);
        let result = image_to_scan(&image);

        assert!(matches!(result, Err(Error::Types(_))));
    }
}
