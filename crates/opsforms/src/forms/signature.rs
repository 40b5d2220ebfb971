use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgb, RgbImage, RgbaImage};

/// Width and height of the drawing canvas offered to operators.
pub const CANVAS_WIDTH: u32 = 600;
pub const CANVAS_HEIGHT: u32 = 150;

const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// A handwritten signature captured from a drawing canvas.
///
/// The bitmap keeps its alpha channel: an untouched canvas is fully
/// transparent, which is how a blank signature is told apart from a drawn one.
#[derive(Clone)]
pub struct Signature {
    image: RgbaImage,
    data_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("signature must be a PNG data URL")]
    NotDataUrl,
    #[error("signature payload is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("signature image could not be decoded: {0}")]
    Image(#[from] image::ImageError),
    #[error("signature image is empty")]
    Empty,
}

impl Signature {
    pub fn from_rgba(image: RgbaImage) -> Self {
        Self {
            image,
            data_url: None,
        }
    }

    /// Decode a `data:image/png;base64,...` URL as produced by `canvas.toDataURL()`.
    pub fn from_data_url(raw: &str) -> Result<Self, SignatureError> {
        let trimmed = raw.trim();
        let payload = trimmed
            .strip_prefix(DATA_URL_PREFIX)
            .ok_or(SignatureError::NotDataUrl)?;
        let bytes = STANDARD.decode(payload.as_bytes())?;
        let mut signature = Self::from_png(&bytes)?;
        signature.data_url = Some(trimmed.to_string());
        Ok(signature)
    }

    pub fn from_png(bytes: &[u8]) -> Result<Self, SignatureError> {
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8();
        if image.width() == 0 || image.height() == 0 {
            return Err(SignatureError::Empty);
        }
        Ok(Self::from_rgba(image))
    }

    /// The original data URL, when the signature arrived as one.
    pub fn data_url(&self) -> Option<&str> {
        self.data_url.as_deref()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// True when any pixel carries non-zero alpha.
    pub fn has_ink(&self) -> bool {
        self.image.pixels().any(|pixel| pixel[3] > 0)
    }

    /// Composite the strokes over an opaque white background.
    pub fn flattened(&self) -> RgbImage {
        let (width, height) = self.image.dimensions();
        RgbImage::from_fn(width, height, |x, y| {
            let pixel = self.image.get_pixel(x, y);
            let alpha = u16::from(pixel[3]);
            let blend = |channel: u8| -> u8 {
                let value = u16::from(channel) * alpha + 255 * (255 - alpha);
                ((value + 127) / 255) as u8
            };
            Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])])
        })
    }

    /// Flatten and resample to the fixed box used on the PDF copy.
    pub fn for_print(&self, width: u32, height: u32) -> RgbImage {
        let flattened = self.flattened();
        if flattened.dimensions() == (width, height) {
            return flattened;
        }
        imageops::resize(&flattened, width, height, FilterType::Lanczos3)
    }
}

/// A signature is present only when it exists and has ink on it.
pub fn is_signature_present(signature: Option<&Signature>) -> bool {
    signature.map(Signature::has_ink).unwrap_or(false)
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.image.dimensions();
        f.debug_struct("Signature")
            .field("width", &width)
            .field("height", &height)
            .field("has_ink", &self.has_ink())
            .finish()
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.image == other.image
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use image::Rgba;

    #[test]
    fn blank_canvas_has_no_ink() {
        let signature = Signature::from_rgba(blank_canvas());
        assert!(!signature.has_ink());
        assert!(!is_signature_present(Some(&signature)));
        assert!(!is_signature_present(None));
    }

    #[test]
    fn a_single_faint_pixel_counts_as_ink() {
        let mut canvas = blank_canvas();
        canvas.put_pixel(599, 149, Rgba([0, 0, 0, 1]));
        assert!(Signature::from_rgba(canvas).has_ink());
    }

    #[test]
    fn data_url_round_trips_through_png() {
        let canvas = stroked_canvas();
        let url = data_url(&canvas);
        let signature = Signature::from_data_url(&url).expect("decodes");
        assert_eq!(signature.dimensions(), (CANVAS_WIDTH, CANVAS_HEIGHT));
        assert!(signature.has_ink());
        assert_eq!(signature.data_url(), Some(url.as_str()));
    }

    #[test]
    fn rejects_non_png_payloads() {
        assert!(matches!(
            Signature::from_data_url("data:image/jpeg;base64,AAAA"),
            Err(SignatureError::NotDataUrl)
        ));
        assert!(matches!(
            Signature::from_data_url("data:image/png;base64,@@@"),
            Err(SignatureError::Encoding(_))
        ));
    }

    #[test]
    fn flattening_paints_transparency_white() {
        let mut canvas = RgbaImage::new(2, 1);
        canvas.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        let flat = Signature::from_rgba(canvas).flattened();
        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn print_copy_is_resampled_to_the_requested_box() {
        let signature = Signature::from_rgba(stroked_canvas());
        let printed = signature.for_print(400, 100);
        assert_eq!(printed.dimensions(), (400, 100));
    }
}
