use crate::error::{HackerbotError, Result};
use crate::llm::models::ImageData;
use crate::vision::geometry::PixelRect;
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, Rgb, RgbImage};

pub const ANNOTATION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const ANNOTATION_THICKNESS: u32 = 2;

const JPEG_QUALITY: u8 = 90;

/// One still image from the arm camera. Produced per turn and never persisted by the core.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Wrap a packed RGB24 buffer.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let len = data.len();
        RgbImage::from_raw(width, height, data).map(Self::new).ok_or_else(|| {
            HackerbotError::DeviceError(format!(
                "buffer of {} bytes does not hold a {}x{} RGB frame",
                len, width, height
            ))
        })
    }

    /// Decode an encoded image (JPEG, PNG).
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(Self::new(image::load_from_memory(bytes)?.to_rgb8()))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Scale to the given size unless it already matches.
    pub fn resized(self, width: u32, height: u32) -> Self {
        if self.width() == width && self.height() == height {
            return self;
        }
        Self::new(imageops::resize(&self.image, width, height, imageops::FilterType::Triangle))
    }

    pub fn to_jpeg(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY).encode_image(&self.image)?;
        Ok(buffer)
    }

    /// JPEG-encoded attachment for a model query or a chat message.
    pub fn to_image_data(&self) -> Result<ImageData> {
        Ok(ImageData::jpeg(self.to_jpeg()?))
    }

    /// Copy of this frame with a rectangle outline drawn between the corners.
    pub fn annotated(&self, rect: &PixelRect) -> Frame {
        let mut image = self.image.clone();
        draw_rect_outline(&mut image, rect, ANNOTATION_COLOR, ANNOTATION_THICKNESS);
        Frame::new(image)
    }
}

// Outline grows outward from the corners by `thickness - 1` pixels, clipped to the image.
fn draw_rect_outline(img: &mut RgbImage, rect: &PixelRect, color: Rgb<u8>, thickness: u32) {
    let (img_w, img_h) = (img.width() as i64, img.height() as i64);
    if img_w == 0 || img_h == 0 {
        return;
    }

    let x0 = i64::from(rect.start.x.min(rect.end.x));
    let y0 = i64::from(rect.start.y.min(rect.end.y));
    let x1 = i64::from(rect.start.x.max(rect.end.x));
    let y1 = i64::from(rect.start.y.max(rect.end.y));

    let mut put = |x: i64, y: i64| {
        if (0..img_w).contains(&x) && (0..img_h).contains(&y) {
            img.put_pixel(x as u32, y as u32, color);
        }
    };

    for t in 0..i64::from(thickness.max(1)) {
        let (tx0, ty0, tx1, ty1) = (x0 - t, y0 - t, x1 + t, y1 + t);

        for x in tx0..=tx1 {
            put(x, ty0);
            put(x, ty1);
        }
        for y in ty0..=ty1 {
            put(tx0, y);
            put(tx1, y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::geometry::PixelPoint;

    fn blank(width: u32, height: u32) -> Frame {
        Frame::new(RgbImage::new(width, height))
    }

    fn rect(x0: i32, y0: i32, x1: i32, y1: i32) -> PixelRect {
        PixelRect {
            start: PixelPoint { x: x0, y: y0 },
            end: PixelPoint { x: x1, y: y1 },
        }
    }

    #[test]
    fn test_from_rgb_rejects_short_buffer() {
        let result = Frame::from_rgb(4, 4, vec![0; 10]);
        assert!(matches!(result, Err(HackerbotError::DeviceError(_))));
    }

    #[test]
    fn test_jpeg_round_trip_keeps_dimensions() {
        let frame = blank(64, 48);

        let decoded = Frame::decode(&frame.to_jpeg().unwrap()).unwrap();

        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn test_resized() {
        let frame = blank(32, 24).resized(64, 48);
        assert_eq!((frame.width(), frame.height()), (64, 48));
    }

    #[test]
    fn test_annotation_draws_outline_only() {
        let frame = blank(40, 30);

        let annotated = frame.annotated(&rect(10, 5, 20, 15));
        let img = annotated.image();

        assert_eq!(*img.get_pixel(10, 5), ANNOTATION_COLOR);
        assert_eq!(*img.get_pixel(20, 15), ANNOTATION_COLOR);
        assert_eq!(*img.get_pixel(9, 10), ANNOTATION_COLOR);
        assert_eq!(*img.get_pixel(15, 10), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(8, 10), Rgb([0, 0, 0]));
        assert_eq!(*frame.image().get_pixel(10, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_annotation_clips_to_frame() {
        let frame = blank(40, 30);

        let annotated = frame.annotated(&rect(0, 0, 40, 30));

        assert_eq!(*annotated.image().get_pixel(0, 0), ANNOTATION_COLOR);
        assert_eq!(*annotated.image().get_pixel(39, 29), Rgb([0, 0, 0]));
    }
}
