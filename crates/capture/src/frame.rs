use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::RgbImage;

/// One still frame, already compressed as baseline JPEG.
#[derive(Clone, Debug)]
pub struct EncodedFrame {
    bytes: Vec<u8>,
}

impl EncodedFrame {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Renders the frame as a `data:image/jpeg;base64,...` URL, the wire
    /// form the detect endpoint expects.
    pub fn to_data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", STANDARD.encode(&self.bytes))
    }
}

pub(crate) fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut jpeg = Vec::new();
    let mut enc = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100));
    enc.encode(img.as_raw(), img.width(), img.height(), image::ColorType::Rgb8)?;
    Ok(jpeg)
}
