//! Remote image loader
//!
//! Fetches a possibly cross-origin photograph and converts it into a
//! self-contained, canvas-safe representation: the original encoded bytes
//! (for data-URL embedding) plus decoded RGBA pixels (for compositing).
//! Assigning a live remote reference to a canvas would block pixel export;
//! converting to a self-contained encoding first is this component's entire
//! reason for existing.
//!
//! The loader is a leaf: it never touches the composition surface, and a
//! failed load is terminal for that attempt (no automatic retry).

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as Base64Engine;
use image::{ImageFormat, RgbaImage};

use crate::{EditorConfig, Error, Result};

/// A self-contained encoding of a fetched photograph
///
/// Owns both the encoded byte stream and the decoded pixel buffer, so the
/// consuming canvas has no further network dependency of any kind.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    bytes: Arc<Vec<u8>>,
    format: ImageFormat,
    pixels: Arc<RgbaImage>,
}

impl EncodedImage {
    /// Decode an already-fetched byte buffer.
    ///
    /// Fails with [`Error::ImageDecode`] when the bytes are not a readable
    /// image in a supported format.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let format = image::guess_format(&bytes)
            .map_err(|e| Error::ImageDecode(format!("Unrecognized image format: {}", e)))?;
        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| Error::ImageDecode(format!("Failed to decode image: {}", e)))?;
        let pixels = decoded.to_rgba8();
        Ok(Self {
            bytes: Arc::new(bytes),
            format,
            pixels: Arc::new(pixels),
        })
    }

    /// Natural pixel width of the photograph
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Natural pixel height of the photograph
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Detected source encoding
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Decoded pixel buffer, shared with the scene graph.
    pub fn pixels(&self) -> Arc<RgbaImage> {
        Arc::clone(&self.pixels)
    }

    /// Encoded size in bytes
    pub fn encoded_len(&self) -> usize {
        self.bytes.len()
    }

    /// The `data:<mime>;base64,...` embedding of the original byte stream.
    pub fn data_url(&self) -> String {
        let b64 = base64::engine::general_purpose::STANDARD.encode(self.bytes.as_slice());
        format!("data:{};base64,{}", mime_for(self.format), b64)
    }

    /// Re-encode the decoded pixels as PNG. Used when a consumer needs a
    /// single known format regardless of what the server delivered.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        self.pixels
            .write_to(&mut buf, image::ImageOutputFormat::Png)
            .map_err(|e| Error::ImageDecode(format!("PNG re-encoding failed: {}", e)))?;
        Ok(buf.into_inner())
    }
}

fn mime_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Asynchronous fetch-and-decode client for remote photographs
pub struct ImageLoader {
    client: reqwest::Client,
}

impl ImageLoader {
    /// Build a loader from the session configuration (user agent + timeout).
    pub fn new(config: &EditorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Fetch `url` and decode the response body.
    ///
    /// Suspends until the fetch resolves. Network failures (including non-2xx
    /// statuses) surface as [`Error::ImageFetch`]; unreadable bodies as
    /// [`Error::ImageDecode`]. Both are terminal for this attempt.
    pub async fn load(&self, url: &str) -> Result<EncodedImage> {
        let parsed = url::Url::parse(url)
            .map_err(|e| Error::ImageFetch(format!("Invalid image URL {}: {}", url, e)))?;

        let resp = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| Error::ImageFetch(format!("Failed to fetch {}: {}", url, e)))?
            .error_for_status()
            .map_err(|e| Error::ImageFetch(format!("Server rejected {}: {}", url, e)))?;

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::ImageFetch(format!("Failed to read response body: {}", e)))?;

        let encoded = EncodedImage::from_bytes(bytes.to_vec())?;
        log::debug!(
            "loaded {} ({}x{}, {} bytes)",
            url,
            encoded.width(),
            encoded.height(),
            encoded.encoded_len()
        );
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn png_fixture(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageOutputFormat::Png)
            .expect("PNG encoding");
        buf.into_inner()
    }

    #[test]
    fn from_bytes_decodes_png() {
        let encoded = EncodedImage::from_bytes(png_fixture(12, 8, [200, 40, 40, 255]))
            .expect("valid png");
        assert_eq!(encoded.width(), 12);
        assert_eq!(encoded.height(), 8);
        assert_eq!(encoded.format(), ImageFormat::Png);
        assert_eq!(encoded.pixels().get_pixel(0, 0), &Rgba([200, 40, 40, 255]));
    }

    #[test]
    fn from_bytes_rejects_garbage() {
        let err = EncodedImage::from_bytes(b"<html>not an image</html>".to_vec()).unwrap_err();
        assert!(matches!(err, Error::ImageDecode(_)), "got {:?}", err);
    }

    #[test]
    fn data_url_is_self_contained() {
        let encoded = EncodedImage::from_bytes(png_fixture(2, 2, [0, 0, 0, 255])).unwrap();
        let url = encoded.data_url();
        assert!(url.starts_with("data:image/png;base64,"));
        // Round-trips through base64 back to the original bytes
        let b64 = url.rsplit(',').next().unwrap();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .expect("valid base64");
        assert_eq!(&bytes[0..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn load_rejects_malformed_url() {
        let loader = ImageLoader::new(&EditorConfig::default()).unwrap();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let err = rt.block_on(loader.load("not a url")).unwrap_err();
        assert!(matches!(err, Error::ImageFetch(_)));
    }
}
