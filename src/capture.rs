use screenshots::Screen;
use std::io::Cursor;

/// Boundary with the screen-capture collaborator. `None` is a non-fatal
/// capture failure; the caller aborts the cycle before creating a request.
pub trait CaptureSource: Send + Sync {
    fn acquire_png(&self) -> Option<Vec<u8>>;
}

/// Captures the primary display and encodes it as PNG in memory.
#[derive(Debug, Default)]
pub struct ScreenCapture;

impl ScreenCapture {
    fn capture_primary() -> anyhow::Result<image::RgbaImage> {
        let screen = Screen::from_point(0, 0)?;
        tracing::info!(
            width = screen.display_info.width,
            height = screen.display_info.height,
            "capturing primary display"
        );
        Ok(screen.capture()?)
    }

    fn encode_png(img: &image::RgbaImage) -> anyhow::Result<Vec<u8>> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageOutputFormat::Png)?;
        Ok(buf)
    }
}

impl CaptureSource for ScreenCapture {
    fn acquire_png(&self) -> Option<Vec<u8>> {
        let img = match Self::capture_primary() {
            Ok(img) => img,
            Err(err) => {
                tracing::error!(?err, "failed to capture screen");
                return None;
            }
        };
        match Self::encode_png(&img) {
            Ok(bytes) => {
                tracing::info!(bytes = bytes.len(), "screenshot encoded");
                Some(bytes)
            }
            Err(err) => {
                tracing::error!(?err, "failed to encode screenshot");
                None
            }
        }
    }
}
