//! Decoding of inbound image payloads into device bitmaps

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use domain::PrinterError;
use domain::printer::Bitmap;

/// Decode a data URL (`data:image/png;base64,...`) or bare base64 string into
/// an 8-bit grayscale bitmap.
///
/// Everything after the first `,` is treated as the base64 body. Whitespace
/// inside the body is ignored.
pub fn decode_data_url(payload: &str) -> Result<Bitmap, PrinterError> {
    let body = payload
        .split_once(',')
        .map(|(_, body)| body)
        .unwrap_or(payload);
    let body: String = body.chars().filter(|c| !c.is_whitespace()).collect();

    if body.is_empty() {
        return Err(PrinterError::ImageDecode("Empty image payload".to_string()));
    }

    let bytes = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| PrinterError::ImageDecode(format!("Invalid base64: {}", e)))?;

    let raster = image::load_from_memory(&bytes)
        .map_err(|e| PrinterError::ImageDecode(format!("Unreadable image: {}", e)))?
        .to_luma8();

    let (width, height) = raster.dimensions();
    tracing::debug!(width, height, "Decoded image payload");

    Bitmap::new(width, height, raster.into_raw())
        .map_err(|e| PrinterError::ImageDecode(e.to_string()))
}
