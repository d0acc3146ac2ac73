//! QR challenge rendering and the log sentinels the UI looks for

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use qrcode::render::svg;
use qrcode::QrCode;

/// Log prefix carrying a QR image as a data URL
pub const QR_SENTINEL: &str = "PAIRING_QR:";

/// Log prefix carrying a pairing code
pub const CODE_SENTINEL: &str = "PAIRING_CODE: ";

/// Render a QR payload as an SVG `data:` URL the browser can show directly.
pub fn render_data_url(payload: &str) -> Result<String> {
    let payload = payload.trim();
    if payload.is_empty() {
        anyhow::bail!("QR payload is empty");
    }

    let code = QrCode::new(payload.as_bytes())
        .map_err(|err| anyhow!("Failed to encode QR payload: {err}"))?;

    let image = code
        .render::<svg::Color>()
        .min_dimensions(250, 250)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .quiet_zone(true)
        .build();

    Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(image)))
}
