use std::{
    io::{self, Cursor, Write},
    sync::{Mutex, PoisonError},
};

use {
    base64::{Engine, engine::general_purpose::STANDARD},
    image::{DynamicImage, ImageFormat, Luma},
    qrcode::{QrCode, render::unicode::Dense1x2},
    serde_json::Value,
    tracing::{info, warn},
};

use pairgate_session::{SessionObserver, SessionStatus};

use crate::error::GatewayError;

fn encode(code: &str) -> Result<QrCode, GatewayError> {
    QrCode::new(code.as_bytes()).map_err(|e| GatewayError::Qr(e.to_string()))
}

/// Render `code` as a PNG QR image wrapped in a `data:` URL.
pub fn render_data_url(code: &str) -> Result<String, GatewayError> {
    let image = encode(code)?
        .render::<Luma<u8>>()
        .min_dimensions(256, 256)
        .build();

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(image).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}

/// Render `code` with half-block characters, light on dark, for a terminal.
pub fn render_terminal(code: &str) -> Result<String, GatewayError> {
    Ok(encode(code)?
        .render::<Dense1x2>()
        .dark_color(Dense1x2::Light)
        .light_color(Dense1x2::Dark)
        .build())
}

/// Broadcast payload for a pairing code: the data URL, or `null` when there
/// is no code or it cannot be rendered.
pub fn qr_payload(code: &str) -> Value {
    if code.is_empty() {
        return Value::Null;
    }
    match render_data_url(code) {
        Ok(url) => Value::String(url),
        Err(e) => {
            warn!(error = %e, "failed to render pairing code");
            Value::Null
        },
    }
}

/// Draws every new pairing code to a console so the device can be paired
/// without an API client.
pub struct TerminalQr<W> {
    out: Mutex<W>,
}

impl TerminalQr<io::Stderr> {
    pub fn stderr() -> Self {
        Self {
            out: Mutex::new(io::stderr()),
        }
    }
}

impl<W: Write + Send> SessionObserver for TerminalQr<W> {
    fn code_changed(&self, code: &str) {
        if code.is_empty() {
            return;
        }
        let art = match render_terminal(code) {
            Ok(art) => art,
            Err(e) => {
                warn!(error = %e, "failed to draw pairing code");
                return;
            },
        };
        info!("scan the pairing code below to link this device");
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{art}").and_then(|()| out.flush()) {
            warn!(error = %e, "failed to write pairing code to the terminal");
        }
    }

    fn status_published(&self, _status: SessionStatus) {}
}
