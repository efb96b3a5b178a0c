//! Relay request and response types.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

/// Media-type prefix for generated images. The provider returns raw PNG bytes.
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Inbound generation request.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Successful generation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub success: bool,
    /// Base64 data URL embedding the generated image
    pub image: String,
}

impl GenerateResponse {
    pub fn from_image_bytes(bytes: &[u8]) -> Self {
        Self {
            success: true,
            image: png_data_url(bytes),
        }
    }
}

/// Encode raw image bytes as a `data:image/png;base64,` URL.
pub fn png_data_url(bytes: &[u8]) -> String {
    format!("{}{}", PNG_DATA_URL_PREFIX, BASE64.encode(bytes))
}

/// Body sent to the inference provider.
#[derive(Debug, Clone, Serialize)]
pub struct InferenceRequest<'a> {
    pub inputs: &'a str,
}
