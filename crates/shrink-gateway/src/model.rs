use serde::{Deserialize, Serialize};

/// Body of `POST /encode`.
///
/// Accepts `{"original_url": ...}` as well as the nested
/// `{"short_url": {"original_url": ...}}` form.
#[derive(Debug, Default, Deserialize)]
pub struct EncodeRequest {
    #[serde(default)]
    pub original_url: Option<String>,
    #[serde(default)]
    pub short_url: Option<NestedEncodeRequest>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NestedEncodeRequest {
    #[serde(default)]
    pub original_url: Option<String>,
}

impl EncodeRequest {
    /// The URL to encode. A missing URL is treated as blank.
    pub fn into_original_url(self) -> String {
        self.original_url
            .or_else(|| self.short_url.and_then(|nested| nested.original_url))
            .unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct EncodeResponse {
    pub short_url: String,
}

#[derive(Debug, Deserialize)]
pub struct DecodeParams {
    pub short_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DecodeResponse {
    pub original_url: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub counter_backend: String,
    pub storage: &'static str,
}
