use axum::http::{header, HeaderMap};
use shrink_limiter::AdmissionController;
use shrink_shortener::Shortener;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    shortener: Arc<dyn Shortener>,
    admission: Arc<AdmissionController>,
    public_base_url: Option<String>,
    shared_counters: bool,
}

impl AppState {
    pub fn new(shortener: Arc<dyn Shortener>, admission: Arc<AdmissionController>) -> Self {
        Self {
            shortener,
            admission,
            public_base_url: None,
            shared_counters: false,
        }
    }

    /// Fixes the base of returned short URLs instead of deriving it from
    /// each request's `Host` header.
    pub fn with_public_base_url(mut self, public_base_url: Option<String>) -> Self {
        self.public_base_url = public_base_url;
        self
    }

    /// Marks Redis as the intended counter backend, so running on local
    /// counters is reported as degraded.
    pub fn with_shared_counters(mut self, shared_counters: bool) -> Self {
        self.shared_counters = shared_counters;
        self
    }

    pub fn shortener(&self) -> &dyn Shortener {
        self.shortener.as_ref()
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    pub fn expects_shared_counters(&self) -> bool {
        self.shared_counters
    }

    pub fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(base) = &self.public_base_url {
            return base.trim_end_matches('/').to_string();
        }

        let host = headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("localhost");
        format!("http://{host}")
    }
}
