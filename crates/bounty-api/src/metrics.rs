//! Request counters exposed on `/metrics`.
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

pub struct ApiMetrics {
    registry: Registry,
    pub uploads_total: IntCounter,
    pub upload_failures_total: IntCounter,
    pub metadata_lookups_total: IntCounter,
    pub metadata_failures_total: IntCounter,
}

impl ApiMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let counter = |name: &str, help: &str| -> Result<IntCounter, prometheus::Error> {
            let c = IntCounter::new(name, help)?;
            registry.register(Box::new(c.clone()))?;
            Ok(c)
        };

        Ok(Self {
            uploads_total: counter("bounty_uploads_total", "Documents accepted for upload")?,
            upload_failures_total: counter("bounty_upload_failures_total", "Uploads rejected or failed")?,
            metadata_lookups_total: counter("bounty_metadata_lookups_total", "Metadata resolution requests")?,
            metadata_failures_total: counter("bounty_metadata_failures_total", "Metadata lookups that failed")?,
            registry,
        })
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}
