use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_OCR_LANGUAGE: &str = "eng";
pub const RECEIPT_FIELD: &str = "receipt";
pub const PDF_MIME: &str = "application/pdf";

/// Upload types the OCR path accepts. `image/jpg` is not a registered MIME
/// type but browsers and some clients send it, so it stays listed.
pub const IMAGE_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/jpg"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrBackend {
    /// Spawns the `tesseract` executable.
    Cli,
    /// Links libtesseract; needs the `libtesseract` feature.
    Library,
}

impl FromStr for OcrBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cli" => Ok(OcrBackend::Cli),
            "lib" | "library" => Ok(OcrBackend::Library),
            other => Err(ConfigError::Invalid {
                key: "ocr_backend".into(),
                value: other.into(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub allowed_mime_types: Vec<String>,
    pub ocr_language: String,
    pub ocr_backend: OcrBackend,
    pub max_upload_bytes: usize,
    pub max_concurrent_recognitions: usize,
    pub staging_ttl: Duration,
    pub sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            upload_dir: PathBuf::from("uploads"),
            allowed_mime_types: IMAGE_MIME_TYPES.iter().map(|m| m.to_string()).collect(),
            ocr_language: DEFAULT_OCR_LANGUAGE.to_string(),
            ocr_backend: OcrBackend::Cli,
            max_upload_bytes: 10 * 1024 * 1024,
            max_concurrent_recognitions: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2),
            staging_ttl: Duration::from_secs(60 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with `RECEIPT_*` values from `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ServerConfig::default();

        if let Some(value) = lookup("RECEIPT_BIND") {
            config.bind_addr = parse("RECEIPT_BIND", &value)?;
        }
        if let Some(value) = lookup("RECEIPT_UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("RECEIPT_OCR_LANGUAGE") {
            config.ocr_language = value;
        }
        if let Some(value) = lookup("RECEIPT_OCR_BACKEND") {
            config.ocr_backend = value.parse()?;
        }
        if let Some(value) = lookup("RECEIPT_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse("RECEIPT_MAX_UPLOAD_BYTES", &value)?;
        }
        if let Some(value) = lookup("RECEIPT_MAX_CONCURRENT_OCR") {
            let limit: usize = parse("RECEIPT_MAX_CONCURRENT_OCR", &value)?;
            if limit == 0 {
                return Err(ConfigError::Invalid {
                    key: "RECEIPT_MAX_CONCURRENT_OCR".into(),
                    value,
                });
            }
            config.max_concurrent_recognitions = limit;
        }
        if let Some(value) = lookup("RECEIPT_STAGING_TTL_SECS") {
            config.staging_ttl = Duration::from_secs(parse("RECEIPT_STAGING_TTL_SECS", &value)?);
        }

        Ok(config)
    }

    pub fn is_allowed(&self, mime: &str) -> bool {
        self.allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(mime))
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_original_server() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.port(), 5000);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.ocr_language, "eng");
        assert!(config.is_allowed("image/jpg"));
        assert!(config.is_allowed("IMAGE/PNG"));
        assert!(!config.is_allowed("application/pdf"));
    }

    #[test]
    fn env_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("RECEIPT_BIND", "127.0.0.1:8080"),
            ("RECEIPT_OCR_BACKEND", "library"),
            ("RECEIPT_MAX_CONCURRENT_OCR", "3"),
            ("RECEIPT_STAGING_TTL_SECS", "60"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.ocr_backend, OcrBackend::Library);
        assert_eq!(config.max_concurrent_recognitions, 3);
        assert_eq!(config.staging_ttl, Duration::from_secs(60));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(ServerConfig::from_lookup(lookup(&[("RECEIPT_BIND", "nope")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("RECEIPT_MAX_CONCURRENT_OCR", "0")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("RECEIPT_OCR_BACKEND", "gpu")])).is_err());
    }
}
