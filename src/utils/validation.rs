use crate::utils::error::{EngineError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// 本地路徑指向的是目錄（快取目錄）還是單一快照檔
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Directory,
    File,
}

fn invalid(field_name: &str, value: impl ToString, reason: impl Into<String>) -> EngineError {
    EngineError::InvalidConfigValue {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// API 的基底網址：會在後面接端點路徑，所以不能帶 query 或 fragment
pub fn validate_base_url(field_name: &str, url_str: &str) -> Result<()> {
    let url = Url::parse(url_str.trim())
        .map_err(|e| invalid(field_name, url_str, format!("Invalid URL format: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(
            field_name,
            url_str,
            format!("Unsupported URL scheme: {}", url.scheme()),
        ));
    }
    if url.host_str().is_none() {
        return Err(invalid(field_name, url_str, "URL has no host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid(
            field_name,
            url_str,
            "Base URL cannot carry a query or fragment",
        ));
    }
    Ok(())
}

pub fn validate_local_path(field_name: &str, path: &str, kind: PathKind) -> Result<()> {
    if path.trim().is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }
    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }
    if kind == PathKind::File && path.ends_with(['/', '\\']) {
        return Err(invalid(field_name, path, "Expected a file, not a directory"));
    }
    Ok(())
}

/// 上限、逾時這類設定值不能為 0
pub fn validate_nonzero(field_name: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(invalid(field_name, value, "Value must be at least 1"));
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field_name, value, "Value cannot be empty"));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_base_url() {
        assert!(validate_base_url("places.base_url", "https://maps.googleapis.com/maps/api/place").is_ok());
        assert!(validate_base_url("places.base_url", "http://127.0.0.1:8080").is_ok());
        assert!(validate_base_url("places.base_url", "").is_err());
        assert!(validate_base_url("places.base_url", "invalid-url").is_err());
        assert!(validate_base_url("places.base_url", "ftp://example.com").is_err());
        assert!(validate_base_url("places.base_url", "https://example.com/api?key=x").is_err());
        assert!(validate_base_url("places.base_url", "https://example.com/#top").is_err());
    }

    #[test]
    fn test_validate_nonzero() {
        assert!(validate_nonzero("display.limit", 10).is_ok());
        assert!(validate_nonzero("display.limit", 0).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("window_days", 30, 1, 3650).is_ok());
        assert!(validate_range("window_days", 0, 1, 3650).is_err());
        assert!(validate_range("window_days", 4000, 1, 3650).is_err());
    }

    #[test]
    fn test_validate_local_path() {
        assert!(validate_local_path("cache_dir", "reviews_data/", PathKind::Directory).is_ok());
        assert!(validate_local_path("cache_file", "haida.json", PathKind::File).is_ok());
        assert!(validate_local_path("cache_file", "reviews_data/", PathKind::File).is_err());
        assert!(validate_local_path("cache_file", "  ", PathKind::File).is_err());
        assert!(validate_local_path("cache_file", "a\0b.json", PathKind::File).is_err());
    }

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("language", "zh-TW").is_ok());
        assert!(validate_non_empty_string("language", "   ").is_err());
    }
}
