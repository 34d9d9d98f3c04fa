use anyhow::{Result, anyhow};
use url::Url;

/// Validation results with specific error messages
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self { is_valid: true, error: None }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self { is_valid: false, error: Some(msg.into()) }
    }

    pub fn to_result(&self) -> Result<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(anyhow!(self.error.clone().unwrap_or_else(|| "Validation failed".to_string())))
        }
    }
}

/// Validate a site URL before registration. Only http/https targets with a
/// real host are accepted.
pub fn validate_site_url(target: &str) -> ValidationResult {
    if target.trim().is_empty() {
        return ValidationResult::err("URL cannot be empty");
    }

    match Url::parse(target) {
        Ok(url) => {
            let scheme = url.scheme();
            if scheme != "http" && scheme != "https" {
                return ValidationResult::err(format!(
                    "Invalid scheme '{scheme}'. Must be http or https"
                ));
            }

            if url.host_str().is_none() {
                return ValidationResult::err("URL must have a valid host");
            }

            ValidationResult::ok()
        }
        Err(e) => {
            if !target.contains("://") {
                ValidationResult::err("URL must include scheme (http:// or https://)")
            } else {
                ValidationResult::err(format!("Invalid URL: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https_urls() {
        assert!(validate_site_url("https://example.com").is_valid);
        assert!(validate_site_url("http://example.com/path?q=1").is_valid);
    }

    #[test]
    fn rejects_missing_scheme() {
        let result = validate_site_url("example.com");
        assert!(!result.is_valid);
        assert!(result.error.unwrap().contains("scheme"));
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(!validate_site_url("ftp://example.com").is_valid);
        assert!(!validate_site_url("file:///etc/passwd").is_valid);
    }

    #[test]
    fn rejects_empty_input() {
        assert!(!validate_site_url("   ").is_valid);
    }
}
