//! Utility functions and helpers

use crate::error::{LazyreqError, Result};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// URL validation and parsing utilities
pub struct UrlUtils;

impl UrlUtils {
    /// Validate and normalize URL
    pub fn validate_url(input: &str) -> Result<Url> {
        // Add http:// if no scheme is provided
        let url_str = if input.contains("://") {
            input.to_string()
        } else {
            format!("http://{}", input)
        };

        Url::parse(&url_str)
            .map_err(|e| LazyreqError::InvalidUrl(format!("Invalid URL '{}': {}", input, e)))
    }
}

/// File system utilities
pub struct FileUtils;

impl FileUtils {
    /// Expand tilde (~) in file paths
    pub fn expand_path(path: &str) -> Result<PathBuf> {
        match path.strip_prefix('~') {
            Some(rest) => {
                let home_dir = dirs::home_dir().ok_or_else(|| {
                    LazyreqError::Config("Cannot determine home directory".to_string())
                })?;
                Ok(home_dir.join(rest.trim_start_matches('/')))
            }
            None => Ok(PathBuf::from(path)),
        }
    }
}

/// String utilities
pub struct StringUtils;

impl StringUtils {
    /// Parse `Key: value` header lines
    pub fn parse_header(input: &str) -> Result<(String, String)> {
        match input.split_once(':') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(LazyreqError::Config(format!(
                "Invalid header format: '{}'. Expected 'key: value'",
                input
            ))),
        }
    }

    /// Parse `key=value` pairs for query parameters and form fields
    pub fn parse_pair(input: &str) -> Result<(String, String)> {
        match input.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(LazyreqError::Config(format!(
                "Invalid pair format: '{}'. Expected 'key=value'",
                input
            ))),
        }
    }

    /// Parse timeout values (supports suffixes like 's', 'm', 'h')
    pub fn parse_timeout(input: &str) -> Result<Duration> {
        if let Ok(seconds) = input.parse::<u64>() {
            return Ok(Duration::from_secs(seconds));
        }
        if let Some(millis) = input.strip_suffix("ms") {
            let number: u64 = millis.parse().map_err(|_| {
                LazyreqError::Config(format!("Invalid timeout number: '{}'", millis))
            })?;
            return Ok(Duration::from_millis(number));
        }

        let (number_part, unit) = if let Some(stripped) = input.strip_suffix('s') {
            (stripped, 1)
        } else if let Some(stripped) = input.strip_suffix('m') {
            (stripped, 60)
        } else if let Some(stripped) = input.strip_suffix('h') {
            (stripped, 3600)
        } else {
            return Err(LazyreqError::Config(format!(
                "Invalid timeout format: '{}'. Use number with optional suffix (ms/s/m/h)",
                input
            )));
        };

        let number: u64 = number_part
            .parse()
            .map_err(|_| LazyreqError::Config(format!("Invalid timeout number: '{}'", number_part)))?;

        Ok(Duration::from_secs(number * unit))
    }
}
