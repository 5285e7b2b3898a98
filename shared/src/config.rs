use manage_task_atoms::media::parse_public_base;
use thiserror::Error;
use url::Url;

pub const DEFAULT_TABLE_NAME: &str = "manage-task";
pub const DEFAULT_BUCKET_NAME: &str = "manage-task-images";
pub const DEFAULT_REGION: &str = "ap-southeast-2";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PUBLIC_URL_BASE is not a usable http(s) base URL: {0}")]
    InvalidPublicUrlBase(String),
}

/// Settings read once at cold start.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub table_name: String,
    pub bucket_name: String,
    /// Where uploaded images are publicly served from.
    pub public_url_base: Url,
}

impl AppConfig {
    /// Read from the process environment. `region` picks the default S3
    /// endpoint when `PUBLIC_URL_BASE` is not set.
    pub fn from_env(region: Option<&str>) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok(), region)
    }

    pub fn from_lookup<F>(lookup: F, region: Option<&str>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let table_name = non_empty("TABLE_NAME").unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string());
        let bucket_name =
            non_empty("S3_BUCKET_NAME").unwrap_or_else(|| DEFAULT_BUCKET_NAME.to_string());

        let base = non_empty("PUBLIC_URL_BASE").unwrap_or_else(|| {
            format!(
                "https://{}.s3.{}.amazonaws.com/",
                bucket_name,
                region.unwrap_or(DEFAULT_REGION)
            )
        });
        let public_url_base =
            parse_public_base(&base).map_err(|_| ConfigError::InvalidPublicUrlBase(base.clone()))?;

        Ok(Self {
            table_name,
            bucket_name,
            public_url_base,
        })
    }
}
