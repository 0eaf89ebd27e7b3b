use anyhow::{bail, Context, Result};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub detect_url: String,
    pub api_base_url: String,
    pub camera_index: u32,
    pub jpeg_quality: u8,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let detect_url =
            std::env::var("DETECT_URL").unwrap_or_else(|_| "http://127.0.0.1:5000".to_string());
        let api_base_url =
            std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());
        let camera_index = parse_var("CAMERA_INDEX", 0u32)?;
        let jpeg_quality = parse_var("JPEG_QUALITY", 80u8)?;

        // Tiny sanity checks (fail fast, fail loud)
        for (name, url) in [("DETECT_URL", &detect_url), ("API_BASE_URL", &api_base_url)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("{name} must start with http:// or https://");
            }
        }
        if !(1..=100).contains(&jpeg_quality) {
            bail!("JPEG_QUALITY must be between 1 and 100");
        }

        Ok(Self {
            detect_url,
            api_base_url,
            camera_index,
            jpeg_quality,
        })
    }
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => v
            .parse::<T>()
            .with_context(|| format!("Invalid value for {key}: {v}")),
        Err(_) => Ok(default),
    }
}
