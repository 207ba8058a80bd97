//! API credentials loaded from the environment

use anyhow::Result;

pub const API_KEY_VAR: &str = "FRACTTAL_API_KEY";
pub const API_SECRET_VAR: &str = "FRACTTAL_API_SECRET";

/// Client-credentials pair for the Fracttal OAuth endpoint
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Read credentials from the process environment, after loading `.env` if present
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => log::debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => log::warn!("Ignoring unreadable .env file: {}", e),
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build credentials from any variable lookup; blank values count as missing
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        match (read(API_KEY_VAR), read(API_SECRET_VAR)) {
            (Some(api_key), Some(api_secret)) => Ok(Self::new(api_key, api_secret)),
            (key, secret) => {
                let missing: Vec<&str> = [
                    key.is_none().then_some(API_KEY_VAR),
                    secret.is_none().then_some(API_SECRET_VAR),
                ]
                .into_iter()
                .flatten()
                .collect();
                anyhow::bail!(
                    "API credentials not found (missing {}).\n\
                     Create a .env file in the working directory with:\n\n\
                     {}=your_api_key\n\
                     {}=your_api_secret",
                    missing.join(", "),
                    API_KEY_VAR,
                    API_SECRET_VAR
                )
            }
        }
    }
}
