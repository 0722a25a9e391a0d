use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub preprocessor_path: PathBuf,
    pub regressor_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub session: SessionConfig,
    pub upload_dir: PathBuf,
    pub model: ModelConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let session = SessionConfig {
            secret: std::env::var("SESSION_SECRET")?,
            issuer: std::env::var("SESSION_ISSUER").unwrap_or_else(|_| "salescast".into()),
            audience: std::env::var("SESSION_AUDIENCE")
                .unwrap_or_else(|_| "salescast-users".into()),
            ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(8 * 60),
        };
        let upload_dir = std::env::var("UPLOAD_DIR")
            .unwrap_or_else(|_| "uploads".into())
            .into();
        let model = ModelConfig {
            preprocessor_path: std::env::var("PREPROCESSOR_PATH")
                .unwrap_or_else(|_| "models/preprocessor.json".into())
                .into(),
            regressor_path: std::env::var("REGRESSOR_PATH")
                .unwrap_or_else(|_| "models/regressor.json".into())
                .into(),
        };
        Ok(Self {
            database_url,
            session,
            upload_dir,
            model,
        })
    }
}
