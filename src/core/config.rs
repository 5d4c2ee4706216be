use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub openai: OpenAiConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_request_body_size: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_leeway: Duration,
}

/// Filesystem storage configuration for uploaded and generated images
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for all image storage; per-type subdirectories are
    /// created underneath it at startup
    pub root: PathBuf,
}

/// OpenAI image-edit API configuration
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub api_url: String,
    /// Upper bound for one generation call, including image download
    pub request_timeout_secs: u64,
    /// When true, image generation returns copies of the input instead of
    /// calling the external API
    pub test_mode: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            openai: OpenAiConfig::from_env()?,
        })
    }
}

impl AppConfig {
    const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 10 * 1024 * 1024; // 10MB

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_request_body_size = env::var("MAX_REQUEST_BODY_SIZE")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_REQUEST_BODY_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_REQUEST_BODY_SIZE must be a valid number".to_string())?;

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
            max_request_body_size,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    // Conservative defaults for small-medium apps
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MAX_CONNECTIONS must be a valid number".to_string())?;

        let min_connections = env::var("DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MIN_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MIN_CONNECTIONS must be a valid number".to_string())?;

        let acquire_timeout_secs = env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_ACQUIRE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_ACQUIRE_TIMEOUT_SECS must be a valid number".to_string())?;

        let idle_timeout_secs = env::var("DB_IDLE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_IDLE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_IDLE_TIMEOUT_SECS must be a valid number".to_string())?;

        let max_lifetime_secs = env::var("DB_MAX_LIFETIME_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_LIFETIME_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_MAX_LIFETIME_SECS must be a valid number".to_string())?;

        Ok(Self {
            url,
            max_connections,
            min_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
        })
    }
}

impl AuthConfig {
    const DEFAULT_JWT_LEEWAY_SECS: u64 = 60; // 1 minute

    pub fn from_env() -> Result<Self, String> {
        let jwt_secret = env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set".to_string())?;

        let leeway_secs = env::var("JWT_LEEWAY_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_JWT_LEEWAY_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "JWT_LEEWAY_SECS must be a valid number".to_string())?;

        Ok(Self {
            jwt_secret,
            jwt_leeway: Duration::from_secs(leeway_secs),
        })
    }
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, String> {
        let root = env::var("STORAGE_ROOT").unwrap_or_else(|_| "storage".to_string());

        Ok(Self {
            root: PathBuf::from(root),
        })
    }
}

impl OpenAiConfig {
    const DEFAULT_API_URL: &'static str = "https://api.openai.com/v1/images/edits";
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300; // 5 minutes

    pub fn from_env() -> Result<Self, String> {
        let test_mode = env::var("IMAGE_GENERATION_TEST_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        // The API key is only required when real generation is active
        let api_key = match env::var("OPENAI_API_KEY") {
            Ok(key) => key,
            Err(_) if test_mode => String::new(),
            Err(_) => return Err("OPENAI_API_KEY must be set".to_string()),
        };

        let api_url =
            env::var("OPENAI_IMAGE_EDIT_URL").unwrap_or_else(|_| Self::DEFAULT_API_URL.to_string());

        let request_timeout_secs = env::var("OPENAI_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_REQUEST_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "OPENAI_REQUEST_TIMEOUT_SECS must be a valid number".to_string())?;

        Ok(Self {
            api_key,
            api_url,
            request_timeout_secs,
            test_mode,
        })
    }
}
