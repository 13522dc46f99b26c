use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Maximum accepted upload body, 50 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 << 20;

/// Longest accepted token lifetime, one year.
pub const MAX_TOKEN_EXPIRE_HOURS: u64 = 24 * 365;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub jwt: JwtConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory served for paths no API route matches
    #[serde(default)]
    pub web_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// HMAC signing secret; must be set before startup
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_token_expire_hours")]
    pub token_expire_hours: u64,
    #[serde(default = "default_cookie_max_age")]
    pub cookie_max_age_secs: i64,
    #[serde(default)]
    pub cookie_secure: bool,
}

/// What happens when two uploads sanitize to the same file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Prefix every stored blob with a random id
    #[default]
    Unique,
    /// Store under the sanitized name; the last writer wins
    Overwrite,
}

impl FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unique" => Ok(CollisionPolicy::Unique),
            "overwrite" => Ok(CollisionPolicy::Overwrite),
            other => Err(format!("unknown collision policy {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_root")]
    pub root: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default)]
    pub collision_policy: CollisionPolicy,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_db_path() -> String {
    "data/image_storage.db".to_string()
}

fn default_token_expire_hours() -> u64 {
    24
}

fn default_cookie_max_age() -> i64 {
    3600
}

fn default_storage_root() -> String {
    "data/images".to_string()
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            web_dir: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token_expire_hours: default_token_expire_hours(),
            cookie_max_age_secs: default_cookie_max_age(),
            cookie_secure: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            max_upload_bytes: default_max_upload_bytes(),
            collision_policy: CollisionPolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    /// Call [`Config::validate`] before serving requests.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides();
        config.ensure_directories()?;
        tracing::info!(
            "Storage config: root={}, max_upload_bytes={}, collision_policy={:?}",
            config.storage.root,
            config.storage.max_upload_bytes,
            config.storage.collision_policy
        );
        Ok(config)
    }

    /// Parse a TOML document into a configuration
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reject configurations the server cannot start with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt.secret.trim().is_empty() {
            anyhow::bail!(
                "JWT secret is not configured; set [jwt] secret or IMGSTASH_CONF_JWT_SECRET"
            );
        }
        if !(1..=MAX_TOKEN_EXPIRE_HOURS).contains(&self.jwt.token_expire_hours) {
            anyhow::bail!(
                "jwt.token_expire_hours must be between 1 and {}",
                MAX_TOKEN_EXPIRE_HOURS
            );
        }
        if self.storage.max_upload_bytes == 0 {
            anyhow::bail!("storage.max_upload_bytes must be positive");
        }
        Ok(())
    }

    /// Load configuration from imgstash.toml or config.toml
    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = [
            "imgstash.toml",
            "config.toml",
            "data/imgstash.toml",
            "data/config.toml",
        ];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config = Self::from_toml(&content)?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Apply environment variable overrides
    /// Format: IMGSTASH_CONF_<SECTION>_<KEY>
    fn apply_env_overrides(&mut self) {
        // Server overrides
        if let Ok(val) = env::var("IMGSTASH_CONF_SERVER_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = env::var("IMGSTASH_CONF_SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = env::var("IMGSTASH_CONF_SERVER_WEB_DIR") {
            if !val.trim().is_empty() {
                self.server.web_dir = Some(val);
            }
        }

        // Database overrides
        if let Ok(val) = env::var("IMGSTASH_CONF_DATABASE_PATH") {
            self.database.path = val;
        }

        // JWT overrides
        if let Ok(val) = env::var("IMGSTASH_CONF_JWT_SECRET") {
            self.jwt.secret = val;
        }
        if let Ok(val) = env::var("IMGSTASH_CONF_JWT_EXPIRE_HOURS") {
            if let Ok(hours) = val.parse() {
                self.jwt.token_expire_hours = hours;
            }
        }
        if let Ok(val) = env::var("IMGSTASH_CONF_JWT_COOKIE_MAX_AGE") {
            if let Ok(secs) = val.parse() {
                self.jwt.cookie_max_age_secs = secs;
            }
        }
        if let Ok(val) = env::var("IMGSTASH_CONF_JWT_COOKIE_SECURE") {
            if let Ok(v) = val.parse() {
                self.jwt.cookie_secure = v;
            }
        }

        // Storage overrides
        if let Ok(val) = env::var("IMGSTASH_CONF_STORAGE_ROOT") {
            self.storage.root = val;
        }
        if let Ok(val) = env::var("IMGSTASH_CONF_STORAGE_MAX_UPLOAD_BYTES") {
            if let Ok(bytes) = val.parse() {
                self.storage.max_upload_bytes = bytes;
            }
        }
        if let Ok(val) = env::var("IMGSTASH_CONF_STORAGE_COLLISION_POLICY") {
            match val.parse::<CollisionPolicy>() {
                Ok(policy) => self.storage.collision_policy = policy,
                Err(e) => tracing::warn!("Ignoring IMGSTASH_CONF_STORAGE_COLLISION_POLICY: {}", e),
            }
        }
    }

    /// Ensure required directories exist
    fn ensure_directories(&self) -> anyhow::Result<()> {
        if let Some(parent) = Path::new(&self.database.path).parent() {
            fs::create_dir_all(parent)?;
        }

        fs::create_dir_all(&self.storage.root)?;

        Ok(())
    }
}
