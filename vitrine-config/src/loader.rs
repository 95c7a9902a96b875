use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::models::{
    Config, ConfigMetadata, DatabaseConfig, LocalStorageConfig, LogFormat,
    LoggingConfig, PipelineConfig, S3Config, ServerConfig, StorageBackend,
    StorageConfig, UploadMode,
};
use crate::sources::{EnvConfig, FileConfig};

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] = ["vitrine.toml", "config/vitrine.toml"];

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_S3_REGION: &str = "us-east-1";
pub const DEFAULT_LOCAL_ROOT: &str = "./data/objects";
pub const DEFAULT_LOCAL_BUCKET: &str = "media";
pub const DEFAULT_LOCAL_BASE_URL: &str = "http://localhost:8080/media";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },

    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value in environment variable {var}: {reason}")]
    Env { var: &'static str, reason: String },

    #[error("invalid configuration for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigLoadError {
    ConfigLoadError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// A non-fatal observation made while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigWarnings(Vec<ConfigWarning>);

impl ConfigWarnings {
    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint(
        &mut self,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) {
        self.0.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.0.iter()
    }
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

/// Resolves configuration from environment, TOML file and defaults, in that
/// order of precedence.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Load `.env` (if present), then the process environment and config file.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let env = EnvConfig::gather()?;
        let mut load = self.load_with_env(env)?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Resolve against an already gathered environment.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        compose_config(file_config, env, config_path)
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env.config_path.clone());

        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            Some(path) => path,
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists())
            {
                Some(path) => path,
                None => return Ok((None, None)),
            },
        };

        let file_config = read_file_config(&path)?;
        debug!(path = %path.display(), "loaded configuration file");
        Ok((Some(file_config), Some(path)))
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let contents =
        fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    config_path: Option<PathBuf>,
) -> Result<ConfigLoad, ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if file_config.is_none() {
        warnings.push_with_hint(
            "No vitrine.toml detected; using environment variables and defaults",
            "Create vitrine.toml or pass --config to point at one",
        );
    }

    let FileConfig {
        server: file_server,
        database: file_database,
        storage: file_storage,
        pipeline: file_pipeline,
        logging: file_logging,
    } = file_config.unwrap_or_default();

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: env.server_port.or(file_server.port).unwrap_or(DEFAULT_PORT),
        max_body_bytes: env
            .max_body_bytes
            .or(file_server.max_body_bytes)
            .unwrap_or(DEFAULT_MAX_BODY_BYTES),
    };
    if server.max_body_bytes == 0 {
        return Err(invalid("server.max_body_bytes", "must be greater than 0"));
    }

    let database = DatabaseConfig {
        url: env
            .database_url
            .or(file_database.url)
            .filter(|url| !url.trim().is_empty()),
        max_connections: env
            .database_max_connections
            .or(file_database.max_connections)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS),
    };
    if database.max_connections == 0 {
        return Err(invalid("database.max_connections", "must be greater than 0"));
    }
    if database.url.is_none() {
        warnings.push_with_hint(
            "No database URL configured",
            "Set database.url, VITRINE_DATABASE_URL or DATABASE_URL",
        );
    }

    let backend = match env.storage_backend.or(file_storage.backend) {
        Some(raw) => raw
            .parse::<StorageBackend>()
            .map_err(|reason| invalid("storage.backend", reason))?,
        None => StorageBackend::default(),
    };

    let storage = match backend {
        StorageBackend::S3 => {
            let s3 = file_storage.s3;
            let config = S3Config {
                endpoint: env.s3_endpoint.or(s3.endpoint),
                region: env
                    .s3_region
                    .or(s3.region)
                    .unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
                bucket: required("storage.s3.bucket", env.s3_bucket.or(s3.bucket))?,
                access_key: required(
                    "storage.s3.access_key",
                    env.s3_access_key.or(s3.access_key),
                )?,
                secret_key: required(
                    "storage.s3.secret_key",
                    env.s3_secret_key.or(s3.secret_key),
                )?,
                cdn_base_url: required(
                    "storage.s3.cdn_base_url",
                    env.cdn_base_url.or(s3.cdn_base_url),
                )?,
                force_path_style: env
                    .s3_force_path_style
                    .or(s3.force_path_style)
                    .unwrap_or(false),
            };
            if let Some(endpoint) = &config.endpoint {
                check_http_url("storage.s3.endpoint", endpoint)?;
            }
            check_http_url("storage.s3.cdn_base_url", &config.cdn_base_url)?;
            StorageConfig::S3(config)
        }
        StorageBackend::Local => {
            let local = file_storage.local;
            let config = LocalStorageConfig {
                root: env
                    .local_root
                    .or(local.root)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCAL_ROOT)),
                bucket: env
                    .local_bucket
                    .or(local.bucket)
                    .unwrap_or_else(|| DEFAULT_LOCAL_BUCKET.to_string()),
                base_url: env
                    .local_base_url
                    .or(local.base_url)
                    .unwrap_or_else(|| DEFAULT_LOCAL_BASE_URL.to_string()),
            };
            check_http_url("storage.local.base_url", &config.base_url)?;
            warnings.push(format!(
                "Local object storage in use; objects are written under {}",
                config.root.display()
            ));
            StorageConfig::Local(config)
        }
    };

    let pipeline = PipelineConfig {
        upload_mode: match env.upload_mode.or(file_pipeline.upload_mode) {
            Some(raw) => raw
                .parse::<UploadMode>()
                .map_err(|reason| invalid("pipeline.upload_mode", reason))?,
            None => UploadMode::default(),
        },
    };

    let logging = LoggingConfig {
        format: match env.log_format.or(file_logging.format) {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|reason| invalid("logging.format", reason))?,
            None => LogFormat::default(),
        },
    };

    Ok(ConfigLoad {
        config: Config {
            server,
            database,
            storage,
            pipeline,
            logging,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded: false,
            },
        },
        warnings,
    })
}

fn required(
    field: &'static str,
    value: Option<String>,
) -> Result<String, ConfigLoadError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| invalid(field, "value is required"))
}

fn check_http_url(field: &'static str, raw: &str) -> Result<(), ConfigLoadError> {
    let url = Url::parse(raw).map_err(|e| invalid(field, e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(field, format!("unsupported scheme '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const S3_CONFIG: &str = r#"
        [server]
        host = "127.0.0.1"
        port = 9000

        [database]
        url = "postgres://vitrine@localhost/vitrine"

        [storage]
        backend = "s3"

        [storage.s3]
        endpoint = "http://localhost:9001"
        bucket = "catalog"
        access_key = "minio"
        secret_key = "minio-secret"
        cdn_base_url = "https://cdn.example.com"
        force_path_style = true

        [pipeline]
        upload_mode = "sequential"

        [logging]
        format = "json"
    "#;

    #[test]
    fn file_values_are_applied() {
        let file = write_config(S3_CONFIG);
        let load = ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(EnvConfig::default())
            .unwrap();
        let config = load.config;

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert_eq!(config.database.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.pipeline.upload_mode, UploadMode::Sequential);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.storage.bucket(), "catalog");
        match config.storage {
            StorageConfig::S3(s3) => {
                assert_eq!(s3.region, DEFAULT_S3_REGION);
                assert!(s3.force_path_style);
                assert_eq!(s3.cdn_base_url, "https://cdn.example.com");
            }
            other => panic!("expected S3 storage, got {other:?}"),
        }
        assert_eq!(
            config.metadata.config_path.as_deref(),
            Some(file.path())
        );
        assert!(load.warnings.is_empty());
    }

    #[test]
    fn environment_wins_over_file() {
        let file = write_config(S3_CONFIG);
        let env = EnvConfig {
            server_port: Some(7000),
            s3_bucket: Some("override".into()),
            upload_mode: Some("concurrent".into()),
            ..EnvConfig::default()
        };

        let config = ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(env)
            .unwrap()
            .config;

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.storage.bucket(), "override");
        assert_eq!(config.pipeline.upload_mode, UploadMode::Concurrent);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::new()
            .with_config_path(dir.path().join("absent.toml"))
            .load_with_env(EnvConfig::default())
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
    }

    #[test]
    fn unknown_sections_fail_to_parse() {
        let file = write_config("[redis]\nurl = \"redis://localhost\"\n");
        let err = ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(EnvConfig::default())
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::Parse { .. }));
    }

    #[test]
    fn s3_requires_bucket_and_credentials() {
        let file = write_config("[storage]\nbackend = \"s3\"\n");
        let err = ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(EnvConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::Invalid {
                field: "storage.s3.bucket",
                ..
            }
        ));
    }

    #[test]
    fn cdn_url_must_be_http() {
        let file = write_config(S3_CONFIG);
        let env = EnvConfig {
            cdn_base_url: Some("ftp://cdn.example.com".into()),
            ..EnvConfig::default()
        };
        let err = ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(env)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::Invalid {
                field: "storage.s3.cdn_base_url",
                ..
            }
        ));
    }

    #[test]
    fn local_backend_uses_defaults_and_warns() {
        let file = write_config("[storage]\nbackend = \"local\"\n");
        let load = ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(EnvConfig::default())
            .unwrap();

        match &load.config.storage {
            StorageConfig::Local(local) => {
                assert_eq!(local.root, PathBuf::from(DEFAULT_LOCAL_ROOT));
                assert_eq!(local.bucket, DEFAULT_LOCAL_BUCKET);
                assert_eq!(local.base_url, DEFAULT_LOCAL_BASE_URL);
            }
            other => panic!("expected local storage, got {other:?}"),
        }
        let messages: Vec<_> =
            load.warnings.iter().map(|w| w.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.starts_with("Local object storage")));
        assert!(messages.iter().any(|m| m.starts_with("No database URL")));
    }

    #[test]
    fn bad_enumerations_name_the_field() {
        let file = write_config("[storage]\nbackend = \"gcs\"\n");
        let err = ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(EnvConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::Invalid {
                field: "storage.backend",
                ..
            }
        ));

        let file = write_config(
            "[storage]\nbackend = \"local\"\n[logging]\nformat = \"xml\"\n",
        );
        let err = ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(EnvConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::Invalid {
                field: "logging.format",
                ..
            }
        ));
    }
}
