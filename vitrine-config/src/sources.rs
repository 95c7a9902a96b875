use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::loader::ConfigLoadError;

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub database: FileDatabaseConfig,
    #[serde(default)]
    pub storage: FileStorageConfig,
    #[serde(default)]
    pub pipeline: FilePipelineConfig,
    #[serde(default)]
    pub logging: FileLoggingConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_body_bytes: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileStorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(default)]
    pub s3: FileS3Config,
    #[serde(default)]
    pub local: FileLocalStorageConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileS3Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cdn_base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_path_style: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileLocalStorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FilePipelineConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_mode: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileLoggingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub max_body_bytes: Option<usize>,
    pub database_url: Option<String>,
    pub database_max_connections: Option<u32>,
    pub storage_backend: Option<String>,
    pub s3_endpoint: Option<String>,
    pub s3_region: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,
    pub s3_force_path_style: Option<bool>,
    pub cdn_base_url: Option<String>,
    pub local_root: Option<PathBuf>,
    pub local_bucket: Option<String>,
    pub local_base_url: Option<String>,
    pub upload_mode: Option<String>,
    pub log_format: Option<String>,
}

impl EnvConfig {
    /// Read `VITRINE_*` variables from the process environment.
    pub fn gather() -> Result<Self, ConfigLoadError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |name: &str| text_var(&lookup, name);

        Ok(Self {
            config_path: text("VITRINE_CONFIG").map(PathBuf::from),
            server_host: text("VITRINE_SERVER_HOST"),
            server_port: parsed_var(&lookup, "VITRINE_SERVER_PORT")?,
            max_body_bytes: parsed_var(&lookup, "VITRINE_MAX_BODY_BYTES")?,
            database_url: text("VITRINE_DATABASE_URL")
                .or_else(|| text("DATABASE_URL")),
            database_max_connections: parsed_var(
                &lookup,
                "VITRINE_DATABASE_MAX_CONNECTIONS",
            )?,
            storage_backend: text("VITRINE_STORAGE_BACKEND"),
            s3_endpoint: text("VITRINE_S3_ENDPOINT"),
            s3_region: text("VITRINE_S3_REGION"),
            s3_bucket: text("VITRINE_S3_BUCKET"),
            s3_access_key: text("VITRINE_S3_ACCESS_KEY"),
            s3_secret_key: text("VITRINE_S3_SECRET_KEY"),
            s3_force_path_style: parsed_var(
                &lookup,
                "VITRINE_S3_FORCE_PATH_STYLE",
            )?,
            cdn_base_url: text("VITRINE_CDN_BASE_URL"),
            local_root: text("VITRINE_LOCAL_ROOT").map(PathBuf::from),
            local_bucket: text("VITRINE_LOCAL_BUCKET"),
            local_base_url: text("VITRINE_LOCAL_BASE_URL"),
            upload_mode: text("VITRINE_UPLOAD_MODE"),
            log_format: text("VITRINE_LOG_FORMAT"),
        })
    }
}

fn text_var<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|value| !value.trim().is_empty())
}

fn parsed_var<F, T>(
    lookup: &F,
    name: &'static str,
) -> Result<Option<T>, ConfigLoadError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    text_var(lookup, name)
        .map(|raw| parse_var(name, &raw))
        .transpose()
}

fn parse_var<T>(name: &'static str, raw: &str) -> Result<T, ConfigLoadError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|err: T::Err| ConfigLoadError::Env {
        var: name,
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(
        vars: &[(&str, &str)],
    ) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn reads_typed_values() {
        let env = EnvConfig::from_lookup(lookup(&[
            ("VITRINE_SERVER_PORT", "8081"),
            ("VITRINE_S3_FORCE_PATH_STYLE", "true"),
            ("VITRINE_UPLOAD_MODE", "sequential"),
        ]))
        .unwrap();

        assert_eq!(env.server_port, Some(8081));
        assert_eq!(env.s3_force_path_style, Some(true));
        assert_eq!(env.upload_mode.as_deref(), Some("sequential"));
        assert!(env.server_host.is_none());
    }

    #[test]
    fn database_url_falls_back_to_plain_variable() {
        let env = EnvConfig::from_lookup(lookup(&[(
            "DATABASE_URL",
            "postgres://localhost/vitrine",
        )]))
        .unwrap();
        assert_eq!(
            env.database_url.as_deref(),
            Some("postgres://localhost/vitrine")
        );
    }

    #[test]
    fn blank_values_are_unset() {
        let env =
            EnvConfig::from_lookup(lookup(&[("VITRINE_SERVER_PORT", "  ")]))
                .unwrap();
        assert!(env.server_port.is_none());
    }

    #[test]
    fn malformed_numbers_name_the_variable() {
        let err =
            EnvConfig::from_lookup(lookup(&[("VITRINE_SERVER_PORT", "http")]))
                .unwrap_err();
        match err {
            ConfigLoadError::Env { var, .. } => {
                assert_eq!(var, "VITRINE_SERVER_PORT")
            }
            other => panic!("expected Env error, got {other:?}"),
        }
    }

    #[test]
    fn file_config_sections_default_when_absent() {
        let parsed: FileConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [storage.s3]
            bucket = "catalog"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.server.port, Some(9000));
        assert_eq!(parsed.storage.s3.bucket.as_deref(), Some("catalog"));
        assert!(parsed.database.url.is_none());
        assert!(parsed.logging.format.is_none());
    }
}
