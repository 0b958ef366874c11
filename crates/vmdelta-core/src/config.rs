use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::audit::AuditMode;

/// Env var pointing at an optional TOML config file.
pub const CONFIG_FILE_ENV: &str = "VMDELTA_CONFIG";

pub const DEFAULT_DATACENTER: &str = "Desconhecido";
pub const DEFAULT_STATE_FILE: &str = "vms_atuais.json";
pub const DEFAULT_LOG_FILE: &str = "novas_vms_detectadas.json";
pub const DEFAULT_OUTPUT_DIR: &str = "vm_data";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required setting {env} is not defined (env var {env} or `{key}` in the config file)")]
    Missing { env: &'static str, key: &'static str },

    #[error("invalid value for {env}: {value:?}")]
    InvalidValue { env: &'static str, value: String },

    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Connection settings for the vCenter endpoint.
#[derive(Clone)]
pub struct VcenterConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    /// vCenter ships self-signed certificates, so verification is opt-in.
    pub verify_tls: bool,
}

impl std::fmt::Debug for VcenterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VcenterConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}

/// Where durable state and exported descriptors live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub state_file: PathBuf,
    pub log_file: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

/// Runtime configuration, resolved once at startup and passed by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub vcenter: VcenterConfig,
    /// Human-readable datacenter label copied into every descriptor.
    pub datacenter: String,
    pub paths: Paths,
    pub audit_mode: AuditMode,
}

/// On-disk TOML layout. Every key is optional; env vars take precedence.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub vcenter: FileVcenter,
    pub datacenter: Option<String>,
    pub paths: FilePaths,
    pub audit_mode: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileVcenter {
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub verify_tls: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilePaths {
    pub state_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Config {
    /// Resolve from the process environment and the optional `$VMDELTA_CONFIG` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let lookup = |key: &str| std::env::var(key).ok();
        let file = match lookup(CONFIG_FILE_ENV).filter(|v| !v.is_empty()) {
            Some(path) => FileConfig::load(Path::new(&path))?,
            None => FileConfig::default(),
        };
        Self::resolve(file, lookup)
    }

    /// Merge defaults, file values and env lookups (highest precedence).
    ///
    /// Empty env values count as unset.
    pub fn resolve<F>(file: FileConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let required = |env_key: &'static str, file_key: &'static str, file_val: Option<String>| {
            env(env_key)
                .or(file_val.filter(|v| !v.trim().is_empty()))
                .ok_or(ConfigError::Missing {
                    env: env_key,
                    key: file_key,
                })
        };

        let host = required("VCENTER_HOST", "vcenter.host", file.vcenter.host)?;
        let user = required("VCENTER_USER", "vcenter.user", file.vcenter.user)?;
        let password = required("VCENTER_PASSWORD", "vcenter.password", file.vcenter.password)?;

        let verify_tls = match env("VCENTER_VERIFY_TLS") {
            Some(v) => parse_bool(&v).ok_or(ConfigError::InvalidValue {
                env: "VCENTER_VERIFY_TLS",
                value: v,
            })?,
            None => file.vcenter.verify_tls.unwrap_or(false),
        };

        let audit_mode = match env("VM_LOG_MODE").or(file.audit_mode) {
            Some(v) => AuditMode::from_str_arg(&v).ok_or(ConfigError::InvalidValue {
                env: "VM_LOG_MODE",
                value: v,
            })?,
            None => AuditMode::default(),
        };

        let defaults = Paths::default();
        let paths = Paths {
            state_file: env("VM_STATE_FILE")
                .map(PathBuf::from)
                .or(file.paths.state_file)
                .unwrap_or(defaults.state_file),
            log_file: env("VM_LOG_FILE")
                .map(PathBuf::from)
                .or(file.paths.log_file)
                .unwrap_or(defaults.log_file),
            output_dir: env("VM_OUTPUT_DIR")
                .map(PathBuf::from)
                .or(file.paths.output_dir)
                .unwrap_or(defaults.output_dir),
        };

        Ok(Self {
            vcenter: VcenterConfig {
                host,
                user,
                password,
                verify_tls,
            },
            datacenter: env("DATACENTER_NAME")
                .or(file.datacenter)
                .unwrap_or_else(|| DEFAULT_DATACENTER.to_string()),
            paths,
            audit_mode,
        })
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const CREDS: [(&str, &str); 3] = [
        ("VCENTER_HOST", "vc.example.com"),
        ("VCENTER_USER", "svc-inventory"),
        ("VCENTER_PASSWORD", "s3cret"),
    ];

    #[test]
    fn test_defaults_with_only_credentials() {
        let cfg = Config::resolve(FileConfig::default(), env_of(&CREDS)).unwrap();
        assert_eq!(cfg.vcenter.host, "vc.example.com");
        assert!(!cfg.vcenter.verify_tls);
        assert_eq!(cfg.datacenter, DEFAULT_DATACENTER);
        assert_eq!(cfg.paths, Paths::default());
        assert_eq!(cfg.audit_mode, AuditMode::Replace);
    }

    #[test]
    fn test_missing_required_variable() {
        let err = Config::resolve(
            FileConfig::default(),
            env_of(&[("VCENTER_HOST", "vc"), ("VCENTER_USER", "u")]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Missing {
                env: "VCENTER_PASSWORD",
                ..
            }
        ));
    }

    #[test]
    fn test_empty_variable_counts_as_missing() {
        let err = Config::resolve(
            FileConfig::default(),
            env_of(&[
                ("VCENTER_HOST", ""),
                ("VCENTER_USER", "u"),
                ("VCENTER_PASSWORD", "p"),
            ]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("VCENTER_HOST"));
    }

    #[test]
    fn test_env_overrides_file() {
        let file: FileConfig = toml::from_str(
            r#"
            datacenter = "from-file"
            audit_mode = "append"

            [vcenter]
            host = "file-host"
            user = "file-user"
            password = "file-pass"
            verify_tls = true

            [paths]
            output_dir = "/srv/vm_data"
            "#,
        )
        .unwrap();
        let cfg = Config::resolve(
            file,
            env_of(&[("VCENTER_HOST", "env-host"), ("DATACENTER_NAME", "DC-West")]),
        )
        .unwrap();
        assert_eq!(cfg.vcenter.host, "env-host");
        assert_eq!(cfg.vcenter.user, "file-user");
        assert!(cfg.vcenter.verify_tls);
        assert_eq!(cfg.datacenter, "DC-West");
        assert_eq!(cfg.audit_mode, AuditMode::Append);
        assert_eq!(cfg.paths.output_dir, PathBuf::from("/srv/vm_data"));
        assert_eq!(cfg.paths.state_file, PathBuf::from(DEFAULT_STATE_FILE));
    }

    #[test]
    fn test_invalid_enum_values() {
        let mut pairs = CREDS.to_vec();
        pairs.push(("VM_LOG_MODE", "rotate"));
        assert!(matches!(
            Config::resolve(FileConfig::default(), env_of(&pairs)),
            Err(ConfigError::InvalidValue {
                env: "VM_LOG_MODE",
                ..
            })
        ));

        let mut pairs = CREDS.to_vec();
        pairs.push(("VCENTER_VERIFY_TLS", "maybe"));
        assert!(Config::resolve(FileConfig::default(), env_of(&pairs)).is_err());
    }

    #[test]
    fn test_unknown_file_key_rejected() {
        assert!(toml::from_str::<FileConfig>("colour = \"blue\"").is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let cfg = Config::resolve(FileConfig::default(), env_of(&CREDS)).unwrap();
        let dbg = format!("{:?}", cfg);
        assert!(!dbg.contains("s3cret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = FileConfig::load(Path::new("/nonexistent/vmdelta.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
