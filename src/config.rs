use crate::error::{AppResult, ConfigError};
use crate::identity::{IdentityGenerator, DEFAULT_UID_ROOT};
use crate::simulation::OctaveSimulator;
use std::path::PathBuf;

/// 运行时配置
///
/// 与扫描参数无关的运行环境设置，来自环境变量；扫描参数来自 TOML 分组。
#[derive(Clone, Debug)]
pub struct Config {
    /// Octave 可执行文件
    pub octave_binary: String,
    /// 仿真资源目录（`ct_sim.m` 所在目录）
    pub simulation_resource_dir: PathBuf,
    /// UID 根前缀
    pub uid_root: String,
    /// 批次盐值，未设置时使用启动时间
    pub uid_batch_salt: Option<u64>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            octave_binary: "octave-cli".to_string(),
            simulation_resource_dir: PathBuf::from("simulation"),
            uid_root: DEFAULT_UID_ROOT.to_string(),
            uid_batch_salt: None,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        let default = Self::default();
        Ok(Self {
            octave_binary: std::env::var("OCTAVE_BINARY").unwrap_or(default.octave_binary),
            simulation_resource_dir: std::env::var("SIMULATION_RESOURCE_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.simulation_resource_dir),
            uid_root: std::env::var("UID_ROOT").unwrap_or(default.uid_root),
            uid_batch_salt: parse_var("UID_BATCH_SALT", "u64")?.or(default.uid_batch_salt),
            verbose_logging: parse_var("VERBOSE_LOGGING", "bool")?
                .unwrap_or(default.verbose_logging),
        })
    }

    /// 按配置创建仿真器
    pub fn simulator(&self) -> OctaveSimulator {
        OctaveSimulator::new(&self.octave_binary, &self.simulation_resource_dir)
    }

    /// 按配置创建本次运行的 UID 生成器
    pub fn identity_generator(&self) -> AppResult<IdentityGenerator> {
        match self.uid_batch_salt {
            Some(salt) => IdentityGenerator::new(&self.uid_root, salt),
            None => IdentityGenerator::with_timestamp_salt(&self.uid_root),
        }
    }
}

/// 读取并解析环境变量；未设置时返回 `None`，无法解析时报错
fn parse_var<T: std::str::FromStr>(var_name: &str, expected_type: &str) -> AppResult<Option<T>> {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse().map(Some).map_err(|_| {
            ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }
            .into()
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.octave_binary, "octave-cli");
        assert_eq!(config.uid_root, DEFAULT_UID_ROOT);
        assert!(config.uid_batch_salt.is_none());
        assert!(!config.verbose_logging);
    }

    #[test]
    fn test_fixed_salt_gives_reproducible_generator() {
        let config = Config {
            uid_batch_salt: Some(20260101120000),
            ..Config::default()
        };
        assert_eq!(config.identity_generator().unwrap().salt(), 20260101120000);
    }

    #[test]
    fn test_invalid_uid_root_is_rejected() {
        let config = Config {
            uid_root: "not.a.uid".to_string(),
            ..Config::default()
        };
        assert!(config.identity_generator().is_err());
    }
}
