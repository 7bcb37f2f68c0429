use crate::error::{AppError, AppResult, ConfigError, FileError};
use crate::models::parameters::SimulationSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 内置默认配置
pub const DEFAULT_CONFIG: &str = include_str!("../../../configs/defaults.toml");

/// 内置配置的显示路径（仅用于错误信息）
pub const DEFAULT_CONFIG_PATH: &str = "configs/defaults.toml";

/// 一次批量仿真请求，对应配置文件中的一个 `[[simulation]]` 分组
#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    /// 输出根目录
    pub image_directory: PathBuf,
    /// 体模列表
    #[serde(default = "default_models")]
    pub model: Vec<String>,
    /// 患者直径列表 (mm)
    #[serde(default = "default_diameters")]
    pub diameter: Vec<f64>,
    /// 满剂量光子数，与 `dose_level` 相乘得到每次扫描的 I0
    #[serde(default = "default_full_dose")]
    pub full_dose: f64,
    /// 相对剂量列表
    #[serde(default = "default_dose_levels")]
    pub dose_level: Vec<f64>,
    /// 是否输出仿真器的详细日志
    #[serde(default = "default_verbose")]
    pub verbose: bool,
    #[serde(flatten)]
    pub settings: SimulationSettings,
}

fn default_models() -> Vec<String> {
    vec!["CCT189".to_string()]
}

fn default_diameters() -> Vec<f64> {
    vec![200.0]
}

fn default_full_dose() -> f64 {
    3e5
}

fn default_dose_levels() -> Vec<f64> {
    vec![1.0]
}

fn default_verbose() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    simulation: Vec<toml::Table>,
}

/// 从 TOML 文件加载批量请求；未指定路径时使用内置默认配置
pub async fn load_batch_requests(config_path: Option<&Path>) -> AppResult<Vec<BatchRequest>> {
    let Some(path) = config_path else {
        tracing::info!("未指定配置文件，使用内置默认配置");
        return parse_batch_requests(DEFAULT_CONFIG, Path::new(DEFAULT_CONFIG_PATH));
    };

    if !path.exists() {
        return Err(FileError::NotFound {
            path: path.to_path_buf(),
        }
        .into());
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path, e))?;

    tracing::info!("正在加载配置: {}", path.display());
    parse_batch_requests(&content, path)
}

/// 解析配置内容
///
/// 分组按顺序累积：后一个分组在前一个分组的基础上覆盖字段。
pub fn parse_batch_requests(content: &str, origin: &Path) -> AppResult<Vec<BatchRequest>> {
    let file: ConfigFile = toml::from_str(content).map_err(|source| FileError::TomlParseFailed {
        path: origin.to_path_buf(),
        source,
    })?;

    if file.simulation.is_empty() {
        return Err(ConfigError::NoSimulationGroups.into());
    }

    let mut merged = toml::Table::new();
    let mut requests = Vec::with_capacity(file.simulation.len());

    for (index, group) in file.simulation.into_iter().enumerate() {
        merged.extend(group);
        let request: BatchRequest = toml::Value::Table(merged.clone())
            .try_into()
            .map_err(|source| ConfigError::InvalidGroup {
                index: index + 1,
                source,
            })?;
        requests.push(request);
    }

    Ok(requests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parameters::LesionDiameter;

    #[test]
    fn test_groups_accumulate_previous_keys() {
        let content = r#"
            [[simulation]]
            image_directory = "out"
            model = ["CCT189"]
            diameter = [112, 131]
            dose_level = [1.0, 0.5]
            nsims = 4

            [[simulation]]
            model = ["CTP404"]
            lesion_diameter = 0.4
        "#;

        let requests = parse_batch_requests(content, Path::new("test.toml")).unwrap();
        assert_eq!(requests.len(), 2);

        assert_eq!(requests[0].model, vec!["CCT189"]);
        assert_eq!(requests[0].settings.lesion_diameter, LesionDiameter::Scaled);

        let second = &requests[1];
        assert_eq!(second.image_directory, PathBuf::from("out"));
        assert_eq!(second.model, vec!["CTP404"]);
        assert_eq!(second.diameter, vec![112.0, 131.0]);
        assert_eq!(second.dose_level, vec![1.0, 0.5]);
        assert_eq!(second.settings.nsims, 4);
        assert_eq!(second.settings.lesion_diameter, LesionDiameter::Single(0.4));
    }

    #[test]
    fn test_defaults_fill_missing_keys() {
        let requests =
            parse_batch_requests("[[simulation]]\nimage_directory = \"out\"", Path::new("t"))
                .unwrap();
        let request = &requests[0];
        assert_eq!(request.model, vec!["CCT189"]);
        assert_eq!(request.diameter, vec![200.0]);
        assert_eq!(request.full_dose, 3e5);
        assert_eq!(request.dose_level, vec![1.0]);
        assert!(request.verbose);
        assert_eq!(request.settings, SimulationSettings::default());
    }

    #[test]
    fn test_bundled_default_config_parses() {
        let requests =
            parse_batch_requests(DEFAULT_CONFIG, Path::new(DEFAULT_CONFIG_PATH)).unwrap();
        assert!(!requests.is_empty());
        assert!(requests.iter().all(|r| !r.dose_level.is_empty()));
    }

    #[test]
    fn test_missing_groups_is_config_error() {
        let err = parse_batch_requests("title = \"x\"", Path::new("t")).unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::NoSimulationGroups)));
    }

    #[test]
    fn test_group_without_image_directory_is_rejected() {
        let err = parse_batch_requests("[[simulation]]\nmodel = [\"CCT189\"]", Path::new("t"))
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Config(ConfigError::InvalidGroup { index: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_config_file_is_not_found() {
        let err = load_batch_requests(Some(Path::new("/nonexistent/phantoms.toml")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FileSystem(FileError::NotFound { .. })));
    }
}
