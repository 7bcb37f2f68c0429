//! 批量仿真处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是批量仿真的入口，负责一个 `[[simulation]]` 分组的完整处理。
//!
//! ## 核心功能
//!
//! 1. **输入校验**：体模名称、列表非空、每个剂量为正、输出目录不重复，全部在第一次仿真之前完成
//! 2. **组合遍历**：体模 → 直径 → 剂量，严格串行
//! 3. **向下委托**：每个 (体模, 直径) 组合交给 `CombinationProcessor`
//! 4. **元数据汇总**：逐个解析写出的文件，生成 `metadata.csv`
//! 5. **全局统计**：仿真次数、序列数、文件数、耗时
//!
//! 任何错误都会中止整个批次，不重试、不跳过。

use crate::error::{AppError, AppResult, ParameterError};
use crate::identity::naming::{diameter_dir, dose_dir, relative_dose_percent};
use crate::identity::IdentityGenerator;
use crate::metadata::{metadata_path, MetadataTable};
use crate::models::loaders::BatchRequest;
use crate::models::phantom::Phantom;
use crate::orchestrator::combination_processor::{Combination, CombinationProcessor};
use crate::simulation::CtSimulator;
use crate::utils::logging;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// 批量仿真编排器
///
/// 同一个编排器处理多个分组时共用 UID 生成器和序列号计数，
/// 保证整个运行期间 SOP Instance UID 不重复。
pub struct BatchOrchestrator<S> {
    processor: CombinationProcessor<S>,
}

impl<S: CtSimulator> BatchOrchestrator<S> {
    pub fn new(simulator: S, identities: IdentityGenerator) -> Self {
        Self {
            processor: CombinationProcessor::new(simulator, identities),
        }
    }

    pub fn simulator(&self) -> &S {
        self.processor.simulator()
    }

    pub fn identities(&self) -> &IdentityGenerator {
        self.processor.identities()
    }

    /// 运行一个批次
    ///
    /// # 参数
    /// - `request`: 批量仿真请求
    ///
    /// # 返回
    /// 返回元数据表，同时写出 `<image_directory>/metadata.csv`
    pub async fn run_batch(&mut self, request: &BatchRequest) -> AppResult<MetadataTable> {
        let phantoms = validate_request(request)?;
        let started = Instant::now();
        let before = self.processor.stats();

        logging::log_batch_start(
            &request.image_directory,
            phantoms.len(),
            request.diameter.len(),
            request.dose_level.len(),
        );

        let mut written: Vec<PathBuf> = Vec::new();
        for (phantom_index, &phantom) in phantoms.iter().enumerate() {
            logging::log_phantom_start(phantom.name(), phantom_index + 1, phantoms.len());

            for (patient_id, &diameter_mm) in request.diameter.iter().enumerate() {
                let combination = Combination {
                    phantom,
                    patient_id: patient_id as u32,
                    diameter_mm,
                };
                written.extend(self.processor.process(&combination, request).await?);
            }
        }

        info!("📝 正在解析 {} 个文件的元数据...", written.len());
        // 元数据提取和 CSV 写出是同步 I/O；批次严格串行，此时没有其他任务等待执行器
        let table = MetadataTable::from_files(&written)?;

        let csv_path = metadata_path(&request.image_directory);
        tokio::fs::create_dir_all(&request.image_directory)
            .await
            .map_err(|e| AppError::directory_create_failed(&request.image_directory, e))?;
        table.write_csv(&csv_path)?;

        let after = self.processor.stats();
        logging::print_final_stats(
            after.simulations - before.simulations,
            after.series - before.series,
            after.files - before.files,
            started.elapsed(),
            &csv_path,
        );

        Ok(table)
    }
}

/// 校验请求并解析体模名称
fn validate_request(request: &BatchRequest) -> AppResult<Vec<Phantom>> {
    if request.model.is_empty() {
        return Err(ParameterError::EmptyList { field: "model" }.into());
    }
    if request.diameter.is_empty() {
        return Err(ParameterError::EmptyList { field: "diameter" }.into());
    }
    if request.dose_level.is_empty() {
        return Err(ParameterError::EmptyList {
            field: "dose_level",
        }
        .into());
    }

    let doses: Vec<f64> = request
        .dose_level
        .iter()
        .map(|level| request.full_dose * level)
        .collect();
    for &dose in &doses {
        if dose.is_nan() || dose <= 0.0 {
            return Err(ParameterError::NotPositive {
                field: "full_dose × dose_level",
                value: dose,
            }
            .into());
        }
    }

    // 同一组合内各剂量的目录由四舍五入后的百分比决定
    let max_dose = doses.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    ensure_distinct(
        "dose_level",
        request.dose_level.iter().zip(&doses),
        |(_, dose)| dose_dir(relative_dose_percent(**dose, max_dose)),
        |(level, _)| level.to_string(),
    )?;
    ensure_distinct(
        "diameter",
        request.diameter.iter(),
        |diameter| diameter_dir(**diameter),
        |diameter| diameter.to_string(),
    )?;

    let phantoms = request
        .model
        .iter()
        .map(|name| Phantom::from_str(name))
        .collect::<AppResult<Vec<_>>>()?;
    ensure_distinct(
        "model",
        request.model.iter().zip(&phantoms),
        |(_, phantom)| phantom.name().to_string(),
        |(name, _)| name.to_string(),
    )?;

    Ok(phantoms)
}

/// 按输出目录名检查重复，重复的条目会覆盖前面已写出的文件
fn ensure_distinct<T>(
    field: &'static str,
    items: impl Iterator<Item = T>,
    key: impl Fn(&T) -> String,
    describe: impl Fn(&T) -> String,
) -> AppResult<()> {
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(key(&item)) {
            return Err(ParameterError::DuplicateEntry {
                field,
                value: describe(&item),
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::loaders::parse_batch_requests;
    use std::path::Path;

    fn request(extra: &str) -> BatchRequest {
        let content = format!(
            "[[simulation]]\nimage_directory = \"out\"\n{}",
            extra
        );
        parse_batch_requests(&content, Path::new("test.toml"))
            .unwrap()
            .remove(0)
    }

    #[test]
    fn test_validate_resolves_phantom_aliases() {
        let phantoms = validate_request(&request("model = [\"MITA-LCD\", \"uniform\"]")).unwrap();
        assert_eq!(phantoms, vec![Phantom::Cct189, Phantom::Uniform]);
    }

    #[test]
    fn test_validate_rejects_empty_lists_and_zero_dose() {
        for extra in [
            "model = []",
            "diameter = []",
            "dose_level = []",
            "dose_level = [0.0]",
            "full_dose = 0",
            "dose_level = [1.0, 0.0]",
            "dose_level = [1.0, -0.5]",
            "model = [\"XCAT\"]",
        ] {
            let err = validate_request(&request(extra)).unwrap_err();
            assert!(err.is_invalid_parameter(), "{}", extra);
        }
    }

    #[test]
    fn test_validate_rejects_entries_sharing_an_output_directory() {
        for (extra, expected_field) in [
            ("dose_level = [1.0, 0.996]", "dose_level"),
            ("dose_level = [0.5, 1.0, 0.5]", "dose_level"),
            ("diameter = [112.0, 200.0, 112.0]", "diameter"),
            ("model = [\"CCT189\", \"MITA-LCD\"]", "model"),
        ] {
            let err = validate_request(&request(extra)).unwrap_err();
            assert!(
                matches!(
                    err,
                    AppError::InvalidParameter(ParameterError::DuplicateEntry { field, .. })
                        if field == expected_field
                ),
                "{}: {:?}",
                extra,
                err
            );
        }
    }

    #[test]
    fn test_validate_accepts_nearby_but_distinct_doses() {
        let phantoms =
            validate_request(&request("dose_level = [1.0, 0.99, 0.25]\ndiameter = [112.0, 112.5]"));
        assert!(phantoms.is_ok());
    }
}
