//! 附属记录
//!
//! 每个 DICOM 文件旁边写一个同名 `.json` 文件，原样保存生成它的参数集。
//! 元数据提取优先读取附属记录，避免从自由文本字段反向解析。

use crate::error::{AppError, AppResult, ParseError};
use crate::models::parameters::ParameterSet;
use crate::models::record::SeriesKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideRecord {
    pub params: ParameterSet,
    pub series: SeriesKind,
    pub slice_index: u32,
    pub sop_instance_uid: String,
}

impl SideRecord {
    /// DICOM 文件对应的附属记录路径
    pub fn path_for(dicom_path: &Path) -> PathBuf {
        dicom_path.with_extension("json")
    }

    pub async fn write(&self, dicom_path: &Path) -> AppResult<PathBuf> {
        let path = Self::path_for(dicom_path);
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::file_write_failed(&path, e))?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| AppError::file_write_failed(&path, e))?;
        Ok(path)
    }

    /// 读取附属记录；不存在时返回 `None`
    ///
    /// 同步读取，供同步的元数据提取使用。
    pub fn read(dicom_path: &Path) -> AppResult<Option<Self>> {
        let path = Self::path_for(dicom_path);
        if !path.exists() {
            return Ok(None);
        }

        let content =
            std::fs::read_to_string(&path).map_err(|e| AppError::file_read_failed(&path, e))?;
        let record = serde_json::from_str(&content)
            .map_err(|source| ParseError::SideRecord { path, source })?;
        Ok(Some(record))
    }
}
