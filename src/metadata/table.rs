use crate::error::{AppError, AppResult};
use crate::metadata::extractor::extract_record;
use crate::models::record::BatchRecord;
use std::path::{Path, PathBuf};

/// 元数据表文件名
pub const METADATA_FILE_NAME: &str = "metadata.csv";

/// 元数据表，每行对应一个已写出的文件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataTable {
    records: Vec<BatchRecord>,
}

impl MetadataTable {
    pub fn new(records: Vec<BatchRecord>) -> Self {
        Self { records }
    }

    /// 按给定顺序逐个提取文件元数据，任一文件失败即返回错误
    ///
    /// 读取是阻塞的，调用方需保证此时没有并发任务依赖执行器。
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> AppResult<Self> {
        let records = paths
            .iter()
            .map(|path| extract_record(path.as_ref()))
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Self { records })
    }

    pub fn records(&self) -> &[BatchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 写出 CSV（带表头）
    pub fn write_csv(&self, path: &Path) -> AppResult<()> {
        let mut writer =
            csv::Writer::from_path(path).map_err(|e| AppError::file_write_failed(path, e))?;
        for record in &self.records {
            writer
                .serialize(record)
                .map_err(|e| AppError::file_write_failed(path, e))?;
        }
        writer
            .flush()
            .map_err(|e| AppError::file_write_failed(path, e))
    }

    /// 读回 CSV
    pub fn read_csv(path: &Path) -> AppResult<Self> {
        let mut reader =
            csv::Reader::from_path(path).map_err(|e| AppError::file_read_failed(path, e))?;
        let records = reader
            .deserialize()
            .collect::<Result<Vec<BatchRecord>, _>>()
            .map_err(|e| AppError::file_read_failed(path, e))?;
        Ok(Self { records })
    }
}

/// 元数据表在输出目录中的位置
pub fn metadata_path(image_directory: &Path) -> PathBuf {
    image_directory.join(METADATA_FILE_NAME)
}
