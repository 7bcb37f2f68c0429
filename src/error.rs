use std::path::{Path, PathBuf};
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 参数错误（体模类型、病灶直径形状等），在调用仿真器之前抛出
    #[error("参数错误: {0}")]
    InvalidParameter(#[from] ParameterError),
    /// 文件系统错误（目录创建、文件写入等）
    #[error("文件错误: {0}")]
    FileSystem(#[from] FileError),
    /// 解析错误（无法从已写出的文件中还原元数据）
    #[error("解析错误: {0}")]
    Parse(#[from] ParseError),
    /// 外部仿真器错误
    #[error("仿真错误: {0}")]
    Simulation(#[from] SimulationError),
    /// 标识生成错误
    #[error("标识错误: {0}")]
    Identity(#[from] IdentityError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 参数错误
#[derive(Debug, Error)]
pub enum ParameterError {
    /// 不支持的体模
    #[error("{name} 不在可用体模列表中: {options:?}")]
    UnknownPhantom {
        name: String,
        options: &'static [&'static str],
    },
    /// 病灶直径与体模类型不匹配
    #[error("{phantom} 体模的病灶直径无效: {detail}")]
    LesionShape { phantom: String, detail: String },
    /// 数值必须为正
    #[error("参数 {field} 必须大于 0，实际为 {value}")]
    NotPositive { field: &'static str, value: f64 },
    /// 列表参数为空
    #[error("参数 {field} 不能为空")]
    EmptyList { field: &'static str },
    /// 列表参数中的两项会写到同一个输出路径
    #[error("参数 {field} 中的 {value} 与前面的条目输出路径相同")]
    DuplicateEntry { field: &'static str, value: String },
    /// 年龄落在参考表的空档中
    #[error("年龄 {age} 岁没有对应的成人腰围参考值")]
    AgeOutsideReferenceTable { age: f64 },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {}", .path.display())]
    NotFound { path: PathBuf },
    /// 读取文件失败
    #[error("读取文件失败 ({}): {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({}): {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 创建目录失败
    #[error("创建目录失败 ({}): {source}", .path.display())]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({}): {source}", .path.display())]
    TomlParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// 元数据解析错误
#[derive(Debug, Error)]
pub enum ParseError {
    /// DICOM 文件缺少必需字段
    #[error("{} 缺少字段 {field}", .path.display())]
    MissingField { path: PathBuf, field: &'static str },
    /// 字段内容无法解析
    #[error("{} 的字段 {field} 无法解析: {value:?}", .path.display())]
    MalformedField {
        path: PathBuf,
        field: &'static str,
        value: String,
    },
    /// 文件名不符合任何已知命名规则
    #[error("文件名不符合命名规则: {}", .path.display())]
    UnrecognizedFileName { path: PathBuf },
    /// 附属记录无法解析
    #[error("附属记录无法解析 ({}): {source}", .path.display())]
    SideRecord {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// 外部仿真器错误
#[derive(Debug, Error)]
pub enum SimulationError {
    /// 无法启动外部进程
    #[error("无法启动仿真器 {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// 外部仿真器返回非零状态
    #[error("仿真器执行失败 (状态: {status}): {stderr}")]
    CollaboratorFailed { status: String, stderr: String },
    /// 仿真输出格式不符合约定
    #[error("仿真输出 {volume} 无效: {detail}")]
    MalformedOutput { volume: &'static str, detail: String },
}

/// 标识生成错误
#[derive(Debug, Error)]
pub enum IdentityError {
    /// 同一批次中 SOP Instance UID 重复
    #[error("SOP Instance UID 重复: {uid}")]
    DuplicateInstanceUid { uid: String },
    /// UID 超过 DICOM 规定的 64 字符
    #[error("UID 长度 {len} 超过 64 字符: {uid}")]
    UidTooLong { uid: String, len: usize },
    /// UID 根前缀格式错误
    #[error("UID 根前缀无效: {root:?}")]
    InvalidRoot { root: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件中没有 [[simulation]] 分组
    #[error("配置中没有任何 [[simulation]] 分组")]
    NoSimulationGroups,
    /// 分组字段无效
    #[error("第 {index} 个 [[simulation]] 分组无效: {source}")]
    InvalidGroup {
        index: usize,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl AsRef<Path>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::FileSystem(FileError::ReadFailed {
            path: path.as_ref().to_path_buf(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl AsRef<Path>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::FileSystem(FileError::WriteFailed {
            path: path.as_ref().to_path_buf(),
            source: Box::new(source),
        })
    }

    /// 创建目录创建错误
    pub fn directory_create_failed(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        AppError::FileSystem(FileError::DirectoryCreateFailed {
            path: path.as_ref().to_path_buf(),
            source,
        })
    }

    /// 创建字段缺失错误
    pub fn missing_field(path: impl AsRef<Path>, field: &'static str) -> Self {
        AppError::Parse(ParseError::MissingField {
            path: path.as_ref().to_path_buf(),
            field,
        })
    }

    /// 创建字段格式错误
    pub fn malformed_field(
        path: impl AsRef<Path>,
        field: &'static str,
        value: impl Into<String>,
    ) -> Self {
        AppError::Parse(ParseError::MalformedField {
            path: path.as_ref().to_path_buf(),
            field,
            value: value.into(),
        })
    }

    /// 是否为参数错误
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, AppError::InvalidParameter(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
