use crate::error::{AppResult, ParameterError};
use serde::{Deserialize, Serialize};

/// 可用体模名称
pub const PHANTOM_OPTIONS: &[&str] = &["CTP404", "CCT189", "UNIFORM"];

/// 体模枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phantom {
    /// Catphan CTP404 图像质量模块
    #[serde(rename = "CTP404")]
    Ctp404,
    /// MITA CCT189 低对比度可探测性体模
    #[serde(rename = "CCT189")]
    Cct189,
    /// 均匀水模
    #[serde(rename = "UNIFORM")]
    Uniform,
}

impl Phantom {
    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            Phantom::Ctp404 => "CTP404",
            Phantom::Cct189 => "CCT189",
            Phantom::Uniform => "UNIFORM",
        }
    }

    /// 从字符串解析体模（不区分大小写）
    ///
    /// 旧名称 `MITA-LCD` / `MITA` / `MITALCD` / `LCD` 统一归为 CCT189。
    pub fn from_str(s: &str) -> AppResult<Self> {
        match s.trim().to_uppercase().as_str() {
            "CTP404" => Ok(Phantom::Ctp404),
            "CCT189" | "MITA-LCD" | "MITA" | "MITALCD" | "LCD" => Ok(Phantom::Cct189),
            "UNIFORM" => Ok(Phantom::Uniform),
            _ => Err(ParameterError::UnknownPhantom {
                name: s.to_string(),
                options: PHANTOM_OPTIONS,
            }
            .into()),
        }
    }
}

impl std::fmt::Display for Phantom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
