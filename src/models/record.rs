use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 序列类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeriesKind {
    /// 剂量扫描得到的仿真序列
    #[serde(rename = "simulation")]
    Simulation,
    /// 关闭噪声的单次仿真
    #[serde(rename = "noise free")]
    NoiseFree,
    /// 真值图像
    #[serde(rename = "ground truth")]
    GroundTruth,
}

impl SeriesKind {
    pub fn label(self) -> &'static str {
        match self {
            SeriesKind::Simulation => "simulation",
            SeriesKind::NoiseFree => "noise free",
            SeriesKind::GroundTruth => "ground truth",
        }
    }

    /// 文件名后缀（仿真序列没有后缀）
    pub fn file_suffix(self) -> Option<&'static str> {
        match self {
            SeriesKind::Simulation => None,
            SeriesKind::NoiseFree => Some("noisefree"),
            SeriesKind::GroundTruth => Some("groundtruth"),
        }
    }
}

impl std::fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 儿科分组
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PediatricSubgroup {
    Newborn,
    Infant,
    Child,
    Adolescent,
    Adult,
}

impl PediatricSubgroup {
    pub fn label(self) -> &'static str {
        match self {
            PediatricSubgroup::Newborn => "newborn",
            PediatricSubgroup::Infant => "infant",
            PediatricSubgroup::Child => "child",
            PediatricSubgroup::Adolescent => "adolescent",
            PediatricSubgroup::Adult => "adult",
        }
    }
}

/// 元数据表中的一行，对应一个已写出的文件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Patient ID")]
    pub patient_id: String,
    #[serde(rename = "Study Name")]
    pub study_name: String,
    #[serde(rename = "Study ID")]
    pub study_id: String,
    #[serde(rename = "series")]
    pub series: SeriesKind,
    #[serde(rename = "effective diameter [cm]")]
    pub effective_diameter_cm: f64,
    #[serde(rename = "age [year]")]
    pub age_years: f64,
    #[serde(rename = "pediatric subgroup")]
    pub pediatric_subgroup: PediatricSubgroup,
    #[serde(rename = "phantom")]
    pub phantom: String,
    #[serde(rename = "scanner")]
    pub scanner: String,
    #[serde(rename = "Dose [%]")]
    pub dose_percent: Option<u32>,
    #[serde(rename = "recon")]
    pub recon: String,
    #[serde(rename = "kernel")]
    pub kernel: String,
    #[serde(rename = "FOV [cm]")]
    pub fov_cm: f64,
    #[serde(rename = "repeat")]
    pub repeat: u32,
    #[serde(rename = "file")]
    pub file: PathBuf,
}
