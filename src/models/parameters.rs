//! 仿真参数集
//!
//! 一次仿真运行所需的全部扫描/重建参数。构造之后不可变，
//! 无噪声与真值变体通过 `derive_*` 显式派生出新的参数集。

use crate::error::{AppResult, ParameterError};
use crate::models::phantom::Phantom;
use serde::{Deserialize, Serialize};

/// 病灶直径设置
///
/// - `Scaled`：病灶随体模尺寸缩放（配置中写 `false` 或省略）
/// - `Single`：CTP404 使用，> 1 为绝对直径 (mm)，< 1 为相对体模直径的比例
/// - `Multiple`：CCT189 使用，按对比度 14 / 7 / 5 / 3 HU 的顺序给出 4 个直径
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLesionDiameter", into = "RawLesionDiameter")]
pub enum LesionDiameter {
    #[default]
    Scaled,
    Single(f64),
    Multiple(Vec<f64>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawLesionDiameter {
    Flag(bool),
    Scalar(f64),
    List(Vec<f64>),
}

impl TryFrom<RawLesionDiameter> for LesionDiameter {
    type Error = String;

    fn try_from(raw: RawLesionDiameter) -> Result<Self, Self::Error> {
        match raw {
            RawLesionDiameter::Flag(false) => Ok(LesionDiameter::Scaled),
            RawLesionDiameter::Flag(true) => {
                Err("lesion_diameter 只能是 false、数值或数值列表".to_string())
            }
            RawLesionDiameter::Scalar(d) => Ok(LesionDiameter::Single(d)),
            RawLesionDiameter::List(ds) => Ok(LesionDiameter::Multiple(ds)),
        }
    }
}

impl From<LesionDiameter> for RawLesionDiameter {
    fn from(value: LesionDiameter) -> Self {
        match value {
            LesionDiameter::Scaled => RawLesionDiameter::Flag(false),
            LesionDiameter::Single(d) => RawLesionDiameter::Scalar(d),
            LesionDiameter::Multiple(ds) => RawLesionDiameter::List(ds),
        }
    }
}

impl LesionDiameter {
    /// 检查病灶直径的形状是否与体模匹配
    pub fn validate_for(&self, phantom: Phantom) -> AppResult<()> {
        let detail = match (phantom, self) {
            (_, LesionDiameter::Scaled) => None,
            (Phantom::Ctp404, LesionDiameter::Single(_)) => None,
            (Phantom::Ctp404, LesionDiameter::Multiple(ds)) => Some(format!(
                "CTP404 的病灶直径必须是单个数值，实际为 {:?}",
                ds
            )),
            (Phantom::Cct189, LesionDiameter::Multiple(ds)) if ds.len() == 4 => None,
            (Phantom::Cct189, LesionDiameter::Multiple(ds)) => Some(format!(
                "CCT189 需要长度为 4 的列表，但 {} != 4: {:?}",
                ds.len(),
                ds
            )),
            (Phantom::Cct189, LesionDiameter::Single(d)) => Some(format!(
                "CCT189 需要长度为 4 的列表，实际为单个数值 {}",
                d
            )),
            (Phantom::Uniform, _) => None,
        };

        match detail {
            Some(detail) => Err(ParameterError::LesionShape {
                phantom: phantom.name().to_string(),
                detail,
            }
            .into()),
            None => Ok(()),
        }
    }
}

/// 与扫描组合无关的仿真设置
///
/// 字段名与配置文件中的键一致，默认值来自参考扫描协议。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// 自动曝光控制参考直径 (mm)
    pub reference_diameter: f64,
    /// 参考视野 (mm)
    pub reference_fov: f64,
    /// 探测器列数
    pub ndetectors: u32,
    /// 每圈投影角度数
    pub nangles: u32,
    /// 探测器单元尺寸 (mm)
    pub detector_size: f64,
    /// 源到旋转中心距离 (mm)
    pub sid: f64,
    /// 源到探测器距离 (mm)
    pub sdd: f64,
    /// 探测器横向偏移（1.25 = 四分之一像素）
    pub detector_offset: f64,
    /// 降采样倍数
    pub down_sampling: u32,
    pub has_bowtie: bool,
    pub add_noise: bool,
    pub aec_on: bool,
    /// 重建矩阵大小（像素，方阵）
    pub matrix_size: u32,
    /// FBP 卷积核描述，例如 `hanning,2.05`
    pub fbp_kernel: String,
    /// 不同噪声实现的重复次数
    pub nsims: u32,
    pub lesion_diameter: LesionDiameter,
    /// 患者年龄（年）
    pub age: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            reference_diameter: 200.0,
            reference_fov: 340.0,
            ndetectors: 900,
            nangles: 580,
            detector_size: 1.0,
            sid: 595.0,
            sdd: 1085.6,
            detector_offset: 1.25,
            down_sampling: 1,
            has_bowtie: false,
            add_noise: true,
            aec_on: true,
            matrix_size: 512,
            fbp_kernel: "hanning,2.05".to_string(),
            nsims: 1,
            lesion_diameter: LesionDiameter::Scaled,
            age: 0.0,
        }
    }
}

/// 一个序列的命名与编号
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesIdentity {
    pub patient_name: String,
    pub patient_id: u32,
    pub study_name: String,
    pub study_id: u32,
    pub series_name: String,
    pub series_id: u32,
}

/// 仿真参数集
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    phantom: Phantom,
    patient_diameter_mm: f64,
    i0: f64,
    fov_mm: f64,
    settings: SimulationSettings,
    identity: SeriesIdentity,
}

impl ParameterSet {
    /// 创建参数集
    ///
    /// # 参数
    /// - `phantom`: 体模
    /// - `patient_diameter_mm`: 患者有效直径 (mm)
    /// - `i0`: 探测器处光子通量
    /// - `settings`: 其余仿真设置
    /// - `identity`: 序列命名与编号
    ///
    /// # 返回
    /// 参数不合法时返回 `InvalidParameter`
    pub fn new(
        phantom: Phantom,
        patient_diameter_mm: f64,
        i0: f64,
        settings: SimulationSettings,
        identity: SeriesIdentity,
    ) -> AppResult<Self> {
        ensure_positive("patient_diameter", patient_diameter_mm)?;
        ensure_positive("I0", i0)?;
        ensure_positive("matrix_size", f64::from(settings.matrix_size))?;
        ensure_positive("nsims", f64::from(settings.nsims))?;
        settings.lesion_diameter.validate_for(phantom)?;

        let fov_mm = derive_fov(
            patient_diameter_mm,
            settings.reference_diameter,
            settings.reference_fov,
        );

        Ok(Self {
            phantom,
            patient_diameter_mm,
            i0,
            fov_mm,
            settings,
            identity,
        })
    }

    /// 重新检查不变量（调用仿真器之前使用）
    pub fn validate(&self) -> AppResult<()> {
        ensure_positive("patient_diameter", self.patient_diameter_mm)?;
        ensure_positive("I0", self.i0)?;
        self.settings.lesion_diameter.validate_for(self.phantom)
    }

    /// 派生无噪声变体：关闭噪声，只做一次仿真，使用新的序列号
    pub fn derive_noise_free(&self, series_id: u32) -> Self {
        let mut derived = self.clone();
        derived.settings.add_noise = false;
        derived.settings.nsims = 1;
        derived.identity.series_id = series_id;
        derived
    }

    /// 派生真值变体：参数不变，只更换序列号
    pub fn derive_ground_truth(&self, series_id: u32) -> Self {
        let mut derived = self.clone();
        derived.identity.series_id = series_id;
        derived
    }

    pub fn phantom(&self) -> Phantom {
        self.phantom
    }

    pub fn patient_diameter_mm(&self) -> f64 {
        self.patient_diameter_mm
    }

    pub fn i0(&self) -> f64 {
        self.i0
    }

    /// 重建视野 (mm)
    pub fn fov_mm(&self) -> f64 {
        self.fov_mm
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn identity(&self) -> &SeriesIdentity {
        &self.identity
    }

    pub fn nsims(&self) -> u32 {
        self.settings.nsims
    }

    pub fn matrix_size(&self) -> u32 {
        self.settings.matrix_size
    }

    pub fn add_noise(&self) -> bool {
        self.settings.add_noise
    }

    /// 像素间距 (mm)，各向同性
    pub fn pixel_spacing_mm(&self) -> f64 {
        self.fov_mm / f64::from(self.settings.matrix_size)
    }
}

/// 重建视野：患者直径等于参考直径时使用参考视野，否则为 1.1 倍患者直径
pub fn derive_fov(patient_diameter_mm: f64, reference_diameter_mm: f64, reference_fov_mm: f64) -> f64 {
    if patient_diameter_mm == reference_diameter_mm {
        reference_fov_mm
    } else {
        1.1 * patient_diameter_mm
    }
}

fn ensure_positive(field: &'static str, value: f64) -> AppResult<()> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ParameterError::NotPositive { field, value }.into())
    }
}
