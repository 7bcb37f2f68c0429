//! 仿真器接口
//!
//! 外部 CT 仿真框架（正投影 → 加噪 → 重建）被视为黑盒，
//! 只通过 [`CtSimulator`] 暴露"给定参数，返回三个体数据"的能力。

use crate::error::AppResult;
use crate::models::parameters::{LesionDiameter, ParameterSet};
use crate::models::phantom::Phantom;
use crate::models::volume::SimulationOutput;
use async_trait::async_trait;

/// 仿真器入口选择，不影响输出结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// 输出进度信息（`ct_sim`）
    Verbose,
    /// 静默运行（`ct_sim_quiet`）
    Quiet,
}

impl Verbosity {
    pub fn from_flag(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Quiet
        }
    }

    /// 对应的仿真器函数名
    pub fn entry_point(self) -> &'static str {
        match self {
            Verbosity::Verbose => "ct_sim",
            Verbosity::Quiet => "ct_sim_quiet",
        }
    }
}

/// 仿真器调用参数
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRequest {
    pub phantom: Phantom,
    pub patient_diameter: f64,
    pub reference_diameter: f64,
    pub reference_fov: f64,
    pub lesion_diameter: LesionDiameter,
    pub i0: f64,
    pub ndetectors: u32,
    pub nangles: u32,
    pub detector_size: f64,
    pub sid: f64,
    pub sdd: f64,
    pub detector_offset: f64,
    pub down_sampling: u32,
    pub has_bowtie: bool,
    pub add_noise: bool,
    pub aec_on: bool,
    pub matrix_size: u32,
    pub fov: f64,
    pub kernel: String,
    pub nsims: u32,
}

impl From<&ParameterSet> for SimulationRequest {
    fn from(params: &ParameterSet) -> Self {
        let settings = params.settings();
        Self {
            phantom: params.phantom(),
            patient_diameter: params.patient_diameter_mm(),
            reference_diameter: settings.reference_diameter,
            reference_fov: settings.reference_fov,
            lesion_diameter: settings.lesion_diameter.clone(),
            i0: params.i0(),
            ndetectors: settings.ndetectors,
            nangles: settings.nangles,
            detector_size: settings.detector_size,
            sid: settings.sid,
            sdd: settings.sdd,
            detector_offset: settings.detector_offset,
            down_sampling: settings.down_sampling,
            has_bowtie: settings.has_bowtie,
            add_noise: settings.add_noise,
            aec_on: settings.aec_on,
            matrix_size: settings.matrix_size,
            fov: params.fov_mm(),
            kernel: settings.fbp_kernel.clone(),
            nsims: settings.nsims,
        }
    }
}

/// CT 仿真器
///
/// 实现方是同步、不可重入的外部协作者；调用方必须串行调用。
#[async_trait]
pub trait CtSimulator: Send + Sync {
    /// 运行一次仿真，返回重建图像、无噪声投影和真值图像
    async fn simulate(
        &self,
        request: &SimulationRequest,
        verbosity: Verbosity,
    ) -> AppResult<SimulationOutput>;
}
