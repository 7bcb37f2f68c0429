//! 单个组合处理器 - 编排层
//!
//! ## 职责
//!
//! 处理一个 (体模, 直径) 组合：
//!
//! 1. **剂量扫描**：每个剂量水平构造一个参数集，仿真并写出重建图像
//! 2. **辅助变体**：把扫描中最后一个参数集显式传给 `derive_auxiliary_variants`，
//!    生成无噪声序列，并写出同一次仿真的真值图像
//!
//! 序列号在整个运行期间递增，每写出一个序列分配一个新号。

use crate::error::{AppResult, ParameterError};
use crate::identity::naming::{
    diameter_dir, dose_dir, dose_series_name, dose_study_name, patient_name, recon_label,
    relative_dose_percent,
};
use crate::identity::{series_identity, IdentityGenerator, IdentityNumbers, NameOverrides};
use crate::models::loaders::BatchRequest;
use crate::models::parameters::ParameterSet;
use crate::models::phantom::Phantom;
use crate::models::record::SeriesKind;
use crate::models::volume::Volume;
use crate::persist::DicomPersister;
use crate::simulation::{CtSimulator, SimulationInvoker};
use std::path::{Path, PathBuf};
use tracing::info;

/// 一个 (体模, 直径) 组合
#[derive(Debug, Clone, Copy)]
pub struct Combination {
    pub phantom: Phantom,
    /// 直径在列表中的下标，用作患者编号
    pub patient_id: u32,
    pub diameter_mm: f64,
}

impl Combination {
    /// 组合的输出目录：`<root>/<体模>/diameter<直径>mm`
    pub fn directory(&self, root: &Path) -> PathBuf {
        root.join(self.phantom.name())
            .join(diameter_dir(self.diameter_mm))
    }

    pub fn patient_name(&self) -> String {
        patient_name(self.phantom, self.diameter_mm)
    }
}

/// 剂量扫描结果
#[derive(Debug)]
pub struct DoseSweep {
    pub written: Vec<PathBuf>,
    /// 扫描中最后一个参数集，用于派生辅助变体
    pub last: ParameterSet,
}

/// 组合处理统计
#[derive(Debug, Default, Clone, Copy)]
pub struct CombinationStats {
    pub simulations: usize,
    pub series: usize,
    pub files: usize,
}

/// 组合处理器
///
/// 持有仿真调用器、DICOM 写入服务和本次运行的 UID 生成器。
pub struct CombinationProcessor<S> {
    invoker: SimulationInvoker<S>,
    persister: DicomPersister,
    identities: IdentityGenerator,
    next_series_id: u32,
    stats: CombinationStats,
}

impl<S: CtSimulator> CombinationProcessor<S> {
    pub fn new(simulator: S, identities: IdentityGenerator) -> Self {
        Self {
            invoker: SimulationInvoker::new(simulator),
            persister: DicomPersister::new(),
            identities,
            next_series_id: 1,
            stats: CombinationStats::default(),
        }
    }

    pub fn simulator(&self) -> &S {
        self.invoker.simulator()
    }

    pub fn identities(&self) -> &IdentityGenerator {
        &self.identities
    }

    pub fn stats(&self) -> CombinationStats {
        self.stats
    }

    /// 处理一个组合：先做剂量扫描，再生成辅助变体
    ///
    /// # 返回
    /// 按写出顺序返回所有文件路径
    pub async fn process(
        &mut self,
        combination: &Combination,
        request: &BatchRequest,
    ) -> AppResult<Vec<PathBuf>> {
        let root = request.image_directory.as_path();
        let sweep = self.run_dose_sweep(combination, request).await?;
        let mut written = sweep.written;
        let directory = combination.directory(root);
        written.extend(
            self.derive_auxiliary_variants(&sweep.last, &directory, request.verbose)
                .await?,
        );
        Ok(written)
    }

    /// 剂量扫描
    ///
    /// 每个剂量水平：I0 = full_dose × dose_level，相对剂量取整后用于命名和目录。
    pub async fn run_dose_sweep(
        &mut self,
        combination: &Combination,
        request: &BatchRequest,
    ) -> AppResult<DoseSweep> {
        let doses: Vec<f64> = request
            .dose_level
            .iter()
            .map(|level| request.full_dose * level)
            .collect();
        let max_dose = doses.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let patient = combination.patient_name();
        let recon_dir = recon_label(&request.settings.fbp_kernel);

        let mut written = Vec::new();
        let mut last = None;

        for (study_id, &dose) in doses.iter().enumerate() {
            let percent = relative_dose_percent(dose, max_dose);
            let study_name = dose_study_name(percent);
            info!(
                "  ▶ {} | 剂量 {}/{} ({}%, I0 = {})",
                patient,
                study_id + 1,
                doses.len(),
                percent,
                dose
            );

            let overrides = NameOverrides {
                patient_name: Some(patient.clone()),
                series_name: Some(dose_series_name(&patient, &study_name)),
                study_name: Some(study_name),
            };
            let numbers = IdentityNumbers {
                patient_id: combination.patient_id,
                study_id: study_id as u32,
                series_id: self.allocate_series_id(),
            };
            let identity = series_identity(
                combination.phantom,
                combination.diameter_mm,
                dose,
                numbers,
                &overrides,
            );
            let params = ParameterSet::new(
                combination.phantom,
                combination.diameter_mm,
                dose,
                request.settings.clone(),
                identity,
            )?;

            let output = self.invoker.run(&params, request.verbose).await?;
            self.stats.simulations += 1;

            let target = combination
                .directory(&request.image_directory)
                .join(dose_dir(percent))
                .join(&recon_dir)
                .join(format!("{}.dcm", patient));
            written.extend(
                self.persist(&output.recon, &params, SeriesKind::Simulation, &target)
                    .await?,
            );
            last = Some(params);
        }

        let last = last.ok_or(ParameterError::EmptyList {
            field: "dose_level",
        })?;
        Ok(DoseSweep { written, last })
    }

    /// 派生辅助变体
    ///
    /// - 无噪声：关闭噪声、只仿真一次，写出 `<患者名>_noisefree.dcm`
    /// - 真值：取同一次仿真的真值图像，写出 `<患者名>_groundtruth.dcm`
    ///
    /// 两个变体沿用 `last` 的患者与研究编号，但各自使用新的序列号。
    pub async fn derive_auxiliary_variants(
        &mut self,
        last: &ParameterSet,
        directory: &Path,
        verbose: bool,
    ) -> AppResult<Vec<PathBuf>> {
        let patient = &last.identity().patient_name;
        info!("  ▶ {} | 无噪声与真值图像", patient);

        let noise_free = last.derive_noise_free(self.allocate_series_id());
        let output = self.invoker.run(&noise_free, verbose).await?;
        self.stats.simulations += 1;

        let mut written = self
            .persist(
                &output.recon,
                &noise_free,
                SeriesKind::NoiseFree,
                &directory.join(format!("{}_noisefree.dcm", patient)),
            )
            .await?;

        let ground_truth = noise_free.derive_ground_truth(self.allocate_series_id());
        written.extend(
            self.persist(
                &output.ground_truth,
                &ground_truth,
                SeriesKind::GroundTruth,
                &directory.join(format!("{}_groundtruth.dcm", patient)),
            )
            .await?,
        );

        Ok(written)
    }

    async fn persist(
        &mut self,
        volume: &Volume,
        params: &ParameterSet,
        kind: SeriesKind,
        target: &Path,
    ) -> AppResult<Vec<PathBuf>> {
        let written = self
            .persister
            .write_series(volume, params, kind, &mut self.identities, target)
            .await?;
        self.stats.series += 1;
        self.stats.files += written.len();
        Ok(written)
    }

    fn allocate_series_id(&mut self) -> u32 {
        let id = self.next_series_id;
        self.next_series_id += 1;
        id
    }
}
