//! Octave 仿真器 - 基础设施层
//!
//! 通过 GNU Octave 调用 MIRT 仿真函数 `ct_sim` / `ct_sim_quiet`。
//! 仿真器依赖自身资源文件的相对路径，因此子进程的工作目录固定为资源目录。
//! 结果通过二进制文件交换：3 个 `uint32` 维度（列主序）+ `single` 数据，小端。

use crate::error::{AppError, AppResult, SimulationError};
use crate::models::parameters::LesionDiameter;
use crate::models::volume::{SimulationOutput, Volume};
use crate::simulation::simulator::{CtSimulator, SimulationRequest, Verbosity};
use async_trait::async_trait;
use ndarray::{Array3, ShapeBuilder};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

const SCRIPT_NAME: &str = "run_ct_sim.m";

/// 仿真结果字段与交换文件名
const OUTPUT_VOLUMES: [(&str, &str); 3] = [
    ("recon", "recon.bin"),
    ("sinogram_noiseless", "sinogram_noiseless.bin"),
    ("ground_truth", "ground_truth.bin"),
];

/// Octave 仿真器
#[derive(Debug, Clone)]
pub struct OctaveSimulator {
    program: String,
    resource_dir: PathBuf,
}

impl OctaveSimulator {
    /// 创建仿真器
    ///
    /// # 参数
    /// - `program`: Octave 可执行文件，例如 `octave-cli`
    /// - `resource_dir`: 仿真资源目录（包含 `ct_sim.m` 等文件）
    pub fn new(program: impl Into<String>, resource_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            resource_dir: resource_dir.into(),
        }
    }

    pub fn resource_dir(&self) -> &Path {
        &self.resource_dir
    }
}

#[async_trait]
impl CtSimulator for OctaveSimulator {
    async fn simulate(
        &self,
        request: &SimulationRequest,
        verbosity: Verbosity,
    ) -> AppResult<SimulationOutput> {
        let scratch = tempfile::tempdir()
            .map_err(|e| AppError::file_write_failed(std::env::temp_dir(), e))?;
        let script_path = scratch.path().join(SCRIPT_NAME);
        let script = render_script(request, verbosity, scratch.path());
        tokio::fs::write(&script_path, script)
            .await
            .map_err(|e| AppError::file_write_failed(&script_path, e))?;

        debug!(
            "启动 {} (工作目录: {})",
            self.program,
            self.resource_dir.display()
        );

        let output = Command::new(&self.program)
            .arg("--quiet")
            .arg("--no-window-system")
            .arg(&script_path)
            .current_dir(&self.resource_dir)
            .output()
            .await
            .map_err(|source| SimulationError::SpawnFailed {
                program: self.program.clone(),
                source,
            })?;

        if verbosity == Verbosity::Verbose {
            for line in String::from_utf8_lossy(&output.stdout).lines() {
                info!("[octave] {}", line);
            }
        }

        if !output.status.success() {
            return Err(SimulationError::CollaboratorFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        let [recon, sinogram, ground_truth] = OUTPUT_VOLUMES;
        Ok(SimulationOutput {
            recon: read_volume(&scratch.path().join(recon.1), recon.0).await?,
            sinogram_noiseless: read_volume(&scratch.path().join(sinogram.1), sinogram.0).await?,
            ground_truth: read_volume(&scratch.path().join(ground_truth.1), ground_truth.0)
                .await?,
        })
    }
}

/// 生成 Octave 驱动脚本
fn render_script(request: &SimulationRequest, verbosity: Verbosity, out_dir: &Path) -> String {
    let lesion = match &request.lesion_diameter {
        LesionDiameter::Scaled => "false".to_string(),
        LesionDiameter::Single(d) => num(*d),
        LesionDiameter::Multiple(ds) => format!(
            "[{}]",
            ds.iter().map(|d| num(*d)).collect::<Vec<_>>().join(" ")
        ),
    };

    // 参数顺序与 ct_sim.m 的签名一致（注意 sdd 在 sid 之前）
    let args = [
        quote(request.phantom.name()),
        num(request.patient_diameter),
        num(request.reference_diameter),
        lesion,
        num(request.i0),
        request.ndetectors.to_string(),
        request.nangles.to_string(),
        num(request.detector_size),
        num(request.sdd),
        num(request.sid),
        num(request.detector_offset),
        request.down_sampling.to_string(),
        boolean(request.has_bowtie),
        boolean(request.add_noise),
        boolean(request.aec_on),
        request.matrix_size.to_string(),
        num(request.fov),
        quote(&request.kernel),
        request.nsims.to_string(),
    ];

    let mut script = String::from(
        "1;\n\
         function dump_volume(vol, fname)\n\
         \x20 if ndims(vol) == 2\n\
         \x20   vol = reshape(vol, [1 size(vol)]);\n\
         \x20 end\n\
         \x20 fid = fopen(fname, 'w', 'ieee-le');\n\
         \x20 fwrite(fid, size(vol), 'uint32');\n\
         \x20 fwrite(fid, single(vol), 'single');\n\
         \x20 fclose(fid);\n\
         end\n\n",
    );
    script.push_str(&format!(
        "res = {}({});\n",
        verbosity.entry_point(),
        args.join(", ")
    ));
    for (field, file_name) in OUTPUT_VOLUMES {
        script.push_str(&format!(
            "dump_volume(res.{}, {});\n",
            field,
            quote(&out_dir.join(file_name).to_string_lossy())
        ));
    }
    script
}

/// 读取交换文件
async fn read_volume(path: &Path, name: &'static str) -> AppResult<Volume> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::file_read_failed(path, e))?;
    decode_volume(&bytes, name)
}

fn decode_volume(bytes: &[u8], name: &'static str) -> AppResult<Volume> {
    let malformed = |detail: String| -> AppError {
        SimulationError::MalformedOutput {
            volume: name,
            detail,
        }
        .into()
    };

    if bytes.len() < 12 {
        return Err(malformed(format!("文件长度 {} 不足以包含维度信息", bytes.len())));
    }

    let (header, payload) = bytes.split_at(12);
    let dims: Vec<usize> = header
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]) as usize)
        .collect();
    let expected = dims
        .iter()
        .try_fold(4usize, |bytes, &dim| bytes.checked_mul(dim))
        .ok_or_else(|| malformed(format!("维度 {:?} 的数据量超出可寻址范围", dims)))?;
    if payload.len() != expected {
        return Err(malformed(format!(
            "维度 {:?} 需要 {} 字节，实际 {} 字节",
            dims,
            expected,
            payload.len()
        )));
    }

    let values: Vec<f32> = payload
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    let data = Array3::from_shape_vec((dims[0], dims[1], dims[2]).f(), values)
        .map_err(|e| malformed(e.to_string()))?;

    Ok(Volume::new(data))
}

fn num(value: f64) -> String {
    format!("{:?}", value)
}

fn boolean(value: bool) -> String {
    value.to_string()
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::phantom::Phantom;

    fn request() -> SimulationRequest {
        SimulationRequest {
            phantom: Phantom::Cct189,
            patient_diameter: 112.0,
            reference_diameter: 200.0,
            reference_fov: 340.0,
            lesion_diameter: LesionDiameter::Multiple(vec![10.0, 7.0, 5.0, 3.0]),
            i0: 3e5,
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
            fov: 123.2,
            kernel: "hanning,2.05".to_string(),
            nsims: 2,
        }
    }

    #[test]
    fn test_script_calls_selected_entry_point_with_ordered_args() {
        let script = render_script(&request(), Verbosity::Quiet, Path::new("/tmp/x"));
        assert!(script.contains(
            "res = ct_sim_quiet('CCT189', 112.0, 200.0, [10.0 7.0 5.0 3.0], 300000.0, 900, 580, \
             1.0, 1085.6, 595.0, 1.25, 1, false, true, true, 512, 123.2, 'hanning,2.05', 2);"
        ));
        assert!(script.contains("dump_volume(res.ground_truth, '/tmp/x/ground_truth.bin');"));

        let verbose = render_script(&request(), Verbosity::Verbose, Path::new("/tmp/x"));
        assert!(verbose.contains("res = ct_sim('CCT189'"));
    }

    #[test]
    fn test_scaled_lesion_is_passed_as_false() {
        let mut request = request();
        request.lesion_diameter = LesionDiameter::Scaled;
        let script = render_script(&request, Verbosity::Quiet, Path::new("/tmp"));
        assert!(script.contains("200.0, false, 300000.0"));
    }

    #[test]
    fn test_decode_volume_reads_column_major_data() {
        // 维度 2 x 2 x 1，列主序 [a(0,0), a(1,0), a(0,1), a(1,1)]
        let mut bytes = Vec::new();
        for d in [2u32, 2, 1] {
            bytes.extend_from_slice(&d.to_le_bytes());
        }
        for v in [1.0f32, 2.0, 3.0, 4.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }

        let volume = decode_volume(&bytes, "recon").unwrap();
        assert_eq!(volume.num_slices(), 2);
        assert_eq!(volume.rows(), 2);
        assert_eq!(volume.columns(), 1);
        assert_eq!(volume.data()[[1, 0, 0]], 2.0);
        assert_eq!(volume.data()[[0, 1, 0]], 3.0);
    }

    #[test]
    fn test_decode_volume_rejects_truncated_payload() {
        let mut bytes = Vec::new();
        for d in [2u32, 2, 2] {
            bytes.extend_from_slice(&d.to_le_bytes());
        }
        bytes.extend_from_slice(&1.0f32.to_le_bytes());
        assert!(matches!(
            decode_volume(&bytes, "recon").unwrap_err(),
            AppError::Simulation(SimulationError::MalformedOutput { .. })
        ));
    }

    #[test]
    fn test_decode_volume_rejects_oversized_dimensions() {
        let mut bytes = Vec::new();
        for d in [u32::MAX; 3] {
            bytes.extend_from_slice(&d.to_le_bytes());
        }
        bytes.extend_from_slice(&1.0f32.to_le_bytes());
        assert!(matches!(
            decode_volume(&bytes, "ground_truth").unwrap_err(),
            AppError::Simulation(SimulationError::MalformedOutput {
                volume: "ground_truth",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_failure() {
        let simulator = OctaveSimulator::new("definitely-not-an-octave-binary", ".");
        let err = simulator
            .simulate(&request(), Verbosity::Quiet)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Simulation(SimulationError::SpawnFailed { .. })
        ));
    }
}
