//! 元数据提取
//!
//! 从已写出的 DICOM 文件还原出元数据表中的一行。
//! 体模和有效直径优先取自附属记录，缺失时才解析 `PatientName` / `ImageComments`。

use crate::error::{AppError, AppResult, ParseError};
use crate::metadata::age_curve::{pediatric_subgroup, subgroup_to_age};
use crate::models::record::{BatchRecord, SeriesKind};
use crate::persist::side_record::SideRecord;
use dicom_core::Tag;
use dicom_dictionary_std::tags;
use dicom_object::{open_file, DefaultDicomObject};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static DOSE_DIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^dose_(\d+)$").expect("valid regex"));
static REPEAT_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(\d{3})$").expect("valid regex"));

const SIMULATED_MARKER: &str = "(simulated)";
const RECON: &str = "fbp";

/// 由文件路径得到的序列信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathClassification {
    pub series: SeriesKind,
    pub dose_percent: Option<u32>,
    pub repeat: u32,
}

/// 按文件名和目录名判断序列类型
///
/// - 文件名以 `noisefree` 结尾：无噪声序列
/// - 文件名以 `groundtruth` 结尾：真值序列
/// - 其他：仿真序列，剂量取自 `dose_NNN` 目录，重复编号取自 `_NNN` 后缀（没有时为 0）
pub fn classify_path(path: &Path) -> AppResult<PathClassification> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| unrecognized(path))?;

    if stem.ends_with("noisefree") {
        return Ok(PathClassification {
            series: SeriesKind::NoiseFree,
            dose_percent: None,
            repeat: 0,
        });
    }
    if stem.ends_with("groundtruth") {
        return Ok(PathClassification {
            series: SeriesKind::GroundTruth,
            dose_percent: None,
            repeat: 0,
        });
    }

    let dose_percent = path
        .parent()
        .into_iter()
        .flat_map(|parent| parent.components())
        .filter_map(|component| {
            let name = component.as_os_str().to_string_lossy();
            DOSE_DIR_RE
                .captures(&name)
                .and_then(|caps| caps[1].parse::<u32>().ok())
        })
        .last()
        .ok_or_else(|| unrecognized(path))?;

    let repeat = REPEAT_SUFFIX_RE
        .captures(&stem)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0);

    Ok(PathClassification {
        series: SeriesKind::Simulation,
        dose_percent: Some(dose_percent),
        repeat,
    })
}

/// 从一个已写出的文件提取元数据
pub fn extract_record(path: &Path) -> AppResult<BatchRecord> {
    let classification = classify_path(path)?;
    let obj = open_file(path).map_err(|e| AppError::file_read_failed(path, e))?;

    let patient_name = text(&obj, path, tags::PATIENT_NAME, "PatientName")?;
    let (phantom, diameter_cm) = match SideRecord::read(path)? {
        Some(record) => (
            record.params.phantom().name().to_string(),
            record.params.patient_diameter_mm() / 10.0,
        ),
        None => (
            phantom_from_patient_name(path, &patient_name)?,
            diameter_from_comments(
                path,
                &text(&obj, path, tags::IMAGE_COMMENTS, "ImageComments")?,
            )?,
        ),
    };

    let subgroup = pediatric_subgroup(diameter_cm);
    let manufacturer = text(&obj, path, tags::MANUFACTURER, "Manufacturer")?;
    let model_name = text(&obj, path, tags::MANUFACTURER_MODEL_NAME, "ManufacturerModelName")?;
    let scanner = format!(
        "{}{}",
        manufacturer.split(SIMULATED_MARKER).next().unwrap_or_default(),
        model_name
    );

    let pixel_spacing = obj
        .element(tags::PIXEL_SPACING)
        .map_err(|_| AppError::missing_field(path, "PixelSpacing"))?
        .to_multi_float64()
        .map_err(|e| AppError::malformed_field(path, "PixelSpacing", e.to_string()))?;
    let spacing = pixel_spacing
        .first()
        .copied()
        .ok_or_else(|| AppError::malformed_field(path, "PixelSpacing", ""))?;
    let rows: u16 = obj
        .element(tags::ROWS)
        .map_err(|_| AppError::missing_field(path, "Rows"))?
        .to_int()
        .map_err(|e| AppError::malformed_field(path, "Rows", e.to_string()))?;

    Ok(BatchRecord {
        name: patient_name,
        patient_id: text(&obj, path, tags::PATIENT_ID, "PatientID")?,
        study_name: text(&obj, path, tags::STUDY_DESCRIPTION, "StudyDescription")?,
        study_id: text(&obj, path, tags::STUDY_ID, "StudyID")?,
        series: classification.series,
        effective_diameter_cm: diameter_cm,
        age_years: subgroup_to_age(subgroup),
        pediatric_subgroup: subgroup,
        phantom,
        scanner,
        dose_percent: classification.dose_percent,
        recon: RECON.to_string(),
        kernel: text(&obj, path, tags::CONVOLUTION_KERNEL, "ConvolutionKernel")?,
        fov_cm: spacing * f64::from(rows) / 10.0,
        repeat: classification.repeat,
        file: path.to_path_buf(),
    })
}

/// `"11.2 cm CCT189"` → `"CCT189"`
fn phantom_from_patient_name(path: &Path, patient_name: &str) -> AppResult<String> {
    patient_name
        .split_once("cm")
        .map(|(_, phantom)| phantom.trim().to_string())
        .filter(|phantom| !phantom.is_empty())
        .ok_or_else(|| AppError::malformed_field(path, "PatientName", patient_name))
}

/// `"effective diameter [cm]: 11.2"` → `11.2`
fn diameter_from_comments(path: &Path, comments: &str) -> AppResult<f64> {
    comments
        .split_once(':')
        .and_then(|(_, value)| value.trim().parse().ok())
        .ok_or_else(|| AppError::malformed_field(path, "ImageComments", comments))
}

fn text(obj: &DefaultDicomObject, path: &Path, tag: Tag, field: &'static str) -> AppResult<String> {
    let element = obj
        .element(tag)
        .map_err(|_| AppError::missing_field(path, field))?;
    let value = element
        .to_str()
        .map_err(|e| AppError::malformed_field(path, field, e.to_string()))?;
    Ok(value.trim_end_matches(['\0', ' ']).trim().to_string())
}

fn unrecognized(path: &Path) -> AppError {
    ParseError::UnrecognizedFileName {
        path: path.to_path_buf(),
    }
    .into()
}
