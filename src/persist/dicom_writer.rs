//! DICOM 写入服务 - 业务能力层
//!
//! 只负责"把一个体数据写成逐切片的 DICOM 文件"，不关心批处理流程

use crate::error::{AppError, AppResult};
use crate::identity::naming::format_cm;
use crate::identity::{IdentityGenerator, IdentityKey, IdentityTriple};
use crate::models::parameters::ParameterSet;
use crate::models::record::SeriesKind;
use crate::models::volume::Volume;
use crate::persist::geometry::{format_ds, slice_path, SliceGeometry};
use crate::persist::side_record::SideRecord;
use dicom_core::{DataElement, PrimitiveValue, Tag, VR};
use dicom_dictionary_std::{tags, uids};
use dicom_object::meta::FileMetaTableBuilder;
use dicom_object::InMemDicomObject;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MANUFACTURER: &str = "Siemens (simulated)";
pub const MANUFACTURER_MODEL_NAME: &str = "Definition AS+ (simulated)";
pub const INSTITUTION_NAME: &str = "FDA/CDRH/OSEL/DIDSR";
/// `ImageComments` 中有效直径的前缀
pub const DIAMETER_COMMENT_PREFIX: &str = "effective diameter [cm]";
pub const RESCALE_INTERCEPT: i16 = -1024;
const KVP: &str = "120";

/// DICOM 写入服务
///
/// 职责：
/// - 每张切片签发一个新的 SOP Instance UID
/// - 计算切片几何信息
/// - 递归创建输出目录，逐切片写出文件和附属记录
/// - 失败时不清理已写出的文件
#[derive(Debug, Clone, Default)]
pub struct DicomPersister;

impl DicomPersister {
    pub fn new() -> Self {
        Self
    }

    /// 写出一个序列
    ///
    /// # 参数
    /// - `volume`: 待写出的体数据，第 0 轴为切片
    /// - `params`: 生成该体数据的参数集
    /// - `kind`: 序列类型，写入附属记录
    /// - `identities`: 本批次的 UID 生成器
    /// - `target`: 目标文件路径，多切片时自动追加 `_NNN`
    ///
    /// # 返回
    /// 按切片顺序返回写出的文件路径
    pub async fn write_series(
        &self,
        volume: &Volume,
        params: &ParameterSet,
        kind: SeriesKind,
        identities: &mut IdentityGenerator,
        target: &Path,
    ) -> AppResult<Vec<PathBuf>> {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::directory_create_failed(parent, e))?;
        }

        let rows = volume.rows();
        let columns = volume.columns();
        let num_slices = volume.num_slices();
        let header = series_header(params, rows, columns);
        let identity = params.identity();

        let mut written = Vec::with_capacity(num_slices);
        for slice_index in 0..num_slices {
            let triple = identities.issue(IdentityKey {
                study_id: identity.study_id,
                series_id: identity.series_id,
                slice_index: slice_index as u32,
            })?;
            let geometry = SliceGeometry::for_slice(params, rows, columns, slice_index);
            let path = slice_path(target, slice_index, num_slices);

            let mut object = header.clone();
            put_slice(&mut object, &triple, &geometry, slice_index);
            put_pixels(&mut object, volume, slice_index);
            write_object(object, &triple, &path).await?;

            SideRecord {
                params: params.clone(),
                series: kind,
                slice_index: slice_index as u32,
                sop_instance_uid: triple.sop_instance_uid,
            }
            .write(&path)
            .await?;

            debug!("写出切片 {}/{}: {}", slice_index + 1, num_slices, path.display());
            written.push(path);
        }

        Ok(written)
    }
}

/// 同一序列所有切片共享的头信息
fn series_header(params: &ParameterSet, rows: usize, columns: usize) -> InMemDicomObject {
    let settings = params.settings();
    let identity = params.identity();
    let now = chrono::Local::now();
    let date = now.format("%Y%m%d").to_string();
    let time = now.format("%H%M%S").to_string();
    let spacing = params.pixel_spacing_mm();

    let mut obj = InMemDicomObject::new_empty();
    put(&mut obj, tags::SOP_CLASS_UID, VR::UI, uids::CT_IMAGE_STORAGE);
    put(&mut obj, tags::MODALITY, VR::CS, "CT");
    put(&mut obj, tags::MANUFACTURER, VR::LO, MANUFACTURER);
    put(&mut obj, tags::MANUFACTURER_MODEL_NAME, VR::LO, MANUFACTURER_MODEL_NAME);
    put(&mut obj, tags::INSTITUTION_NAME, VR::LO, INSTITUTION_NAME);
    put(&mut obj, tags::INSTANCE_CREATION_DATE, VR::DA, date.as_str());
    put(&mut obj, tags::INSTANCE_CREATION_TIME, VR::TM, time.as_str());
    put(&mut obj, tags::STUDY_DATE, VR::DA, date.as_str());
    put(&mut obj, tags::STUDY_TIME, VR::TM, time.as_str());

    put(&mut obj, tags::PATIENT_NAME, VR::PN, identity.patient_name.as_str());
    put(&mut obj, tags::PATIENT_ID, VR::LO, format!("{:03}", identity.patient_id));
    put(&mut obj, tags::PATIENT_AGE, VR::AS, format!("{:03}Y", settings.age.max(0.0) as u32));
    put(
        &mut obj,
        tags::IMAGE_COMMENTS,
        VR::LT,
        format!("{}: {}", DIAMETER_COMMENT_PREFIX, format_cm(params.patient_diameter_mm())),
    );
    put(
        &mut obj,
        tags::STUDY_DESCRIPTION,
        VR::LO,
        format!(
            "{:?} photons {} {}",
            params.i0(),
            identity.series_name,
            settings.fbp_kernel
        ),
    );
    put(&mut obj, tags::SERIES_DESCRIPTION, VR::LO, identity.series_name.as_str());
    put(&mut obj, tags::STUDY_ID, VR::SH, identity.study_id.to_string());
    put(&mut obj, tags::ACQUISITION_NUMBER, VR::IS, identity.study_id.to_string());
    put(&mut obj, tags::SERIES_NUMBER, VR::IS, identity.series_id.to_string());

    put(&mut obj, tags::SCAN_OPTIONS, VR::CS, "AXIAL MODE");
    put(&mut obj, tags::KVP, VR::DS, KVP);
    put(&mut obj, tags::RECONSTRUCTION_DIAMETER, VR::DS, format_ds(params.fov_mm()));
    put(&mut obj, tags::CONVOLUTION_KERNEL, VR::SH, settings.fbp_kernel.as_str());
    put(&mut obj, tags::EXPOSURE, VR::IS, format!("{}", params.i0().round() as i64));
    put(&mut obj, tags::DISTANCE_SOURCE_TO_DETECTOR, VR::DS, format_ds(settings.sdd));
    put(&mut obj, tags::DISTANCE_SOURCE_TO_PATIENT, VR::DS, format_ds(settings.sid));
    put(&mut obj, tags::SLICE_THICKNESS, VR::DS, format_ds(spacing));
    put(&mut obj, tags::SPACING_BETWEEN_SLICES, VR::DS, format_ds(spacing));
    put_ds(&mut obj, tags::PIXEL_SPACING, &[spacing, spacing]);
    put_ds(&mut obj, tags::IMAGE_ORIENTATION_PATIENT, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);

    put(&mut obj, tags::SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(1u16));
    put(&mut obj, tags::PHOTOMETRIC_INTERPRETATION, VR::CS, "MONOCHROME2");
    put(&mut obj, tags::ROWS, VR::US, PrimitiveValue::from(rows as u16));
    put(&mut obj, tags::COLUMNS, VR::US, PrimitiveValue::from(columns as u16));
    put(&mut obj, tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(16u16));
    put(&mut obj, tags::BITS_STORED, VR::US, PrimitiveValue::from(16u16));
    put(&mut obj, tags::HIGH_BIT, VR::US, PrimitiveValue::from(15u16));
    put(&mut obj, tags::PIXEL_REPRESENTATION, VR::US, PrimitiveValue::from(1u16));
    put(&mut obj, tags::RESCALE_INTERCEPT, VR::DS, RESCALE_INTERCEPT.to_string());
    put(&mut obj, tags::RESCALE_SLOPE, VR::DS, "1");
    obj
}

fn put_slice(
    obj: &mut InMemDicomObject,
    triple: &IdentityTriple,
    geometry: &SliceGeometry,
    slice_index: usize,
) {
    put(obj, tags::STUDY_INSTANCE_UID, VR::UI, triple.study_instance_uid.as_str());
    put(obj, tags::SERIES_INSTANCE_UID, VR::UI, triple.series_instance_uid.as_str());
    put(obj, tags::SOP_INSTANCE_UID, VR::UI, triple.sop_instance_uid.as_str());
    put(obj, tags::INSTANCE_NUMBER, VR::IS, (slice_index + 1).to_string());
    put(obj, tags::SLICE_LOCATION, VR::DS, format_ds(geometry.slice_location));
    put_ds(obj, tags::IMAGE_POSITION_PATIENT, &geometry.image_position);
}

/// 像素值截断为 16 位有符号整数后减去 rescale intercept
fn put_pixels(obj: &mut InMemDicomObject, volume: &Volume, slice_index: usize) {
    let pixels: Vec<u16> = volume
        .slice(slice_index)
        .iter()
        .map(|&v| (v as i16).saturating_sub(RESCALE_INTERCEPT) as u16)
        .collect();
    put(obj, tags::PIXEL_DATA, VR::OW, PrimitiveValue::U16(pixels.into()));
}

async fn write_object(object: InMemDicomObject, triple: &IdentityTriple, path: &Path) -> AppResult<()> {
    let file = object
        .with_meta(
            FileMetaTableBuilder::new()
                .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
                .media_storage_sop_class_uid(uids::CT_IMAGE_STORAGE)
                .media_storage_sop_instance_uid(triple.sop_instance_uid.as_str()),
        )
        .map_err(|e| AppError::file_write_failed(path, e))?;

    let mut bytes = Vec::new();
    file.write_all(&mut bytes)
        .map_err(|e| AppError::file_write_failed(path, e))?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| AppError::file_write_failed(path, e))
}

fn put(obj: &mut InMemDicomObject, tag: Tag, vr: VR, value: impl Into<PrimitiveValue>) {
    obj.put(DataElement::new(tag, vr, value.into()));
}

fn put_ds(obj: &mut InMemDicomObject, tag: Tag, values: &[f64]) {
    let strs = values.iter().map(|v| format_ds(*v)).collect();
    put(obj, tag, VR::DS, PrimitiveValue::Strs(strs));
}
