//! 切片几何与文件命名

use crate::models::parameters::ParameterSet;
use std::path::{Path, PathBuf};

/// DS (Decimal String) 最大长度
const DS_MAX_LEN: usize = 16;

/// 单张切片的空间位置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceGeometry {
    /// 像素间距 (mm)，行列相同
    pub pixel_spacing: f64,
    /// 层厚 (mm)，等于像素间距
    pub slice_thickness: f64,
    pub slice_location: f64,
    pub image_position: [f64; 3],
}

impl SliceGeometry {
    /// 计算第 `slice_index` 张切片的几何信息
    ///
    /// 层位置从 `nsims / 2` 个层厚处开始逐层递增；
    /// 图像左上角位于 `(-rows / 2, -cols / 2)` 个像素处（向下取整）。
    pub fn for_slice(params: &ParameterSet, rows: usize, columns: usize, slice_index: usize) -> Self {
        let pixel_spacing = params.pixel_spacing_mm();
        let thickness = pixel_spacing;
        let slice_location =
            f64::from(params.nsims() / 2) * thickness + slice_index as f64 * thickness;

        Self {
            pixel_spacing,
            slice_thickness: thickness,
            slice_location,
            image_position: [
                (-(rows as i64)).div_euclid(2) as f64 * pixel_spacing,
                (-(columns as i64)).div_euclid(2) as f64 * pixel_spacing,
                slice_location,
            ],
        }
    }
}

/// 切片文件路径：多张切片时在文件名后追加 `_NNN`，单张时使用原路径
pub fn slice_path(target: &Path, slice_index: usize, num_slices: usize) -> PathBuf {
    if num_slices <= 1 {
        return target.to_path_buf();
    }

    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match target.extension() {
        Some(ext) => format!("{}_{:03}.{}", stem, slice_index, ext.to_string_lossy()),
        None => format!("{}_{:03}", stem, slice_index),
    };
    target.with_file_name(file_name)
}

/// 把浮点数格式化为不超过 16 个字符的 DS 值
pub fn format_ds(value: f64) -> String {
    let plain = format!("{}", value);
    if plain.len() <= DS_MAX_LEN {
        return plain;
    }

    for precision in (0..DS_MAX_LEN).rev() {
        let fixed = format!("{:.*}", precision, value);
        if fixed.len() <= DS_MAX_LEN {
            return trim_fraction(fixed);
        }
    }
    format!("{:.6e}", value)
}

fn trim_fraction(text: String) -> String {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}
