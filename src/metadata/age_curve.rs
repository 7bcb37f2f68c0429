//! 年龄与有效直径
//!
//! 22 岁及以下使用 AAPM TG204 报告中的公式 A-3：
//!
//! ```text
//! d(a) = 18.788598 + 0.19486455·a^1.5 − 1.060056·a^0.5 − 7.6244784·e^(−a)   [cm]
//! ```
//!
//! 22 岁以上按年代查成人腰围参考表。

use crate::error::{AppResult, ParameterError};
use crate::models::record::PediatricSubgroup;
use phf::phf_map;

/// 成人腰围参考值 (cm)，键为年代（向下取整到 10 岁）
static ADULT_WAIST_CIRCUMFERENCES_CM: phf::Map<u32, f64> = phf_map! {
    30u32 => 99.9,
    40u32 => 102.8,
    60u32 => 106.2,
    70u32 => 106.6,
    80u32 => 104.1,
};

const PEDIATRIC_MAX_AGE: f64 = 22.0;

/// 年龄对应的有效直径 (cm)
///
/// 参考表只覆盖 30、40、60、70、80 年代，其余成人年龄返回错误。
pub fn age_to_eff_diameter(age: f64) -> AppResult<f64> {
    if age.is_nan() || age < 0.0 {
        return Err(ParameterError::AgeOutsideReferenceTable { age }.into());
    }
    if age <= PEDIATRIC_MAX_AGE {
        return Ok(pediatric_curve(age));
    }

    let decade = (age - age % 10.0) as u32;
    ADULT_WAIST_CIRCUMFERENCES_CM
        .get(&decade)
        .copied()
        .ok_or_else(|| ParameterError::AgeOutsideReferenceTable { age }.into())
}

/// 按有效直径 (cm) 划分儿科分组
///
/// 分界点为 1、5、12、22 岁对应的直径。
pub fn pediatric_subgroup(diameter_cm: f64) -> PediatricSubgroup {
    if diameter_cm < pediatric_curve(1.0) {
        PediatricSubgroup::Newborn
    } else if diameter_cm < pediatric_curve(5.0) {
        PediatricSubgroup::Infant
    } else if diameter_cm < pediatric_curve(12.0) {
        PediatricSubgroup::Child
    } else if diameter_cm < pediatric_curve(22.0) {
        PediatricSubgroup::Adolescent
    } else {
        PediatricSubgroup::Adult
    }
}

/// 分组的代表年龄（年）
pub fn subgroup_to_age(group: PediatricSubgroup) -> f64 {
    match group {
        PediatricSubgroup::Newborn => 1.0 / 12.0,
        PediatricSubgroup::Infant => 2.0,
        PediatricSubgroup::Child => 12.0,
        PediatricSubgroup::Adolescent => 21.0,
        PediatricSubgroup::Adult => 39.0,
    }
}

fn pediatric_curve(age: f64) -> f64 {
    const A: f64 = 18.788598;
    const B: f64 = 0.19486455;
    const C: f64 = -1.060056;
    const D: f64 = -7.6244784;
    A + B * age.powf(1.5) + C * age.sqrt() + D * (-age).exp()
}
