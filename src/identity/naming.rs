//! 命名规则
//!
//! 患者名、研究名、序列名以及输出目录的各级名称。

use crate::models::parameters::SeriesIdentity;
use crate::models::phantom::Phantom;

/// 可选的名称覆盖，未设置的名称按默认规则生成
#[derive(Debug, Clone, Default)]
pub struct NameOverrides {
    pub patient_name: Option<String>,
    pub study_name: Option<String>,
    pub series_name: Option<String>,
}

/// 序列的数字编号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityNumbers {
    pub patient_id: u32,
    pub study_id: u32,
    pub series_id: u32,
}

/// 生成序列标识
///
/// 默认规则：
/// - 患者名 `"<直径/10> cm <体模>"`
/// - 研究名 = 患者名
/// - 序列名 `"<患者名> I0: <I0>"`
pub fn series_identity(
    phantom: Phantom,
    patient_diameter_mm: f64,
    i0: f64,
    numbers: IdentityNumbers,
    overrides: &NameOverrides,
) -> SeriesIdentity {
    let patient_name = overrides
        .patient_name
        .clone()
        .unwrap_or_else(|| patient_name(phantom, patient_diameter_mm));
    let study_name = overrides
        .study_name
        .clone()
        .unwrap_or_else(|| patient_name.clone());
    let series_name = overrides
        .series_name
        .clone()
        .unwrap_or_else(|| format!("{} I0: {:?}", patient_name, i0));

    SeriesIdentity {
        patient_name,
        patient_id: numbers.patient_id,
        study_name,
        study_id: numbers.study_id,
        series_name,
        series_id: numbers.series_id,
    }
}

/// 患者名，例如 `11.2 cm CCT189`
pub fn patient_name(phantom: Phantom, patient_diameter_mm: f64) -> String {
    format!("{} cm {}", format_cm(patient_diameter_mm), phantom)
}

/// 剂量扫描中的研究名，例如 `55% dose`
pub fn dose_study_name(dose_percent: u32) -> String {
    format!("{}% dose", dose_percent)
}

/// 剂量扫描中的序列名，例如 `11.2 cm CCT189 55% dose`
pub fn dose_series_name(patient_name: &str, study_name: &str) -> String {
    format!("{} {}", patient_name, study_name)
}

/// 相对剂量百分比：`round(100 * dose / max_dose)`
pub fn relative_dose_percent(dose: f64, max_dose: f64) -> u32 {
    (100.0 * dose / max_dose).round() as u32
}

/// 直径目录名，例如 `diameter112mm`
pub fn diameter_dir(patient_diameter_mm: f64) -> String {
    format!("diameter{}mm", format_mm(patient_diameter_mm))
}

/// 剂量目录名，例如 `dose_055`
pub fn dose_dir(dose_percent: u32) -> String {
    format!("dose_{:03}", dose_percent)
}

/// 重建目录名：`fbp` 加上去掉逗号和小数点的卷积核，例如 `fbp hanning205`
pub fn recon_label(kernel: &str) -> String {
    format!("fbp {}", kernel.replace([',', '.'], ""))
}

/// 毫米转厘米，总是带小数部分（`20.0`、`11.2`）
pub fn format_cm(mm: f64) -> String {
    format!("{:?}", mm / 10.0)
}

/// 毫米数值，整数时不带小数部分
fn format_mm(mm: f64) -> String {
    if mm.fract() == 0.0 {
        format!("{}", mm as i64)
    } else {
        format!("{}", mm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers() -> IdentityNumbers {
        IdentityNumbers {
            patient_id: 2,
            study_id: 1,
            series_id: 9,
        }
    }

    #[test]
    fn test_default_names() {
        let identity =
            series_identity(Phantom::Cct189, 112.0, 3e5, numbers(), &NameOverrides::default());
        assert_eq!(identity.patient_name, "11.2 cm CCT189");
        assert_eq!(identity.study_name, "11.2 cm CCT189");
        assert_eq!(identity.series_name, "11.2 cm CCT189 I0: 300000.0");
        assert_eq!(identity.patient_id, 2);
        assert_eq!(identity.study_id, 1);
        assert_eq!(identity.series_id, 9);
    }

    #[test]
    fn test_overrides_take_precedence() {
        let overrides = NameOverrides {
            patient_name: None,
            study_name: Some(dose_study_name(55)),
            series_name: Some("custom".to_string()),
        };
        let identity = series_identity(Phantom::Ctp404, 200.0, 1.65e5, numbers(), &overrides);
        assert_eq!(identity.patient_name, "20.0 cm CTP404");
        assert_eq!(identity.study_name, "55% dose");
        assert_eq!(identity.series_name, "custom");
    }

    #[test]
    fn test_directory_names() {
        assert_eq!(diameter_dir(112.0), "diameter112mm");
        assert_eq!(diameter_dir(112.5), "diameter112.5mm");
        assert_eq!(dose_dir(100), "dose_100");
        assert_eq!(dose_dir(25), "dose_025");
        assert_eq!(recon_label("hanning,2.05"), "fbp hanning205");
    }

    #[test]
    fn test_relative_dose_percent_rounds() {
        assert_eq!(relative_dose_percent(3e5, 3e5), 100);
        assert_eq!(relative_dose_percent(0.55 * 3e5, 3e5), 55);
        assert_eq!(relative_dose_percent(0.104 * 3e5, 3e5), 10);
        assert_eq!(relative_dose_percent(0.106 * 3e5, 3e5), 11);
    }
}
