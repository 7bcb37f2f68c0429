//! DICOM UID 生成
//!
//! UID 由结构化字段拼接而成：
//!
//! ```text
//! <root>.<salt>.1.<study>                    Study Instance UID
//! <root>.<salt>.2.<study>.<series>           Series Instance UID
//! <root>.<salt>.3.<study>.<series>.<slice>   SOP Instance UID
//! ```
//!
//! `salt` 区分不同批次；同一批次中每个 SOP Instance UID 只能签发一次。

use crate::error::{AppResult, IdentityError};
use std::collections::HashSet;

/// 默认 UID 根前缀
pub const DEFAULT_UID_ROOT: &str = "1.2.826.0.1.3680043.8.498";

/// DICOM UID 最大长度
pub const MAX_UID_LEN: usize = 64;

/// 定位一张切片所需的编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub study_id: u32,
    pub series_id: u32,
    pub slice_index: u32,
}

/// 一张切片的三级 UID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityTriple {
    pub study_instance_uid: String,
    pub series_instance_uid: String,
    /// 同时用作文件头中的 MediaStorageSOPInstanceUID
    pub sop_instance_uid: String,
}

/// UID 生成器
#[derive(Debug, Clone)]
pub struct IdentityGenerator {
    root: String,
    salt: u64,
    issued: HashSet<String>,
}

impl IdentityGenerator {
    /// 创建生成器
    ///
    /// # 参数
    /// - `root`: 点分数字形式的根前缀
    /// - `salt`: 批次盐值
    pub fn new(root: impl Into<String>, salt: u64) -> AppResult<Self> {
        let root = root.into();
        if !is_valid_root(&root) {
            return Err(IdentityError::InvalidRoot { root }.into());
        }
        Ok(Self {
            root,
            salt,
            issued: HashSet::new(),
        })
    }

    /// 以当前时间 `YYYYMMDDHHMMSS` 作为盐值
    pub fn with_timestamp_salt(root: impl Into<String>) -> AppResult<Self> {
        Self::new(root, timestamp_salt())
    }

    pub fn salt(&self) -> u64 {
        self.salt
    }

    /// 已签发的 SOP Instance UID 数量
    pub fn issued_count(&self) -> usize {
        self.issued.len()
    }

    /// 计算 UID，不登记（相同输入总是得到相同结果）
    pub fn derive(&self, key: IdentityKey) -> AppResult<IdentityTriple> {
        let prefix = format!("{}.{}", self.root, self.salt);
        let triple = IdentityTriple {
            study_instance_uid: checked(format!("{}.1.{}", prefix, key.study_id))?,
            series_instance_uid: checked(format!(
                "{}.2.{}.{}",
                prefix, key.study_id, key.series_id
            ))?,
            sop_instance_uid: checked(format!(
                "{}.3.{}.{}.{}",
                prefix, key.study_id, key.series_id, key.slice_index
            ))?,
        };
        Ok(triple)
    }

    /// 计算并登记 UID；同一批次中重复签发同一个 SOP Instance UID 时报错
    pub fn issue(&mut self, key: IdentityKey) -> AppResult<IdentityTriple> {
        let triple = self.derive(key)?;
        if !self.issued.insert(triple.sop_instance_uid.clone()) {
            return Err(IdentityError::DuplicateInstanceUid {
                uid: triple.sop_instance_uid,
            }
            .into());
        }
        Ok(triple)
    }
}

/// 当前时间戳盐值
pub fn timestamp_salt() -> u64 {
    chrono::Local::now()
        .format("%Y%m%d%H%M%S")
        .to_string()
        .parse()
        .unwrap_or_default()
}

fn checked(uid: String) -> AppResult<String> {
    if uid.len() > MAX_UID_LEN {
        let len = uid.len();
        return Err(IdentityError::UidTooLong { uid, len }.into());
    }
    Ok(uid)
}

// 每段都是不带前导零的十进制数
fn is_valid_root(root: &str) -> bool {
    !root.is_empty()
        && root.split('.').all(|component| {
            !component.is_empty()
                && component.bytes().all(|b| b.is_ascii_digit())
                && (component == "0" || !component.starts_with('0'))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn generator() -> IdentityGenerator {
        IdentityGenerator::new(DEFAULT_UID_ROOT, 20260101120000).unwrap()
    }

    #[test]
    fn test_derive_is_idempotent() {
        let key = IdentityKey {
            study_id: 3,
            series_id: 12,
            slice_index: 7,
        };
        let a = generator().derive(key).unwrap();
        let b = generator().derive(key).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a.sop_instance_uid,
            "1.2.826.0.1.3680043.8.498.20260101120000.3.3.12.7"
        );
        assert_eq!(
            a.series_instance_uid,
            "1.2.826.0.1.3680043.8.498.20260101120000.2.3.12"
        );
        assert_eq!(a.study_instance_uid, "1.2.826.0.1.3680043.8.498.20260101120000.1.3");
    }

    #[test]
    fn test_instance_uids_are_pairwise_distinct() {
        let mut generator = generator();
        let mut seen = HashSet::new();
        for study_id in 0..5 {
            for series_id in 0..12 {
                for slice_index in 0..11 {
                    let triple = generator
                        .issue(IdentityKey {
                            study_id,
                            series_id,
                            slice_index,
                        })
                        .unwrap();
                    assert!(seen.insert(triple.sop_instance_uid));
                }
            }
        }
        assert_eq!(generator.issued_count(), 5 * 12 * 11);
    }

    #[test]
    fn test_reissuing_same_key_fails_fast() {
        let mut generator = generator();
        let key = IdentityKey {
            study_id: 0,
            series_id: 1,
            slice_index: 0,
        };
        generator.issue(key).unwrap();
        let err = generator.issue(key).unwrap_err();
        assert!(matches!(
            err,
            AppError::Identity(IdentityError::DuplicateInstanceUid { .. })
        ));
    }

    #[test]
    fn test_invalid_root_is_rejected() {
        for root in ["", "1..2", "1.02", "1.2.a"] {
            assert!(IdentityGenerator::new(root, 1).is_err());
        }
    }

    #[test]
    fn test_overlong_uid_is_rejected() {
        let root = "1.2.3.4.5.6.7.8.9.10.11.12.13.14.15.16.17.18.19.20.21.22.23.24.25";
        let generator = IdentityGenerator::new(root, 20260101120000).unwrap();
        let err = generator
            .derive(IdentityKey {
                study_id: 1,
                series_id: 1,
                slice_index: 1,
            })
            .unwrap_err();
        assert!(matches!(err, AppError::Identity(IdentityError::UidTooLong { .. })));
    }
}
