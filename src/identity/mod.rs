//! 标识生成（能力层）
//!
//! - `naming` - 患者 / 研究 / 序列名称以及目录命名
//! - `uid` - Study / Series / SOP Instance UID，并检查批次内唯一性

pub mod naming;
pub mod uid;

pub use naming::{series_identity, IdentityNumbers, NameOverrides};
pub use uid::{IdentityGenerator, IdentityKey, IdentityTriple, DEFAULT_UID_ROOT};
