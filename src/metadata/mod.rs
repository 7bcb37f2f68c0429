//! 元数据提取
//!
//! - `age_curve`: 年龄与有效直径的换算、儿科分组
//! - `extractor`: 从已写出的文件还原元数据
//! - `table`: 元数据表及 CSV 输出

pub mod age_curve;
pub mod extractor;
pub mod table;

pub use age_curve::{age_to_eff_diameter, pediatric_subgroup, subgroup_to_age};
pub use extractor::{classify_path, extract_record, PathClassification};
pub use table::{metadata_path, MetadataTable, METADATA_FILE_NAME};
