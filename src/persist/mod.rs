//! 图像持久化
//!
//! 把仿真得到的体数据逐切片写成 DICOM 文件，并在旁边写出附属记录。

pub mod dicom_writer;
pub mod geometry;
pub mod side_record;

pub use dicom_writer::DicomPersister;
pub use geometry::SliceGeometry;
pub use side_record::SideRecord;
