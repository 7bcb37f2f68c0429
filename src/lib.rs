//! # Pediatric IQ Phantoms
//!
//! 生成儿科 CT 图像质量体模数据集：对体模 × 直径 × 剂量的每个组合运行 CT 仿真，
//! 把结果写成 DICOM 文件，并汇总为 `metadata.csv`。
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 数据模型层（Models）
//! - `models/` - 体模、参数集、体数据、元数据行以及 TOML 分组加载
//! - `ParameterSet` - 构造后不可变，变体通过 `derive_*` 显式派生
//!
//! ### ② 业务能力层（Capabilities）
//! - `identity/` - 患者 / 研究 / 序列命名与 UID 生成
//! - `simulation/` - 外部仿真器接口、调用器与 Octave 实现
//! - `persist/` - 逐切片写出 DICOM 文件与附属记录
//! - `metadata/` - 从已写出的文件还原元数据，年龄与直径换算
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 一个分组的批量仿真，生成元数据表
//! - `orchestrator/combination_processor` - 单个 (体模, 直径) 组合的剂量扫描与辅助变体
//!
//! ### ④ 入口（Binary）
//! - `main.rs` - 命令行参数、日志初始化、逐个分组运行
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod identity;
pub mod metadata;
pub mod models;
pub mod orchestrator;
pub mod persist;
pub mod simulation;
pub mod utils;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use metadata::MetadataTable;
pub use models::{BatchRecord, BatchRequest, ParameterSet, Phantom, SeriesKind};
pub use orchestrator::BatchOrchestrator;
pub use simulation::{CtSimulator, OctaveSimulator, SimulationInvoker};
