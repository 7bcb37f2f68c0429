//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量仿真的流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量仿真处理器
//! - 校验一个 `[[simulation]]` 分组
//! - 遍历体模 × 直径
//! - 汇总写出的文件并生成 `metadata.csv`
//! - 输出统计信息
//!
//! ### `combination_processor` - 单个组合处理器
//! - 对一个 (体模, 直径) 组合做剂量扫描
//! - 派生无噪声和真值变体
//! - 分配序列号
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 体模 × 直径)
//!     ↓
//! combination_processor (处理 剂量扫描 + 辅助变体)
//!     ↓
//! simulation::SimulationInvoker / persist::DicomPersister
//!     ↓
//! simulation::CtSimulator (外部仿真器)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：batch_processor 管批量，combination_processor 管单个组合
//! 2. **严格串行**：外部仿真器不可重入，每次调用都等待完成
//! 3. **向下依赖**：编排层 → simulation / persist → models

pub mod batch_processor;
pub mod combination_processor;

// 重新导出主要类型
pub use batch_processor::BatchOrchestrator;
pub use combination_processor::{Combination, CombinationProcessor, DoseSweep};
