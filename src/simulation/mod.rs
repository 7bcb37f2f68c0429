//! 仿真层
//!
//! - `simulator`: 外部仿真器接口
//! - `invoker`: 参数集到仿真器调用的适配
//! - `octave`: 基于 GNU Octave 子进程的实现

pub mod invoker;
pub mod octave;
pub mod simulator;

pub use invoker::SimulationInvoker;
pub use octave::OctaveSimulator;
pub use simulator::{CtSimulator, SimulationRequest, Verbosity};
