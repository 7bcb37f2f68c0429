pub mod loaders;
pub mod parameters;
pub mod phantom;
pub mod record;
pub mod volume;

pub use loaders::{load_batch_requests, parse_batch_requests, BatchRequest};
pub use parameters::{LesionDiameter, ParameterSet, SeriesIdentity, SimulationSettings};
pub use phantom::Phantom;
pub use record::{BatchRecord, PediatricSubgroup, SeriesKind};
pub use volume::{SimulationOutput, Volume};
