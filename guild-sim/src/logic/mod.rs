pub mod policy;
pub mod reports;
pub mod seeds;
pub mod simulation;
pub mod storage;

pub use policy::GameplayStrategy;
pub use reports::{StrategyAggregate, aggregate_runs};
pub use seeds::{resolve_seeds, split_csv};
pub use simulation::{
    DEFAULT_MAX_DAYS, RunRecord, RunStats, SimulationConfig, load_slot, new_session,
    resume_session, run_slot, simulate,
};
pub use storage::FileStorage;
