//! Repository layer: one unit struct per table, all methods take a pool
//! or connection explicitly.

pub mod person_repo;
pub mod pipeline_run_repo;
pub mod step_execution_repo;

pub use person_repo::PersonRepo;
pub use pipeline_run_repo::PipelineRunRepo;
pub use step_execution_repo::StepExecutionRepo;
