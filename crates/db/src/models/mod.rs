pub mod person;
pub mod pipeline_run;
pub mod step_execution;
