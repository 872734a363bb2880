//! The two-step generate-and-load pipeline.
//!
//! [`external_step::ExternalJobStep`] launches a workload on the cluster and
//! waits for its terminal status; [`load::ChunkedLoadStep`] reads the file
//! that workload produced and inserts it in chunks. The
//! [`orchestrator::PipelineOrchestrator`] sequences the two and records
//! outcomes through a [`repository::JobRepository`].

pub mod external_step;
pub mod load;
pub mod orchestrator;
pub mod repository;
