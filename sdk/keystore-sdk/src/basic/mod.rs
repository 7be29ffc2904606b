pub mod batch;
pub mod orchestrator;
pub mod wallet;
