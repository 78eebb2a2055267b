/// Probe cycle orchestration task
pub mod cycle;
