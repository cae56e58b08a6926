pub mod audit;
pub mod deadline;
pub mod determinism;
pub mod incident;
pub mod report;
pub mod taxonomy;
pub mod validation;

pub mod error;
