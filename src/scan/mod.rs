//! Rule execution and result aggregation.

pub mod manager;
pub mod report;
pub mod result;

pub use manager::{EngineSettings, RuleFailure, ScanManager, ScanOutcome};
pub use report::{metrics, Metric, SeverityCounts};
pub use result::{interpolate, ResultRecord, ScanResult};
