pub mod logger;

pub use logger::{log_summary, ReportLogger};
