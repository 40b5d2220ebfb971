pub mod config;
pub mod error;
pub mod forms;
pub mod notify;
pub mod render;
pub mod storage;
pub mod submission;
pub mod telemetry;
