pub mod config;
pub mod driver;

pub use config::{ModeSpec, ServerConfig, WorldSpec};
pub use driver::{run, RunSummary, SummarySink, WorldSummary};
