pub mod analysis;
pub mod binning;
pub mod config;
pub mod error;
pub mod impute;
pub mod loader;
pub mod metrics;
pub mod output;
pub mod pipeline;
pub mod range;
pub mod reader;
pub mod schema;
pub mod table;
pub mod temporal;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{CleaningReport, clean, run};
