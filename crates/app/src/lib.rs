pub mod pipeline;

pub use pipeline::{BillPipeline, PipelineError};
