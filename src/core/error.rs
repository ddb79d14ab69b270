use thiserror::Error;

/// Failures the extraction pipeline distinguishes between.
///
/// None of these abort a batch: the pipeline logs them and downgrades the affected
/// page or table to "no data".
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("`{command}` is not installed or not on PATH")]
    ToolMissing { command: String },

    #[error("`{command}` exited with {status}: {stderr}")]
    ToolFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("table {table} has no usable grid: {reason}")]
    Structure { table: usize, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}
