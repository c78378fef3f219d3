use thiserror::Error;

use crate::render::RenderError;

/// CLI-level error categories.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] chainheat_core::ValidationError),

    #[error(transparent)]
    Fetch(#[from] chainheat_core::FetchError),

    #[error(transparent)]
    Cache(#[from] chainheat_core::CacheError),

    #[error(transparent)]
    Grid(#[from] chainheat_core::GridError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Every failure exits 1; the category is conveyed by the message.
    pub const fn exit_code(&self) -> i32 {
        1
    }
}
