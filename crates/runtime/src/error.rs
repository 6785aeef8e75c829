use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Model(#[from] crate::model::ModelError),

    #[error(transparent)]
    Tool(#[from] crate::tools::ToolError),
}

pub type Result<T> = std::result::Result<T, Error>;
