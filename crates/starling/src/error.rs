#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Graph(#[from] starling_graph::Error),

    #[error("node was never added to the layout: {id}")]
    UnknownNode { id: String },

    #[error("invalid layout config: {message}")]
    InvalidConfig { message: String },

    #[error("invalid layout config JSON: {0}")]
    ConfigJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
