#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("link references a missing endpoint: {link_id}")]
    MissingEndpoint { link_id: String },
}

pub type Result<T> = std::result::Result<T, Error>;
