use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("Model must be of type object")]
    InvalidModel,

    #[error(
        "Unknown tree walk strategy '{strategy}'. Valid strategies are 'pre' [default], 'post' and 'breadth'."
    )]
    UnknownStrategy { strategy: String },

    #[error("Invalid index: {index} (valid range is 0..{len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Cannot set child position explicitly when using a comparator function")]
    ComparatorConflict,

    #[error("Cannot attach a node to itself or to one of its descendants")]
    CyclicAttachment,

    #[error("config error: {message}")]
    Config { message: String },
}

pub type TreeResult<T> = Result<T, TreeError>;
