//! Error types for the transformation pipeline.

/// Errors surfacing from a work transformation.
///
/// The first four variants mirror the factory's error taxonomy: markup the
/// pipeline does not know how to handle, elements without a renderer arm,
/// inconsistencies while building the node index, and request parameters
/// that map to no resource.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source tree violates a local expectation (e.g. `tei:g` without
    /// text, `tei:del` without a `tei:supplied` child).
    #[error("markup error: {0}")]
    Markup(String),

    /// Dispatch found no handler and the element is not on the pass-through
    /// allow-list.
    #[error("unknown element: tei:{0}")]
    UnknownElement(String),

    /// The index produced an inconsistent structure.
    #[error("node indexing error: {0}")]
    NodeIndexing(String),

    /// The supplied work id has no file mapping; no output is produced.
    #[error("no resource for request: {0}")]
    QueryValidation(String),

    /// An XInclude reference could not be expanded.
    #[error("could not expand XInclude: {0}")]
    XInclude(String),

    #[error("could not parse XML: {0}")]
    Parse(#[from] xot::ParseError),

    #[error("XML tree error: {0}")]
    Xml(#[from] xot::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a [`Error::Markup`] with a formatted message.
    pub fn markup(msg: impl Into<String>) -> Self {
        Error::Markup(msg.into())
    }
}
