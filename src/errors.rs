use astra::Response;
use std::fmt;

/// Errors originating from the server logic (routing, missing resources),
/// downstream layers (DB, geometry), or a taxonomy violation in input data.
#[derive(Debug)]
pub enum ServerError {
    NotFound,
    BadRequest(String),
    DbError(String),
    /// An input category outside the canonical maps. Fatal for the run that
    /// hits it rather than a silent null in the statistics.
    Taxonomy(String),
    /// A polygon union that failed even after flattening the operands.
    Geometry(String),
    XlsxError(String),
    InternalError,
}

// Type alias commonly used by route handlers.
pub type ResultResp = Result<Response, ServerError>;

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::NotFound => write!(f, "Not Found"),
            ServerError::BadRequest(msg) => write!(f, "Bad Request: {msg}"),
            ServerError::DbError(msg) => write!(f, "Database Error: {msg}"),
            ServerError::Taxonomy(msg) => write!(f, "Taxonomy Violation: {msg}"),
            ServerError::Geometry(msg) => write!(f, "Geometry Error: {msg}"),
            ServerError::XlsxError(msg) => write!(f, "Spreadsheet Error: {msg}"),
            ServerError::InternalError => write!(f, "Internal Server Error"),
        }
    }
}

impl std::error::Error for ServerError {}
