use std::error::Error;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;

#[derive(Debug, Clone)]
pub enum CatalogError {
    AllMirrorsFailed(String),
    Http(String, String),
    Decode(String, String),
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match *self {
            CatalogError::AllMirrorsFailed(ref path) => write!(f, "Radio Browser fetch failed for path: {}", path),
            CatalogError::Http(ref url, ref v) => write!(f, "HttpError '{}': {}", url, v),
            CatalogError::Decode(ref url, ref v) => write!(f, "DecodeError '{}': {}", url, v),
        }
    }
}

impl Error for CatalogError {}
