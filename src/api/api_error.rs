use std::error::Error;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;

#[derive(Debug, Clone)]
pub enum ApiError {
    BadRequest(String),
    InternalError(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match *self {
            ApiError::BadRequest(_) => 400,
            ApiError::InternalError(_) => 500,
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match *self {
            ApiError::BadRequest(ref v) => write!(f, "BadRequest '{}'", v),
            ApiError::InternalError(ref v) => write!(f, "InternalError '{}'", v),
        }
    }
}

impl Error for ApiError {}
