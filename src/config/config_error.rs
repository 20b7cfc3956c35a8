use std::error::Error;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;

#[derive(Debug, Clone)]
pub enum ConfigError {
    TypeError(String, String),
    InvalidValue(String, String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match *self {
            ConfigError::TypeError(ref field_name, ref field_value) => write!(f, "Value {} for field {} has wrong type", field_value, field_name),
            ConfigError::InvalidValue(ref field_name, ref reason) => write!(f, "Invalid value for field {}: {}", field_name, reason),
        }
    }
}

impl Error for ConfigError {}
