use std::fmt;

#[derive(Debug)]
pub enum DocPressError {
    Decode(String),
    Asset(String),
    Layout(String),
    Pack(String),
    InvalidConfiguration(String),
    Io(std::io::Error),
}

impl fmt::Display for DocPressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocPressError::Decode(message) => write!(f, "decode error: {}", message),
            DocPressError::Asset(message) => write!(f, "asset error: {}", message),
            DocPressError::Layout(message) => write!(f, "layout error: {}", message),
            DocPressError::Pack(message) => write!(f, "pack error: {}", message),
            DocPressError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            DocPressError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for DocPressError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DocPressError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DocPressError {
    fn from(value: std::io::Error) -> Self {
        DocPressError::Io(value)
    }
}
