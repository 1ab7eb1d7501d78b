use std::fmt;

#[derive(Debug)]
pub enum GalleyError {
    Renderer(Box<dyn std::error::Error + Send + Sync>),
    ImageEncode(String),
    GateTimeout { waited_ms: u64 },
    Cancelled,
    InvalidConfiguration(String),
    Io(std::io::Error),
}

impl fmt::Display for GalleyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GalleyError::Renderer(err) => write!(f, "renderer error: {}", err),
            GalleyError::ImageEncode(message) => {
                write!(f, "image re-encode failed: {}", message)
            }
            GalleyError::GateTimeout { waited_ms } => {
                write!(f, "image load gate did not settle after {}ms", waited_ms)
            }
            GalleyError::Cancelled => write!(f, "translation pass cancelled"),
            GalleyError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            GalleyError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for GalleyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GalleyError::Renderer(err) => Some(err.as_ref()),
            GalleyError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GalleyError {
    fn from(value: std::io::Error) -> Self {
        GalleyError::Io(value)
    }
}
