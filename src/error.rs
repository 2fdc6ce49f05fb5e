//! An error from the ACI node provider
use reqwest::StatusCode;

/// An error from the provider
#[derive(Debug)]
pub enum Error {
    /// A pod spec could not be mapped into a valid container group
    Validation(String),
    /// A registry credential could not be resolved
    Auth(String),
    /// The Cloud Container Service rejected a request or could not be reached
    Remote(String),
    /// The requested container group does not exist
    NotFound(String),
    /// A generic error with a message
    Generic(String),
    /// An error from sending or receiving a request
    Reqwest(reqwest::Error),
    /// An IO error
    Io(std::io::Error),
    /// An error from parsing a timestamp
    ChronoParse(chrono::ParseError),
    /// An error from loading a config
    Config(config::ConfigError),
    /// An error from converting a value with serde
    Serde(serde_json::Error),
    /// An error decoding base64
    Base64(base64::DecodeError),
    /// An error from joining a tokio task
    Join(tokio::task::JoinError),
    /// An error converting bytes to a utf8 string
    StringFromUtf8(std::string::FromUtf8Error),
}

impl Error {
    /// Create a new generic error
    ///
    /// # Arguments
    ///
    /// * `msg` - The error message to set
    pub fn new<T: Into<String>>(msg: T) -> Self {
        Error::Generic(msg.into())
    }

    /// Build a validation error
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        Error::Validation(msg.into())
    }

    /// Build an auth error
    pub fn auth<T: Into<String>>(msg: T) -> Self {
        Error::Auth(msg.into())
    }

    /// Build a remote error
    pub fn remote<T: Into<String>>(msg: T) -> Self {
        Error::Remote(msg.into())
    }

    /// Build a not found error
    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        Error::NotFound(msg.into())
    }

    /// Get the status code from this error if one exists
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::NotFound(_) => Some(StatusCode::NOT_FOUND),
            Error::Reqwest(err) => err.status(),
            _ => None,
        }
    }

    /// Get the error message for this error if one exists
    pub fn msg(&self) -> Option<String> {
        match self {
            Error::Validation(msg) => Some(msg.clone()),
            Error::Auth(msg) => Some(msg.clone()),
            Error::Remote(msg) => Some(msg.clone()),
            Error::NotFound(msg) => Some(msg.clone()),
            Error::Generic(msg) => Some(msg.clone()),
            Error::Reqwest(err) => Some(err.to_string()),
            Error::Io(err) => Some(err.to_string()),
            Error::ChronoParse(err) => Some(err.to_string()),
            Error::Config(err) => Some(err.to_string()),
            Error::Serde(err) => Some(err.to_string()),
            Error::Base64(err) => Some(err.to_string()),
            Error::Join(err) => Some(err.to_string()),
            Error::StringFromUtf8(err) => Some(err.to_string()),
        }
    }

    /// Get the kind of error as a str
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "Validation",
            Error::Auth(_) => "Auth",
            Error::Remote(_) => "Remote",
            Error::NotFound(_) => "NotFound",
            Error::Generic(_) => "Generic",
            Error::Reqwest(_) => "Reqwest",
            Error::Io(_) => "Io",
            Error::ChronoParse(_) => "ChronoParse",
            Error::Config(_) => "Config",
            Error::Serde(_) => "Serde",
            Error::Base64(_) => "Base64",
            Error::Join(_) => "Join",
            Error::StringFromUtf8(_) => "StringFromUtf8",
        }
    }
}

impl std::fmt::Display for Error {
    /// display this error in an easy readable format
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match (self.status(), self.msg()) {
            (Some(code), Some(msg)) => write!(f, "Code: {} Error: {}", code, msg),
            (None, Some(msg)) => write!(f, "Error: {}", msg),
            (Some(code), None) => write!(f, "Code: {}", code),
            (None, None) => write!(f, "Kind: {}", self.kind()),
        }
    }
}

impl std::error::Error for Error {}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Error::Reqwest(error)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io(error)
    }
}

impl From<chrono::ParseError> for Error {
    fn from(error: chrono::ParseError) -> Self {
        Error::ChronoParse(error)
    }
}

impl From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Error::Config(error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Serde(error)
    }
}

impl From<base64::DecodeError> for Error {
    fn from(error: base64::DecodeError) -> Self {
        Error::Base64(error)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(error: tokio::task::JoinError) -> Self {
        Error::Join(error)
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(error: std::string::FromUtf8Error) -> Self {
        Error::StringFromUtf8(error)
    }
}
