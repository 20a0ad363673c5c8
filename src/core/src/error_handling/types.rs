use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    MissingField(String),
    BadUrl(String),
    BadAddress(String),
    NotInRange(String),
    PortConflict(u16),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::MissingField(e) => write!(f, "Missing configuration field: {}", e),
            ConfigError::BadUrl(e) => write!(f, "URL error: {}", e),
            ConfigError::BadAddress(e) => write!(f, "Address formatting error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
            ConfigError::PortConflict(p) => {
                write!(f, "Collector and web interface both bound to port {}", p)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

#[derive(Debug)]
pub enum NetworkError {
    BindError(std::io::Error),
    SockError(std::io::Error),
    ChannelFailed,
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::BindError(e) => write!(f, "Network bind error: {}", e),
            NetworkError::SockError(e) => write!(f, "Socket error: {}", e),
            NetworkError::ChannelFailed => write!(f, "Flow channel closed"),
        }
    }
}

impl std::error::Error for NetworkError {}

/// Failure to turn an export datagram into flow records.
#[derive(Debug)]
pub enum DecodeError {
    Empty,
    InvalidUtf8,
    Malformed(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Empty => write!(f, "Empty export packet"),
            DecodeError::InvalidUtf8 => write!(f, "Export packet is not valid UTF-8"),
            DecodeError::Malformed(e) => write!(f, "Malformed export packet: {}", e),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Failure of a single router poll. Never fatal, the next tick retries.
#[derive(Debug)]
pub enum PollError {
    Request(reqwest::Error),
    Status(u16),
    Body(reqwest::Error),
    Timeout,
}

impl fmt::Display for PollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollError::Request(e) => write!(f, "Router request failed: {}", e),
            PollError::Status(code) => write!(f, "Router answered with HTTP {}", code),
            PollError::Body(e) => write!(f, "Router response body unusable: {}", e),
            PollError::Timeout => write!(f, "Router poll timed out"),
        }
    }
}

impl std::error::Error for PollError {}

#[derive(Debug)]
pub enum WebError {
    BadAddress(String),
    BindFailed(std::io::Error),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::BadAddress(e) => write!(f, "Invalid web bind address: {}", e),
            WebError::BindFailed(e) => write!(f, "Web server bind failed: {}", e),
        }
    }
}

impl std::error::Error for WebError {}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    NetworkError(NetworkError),
    PollerError(PollError),
    WebError(WebError),
    InitializationFailed(String),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::NetworkError(e) => write!(f, "Network error: {}", e),
            ControllerError::PollerError(e) => write!(f, "Poller error: {}", e),
            ControllerError::WebError(e) => write!(f, "Web error: {}", e),
            ControllerError::InitializationFailed(e) => write!(f, "Initialization failed: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<NetworkError> for ControllerError {
    fn from(err: NetworkError) -> Self {
        ControllerError::NetworkError(err)
    }
}

impl From<PollError> for ControllerError {
    fn from(err: PollError) -> Self {
        ControllerError::PollerError(err)
    }
}

impl From<WebError> for ControllerError {
    fn from(err: WebError) -> Self {
        ControllerError::WebError(err)
    }
}
