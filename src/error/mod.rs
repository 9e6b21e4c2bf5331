//! Error handling for the network diagnostics engine
//!
//! Two layers live here. [`AppError`] is the Rust error type returned by every
//! fallible library API. [`ErrorKind`] and [`DiagnosticError`] are the
//! serializable taxonomy carried inside diagnostic results, where network
//! failures are data rather than control flow.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of everything that can go wrong during a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed target or out-of-range parameter, detected before any probe
    #[serde(rename = "ValidationError")]
    Validation,
    /// Target name could not be turned into an address
    ResolutionFailed,
    /// Resolver confirmed the name does not exist
    NameNotFound,
    /// No response within the bound
    Timeout,
    /// Peer answered with a reset; a closed port, not a failure
    ConnectionRefused,
    /// Raw socket privilege unavailable
    PermissionDenied,
    /// Resolver could not be reached or answered with a server failure
    ResolverUnavailable,
    /// Address has no PTR record
    NoPtrRecord,
    /// No route or no reply from the destination
    Unreachable,
    /// Unexpected local failure
    Internal,
}

impl ErrorKind {
    /// Stable uppercase label used in logs and console output
    pub fn label(&self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION",
            Self::ResolutionFailed => "RESOLUTION",
            Self::NameNotFound => "NXDOMAIN",
            Self::Timeout => "TIMEOUT",
            Self::ConnectionRefused => "REFUSED",
            Self::PermissionDenied => "PERMISSION",
            Self::ResolverUnavailable => "RESOLVER",
            Self::NoPtrRecord => "NO_PTR",
            Self::Unreachable => "UNREACHABLE",
            Self::Internal => "INTERNAL",
        }
    }

    /// Environment errors are the ones that should fail a whole operation
    /// rather than count as a lost probe.
    pub fn is_environmental(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::ResolverUnavailable | Self::Internal)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "ValidationError",
            Self::ResolutionFailed => "ResolutionFailed",
            Self::NameNotFound => "NameNotFound",
            Self::Timeout => "Timeout",
            Self::ConnectionRefused => "ConnectionRefused",
            Self::PermissionDenied => "PermissionDenied",
            Self::ResolverUnavailable => "ResolverUnavailable",
            Self::NoPtrRecord => "NoPtrRecord",
            Self::Unreachable => "Unreachable",
            Self::Internal => "Internal",
        };
        f.write_str(name)
    }
}

/// Error attached to a failed diagnostic result: always a kind, plus detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticError {
    pub kind: ErrorKind,
    pub detail: String,
}

impl DiagnosticError {
    pub fn new<S: Into<String>>(kind: ErrorKind, detail: S) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for DiagnosticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl From<AppError> for DiagnosticError {
    fn from(error: AppError) -> Self {
        let kind = error.kind();
        Self::new(kind, error.detail())
    }
}

/// Custom error types for the diagnostics engine
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid target or parameter
    #[error("Validation error: {0}")]
    Validation(String),

    /// Target could not be resolved to an address
    #[error("Resolution failed: {0}")]
    ResolutionFailed(String),

    /// NXDOMAIN
    #[error("Name not found: {0}")]
    NameNotFound(String),

    /// No PTR record for an address
    #[error("No PTR record: {0}")]
    NoPtrRecord(String),

    /// Resolver unreachable or broken
    #[error("Resolver unavailable: {0}")]
    ResolverUnavailable(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Insufficient privilege for raw sockets
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Network connectivity errors
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP request errors (DoH, public IP discovery)
    #[error("HTTP request error: {0}")]
    HttpRequest(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors (URLs, JSON, etc.)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new resolution error
    pub fn resolution_failed<S: Into<String>>(message: S) -> Self {
        Self::ResolutionFailed(message.into())
    }

    pub fn name_not_found<S: Into<String>>(message: S) -> Self {
        Self::NameNotFound(message.into())
    }

    pub fn no_ptr_record<S: Into<String>>(message: S) -> Self {
        Self::NoPtrRecord(message.into())
    }

    pub fn resolver_unavailable<S: Into<String>>(message: S) -> Self {
        Self::ResolverUnavailable(message.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    pub fn permission_denied<S: Into<String>>(message: S) -> Self {
        Self::PermissionDenied(message.into())
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    /// Create a new HTTP request error
    pub fn http_request<S: Into<String>>(message: S) -> Self {
        Self::HttpRequest(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Build an error of the given diagnostic kind
    pub fn from_kind<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::ResolutionFailed => Self::ResolutionFailed(message),
            ErrorKind::NameNotFound => Self::NameNotFound(message),
            ErrorKind::Timeout => Self::Timeout(message),
            ErrorKind::ConnectionRefused | ErrorKind::Unreachable => Self::Network(message),
            ErrorKind::PermissionDenied => Self::PermissionDenied(message),
            ErrorKind::ResolverUnavailable => Self::ResolverUnavailable(message),
            ErrorKind::NoPtrRecord => Self::NoPtrRecord(message),
            ErrorKind::Internal => Self::Internal(message),
        }
    }

    /// Diagnostic kind this error maps onto
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => ErrorKind::Validation,
            Self::ResolutionFailed(_) => ErrorKind::ResolutionFailed,
            Self::NameNotFound(_) => ErrorKind::NameNotFound,
            Self::NoPtrRecord(_) => ErrorKind::NoPtrRecord,
            Self::ResolverUnavailable(_) => ErrorKind::ResolverUnavailable,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::Network(_) | Self::HttpRequest(_) => ErrorKind::Unreachable,
            Self::Io(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message without the variant prefix
    pub fn detail(&self) -> String {
        match self {
            Self::Config(msg)
            | Self::Validation(msg)
            | Self::ResolutionFailed(msg)
            | Self::NameNotFound(msg)
            | Self::NoPtrRecord(msg)
            | Self::ResolverUnavailable(msg)
            | Self::Timeout(msg)
            | Self::PermissionDenied(msg)
            | Self::Network(msg)
            | Self::HttpRequest(msg)
            | Self::Io(msg)
            | Self::Parse(msg)
            | Self::Internal(msg) => msg.clone(),
        }
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Validation(_) => "VALIDATION",
            Self::ResolutionFailed(_) | Self::NameNotFound(_) | Self::NoPtrRecord(_) | Self::ResolverUnavailable(_) => "DNS",
            Self::Timeout(_) => "TIMEOUT",
            Self::PermissionDenied(_) => "PERMISSION",
            Self::Network(_) => "NETWORK",
            Self::HttpRequest(_) => "HTTP",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Check if error is recoverable (can retry)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::HttpRequest(_) | Self::Timeout(_) | Self::ResolverUnavailable(_) | Self::ResolutionFailed(_) => true,
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) | Self::PermissionDenied(_) => false,
            Self::NameNotFound(_) | Self::NoPtrRecord(_) | Self::Io(_) | Self::Internal(_) => false,
        }
    }

    /// Get user-friendly error message with suggestions
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Config(msg) => {
                format!("Configuration problem: {}\n\nSuggestion: Check your .env file, NETDIAG_* variables or command line arguments.", msg)
            }
            Self::Validation(msg) => {
                format!("Invalid input: {}\n\nSuggestion: Targets must be a hostname or an IPv4/IPv6 address; ports must be 1-65535.", msg)
            }
            Self::ResolutionFailed(msg) => {
                format!("Could not resolve target: {}\n\nSuggestion: Check the spelling or try another resolver with --dns-server.", msg)
            }
            Self::NameNotFound(msg) => {
                format!("Domain does not exist: {}\n\nSuggestion: Verify the domain name; the resolver returned NXDOMAIN.", msg)
            }
            Self::NoPtrRecord(msg) => {
                format!("No reverse DNS entry: {}\n\nSuggestion: Many addresses have no PTR record; this is not a network fault.", msg)
            }
            Self::ResolverUnavailable(msg) => {
                format!("DNS resolver unavailable: {}\n\nSuggestion: Try using different DNS servers (8.8.8.8, 1.1.1.1) or DNS-over-HTTPS with --doh.", msg)
            }
            Self::Timeout(msg) => {
                format!("Request timed out: {}\n\nSuggestion: Increase the timeout value using --timeout or check your network connection.", msg)
            }
            Self::PermissionDenied(msg) => {
                format!("Insufficient privileges: {}\n\nSuggestion: ICMP probes need raw socket access. Run with elevated privileges, grant CAP_NET_RAW, or use `netdiag scan` for a TCP reachability check.", msg)
            }
            Self::Network(msg) => {
                format!("Network connectivity issue: {}\n\nSuggestion: Check your internet connection and try again.", msg)
            }
            Self::HttpRequest(msg) => {
                format!("HTTP request failed: {}\n\nSuggestion: The service may be down or blocking requests. Try again later.", msg)
            }
            Self::Io(msg) => {
                format!("File operation failed: {}\n\nSuggestion: Check file permissions and disk space.", msg)
            }
            Self::Parse(msg) => {
                format!("Failed to parse data: {}\n\nSuggestion: Check the format of your input data or configuration files.", msg)
            }
            Self::Internal(msg) => {
                format!("Internal error: {}\n\nThis is likely a bug. Please report this issue with the error details.", msg)
            }
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => 1,  // Invalid configuration/usage
            Self::Network(_) | Self::HttpRequest(_) | Self::ResolutionFailed(_) => 2,  // Network issues
            Self::Timeout(_) => 3,
            Self::PermissionDenied(_) => 4,
            Self::Io(_) => 5,
            Self::NameNotFound(_) | Self::NoPtrRecord(_) | Self::ResolverUnavailable(_) => 6,  // DNS outcomes
            Self::Internal(_) => 99,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Validation(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Network(_) | Self::HttpRequest(_) | Self::ResolutionFailed(_) | Self::ResolverUnavailable(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::NameNotFound(_) | Self::NoPtrRecord(_) | Self::Timeout(_) => {
                    format!("[{}] {}", category.blue().bold(), message.blue())
                }
                Self::PermissionDenied(_) => {
                    format!("[{}] {}", category.magenta().bold(), message.magenta())
                }
                Self::Io(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

impl From<DiagnosticError> for AppError {
    fn from(error: DiagnosticError) -> Self {
        Self::from_kind(error.kind, error.detail)
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(error.to_string()),
            std::io::ErrorKind::TimedOut => Self::timeout(error.to_string()),
            _ => Self::io(error.to_string()),
        }
    }
}

impl From<url::ParseError> for AppError {
    fn from(error: url::ParseError) -> Self {
        Self::parse(format!("URL parse error: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::timeout(error.to_string())
        } else if error.is_connect() || error.is_request() {
            Self::network(error.to_string())
        } else {
            Self::http_request(error.to_string())
        }
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::num::ParseFloatError> for AppError {
    fn from(error: std::num::ParseFloatError) -> Self {
        Self::parse(format!("Float parse error: {}", error))
    }
}

impl From<std::str::ParseBoolError> for AppError {
    fn from(error: std::str::ParseBoolError) -> Self {
        Self::parse(format!("Boolean parse error: {}", error))
    }
}

impl From<std::net::AddrParseError> for AppError {
    fn from(error: std::net::AddrParseError) -> Self {
        Self::parse(format!("IP address parse error: {}", error))
    }
}

// Anyhow integration
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Error context trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add static context to an error
    fn context(self, message: &'static str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<AppError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let original: AppError = e.into();
            let context = f();
            AppError::from_kind(original.kind(), format!("{}: {}", context, original.detail()))
        })
    }

    fn context(self, message: &'static str) -> Result<T> {
        self.with_context(|| message.to_string())
    }
}

/// Error reporter for user feedback on stderr
pub struct ErrorReporter {
    pub use_color: bool,
    pub verbose: bool,
}

impl ErrorReporter {
    /// Create a new error reporter
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    /// Report an error to the user
    pub fn report_error(&self, error: &AppError) {
        eprintln!("{}", error.format_for_console(self.use_color));

        if self.verbose {
            eprintln!();
            eprintln!("{}", error.user_friendly_message());

            if error.is_recoverable() {
                eprintln!();
                if self.use_color {
                    use colored::Colorize;
                    eprintln!("{}", "This error might be temporary. You can try running the command again.".green());
                } else {
                    eprintln!("This error might be temporary. You can try running the command again.");
                }
            }
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}
