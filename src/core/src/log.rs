//! Log level selection for the build driver.

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl LogLevel {
    /// Map `-q` / repeated `-v` flags onto a level. Quiet wins over verbose.
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return Self::Error;
        }
        match verbose {
            0 => Self::Info,
            1 => Self::Debug,
            _ => Self::Trace,
        }
    }

    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_directive())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(format!(
                "unknown log level: '{}' (supported: error, warn, info, debug, trace)",
                s
            )),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags() {
        assert_eq!(LogLevel::from_flags(0, false), LogLevel::Info);
        assert_eq!(LogLevel::from_flags(1, false), LogLevel::Debug);
        assert_eq!(LogLevel::from_flags(4, false), LogLevel::Trace);
        assert_eq!(LogLevel::from_flags(2, true), LogLevel::Error);
    }

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_directive_and_tracing_level() {
        assert_eq!(LogLevel::Trace.as_directive(), "trace");
        assert_eq!(LogLevel::default().to_string(), "info");
        assert_eq!(tracing::Level::from(LogLevel::Warn), tracing::Level::WARN);
    }
}
