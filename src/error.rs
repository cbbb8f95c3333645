//! Error type shared by every stage of the compiler.

use std::fmt;
use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Reading or writing a file failed.
    Io { path: PathBuf, source: io::Error },
    /// A text input (`.net`, `.map`, ordering, partition, pseudo-tree) is malformed.
    Parse { what: String, line: usize, message: String },
    /// An ordering does not cover its partition exactly once.
    InvalidOrdering(String),
    /// Partitions overlap, miss variables, or disagree with the ordering.
    InvalidPartition(String),
    /// A diagram would not fit into its pre-computed arena.
    BoundExceeded { layer: usize, bound: usize },
    /// The wall-clock budget ran out.
    Timeout,
    /// The requested combination of options has no implementation.
    Unsupported(String),
    /// An internal invariant was violated.
    Internal { message: String, dump: Option<PathBuf> },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    pub fn parse(what: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            what: what.into(),
            line,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
            dump: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            Error::Parse { what, line, message } => {
                if *line > 0 {
                    write!(f, "{}:{}: {}", what, line, message)
                } else {
                    write!(f, "{}: {}", what, message)
                }
            }
            Error::InvalidOrdering(msg) => write!(f, "invalid ordering: {}", msg),
            Error::InvalidPartition(msg) => write!(f, "invalid partition: {}", msg),
            Error::BoundExceeded { layer, bound } => {
                write!(f, "layer {} exceeds its bound of {} entries", layer, bound)
            }
            Error::Timeout => write!(f, "time limit reached"),
            Error::Unsupported(msg) => write!(f, "unsupported: {}", msg),
            Error::Internal { message, dump } => match dump {
                Some(path) => write!(f, "internal error: {} (context written to {})", message, path.display()),
                None => write!(f, "internal error: {}", message),
            },
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_parse_display() {
        let e = Error::parse("asia.net", 12, "expected '='");
        assert_eq!(e.to_string(), "asia.net:12: expected '='");
        let e = Error::parse("ordering", 0, "empty");
        assert_eq!(e.to_string(), "ordering: empty");
    }

    #[test]
    fn test_io_source() {
        use std::error::Error as _;
        let e = Error::io("missing.net", io::Error::new(io::ErrorKind::NotFound, "nope"));
        assert!(e.source().is_some());
        assert!(e.to_string().starts_with("missing.net"));
    }
}
