use std::fmt::Display;

/// A place in a source file that a diagnostic refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileLocation {
    pub file: String,
    pub line: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}", str)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorMessage {
    pub locations: Vec<FileLocation>,
    pub severity: Severity,
    pub id: String,
    pub message: String,
}

impl Display for ErrorMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for location in self.locations.iter() {
            write!(f, "[{}:{}] ", location.file, location.line)?;
        }
        write!(f, "({}) {}: {}", self.severity, self.id, self.message)
    }
}

/// Receiver for diagnostics raised while preprocessing.
pub trait ErrorSink {
    fn report(&mut self, message: ErrorMessage);
}

/// Sink that keeps every reported message. Used by the driver binary and by
/// tests that need to inspect what was raised.
#[derive(Debug, Default)]
pub struct CollectedErrors(pub Vec<ErrorMessage>);

impl ErrorSink for CollectedErrors {
    fn report(&mut self, message: ErrorMessage) {
        self.0.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_display_includes_location_and_id() {
        let message = ErrorMessage {
            locations: vec![FileLocation {
                file: "a.c".to_string(),
                line: 3,
            }],
            severity: Severity::Error,
            id: "noQuoteCharPair".to_string(),
            message: "No pair for character (\").".to_string(),
        };
        assert_eq!(
            message.to_string(),
            "[a.c:3] (error) noQuoteCharPair: No pair for character (\")."
        );
    }
}
