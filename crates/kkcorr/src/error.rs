// We define a single opaque Error type for the public crate. The internal
// crate reports `&'static str` errors; they get wrapped here (see
// `Error::internal_legacy_adhoc`).
//
// Callers distinguish between kinds of errors with the `is_*` methods. The
// kinds themselves aren't exposed, which leaves us free to reorganize them.

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

/// The underlying internal error type
#[non_exhaustive]
#[derive(Debug)]
enum ErrorKind {
    /// An error that occurs when the binning parameters (or other
    /// configuration options) are missing, inconsistent or invalid
    Config(ConfigError),
    /// An error that occurs when a catalog's coordinate system is
    /// inconsistent with the other catalog or with the metric
    IncompatibleCoordinates(IncompatibleCoordinatesError),
    /// An error that occurs when 2 operands can't be combined (e.g. merging
    /// accumulators with different bins)
    Incompatible(IncompatibleError),
    /// An error that occurs when no catalogs are supplied
    EmptyInput(EmptyInputError),
    /// An error that occurs within `kkcorr_internal`
    InternalLegacyAdHoc(InternalLegacyAdHocError),
    /// An error that occurs while reading or writing a file
    Io(IoError),
    /// An error that occurs when an unknown metric name is specified
    MetricName(MetricNameError),
    /// An error that occurs while encoding or decoding a file's contents
    Serialization(SerializationError),
    /// An error that occurs when an operation isn't allowed in the
    /// accumulator's current state
    State(StateError),
    /// An error that occurs when a file doesn't hold the expected table
    TableShape(TableShapeError),
}

// define constructor methods for Error
impl Error {
    /// produce an error indicating a problem with the configuration
    pub(crate) fn config(what: String) -> Self {
        Error {
            kind: ErrorKind::Config(ConfigError { what }),
        }
    }

    /// produce an error indicating that a pair of coordinate systems (or a
    /// metric and a coordinate system) can't be used together
    pub(crate) fn incompatible_coordinates(what: String) -> Self {
        Error {
            kind: ErrorKind::IncompatibleCoordinates(IncompatibleCoordinatesError { what }),
        }
    }

    /// produce an error indicating that 2 operands are incompatible
    pub(crate) fn incompatible(what: String) -> Self {
        Error {
            kind: ErrorKind::Incompatible(IncompatibleError { what }),
        }
    }

    /// produce an error indicating that no catalogs were provided
    pub(crate) fn empty_input() -> Self {
        Error {
            kind: ErrorKind::EmptyInput(EmptyInputError),
        }
    }

    /// wraps a legacy internal error string
    pub(crate) fn internal_legacy_adhoc(message: &'static str) -> Self {
        Error {
            kind: ErrorKind::InternalLegacyAdHoc(InternalLegacyAdHocError(message)),
        }
    }

    pub(crate) fn io(context: String, source: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io(IoError { context, source }),
        }
    }

    /// produce an error indicating that an unknown metric name was specified
    pub(crate) fn metric_name(actual: String, choices: Vec<String>) -> Self {
        Error {
            kind: ErrorKind::MetricName(MetricNameError { actual, choices }),
        }
    }

    pub(crate) fn serialization(context: String, what: String) -> Self {
        Error {
            kind: ErrorKind::Serialization(SerializationError { context, what }),
        }
    }

    /// produce an error indicating that `operation` can't be performed in
    /// the accumulator's current state
    pub(crate) fn state(operation: &'static str, state: &'static str) -> Self {
        Error {
            kind: ErrorKind::State(StateError { operation, state }),
        }
    }

    pub(crate) fn table_shape(what: String) -> Self {
        Error {
            kind: ErrorKind::TableShape(TableShapeError { what }),
        }
    }
}

// define the predicates used to query the kind of error
impl Error {
    pub fn is_config(&self) -> bool {
        matches!(self.kind, ErrorKind::Config(_))
    }

    /// Returns `true` when the error was produced by an invalid metric name
    pub fn is_value(&self) -> bool {
        matches!(self.kind, ErrorKind::MetricName(_))
    }

    pub fn is_incompatible_coordinates(&self) -> bool {
        matches!(self.kind, ErrorKind::IncompatibleCoordinates(_))
    }

    pub fn is_incompatible(&self) -> bool {
        matches!(self.kind, ErrorKind::Incompatible(_))
    }

    pub fn is_empty_input(&self) -> bool {
        matches!(self.kind, ErrorKind::EmptyInput(_))
    }

    pub fn is_state(&self) -> bool {
        matches!(self.kind, ErrorKind::State(_))
    }

    pub fn is_table_shape(&self) -> bool {
        matches!(self.kind, ErrorKind::TableShape(_))
    }

    pub fn is_io(&self) -> bool {
        matches!(self.kind, ErrorKind::Io(_))
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind {
            ErrorKind::Io(ref err) => Some(&err.source),
            _ => None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        self.kind.fmt(f)
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            ErrorKind::Config(ref err) => err.fmt(f),
            ErrorKind::IncompatibleCoordinates(ref err) => err.fmt(f),
            ErrorKind::Incompatible(ref err) => err.fmt(f),
            ErrorKind::EmptyInput(ref err) => err.fmt(f),
            ErrorKind::InternalLegacyAdHoc(ref msg) => msg.fmt(f),
            ErrorKind::Io(ref err) => err.fmt(f),
            ErrorKind::MetricName(ref err) => err.fmt(f),
            ErrorKind::Serialization(ref err) => err.fmt(f),
            ErrorKind::State(ref err) => err.fmt(f),
            ErrorKind::TableShape(ref err) => err.fmt(f),
        }
    }
}

/// An error that occurs when the configuration is missing, inconsistent or
/// invalid
#[derive(Clone, Debug)]
struct ConfigError {
    what: String,
}

impl std::error::Error for ConfigError {}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid configuration: {}", self.what)
    }
}

#[derive(Clone, Debug)]
struct IncompatibleCoordinatesError {
    what: String,
}

impl std::error::Error for IncompatibleCoordinatesError {}

impl core::fmt::Display for IncompatibleCoordinatesError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "incompatible coordinates: {}", self.what)
    }
}

#[derive(Clone, Debug)]
struct IncompatibleError {
    what: String,
}

impl std::error::Error for IncompatibleError {}

impl core::fmt::Display for IncompatibleError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "incompatible operands: {}", self.what)
    }
}

#[derive(Clone, Debug)]
struct EmptyInputError;

impl std::error::Error for EmptyInputError {}

impl core::fmt::Display for EmptyInputError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "no catalogs were provided")
    }
}

/// A temporary type that wraps the string errors from `kkcorr_internal`.
#[derive(Clone)]
struct InternalLegacyAdHocError(&'static str);

impl std::error::Error for InternalLegacyAdHocError {}

impl core::fmt::Display for InternalLegacyAdHocError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::fmt::Debug for InternalLegacyAdHocError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Debug::fmt(&self.0, f)
    }
}

#[derive(Debug)]
struct IoError {
    context: String,
    source: std::io::Error,
}

impl std::error::Error for IoError {}

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}: {}", self.context, self.source)
    }
}

/// An error occurs when an unknown metric name is specified
#[derive(Clone, Debug)]
struct MetricNameError {
    actual: String,
    choices: Vec<String>,
}

impl std::error::Error for MetricNameError {}

impl core::fmt::Display for MetricNameError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{} is not a metric name. Choices include: {:?}",
            self.actual, self.choices
        )
    }
}

#[derive(Clone, Debug)]
struct SerializationError {
    context: String,
    what: String,
}

impl std::error::Error for SerializationError {}

impl core::fmt::Display for SerializationError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}: {}", self.context, self.what)
    }
}

#[derive(Clone, Debug)]
struct StateError {
    operation: &'static str,
    state: &'static str,
}

impl std::error::Error for StateError {}

impl core::fmt::Display for StateError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "can't {} an accumulator in the {} state",
            self.operation, self.state
        )
    }
}

/// An error that occurs when a file is missing a column or a column has the
/// wrong length
#[derive(Clone, Debug)]
struct TableShapeError {
    what: String,
}

impl std::error::Error for TableShapeError {}

impl core::fmt::Display for TableShapeError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "unexpected table layout: {}", self.what)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn predicates_and_messages() {
        let err = Error::metric_name("Arc".to_owned(), vec!["Flat".to_owned()]);
        assert!(err.is_value());
        assert!(!err.is_config());
        assert_eq!(
            err.to_string(),
            "Arc is not a metric name. Choices include: [\"Flat\"]"
        );

        let err = Error::state("finalize", "Finalized");
        assert!(err.is_state());
        assert_eq!(
            err.to_string(),
            "can't finalize an accumulator in the Finalized state"
        );
    }

    #[test]
    fn io_source() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = Error::io("opening out.dat".to_owned(), source);
        assert!(err.is_io());
        assert!(err.source().is_some());
        assert!(Error::empty_input().source().is_none());
    }
}
