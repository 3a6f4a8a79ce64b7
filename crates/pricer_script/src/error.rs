//! Error types for parsing and evaluating scripts.

use pricer_core::vectorized::VectorError;
use pricer_models::ModelError;
use thiserror::Error;

use crate::ast::Location;

/// Errors raised by the parser, the context and the interpreter.
///
/// Runtime errors are wrapped once in [`ScriptError::At`] with the location
/// of the innermost statement being executed; [`ScriptError::root`] strips
/// that wrapper.
///
/// # Examples
///
/// ```
/// use pricer_script::ScriptError;
///
/// let err = ScriptError::IndexOutOfRange {
///     name: "Fixings".to_string(),
///     index: 5,
///     size: 4,
/// };
/// assert_eq!(err.to_string(), "Index 5 out of range for 'Fixings' (size 4)");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// Malformed script text.
    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse {
        /// What the parser expected or found
        message: String,
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
    },

    /// A name is not bound in any scope.
    #[error("Undefined identifier '{0}'")]
    UndefinedIdentifier(String),

    /// A value has the wrong shape for the operation or binding.
    #[error("Type mismatch for '{name}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Variable, operator or expression concerned
        name: String,
        /// Expected shape
        expected: String,
        /// Actual shape
        found: String,
    },

    /// 1-based array subscript outside `1..=size`.
    #[error("Index {index} out of range for '{name}' (size {size})")]
    IndexOutOfRange {
        /// Array name
        name: String,
        /// Offending subscript
        index: i64,
        /// Array length
        size: usize,
    },

    /// A name is declared twice in one scope.
    #[error("'{0}' is already declared in this scope")]
    AlreadyDeclared(String),

    /// Assignment to a trade constant or loop counter.
    #[error("Cannot assign to constant '{0}'")]
    ConstantAssignment(String),

    /// A built-in received arguments of the wrong shape.
    #[error("Invalid arguments to {builtin}: expected {expected}")]
    BuiltinArgumentError {
        /// Built-in name
        builtin: String,
        /// Expected signature
        expected: String,
    },

    /// `FOR` bounds are not deterministic integers or the step is zero.
    #[error("Invalid loop bounds: {0}")]
    InvalidLoopBounds(String),

    /// A `REQUIRE` condition is false on some active path.
    #[error("REQUIRE failed: {0}")]
    RequireFailed(String),

    /// Engine used outside its life cycle.
    #[error("Invalid engine state: {0}")]
    InvalidState(String),

    /// Script library or trade data configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The model could not answer a request.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Size or backend mismatch between numbers.
    #[error(transparent)]
    Vector(#[from] VectorError),

    /// Runtime error located at a statement.
    #[error("{source} (at line {line}, column {column})")]
    At {
        /// 1-based line of the statement
        line: usize,
        /// 1-based column of the statement
        column: usize,
        /// Underlying error
        source: Box<ScriptError>,
    },
}

impl ScriptError {
    /// Parse error at `location`.
    pub fn parse(message: impl Into<String>, location: Location) -> Self {
        ScriptError::Parse {
            message: message.into(),
            line: location.line,
            column: location.column,
        }
    }

    /// Type mismatch shorthand.
    pub fn mismatch(
        name: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        ScriptError::TypeMismatch {
            name: name.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Attaches a statement location unless one is already attached.
    pub fn at(self, location: Location) -> Self {
        match self {
            located @ ScriptError::At { .. } => located,
            other => ScriptError::At {
                line: location.line,
                column: location.column,
                source: Box::new(other),
            },
        }
    }

    /// The error without its location wrapper.
    pub fn root(&self) -> &ScriptError {
        match self {
            ScriptError::At { source, .. } => source.root(),
            other => other,
        }
    }

    /// Location attached by [`ScriptError::at`] or reported by the parser.
    pub fn location(&self) -> Option<Location> {
        match self {
            ScriptError::At { line, column, .. } | ScriptError::Parse { line, column, .. } => {
                Some(Location {
                    line: *line,
                    column: *column,
                })
            }
            _ => None,
        }
    }
}
