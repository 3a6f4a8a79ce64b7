//! Values bound to script variables.

use std::fmt;

use pricer_core::types::{Currency, Date, DayCountConvention};
use pricer_core::vectorized::{RandomVariable, VectorError};

/// A script value.
///
/// Numbers are vectorised; every other variant is deterministic. Arrays are
/// homogeneous and keep their length and element kind for the whole
/// evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Per-path number or graph node
    Number(RandomVariable),
    /// Date
    Event(Date),
    /// Name of a market index
    Index(String),
    /// Currency tag
    Currency(Currency),
    /// Day count convention
    DayCounter(DayCountConvention),
    /// Array of values of one kind
    Array(Vec<Value>),
}

impl Value {
    /// Kind name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Event(_) => "event",
            Value::Index(_) => "index",
            Value::Currency(_) => "currency",
            Value::DayCounter(_) => "daycounter",
            Value::Array(_) => "array",
        }
    }

    /// Description of the shape, e.g. `array[3] of event`.
    pub fn shape(&self) -> String {
        match self {
            Value::Array(items) => match items.first() {
                Some(first) => format!("array[{}] of {}", items.len(), first.kind()),
                None => "array[0]".to_string(),
            },
            other => other.kind().to_string(),
        }
    }

    /// Whether `other` may replace this value: same kind and, for arrays,
    /// same length and element kinds.
    pub fn same_shape(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_shape(y))
            }
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }

    /// The number, if this is one.
    pub fn as_number(&self) -> Option<&RandomVariable> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    /// The date, if this is an event.
    pub fn as_event(&self) -> Option<Date> {
        match self {
            Value::Event(d) => Some(*d),
            _ => None,
        }
    }

    /// The elements, if this is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The same value with deterministic numbers rebroadcast to `size`
    /// paths.
    ///
    /// # Errors
    ///
    /// `SizeMismatch` for a path-dependent number of a different size.
    pub fn resized(&self, size: usize) -> Result<Value, VectorError> {
        Ok(match self {
            Value::Number(RandomVariable::Paths(p)) if p.size() != size => {
                match p.deterministic_value() {
                    Some(v) => Value::Number(RandomVariable::constant(size, v)),
                    None => {
                        return Err(VectorError::SizeMismatch {
                            left: p.size(),
                            right: size,
                        })
                    }
                }
            }
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|v| v.resized(size))
                    .collect::<Result<_, _>>()?,
            ),
            other => other.clone(),
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(RandomVariable::Paths(p)) => match p.deterministic_value() {
                Some(v) => write!(f, "{v}"),
                None => write!(f, "<{} paths, mean {}>", p.size(), p.expectation()),
            },
            Value::Number(RandomVariable::Node(n)) => write!(f, "<node {}>", n.id().index()),
            Value::Event(d) => write!(f, "{d}"),
            Value::Index(name) => write!(f, "{name}"),
            Value::Currency(c) => write!(f, "{c}"),
            Value::DayCounter(dc) => write!(f, "{dc}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}
