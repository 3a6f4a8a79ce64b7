//! Execution context: scoped variable bindings and trade data.
//!
//! A [`Context`] is a stack of scopes. Scope 0 holds the trade data and the
//! script's top-level declarations; loop iterations push a scope through
//! [`Context::enter_scope`], whose guard pops it again on every exit path.
//!
//! # Example
//!
//! ```
//! use pricer_script::context::Context;
//! use pricer_script::value::Value;
//! use pricer_core::vectorized::RandomVariable;
//!
//! let mut ctx = Context::new();
//! ctx.declare("x", Value::Number(RandomVariable::constant(1, 1.0))).unwrap();
//! {
//!     let mut scope = ctx.enter_scope();
//!     scope.declare_constant("i", Value::Number(RandomVariable::constant(1, 2.0))).unwrap();
//!     assert!(scope.get("i").is_ok());
//! }
//! assert!(ctx.get("i").is_err());
//! assert_eq!(ctx.depth(), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::ops::{Deref, DerefMut};

use pricer_core::types::{Currency, Date, DayCountConvention};
use pricer_core::vectorized::RandomVariable;

use crate::error::ScriptError;
use crate::value::Value;

#[derive(Debug, Clone, Default)]
struct Scope {
    values: HashMap<String, Value>,
    constants: HashSet<String>,
}

/// Scoped name to value bindings.
#[derive(Debug, Clone)]
pub struct Context {
    scopes: Vec<Scope>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Context with an empty global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    /// Number of scopes, at least one.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    fn innermost(&mut self) -> &mut Scope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    fn owner(&self, name: &str) -> Option<usize> {
        self.scopes
            .iter()
            .rposition(|scope| scope.values.contains_key(name))
    }

    /// Binds `name` in the innermost scope.
    ///
    /// # Errors
    ///
    /// `AlreadyDeclared` if the innermost scope already binds `name`.
    pub fn declare(&mut self, name: &str, value: Value) -> Result<(), ScriptError> {
        let scope = self.innermost();
        if scope.values.contains_key(name) {
            return Err(ScriptError::AlreadyDeclared(name.to_string()));
        }
        scope.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Binds `name` in the innermost scope and flags it constant.
    pub fn declare_constant(&mut self, name: &str, value: Value) -> Result<(), ScriptError> {
        self.declare(name, value)?;
        self.innermost().constants.insert(name.to_string());
        Ok(())
    }

    /// Whether `name` is bound in some scope.
    pub fn contains(&self, name: &str) -> bool {
        self.owner(name).is_some()
    }

    /// Whether the binding visible as `name` is constant.
    pub fn is_constant(&self, name: &str) -> bool {
        self.owner(name)
            .is_some_and(|i| self.scopes[i].constants.contains(name))
    }

    /// Innermost binding of `name`.
    pub fn get(&self, name: &str) -> Result<&Value, ScriptError> {
        self.owner(name)
            .and_then(|i| self.scopes[i].values.get(name))
            .ok_or_else(|| ScriptError::UndefinedIdentifier(name.to_string()))
    }

    fn writable(&mut self, name: &str) -> Result<&mut Value, ScriptError> {
        let i = self
            .owner(name)
            .ok_or_else(|| ScriptError::UndefinedIdentifier(name.to_string()))?;
        let scope = &mut self.scopes[i];
        if scope.constants.contains(name) {
            return Err(ScriptError::ConstantAssignment(name.to_string()));
        }
        scope
            .values
            .get_mut(name)
            .ok_or_else(|| ScriptError::UndefinedIdentifier(name.to_string()))
    }

    /// Rebinds `name` in the scope that owns it.
    ///
    /// # Errors
    ///
    /// `UndefinedIdentifier`, `ConstantAssignment`, or `TypeMismatch` if the
    /// new value's shape differs from the current one.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), ScriptError> {
        let slot = self.writable(name)?;
        if !slot.same_shape(&value) {
            return Err(ScriptError::mismatch(name, slot.shape(), value.shape()));
        }
        *slot = value;
        Ok(())
    }

    fn element_index(name: &str, items: &[Value], index: i64) -> Result<usize, ScriptError> {
        if index < 1 || index as usize > items.len() {
            return Err(ScriptError::IndexOutOfRange {
                name: name.to_string(),
                index,
                size: items.len(),
            });
        }
        Ok(index as usize - 1)
    }

    /// Element `index` (1-based) of array `name`.
    pub fn get_element(&self, name: &str, index: i64) -> Result<&Value, ScriptError> {
        match self.get(name)? {
            Value::Array(items) => {
                let i = Self::element_index(name, items, index)?;
                Ok(&items[i])
            }
            other => Err(ScriptError::mismatch(name, "array", other.shape())),
        }
    }

    /// Replaces element `index` (1-based) of array `name`.
    pub fn set_element(&mut self, name: &str, index: i64, value: Value) -> Result<(), ScriptError> {
        match self.writable(name)? {
            Value::Array(items) => {
                let i = Self::element_index(name, items, index)?;
                if !items[i].same_shape(&value) {
                    return Err(ScriptError::mismatch(
                        format!("{name}[{index}]"),
                        items[i].shape(),
                        value.shape(),
                    ));
                }
                items[i] = value;
                Ok(())
            }
            other => Err(ScriptError::mismatch(name, "array", other.shape())),
        }
    }

    /// Pushes a scope; it is popped when the guard is dropped.
    pub fn enter_scope(&mut self) -> ScopeGuard<'_> {
        self.scopes.push(Scope::default());
        ScopeGuard { context: self }
    }

    /// Every bound name, sorted.
    pub fn names(&self) -> Vec<String> {
        self.scopes
            .iter()
            .flat_map(|s| s.values.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Copy with deterministic numbers rebroadcast to `size` paths.
    pub fn resized(&self, size: usize) -> Result<Context, ScriptError> {
        let scopes = self
            .scopes
            .iter()
            .map(|scope| {
                let values = scope
                    .values
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), v.resized(size)?)))
                    .collect::<Result<_, ScriptError>>()?;
                Ok(Scope {
                    values,
                    constants: scope.constants.clone(),
                })
            })
            .collect::<Result<_, ScriptError>>()?;
        Ok(Context { scopes })
    }
}

/// Dumps the global scope, one sorted binding per line.
impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let global: BTreeMap<_, _> = self.scopes[0].values.iter().collect();
        for (name, value) in global {
            let marker = if self.scopes[0].constants.contains(name) {
                " (const)"
            } else {
                ""
            };
            writeln!(f, "{name}{marker} = {value}")?;
        }
        Ok(())
    }
}

/// Scope pushed by [`Context::enter_scope`].
pub struct ScopeGuard<'a> {
    context: &'a mut Context,
}

impl Deref for ScopeGuard<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        self.context
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        self.context
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        if self.context.scopes.len() > 1 {
            self.context.scopes.pop();
        }
    }
}

// ============================================================================
// Trade data
// ============================================================================

/// One trade constant.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "serde_impl::RawTradeValue"))]
pub enum TradeValue {
    /// Number
    Number(f64),
    /// Date
    Event(Date),
    /// Index name
    Index(String),
    /// Currency
    Currency(Currency),
    /// Day count convention
    DayCounter(DayCountConvention),
    /// Array of numbers
    Numbers(Vec<f64>),
    /// Array of dates
    Events(Vec<Date>),
}

impl TradeValue {
    fn to_value(&self, size: usize) -> Value {
        let number = |v: f64| Value::Number(RandomVariable::constant(size, v));
        match self {
            TradeValue::Number(v) => number(*v),
            TradeValue::Event(d) => Value::Event(*d),
            TradeValue::Index(name) => Value::Index(name.clone()),
            TradeValue::Currency(c) => Value::Currency(*c),
            TradeValue::DayCounter(dc) => Value::DayCounter(*dc),
            TradeValue::Numbers(vs) => Value::Array(vs.iter().map(|v| number(*v)).collect()),
            TradeValue::Events(ds) => Value::Array(ds.iter().map(|d| Value::Event(*d)).collect()),
        }
    }
}

/// Plain-data trade description, shareable across threads.
///
/// In TOML, bare numbers and number arrays are numbers; other kinds are
/// tagged:
///
/// ```toml
/// Strike = 100.0
/// Weights = [0.5, 0.5]
/// Expiry = { event = "2025-01-02" }
/// Fixings = { events = ["2024-07-01", "2025-01-02"] }
/// Underlying = { index = "EQ-SPX" }
/// PayCcy = { currency = "USD" }
/// Basis = { daycounter = "ACT/360" }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TradeData {
    entries: BTreeMap<String, TradeValue>,
}

impl TradeData {
    /// Empty trade data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entry.
    pub fn insert(&mut self, name: impl Into<String>, value: TradeValue) {
        self.entries.insert(name.into(), value);
    }

    /// Adds a number.
    pub fn number(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, TradeValue::Number(value));
        self
    }

    /// Adds a date.
    pub fn event(mut self, name: impl Into<String>, date: Date) -> Self {
        self.insert(name, TradeValue::Event(date));
        self
    }

    /// Adds an index reference.
    pub fn index(mut self, name: impl Into<String>, index: impl Into<String>) -> Self {
        self.insert(name, TradeValue::Index(index.into()));
        self
    }

    /// Adds a currency.
    pub fn currency(mut self, name: impl Into<String>, currency: Currency) -> Self {
        self.insert(name, TradeValue::Currency(currency));
        self
    }

    /// Adds a day count convention.
    pub fn day_counter(mut self, name: impl Into<String>, dc: DayCountConvention) -> Self {
        self.insert(name, TradeValue::DayCounter(dc));
        self
    }

    /// Adds an array of numbers.
    pub fn numbers(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.insert(name, TradeValue::Numbers(values));
        self
    }

    /// Adds an array of dates.
    pub fn events(mut self, name: impl Into<String>, dates: Vec<Date>) -> Self {
        self.insert(name, TradeValue::Events(dates));
        self
    }

    /// Entry called `name`.
    pub fn get(&self, name: &str) -> Option<&TradeValue> {
        self.entries.get(name)
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TradeValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Context binding every entry as a constant, numbers on `size` paths.
    pub fn to_context(&self, size: usize) -> Context {
        let mut ctx = Context::new();
        let global = ctx.innermost();
        for (name, value) in &self.entries {
            global.values.insert(name.clone(), value.to_value(size));
            global.constants.insert(name.clone());
        }
        ctx
    }

    /// Parses trade data from TOML text.
    #[cfg(feature = "serde")]
    pub fn from_toml_str(text: &str) -> Result<Self, ScriptError> {
        toml::from_str(text).map_err(|e| ScriptError::Config(e.to_string()))
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::TradeValue;
    use pricer_core::types::{Currency, Date, DayCountConvention};
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub(super) enum Tagged {
        Number(f64),
        Event(Date),
        Index(String),
        Currency(Currency),
        DayCounter(DayCountConvention),
        Numbers(Vec<f64>),
        Events(Vec<Date>),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    pub(super) enum RawTradeValue {
        Number(f64),
        Numbers(Vec<f64>),
        Tagged(Tagged),
    }

    impl From<RawTradeValue> for TradeValue {
        fn from(raw: RawTradeValue) -> Self {
            match raw {
                RawTradeValue::Number(v) => TradeValue::Number(v),
                RawTradeValue::Numbers(vs) => TradeValue::Numbers(vs),
                RawTradeValue::Tagged(Tagged::Number(v)) => TradeValue::Number(v),
                RawTradeValue::Tagged(Tagged::Event(d)) => TradeValue::Event(d),
                RawTradeValue::Tagged(Tagged::Index(s)) => TradeValue::Index(s),
                RawTradeValue::Tagged(Tagged::Currency(c)) => TradeValue::Currency(c),
                RawTradeValue::Tagged(Tagged::DayCounter(dc)) => TradeValue::DayCounter(dc),
                RawTradeValue::Tagged(Tagged::Numbers(vs)) => TradeValue::Numbers(vs),
                RawTradeValue::Tagged(Tagged::Events(ds)) => TradeValue::Events(ds),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(v: f64) -> Value {
        Value::Number(RandomVariable::constant(4, v))
    }

    #[test]
    fn test_declare_get_set() {
        let mut ctx = Context::new();
        ctx.declare("x", number(1.0)).unwrap();
        assert_eq!(
            ctx.declare("x", number(2.0)),
            Err(ScriptError::AlreadyDeclared("x".to_string()))
        );
        ctx.set("x", number(3.0)).unwrap();
        assert_eq!(ctx.get("x").unwrap(), &number(3.0));
        assert!(matches!(
            ctx.set("x", Value::Currency(Currency::USD)),
            Err(ScriptError::TypeMismatch { .. })
        ));
        assert_eq!(
            ctx.get("y"),
            Err(ScriptError::UndefinedIdentifier("y".to_string()))
        );
        assert!(matches!(
            ctx.set("y", number(0.0)),
            Err(ScriptError::UndefinedIdentifier(_))
        ));
    }

    #[test]
    fn test_inner_scope_shadows_and_sets_outer() {
        let mut ctx = Context::new();
        ctx.declare("x", number(1.0)).unwrap();
        ctx.declare("y", number(1.0)).unwrap();
        {
            let mut scope = ctx.enter_scope();
            scope.declare("x", number(10.0)).unwrap();
            scope.set("y", number(5.0)).unwrap();
            assert_eq!(scope.get("x").unwrap(), &number(10.0));
            assert_eq!(scope.depth(), 2);
        }
        assert_eq!(ctx.get("x").unwrap(), &number(1.0));
        assert_eq!(ctx.get("y").unwrap(), &number(5.0));
    }

    #[test]
    fn test_scope_popped_on_error_path() {
        fn failing(ctx: &mut Context) -> Result<(), ScriptError> {
            let mut scope = ctx.enter_scope();
            scope.declare("tmp", number(0.0))?;
            scope.get("missing")?;
            Ok(())
        }
        let mut ctx = Context::new();
        assert!(failing(&mut ctx).is_err());
        assert_eq!(ctx.depth(), 1);
        assert!(!ctx.contains("tmp"));
    }

    #[test]
    fn test_arrays_are_one_based() {
        let mut ctx = Context::new();
        ctx.declare("a", Value::Array(vec![number(1.0), number(2.0)]))
            .unwrap();
        assert_eq!(ctx.get_element("a", 2).unwrap(), &number(2.0));
        ctx.set_element("a", 1, number(7.0)).unwrap();
        assert_eq!(ctx.get_element("a", 1).unwrap(), &number(7.0));
        assert_eq!(
            ctx.get_element("a", 3),
            Err(ScriptError::IndexOutOfRange {
                name: "a".to_string(),
                index: 3,
                size: 2
            })
        );
        assert!(ctx.get_element("a", 0).is_err());
        assert!(matches!(
            ctx.set_element("a", 1, Value::Event(Date::from_ymd(2025, 1, 1).unwrap())),
            Err(ScriptError::TypeMismatch { .. })
        ));
        assert!(matches!(
            ctx.set("a", Value::Array(vec![number(1.0)])),
            Err(ScriptError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_trade_data_is_constant() {
        let expiry = Date::from_ymd(2025, 1, 2).unwrap();
        let mut ctx = TradeData::new()
            .number("Strike", 100.0)
            .event("Expiry", expiry)
            .index("Underlying", "EQ-SPX")
            .numbers("Weights", vec![0.5, 0.5])
            .to_context(8);

        assert!(ctx.is_constant("Strike"));
        assert_eq!(ctx.get("Expiry").unwrap(), &Value::Event(expiry));
        assert_eq!(
            ctx.get("Strike").unwrap().as_number().unwrap().size(),
            8
        );
        assert_eq!(
            ctx.set("Strike", Value::Number(RandomVariable::constant(8, 1.0))),
            Err(ScriptError::ConstantAssignment("Strike".to_string()))
        );
        assert_eq!(ctx.names(), vec!["Expiry", "Strike", "Underlying", "Weights"]);
        assert!(ctx.to_string().contains("Strike (const) = 100"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_trade_data_from_toml() {
        let data = TradeData::from_toml_str(
            r#"
            Strike = 100.0
            Weights = [0.5, 0.5]
            Expiry = { event = "2025-01-02" }
            Schedule = { events = ["2024-07-01", "2025-01-02"] }
            Underlying = { index = "EQ-SPX" }
            PayCcy = { currency = "USD" }
            Basis = { daycounter = "ACT/360" }
            "#,
        )
        .unwrap();
        assert_eq!(data.get("Strike"), Some(&TradeValue::Number(100.0)));
        assert_eq!(data.get("Weights"), Some(&TradeValue::Numbers(vec![0.5, 0.5])));
        assert_eq!(
            data.get("Expiry"),
            Some(&TradeValue::Event(Date::from_ymd(2025, 1, 2).unwrap()))
        );
        assert_eq!(data.get("PayCcy"), Some(&TradeValue::Currency(Currency::USD)));
        assert_eq!(
            data.get("Basis"),
            Some(&TradeValue::DayCounter(DayCountConvention::ActualActual360))
        );
        assert!(matches!(data.get("Schedule"), Some(TradeValue::Events(d)) if d.len() == 2));
    }
}
