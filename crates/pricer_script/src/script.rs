//! Parsed scripts.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use crate::ast::{Block, Expr};
use crate::error::ScriptError;
use crate::parser::{parse_expression, parse_program, IdAllocator};

/// Name of the result variable unless configured otherwise.
pub const DEFAULT_RESULT: &str = "Option";

/// An immutable parsed script with its result bindings.
///
/// Scripts hold no interior mutability and are shared across threads
/// through `Arc`.
///
/// # Examples
///
/// ```
/// use pricer_script::Script;
///
/// let script = Script::builder("Option = 2 * Notional;")
///     .product("Doubler")
///     .additional_result("half", "Notional / 2")
///     .build()
///     .unwrap();
///
/// assert_eq!(script.result(), "Option");
/// assert_eq!(script.product(), Some("Doubler"));
/// assert_eq!(script.additional_results()[0].0, "half");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    statements: Block,
    result: String,
    additional_results: Vec<(String, Expr)>,
    product: Option<String>,
    fingerprint: u64,
    source: String,
}

impl Script {
    /// Parses `source` with the default result variable.
    ///
    /// # Errors
    ///
    /// `Parse` with the location of the first offending token.
    pub fn parse(source: &str) -> Result<Self, ScriptError> {
        Self::builder(source).build()
    }

    /// Builder for a script with result bindings.
    pub fn builder(source: impl Into<String>) -> ScriptBuilder {
        ScriptBuilder {
            source: source.into(),
            result: None,
            additional_results: Vec::new(),
            product: None,
        }
    }

    /// Top-level statements.
    pub fn statements(&self) -> &Block {
        &self.statements
    }

    /// Name of the variable holding the value.
    pub fn result(&self) -> &str {
        &self.result
    }

    /// Additional result names and expressions, in declaration order.
    pub fn additional_results(&self) -> &[(String, Expr)] {
        &self.additional_results
    }

    /// Product type, if known.
    pub fn product(&self) -> Option<&str> {
        self.product.as_deref()
    }

    /// Hash of the source text.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Source text.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Builder for [`Script`].
#[derive(Debug, Clone)]
pub struct ScriptBuilder {
    source: String,
    result: Option<String>,
    additional_results: Vec<(String, String)>,
    product: Option<String>,
}

impl ScriptBuilder {
    /// Sets the result variable.
    pub fn result(mut self, name: impl Into<String>) -> Self {
        self.result = Some(name.into());
        self
    }

    /// Adds an additional result computed from `expression` after the last
    /// statement.
    pub fn additional_result(
        mut self,
        name: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        self.additional_results.push((name.into(), expression.into()));
        self
    }

    /// Sets the product type.
    pub fn product(mut self, name: impl Into<String>) -> Self {
        self.product = Some(name.into());
        self
    }

    /// Parses the program and the additional result expressions.
    pub fn build(self) -> Result<Script, ScriptError> {
        let mut ids = IdAllocator::default();
        let statements = parse_program(&self.source, &mut ids)?;
        let additional_results = self
            .additional_results
            .into_iter()
            .map(|(name, text)| Ok((name, parse_expression(&text, &mut ids)?)))
            .collect::<Result<_, ScriptError>>()?;

        let mut hasher = DefaultHasher::new();
        self.source.hash(&mut hasher);

        Ok(Script {
            statements,
            result: self.result.unwrap_or_else(|| DEFAULT_RESULT.to_string()),
            additional_results,
            product: self.product,
            fingerprint: hasher.finish(),
            source: self.source,
        })
    }
}

/// Parses `source` into a [`Script`] with the default result variable.
pub fn parse(source: &str) -> Result<Script, ScriptError> {
    Script::parse(source)
}

/// Serialisable script description: code, result variable and additional
/// results.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct ScriptSource {
    /// Script text
    pub code: String,
    /// Result variable; [`DEFAULT_RESULT`] if absent
    #[cfg_attr(feature = "serde", serde(default))]
    pub npv: Option<String>,
    /// Additional results, name to expression
    #[cfg_attr(feature = "serde", serde(default))]
    pub results: BTreeMap<String, String>,
}

impl ScriptSource {
    /// Source with code only.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    /// Sets the result variable.
    pub fn with_npv(mut self, name: impl Into<String>) -> Self {
        self.npv = Some(name.into());
        self
    }

    /// Adds an additional result.
    pub fn with_result(mut self, name: impl Into<String>, expr: impl Into<String>) -> Self {
        self.results.insert(name.into(), expr.into());
        self
    }

    /// Parses the description.
    pub fn to_script(&self, product: Option<&str>) -> Result<Script, ScriptError> {
        let mut builder = Script::builder(self.code.clone());
        if let Some(npv) = &self.npv {
            builder = builder.result(npv.clone());
        }
        if let Some(product) = product {
            builder = builder.product(product);
        }
        for (name, expr) in &self.results {
            builder = builder.additional_result(name.clone(), expr.clone());
        }
        builder.build()
    }
}
