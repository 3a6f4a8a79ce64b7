//! Library of parsed scripts keyed by product type.
//!
//! Scripts are parsed once when the library is built and shared as
//! `Arc<Script>`. The library is an ordinary value created at startup and
//! passed to whoever prices trades.
//!
//! ```toml
//! [[script]]
//! name = "EuropeanOption"
//! code = "Option = LOGPAY(max(Underlying(Expiry) - Strike, 0), Expiry, Expiry, PayCcy);"
//!
//! [[script]]
//! name = "Forward"
//! code = "Value = PAY(Notional * (Underlying(Expiry) - Strike), Expiry, Expiry, PayCcy);"
//! npv = "Value"
//! results = { notional = "Notional" }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ScriptError;
use crate::script::{Script, ScriptSource};

/// Immutable map from product type to parsed script.
#[derive(Debug, Clone, Default)]
pub struct ScriptLibrary {
    scripts: BTreeMap<String, Arc<Script>>,
}

impl ScriptLibrary {
    /// Builder collecting script sources.
    pub fn builder() -> ScriptLibraryBuilder {
        ScriptLibraryBuilder::default()
    }

    /// Script for `product`.
    pub fn get(&self, product: &str) -> Option<Arc<Script>> {
        self.scripts.get(product).cloned()
    }

    /// Number of scripts.
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Whether the library is empty.
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// Product types, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }

    /// Loads `[[script]]` tables from TOML text.
    #[cfg(feature = "serde")]
    pub fn from_toml_str(text: &str) -> Result<Self, ScriptError> {
        #[derive(serde::Deserialize)]
        struct Entry {
            name: String,
            #[serde(flatten)]
            source: ScriptSource,
        }

        #[derive(serde::Deserialize)]
        struct File {
            #[serde(default)]
            script: Vec<Entry>,
        }

        let file: File = toml::from_str(text).map_err(|e| ScriptError::Config(e.to_string()))?;
        file.script
            .into_iter()
            .fold(Self::builder(), |b, e| b.add(e.name, e.source))
            .build()
    }
}

/// Collects `(product type, source)` entries for a [`ScriptLibrary`].
#[derive(Debug, Clone, Default)]
pub struct ScriptLibraryBuilder {
    entries: Vec<(String, ScriptSource)>,
}

impl ScriptLibraryBuilder {
    /// Adds a script source for `product`.
    pub fn add(mut self, product: impl Into<String>, source: ScriptSource) -> Self {
        self.entries.push((product.into(), source));
        self
    }

    /// Parses every source.
    ///
    /// # Errors
    ///
    /// `Config` for a duplicate product type; the first parse error
    /// otherwise.
    pub fn build(self) -> Result<ScriptLibrary, ScriptError> {
        let mut scripts = BTreeMap::new();
        for (product, source) in self.entries {
            if scripts.contains_key(&product) {
                return Err(ScriptError::Config(format!(
                    "duplicate script for product '{product}'"
                )));
            }
            let script = source.to_script(Some(&product)).map_err(|err| {
                warn!(product = %product, error = %err, "script does not parse");
                err
            })?;
            debug!(product = %product, fingerprint = script.fingerprint(), "script parsed");
            scripts.insert(product, Arc::new(script));
        }
        Ok(ScriptLibrary { scripts })
    }
}
