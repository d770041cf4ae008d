use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use dashmap::DashMap;
use oxrdf::vocab::{rdf, rdfs, xsd};
use oxrdf::NamedNode;
use thiserror::Error;

use crate::{Error, Result};

/// Value object naming a graph vertex or a predicate.
///
/// The text is validated as an absolute IRI on construction. Equality,
/// ordering and hashing are by value, so two identifiers built from the same
/// text compare equal whether or not they were interned by the same
/// [`IdentifierRegistry`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    value: Arc<str>,
}

impl Identifier {
    /// Validates and constructs a new [`Identifier`] without interning it.
    pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
        let value = value.as_ref();
        validate(value)?;
        Ok(Self {
            value: Arc::from(value),
        })
    }

    /// Returns the underlying textual representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Returns the fragment after the last `#` or `/`, or the whole text when
    /// neither separator is present.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.value
            .rfind(['#', '/'])
            .map_or(&*self.value, |index| &self.value[index + 1..])
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.value
    }
}

impl TryFrom<&str> for Identifier {
    type Error = IdentifierError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Errors produced when validating an [`Identifier`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
    /// The provided text could not be parsed as an IRI.
    #[error("invalid IRI: {value}")]
    Invalid { value: String },
}

fn validate(value: &str) -> Result<(), IdentifierError> {
    NamedNode::new(value).map_err(|_| IdentifierError::Invalid {
        value: value.to_owned(),
    })?;
    Ok(())
}

/// Process-wide table guaranteeing a single shared representative per
/// distinct identifier text, plus the prefix table used to expand and
/// shorten identifiers.
///
/// The registry is created once and handed to every component through an
/// `Arc`; interning is safe from any number of threads.
#[derive(Debug)]
pub struct IdentifierRegistry {
    table: DashMap<Arc<str>, Identifier>,
    namespaces: BTreeMap<String, String>,
}

impl Default for IdentifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentifierRegistry {
    /// Creates a registry seeded with the `rdf`, `rdfs`, `owl` and `xsd`
    /// namespaces.
    #[must_use]
    pub fn new() -> Self {
        let mut namespaces = BTreeMap::new();
        namespaces.insert("rdf".to_string(), namespace_of(rdf::TYPE.as_str()));
        namespaces.insert(
            "rdfs".to_string(),
            namespace_of(rdfs::SUB_CLASS_OF.as_str()),
        );
        namespaces.insert(
            "owl".to_string(),
            "http://www.w3.org/2002/07/owl#".to_string(),
        );
        namespaces.insert("xsd".to_string(), namespace_of(xsd::STRING.as_str()));
        Self {
            table: DashMap::new(),
            namespaces,
        }
    }

    /// Registers (or replaces) a prefix → namespace binding.
    pub fn register_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.namespaces.insert(prefix.into(), namespace.into());
    }

    /// Builder flavour of [`Self::register_prefix`] for a whole table.
    #[must_use]
    pub fn with_prefixes<I, P, N>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = (P, N)>,
        P: Into<String>,
        N: Into<String>,
    {
        for (prefix, namespace) in prefixes {
            self.register_prefix(prefix, namespace);
        }
        self
    }

    /// Returns the namespace bound to `prefix`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Configuration`] when the prefix is unknown.
    pub fn namespace(&self, prefix: &str) -> Result<&str> {
        self.namespaces
            .get(prefix)
            .map(String::as_str)
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "no namespace associated to prefix `{prefix}`, please declare it under `prefixes`"
                ))
            })
    }

    /// Interns `text` as an absolute identifier.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Parse`] when the text is not a valid IRI.
    pub fn intern(&self, text: &str) -> Result<Identifier> {
        if let Some(existing) = self.table.get(text) {
            return Ok(existing.value().clone());
        }
        validate(text).map_err(|err| Error::Parse {
            input: text.to_owned(),
            reason: err.to_string(),
        })?;
        let key: Arc<str> = Arc::from(text);
        let interned = self
            .table
            .entry(Arc::clone(&key))
            .or_insert_with(|| Identifier { value: key })
            .value()
            .clone();
        Ok(interned)
    }

    /// Resolves a raw identifier string, expanding `prefix:local` forms when
    /// `expand_prefixes` is set and the prefix is registered.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Parse`] when the (expanded) text is not a valid IRI.
    pub fn resolve(&self, text: &str, expand_prefixes: bool) -> Result<Identifier> {
        let text = text.trim();
        if expand_prefixes {
            if let Some((prefix, local)) = text.split_once(':') {
                if let Some(namespace) = self.namespaces.get(prefix) {
                    return self.intern(&format!("{namespace}{local}"));
                }
            }
        }
        self.intern(text)
    }

    /// Expands a `prefix:local` form, requiring the prefix to be registered.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Configuration`] for an unknown prefix and with
    /// [`Error::Parse`] when `text` has no prefix or expands to an invalid IRI.
    pub fn expand(&self, text: &str) -> Result<Identifier> {
        let Some((prefix, local)) = text.split_once(':') else {
            return Err(Error::Parse {
                input: text.to_owned(),
                reason: "expected a `prefix:local` form".to_string(),
            });
        };
        let namespace = self.namespace(prefix)?;
        self.intern(&format!("{namespace}{local}"))
    }

    /// Renders the `prefix:local` form using the longest matching namespace,
    /// or the full text when no namespace matches.
    #[must_use]
    pub fn shorten(&self, identifier: &Identifier) -> String {
        let text = identifier.as_str();
        self.namespaces
            .iter()
            .filter(|(_, namespace)| !namespace.is_empty() && text.starts_with(namespace.as_str()))
            .max_by_key(|(prefix, namespace)| (namespace.len(), std::cmp::Reverse(prefix.len())))
            .map_or_else(
                || text.to_owned(),
                |(prefix, namespace)| format!("{prefix}:{}", &text[namespace.len()..]),
            )
    }

    /// Number of distinct identifiers interned so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

fn namespace_of(iri: &str) -> String {
    iri.rfind(['#', '/'])
        .map_or_else(String::new, |index| iri[..=index].to_owned())
}
