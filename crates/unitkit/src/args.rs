//! Argument contexts built from `name=value` tokens

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Input bound to a single action invocation.
///
/// Values are kept verbatim as strings; actions interpret them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentContext {
    values: BTreeMap<String, String>,
}

impl ArgumentContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from raw `name=value` tokens.
    ///
    /// The value is everything after the first `=`. A repeated name keeps
    /// the last value given.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Self> {
        let mut ctx = Self::new();

        for token in tokens {
            let token = token.as_ref();
            let (name, value) = parse_token(token)?;

            if let Some(previous) = ctx.values.insert(name.to_string(), value.to_string()) {
                log::debug!("argument `{}` given twice, `{}` replaces `{}`", name, value, previous);
            }
        }

        Ok(ctx)
    }

    /// Set a value, replacing any previous one
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Look up a value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Whether a value is present
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Look up a value that must be present
    pub fn require(&self, name: &str) -> anyhow::Result<&str> {
        self.get(name)
            .ok_or_else(|| anyhow::anyhow!("missing required argument `{}`", name))
    }

    /// Parse a value into a typed one. `Ok(None)` when absent.
    pub fn parse<T>(&self, name: &str) -> anyhow::Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(name) {
            None => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|e| anyhow::anyhow!("argument `{}`: cannot parse `{}`: {}", name, raw, e)),
        }
    }

    /// Iterate over `(name, value)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn parse_token(token: &str) -> Result<(&str, &str)> {
    match token.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name, value)),
        _ => Err(Error::MalformedArgument {
            token: token.to_string(),
        }),
    }
}
