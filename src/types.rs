//! Shared types for stockroom

use std::fmt;
use thiserror::Error;

/// Error type for identity validation failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("{0} cannot be empty")]
    Empty(&'static str),
}

/// The user recorded as author of store commits.
///
/// Name and email are stored as given, minus surrounding whitespace. The only
/// requirement is that neither is blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    name: String,
    email: String,
}

impl Identity {
    pub fn new(name: &str, email: &str) -> Result<Self, ParseError> {
        let name = non_blank(name, "name")?;
        let email = non_blank(email, "email")?;
        Ok(Self {
            name: name.to_string(),
            email: email.to_string(),
        })
    }

    /// Builds an identity from optional parts. Returns `None` when either
    /// part is missing or blank.
    pub fn from_parts(name: Option<&str>, email: Option<&str>) -> Option<Self> {
        Self::new(name?, email?).ok()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

fn non_blank<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ParseError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ParseError::Empty(field));
    }
    Ok(value)
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}
