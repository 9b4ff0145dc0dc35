//! ADO.NET style connection strings (`Key=Value;Key=Value`).
//!
//! Only the three fields this crate ever sets are modelled: data source,
//! initial catalog and integrated security. The parser accepts the common
//! synonyms for those keys so strings produced by other tools can be read
//! back, but rejects anything else.
use std::fmt;
use std::str::FromStr;

use crate::error::TempDbError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionString {
    data_source: Option<String>,
    initial_catalog: Option<String>,
    integrated_security: Option<bool>,
}

impl ConnectionString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data_source(mut self, value: impl Into<String>) -> Self {
        self.data_source = Some(value.into());
        self
    }

    pub fn initial_catalog(mut self, value: impl Into<String>) -> Self {
        self.initial_catalog = Some(value.into());
        self
    }

    pub fn integrated_security(mut self, value: bool) -> Self {
        self.integrated_security = Some(value);
        self
    }

    pub fn get_data_source(&self) -> Option<&str> {
        self.data_source.as_deref()
    }

    pub fn get_initial_catalog(&self) -> Option<&str> {
        self.initial_catalog.as_deref()
    }

    pub fn get_integrated_security(&self) -> Option<bool> {
        self.integrated_security
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    DataSource,
    InitialCatalog,
    IntegratedSecurity,
}

impl Key {
    fn lookup(raw: &str) -> Option<Key> {
        let normalized = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        match normalized.as_str() {
            "data source" | "server" | "address" | "addr" | "network address" => {
                Some(Key::DataSource)
            }
            "initial catalog" | "database" => Some(Key::InitialCatalog),
            "integrated security" | "trusted_connection" => Some(Key::IntegratedSecurity),
            _ => None,
        }
    }
}

fn parse_bool(value: &str) -> Result<bool, TempDbError> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "sspi" => Ok(true),
        "false" | "no" => Ok(false),
        _ => Err(TempDbError::Parse(format!(
            "Expected a boolean value, got '{}'",
            value
        ))),
    }
}

fn needs_quoting(value: &str) -> bool {
    value.contains([';', '=', '"', '\''])
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace)
}

fn write_pair(f: &mut fmt::Formatter<'_>, first: &mut bool, key: &str, value: &str) -> fmt::Result {
    if !*first {
        f.write_str(";")?;
    }
    *first = false;
    if needs_quoting(value) {
        write!(f, "{}=\"{}\"", key, value.replace('"', "\"\""))
    } else {
        write!(f, "{}={}", key, value)
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        if let Some(ref source) = self.data_source {
            write_pair(f, &mut first, "Data Source", source)?;
        }
        if let Some(ref catalog) = self.initial_catalog {
            write_pair(f, &mut first, "Initial Catalog", catalog)?;
        }
        if let Some(integrated) = self.integrated_security {
            let value = if integrated { "True" } else { "False" };
            write_pair(f, &mut first, "Integrated Security", value)?;
        }
        Ok(())
    }
}

impl FromStr for ConnectionString {
    type Err = TempDbError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut result = ConnectionString::new();
        for (raw_key, value) in split_pairs(s)? {
            let key = Key::lookup(&raw_key).ok_or_else(|| {
                TempDbError::Parse(format!("Unsupported keyword: '{}'", raw_key.trim()))
            })?;
            match key {
                Key::DataSource => result.data_source = Some(value),
                Key::InitialCatalog => result.initial_catalog = Some(value),
                Key::IntegratedSecurity => result.integrated_security = Some(parse_bool(&value)?),
            }
        }
        Ok(result)
    }
}

/// Split a connection string into raw `(key, value)` pairs, unquoting values.
fn split_pairs(s: &str) -> Result<Vec<(String, String)>, TempDbError> {
    let mut pairs = Vec::new();
    let mut chars = s.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ';') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        loop {
            match chars.next() {
                Some('=') => break,
                Some(c) => key.push(c),
                None => {
                    return Err(TempDbError::Parse(format!(
                        "Missing '=' after keyword '{}'",
                        key.trim()
                    )))
                }
            }
        }
        if key.trim().is_empty() {
            return Err(TempDbError::Parse("Empty keyword".to_string()));
        }

        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }

        let value = match chars.peek().copied() {
            Some(quote @ ('"' | '\'')) => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == quote => {
                            // A doubled quote is a literal quote character.
                            if chars.peek() == Some(&quote) {
                                chars.next();
                                value.push(quote);
                            } else {
                                break;
                            }
                        }
                        Some(c) => value.push(c),
                        None => {
                            return Err(TempDbError::Parse(format!(
                                "Unterminated quoted value for '{}'",
                                key.trim()
                            )))
                        }
                    }
                }
                while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
                    chars.next();
                }
                match chars.next() {
                    None | Some(';') => {}
                    Some(c) => {
                        return Err(TempDbError::Parse(format!(
                            "Unexpected '{}' after quoted value for '{}'",
                            c,
                            key.trim()
                        )))
                    }
                }
                value
            }
            _ => {
                let mut value = String::new();
                for c in chars.by_ref() {
                    if c == ';' {
                        break;
                    }
                    value.push(c);
                }
                value.trim_end().to_string()
            }
        };

        pairs.push((key, value));
    }

    Ok(pairs)
}
