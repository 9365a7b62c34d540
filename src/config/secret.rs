//! Secret strings for credentials and sensitive entity fields
//!
//! Connection strings, passwords, SSNs and bank account numbers are held in
//! [`SecretString`]. The value is zeroized on drop, redacted in `Debug`
//! output, and only reachable through `expose_secret()`.
//!
//! # Example
//!
//! ```rust
//! use credo::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let dsn = secret_string("postgresql://credo:pw@localhost/credo".to_string());
//! assert!(dsn.expose_secret().starts_with("postgresql://"));
//! assert!(!format!("{dsn:?}").contains("pw@"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// String payload of a [`SecretString`]
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    /// Parses the value, e.g. a connection string into a driver config
    pub fn parse<F: std::str::FromStr>(&self) -> Result<F, F::Err> {
        self.0.parse()
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// Zeroizing, redacted string
pub type SecretString = Secret<SecretValue>;

#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

#[inline]
pub fn secret_string_opt(value: Option<String>) -> Option<SecretString> {
    value.map(secret_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_secret_debug_redacted() {
        let secret = secret_string("123-45-6789".to_string());
        let debug_output = format!("{secret:?}");
        assert!(!debug_output.contains("123-45-6789"));
    }

    #[test]
    fn test_blank_secret_is_empty() {
        assert!(secret_string("   ".to_string()).expose_secret().is_empty());
        assert!(!secret_string("k".to_string()).expose_secret().is_empty());
    }

    #[test]
    fn test_secret_opt() {
        assert!(secret_string_opt(None).is_none());
        let key = secret_string_opt(Some("abc".to_string())).unwrap();
        assert!(key.expose_secret() == "abc");
    }

    #[test]
    fn test_secret_round_trips_through_json_body() {
        #[derive(Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Owner {
            ssn: SecretString,
        }

        let owner: Owner = serde_json::from_str(r#"{"ssn":"987-65-4321"}"#).unwrap();
        assert!(owner.ssn.expose_secret() == "987-65-4321");
        let json = serde_json::to_string(&owner).unwrap();
        assert!(json.contains("987-65-4321"));
    }
}
