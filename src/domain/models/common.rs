//! Value objects embedded in several entities

use crate::domain::entity::{invalid, trim_opt};
use crate::domain::kind::EntityKind;
use crate::domain::result::Result;
use serde::{Deserialize, Serialize};

/// Postal address embedded inside a PIF document
///
/// Unlike [`Address`](super::Address) documents these are not shared; they
/// live and die with the PIF that contains them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, alias = "postalCode")]
    pub zip: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl PostalAddress {
    pub fn normalize(&mut self) {
        trim_opt(&mut self.street);
        trim_opt(&mut self.city);
        trim_opt(&mut self.state);
        trim_opt(&mut self.zip);
        trim_opt(&mut self.country);
    }

    /// Fails unless every component is present
    pub fn require_complete(&self, kind: EntityKind, field: &str) -> Result<()> {
        let missing: Vec<&str> = [
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("zip", &self.zip),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(invalid(
                kind,
                format!("{field} is missing {}", missing.join(", ")),
            ))
        }
    }
}

/// Month/year range used for education, training and privileges
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthRange {
    #[serde(default)]
    pub from_month: Option<String>,
    #[serde(default)]
    pub from_year: Option<i32>,
    #[serde(default)]
    pub to_month: Option<String>,
    #[serde(default)]
    pub to_year: Option<i32>,
}

impl MonthRange {
    /// False when both ends are known and the end precedes the start
    pub fn is_ordered(&self) -> bool {
        match (self.from_year, self.to_year) {
            (Some(from), Some(to)) if from != to => from < to,
            (Some(_), Some(_)) => {
                let from = self.from_month.as_deref().and_then(month_index);
                let to = self.to_month.as_deref().and_then(month_index);
                match (from, to) {
                    (Some(from), Some(to)) => from <= to,
                    _ => true,
                }
            }
            _ => true,
        }
    }

    pub fn require_ordered(&self, kind: EntityKind, field: &str) -> Result<()> {
        if self.is_ordered() {
            Ok(())
        } else {
            Err(invalid(kind, format!("{field} ends before it starts")))
        }
    }
}

/// Month number from `3`, `03`, `Mar` or `March`
fn month_index(month: &str) -> Option<u32> {
    let month = month.trim();
    if let Ok(number) = month.parse::<u32>() {
        return (1..=12).contains(&number).then_some(number);
    }

    const NAMES: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let prefix = month.get(..3)?.to_ascii_lowercase();
    NAMES
        .iter()
        .position(|name| *name == prefix)
        .map(|index| index as u32 + 1)
}
