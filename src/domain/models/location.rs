//! Practice locations and shared street addresses

use crate::domain::entity::{
    invalid, looks_like_email, require_text, trim, trim_opt, Entity, Reference, References,
};
use crate::domain::ids::DocumentId;
use crate::domain::kind::EntityKind;
use crate::domain::result::Result;
use serde::{Deserialize, Serialize};

/// Street address document, shared by reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street_line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

impl Entity for Address {
    const KIND: EntityKind = EntityKind::Address;

    fn normalize(&mut self) {
        trim(&mut self.street_line1);
        trim_opt(&mut self.street_line2);
        trim(&mut self.city);
        trim(&mut self.state);
        trim(&mut self.zip_code);
    }

    fn validate(&self) -> Result<()> {
        require_text(Self::KIND, "streetLine1", &self.street_line1)?;
        require_text(Self::KIND, "city", &self.city)?;
        require_text(Self::KIND, "state", &self.state)?;
        require_text(Self::KIND, "zipCode", &self.zip_code)
    }

    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }
}

/// National Provider Identifiers are ten digits
const NPI_RANGE: std::ops::RangeInclusive<u64> = 1_000_000_000..=9_999_999_999;

/// A practice location of a provider or associate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderLocation {
    pub location_name: String,
    pub address: DocumentId,
    #[serde(
        default,
        rename = "taxID",
        alias = "taxId",
        skip_serializing_if = "Option::is_none"
    )]
    pub tax_id: Option<String>,
    pub npi: u64,
    pub office_contact_name: String,
    pub phone_number: String,
    pub fax_number: String,
    pub email_id: String,
}

impl Entity for ProviderLocation {
    const KIND: EntityKind = EntityKind::ProviderLocation;

    fn normalize(&mut self) {
        trim(&mut self.location_name);
        trim_opt(&mut self.tax_id);
        trim(&mut self.office_contact_name);
        trim(&mut self.phone_number);
        trim(&mut self.fax_number);
        trim(&mut self.email_id);
    }

    fn validate(&self) -> Result<()> {
        require_text(Self::KIND, "locationName", &self.location_name)?;
        require_text(Self::KIND, "officeContactName", &self.office_contact_name)?;
        require_text(Self::KIND, "phoneNumber", &self.phone_number)?;
        require_text(Self::KIND, "faxNumber", &self.fax_number)?;
        require_text(Self::KIND, "emailId", &self.email_id)?;

        if !NPI_RANGE.contains(&self.npi) {
            return Err(invalid(
                Self::KIND,
                format!("npi {} must be a 10-digit number", self.npi),
            ));
        }
        if !looks_like_email(&self.email_id) {
            return Err(invalid(
                Self::KIND,
                format!("emailId '{}' is not a valid address", self.email_id),
            ));
        }
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        References::new()
            .required("address", EntityKind::Address, &self.address)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn location(npi: u64) -> ProviderLocation {
        serde_json::from_value(json!({
            "locationName": " Main Office ",
            "address": "65f1c2a4b7e3d90012ab34cd",
            "taxID": "12-3456789",
            "npi": npi,
            "officeContactName": "Pat Lee",
            "phoneNumber": "555-0100",
            "faxNumber": "555-0101",
            "emailId": "office@lakeside.example"
        }))
        .unwrap()
    }

    #[test_case(1_234_567_893, true ; "ten digits")]
    #[test_case(123_456_789, false ; "nine digits")]
    #[test_case(12_345_678_901, false ; "eleven digits")]
    fn test_npi_length(npi: u64, valid: bool) {
        assert_eq!(location(npi).validate().is_ok(), valid);
    }

    #[test]
    fn test_location_name_trimmed() {
        let mut location = location(1_234_567_893);
        location.normalize();
        assert_eq!(location.location_name, "Main Office");
        assert_eq!(location.tax_id.as_deref(), Some("12-3456789"));
    }

    #[test]
    fn test_address_requires_street() {
        let mut address = Address {
            street_line1: "  ".to_string(),
            street_line2: Some(" ".to_string()),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip_code: "62701".to_string(),
        };
        address.normalize();
        assert!(address.street_line2.is_none());
        assert!(address.validate().is_err());
    }
}
