//! Provider Information Form for group practices and facilities

use super::common::PostalAddress;
use super::enums::OwnershipType;
use crate::config::SecretString;
use crate::domain::entity::{
    capitalize, detach_all, detach_one, invalid, looks_like_email, require_ordered, require_text,
    trim, trim_opt, Entity, Reference, References,
};
use crate::domain::ids::DocumentId;
use crate::domain::kind::EntityKind;
use crate::domain::result::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupLicense {
    pub license_number: String,
    pub license_type: String,
    pub effective: DateTime<Utc>,
    pub expiry: DateTime<Utc>,
    #[serde(default)]
    pub uploads: Vec<DocumentId>,
    #[serde(default)]
    pub comments: Vec<DocumentId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiabilityInsurance {
    pub insurance_carrier: String,
    pub policy_number: String,
    pub effective_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    #[serde(default)]
    pub uploads: Vec<DocumentId>,
    #[serde(default)]
    pub comments: Vec<DocumentId>,
}

/// An owner of the group: another entity or a person
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ownership {
    #[serde(rename = "types")]
    pub owner_type: OwnershipType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<DocumentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incorporation_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fax: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssn: Option<SecretString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ownership_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drivers_license_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drivers_license_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_address: Option<DocumentId>,
    #[serde(default)]
    pub uploads: Vec<DocumentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_stamp: Option<DateTime<Utc>>,
}

impl Ownership {
    /// Entity name for entity owners, capitalised full name for individuals
    pub fn display_name(&self) -> Option<String> {
        match self.owner_type {
            OwnershipType::Entity => self.entity_name.clone(),
            OwnershipType::Individual => match (&self.first_name, &self.last_name) {
                (Some(first), Some(last)) => {
                    Some(format!("{} {}", capitalize(first), capitalize(last)))
                }
                (Some(name), None) | (None, Some(name)) => Some(capitalize(name)),
                (None, None) => None,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankInformation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<SecretString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_contact: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PifGroup {
    #[serde(default, alias = "provider")]
    pub providers: Vec<DocumentId>,
    pub legal_business_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dba: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npi_enumeration_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incorporation_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incorporation_state: Option<String>,
    pub practice_address: PostalAddress,
    pub mailing_address: PostalAddress,
    pub billing_address: PostalAddress,
    #[serde(default)]
    pub mailing_address_same_as_practice: bool,
    #[serde(default)]
    pub billing_address_same_as_practice_address: bool,
    #[serde(default)]
    pub liability_insurance: Vec<LiabilityInsurance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fax: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signatory_email: Option<String>,
    #[serde(default)]
    pub licenses: Vec<GroupLicense>,
    #[serde(default)]
    pub owners: Vec<Ownership>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_information: Option<BankInformation>,
    #[serde(default)]
    pub uploads: Vec<DocumentId>,
}

impl PifGroup {
    fn validate_owners(&self) -> Result<()> {
        let mut total = 0.0;
        for (index, owner) in self.owners.iter().enumerate() {
            match owner.owner_type {
                OwnershipType::Entity if owner.entity_name.is_none() => {
                    return Err(invalid(
                        Self::KIND,
                        format!("owners[{index}]: entity owners require entityName"),
                    ));
                }
                OwnershipType::Individual
                    if owner.first_name.is_none() || owner.last_name.is_none() =>
                {
                    return Err(invalid(
                        Self::KIND,
                        format!("owners[{index}]: individual owners require firstName and lastName"),
                    ));
                }
                _ => {}
            }

            if let Some(percentage) = owner.ownership_percentage {
                if !(0.0..=100.0).contains(&percentage) {
                    return Err(invalid(
                        Self::KIND,
                        format!("owners[{index}]: ownershipPercentage {percentage} is outside 0..=100"),
                    ));
                }
                total += percentage;
            }
        }

        // Allow for float noise in splits like 33.33 x 3.
        if total > 100.0 + 1e-6 {
            return Err(invalid(
                Self::KIND,
                format!("owners: ownership percentages sum to {total}, more than 100"),
            ));
        }
        Ok(())
    }
}

impl Entity for PifGroup {
    const KIND: EntityKind = EntityKind::PifGroup;
    const SECRET_FIELDS: &'static [&'static str] =
        &["owners.ssn", "bankInformation.accountNumber"];

    fn normalize(&mut self) {
        trim(&mut self.legal_business_name);
        trim_opt(&mut self.dba);
        trim_opt(&mut self.tax_id);
        trim_opt(&mut self.npi);
        trim_opt(&mut self.email);
        trim_opt(&mut self.signatory_email);
        self.practice_address.normalize();
        self.mailing_address.normalize();
        self.billing_address.normalize();
        for owner in &mut self.owners {
            trim_opt(&mut owner.entity_name);
            trim_opt(&mut owner.first_name);
            trim_opt(&mut owner.last_name);
            trim_opt(&mut owner.email);
        }
    }

    fn validate(&self) -> Result<()> {
        require_text(Self::KIND, "legalBusinessName", &self.legal_business_name)?;
        self.practice_address
            .require_complete(Self::KIND, "practiceAddress")?;
        self.mailing_address
            .require_complete(Self::KIND, "mailingAddress")?;
        self.billing_address
            .require_complete(Self::KIND, "billingAddress")?;

        for (field, email) in [("email", &self.email), ("signatoryEmail", &self.signatory_email)] {
            if let Some(email) = email {
                if !looks_like_email(email) {
                    return Err(invalid(
                        Self::KIND,
                        format!("{field} '{email}' is not a valid address"),
                    ));
                }
            }
        }

        for (index, license) in self.licenses.iter().enumerate() {
            let field = format!("licenses[{index}]");
            require_text(Self::KIND, &format!("{field}.licenseNumber"), &license.license_number)?;
            require_text(Self::KIND, &format!("{field}.licenseType"), &license.license_type)?;
            require_ordered(Self::KIND, &field, Some(license.effective), Some(license.expiry))?;
        }

        for (index, insurance) in self.liability_insurance.iter().enumerate() {
            let field = format!("liabilityInsurance[{index}]");
            require_text(
                Self::KIND,
                &format!("{field}.insuranceCarrier"),
                &insurance.insurance_carrier,
            )?;
            require_text(Self::KIND, &format!("{field}.policyNumber"), &insurance.policy_number)?;
            require_ordered(
                Self::KIND,
                &field,
                Some(insurance.effective_date),
                Some(insurance.expiry_date),
            )?;
        }

        self.validate_owners()
    }

    fn references(&self) -> Vec<Reference> {
        References::new()
            .each("providers", EntityKind::Provider, &self.providers)
            .each(
                "licenses.uploads",
                EntityKind::Upload,
                self.licenses.iter().flat_map(|l| &l.uploads),
            )
            .each(
                "licenses.comments",
                EntityKind::Comment,
                self.licenses.iter().flat_map(|l| &l.comments),
            )
            .each(
                "liabilityInsurance.uploads",
                EntityKind::Upload,
                self.liability_insurance.iter().flat_map(|i| &i.uploads),
            )
            .each(
                "liabilityInsurance.comments",
                EntityKind::Comment,
                self.liability_insurance.iter().flat_map(|i| &i.comments),
            )
            .each(
                "owners.address",
                EntityKind::Address,
                self.owners.iter().filter_map(|o| o.address.as_ref()),
            )
            .each(
                "owners.homeAddress",
                EntityKind::Address,
                self.owners.iter().filter_map(|o| o.home_address.as_ref()),
            )
            .each(
                "owners.uploads",
                EntityKind::Upload,
                self.owners.iter().flat_map(|o| &o.uploads),
            )
            .each("uploads", EntityKind::Upload, &self.uploads)
            .build()
    }

    fn detach(&mut self, target: &DocumentId) -> bool {
        let mut changed = detach_all(&mut self.providers, target);
        changed |= detach_all(&mut self.uploads, target);
        for license in &mut self.licenses {
            changed |= detach_all(&mut license.uploads, target);
            changed |= detach_all(&mut license.comments, target);
        }
        for insurance in &mut self.liability_insurance {
            changed |= detach_all(&mut insurance.uploads, target);
            changed |= detach_all(&mut insurance.comments, target);
        }
        for owner in &mut self.owners {
            changed |= detach_one(&mut owner.address, target);
            changed |= detach_one(&mut owner.home_address, target);
            changed |= detach_all(&mut owner.uploads, target);
        }
        changed
    }

    fn virtuals(&self) -> Vec<(&'static str, Value)> {
        let names: Vec<Value> = self
            .owners
            .iter()
            .map(|owner| owner.display_name().map(Value::String).unwrap_or(Value::Null))
            .collect();
        vec![("ownerDisplayNames", Value::Array(names))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Value {
        let address = json!({
            "street": "100 Lake Rd",
            "city": "Madison",
            "state": "WI",
            "zip": "53703",
            "country": "US"
        });
        json!({
            "provider": ["000000000000000000000001"],
            "legalBusinessName": " Lakeside Medical Group LLC ",
            "practiceAddress": address,
            "mailingAddress": address,
            "billingAddress": address,
            "licenses": [{
                "licenseNumber": "WI-2231",
                "licenseType": "Facility",
                "effective": "2023-01-01T00:00:00Z",
                "expiry": "2026-01-01T00:00:00Z",
                "uploads": ["000000000000000000000002"]
            }],
            "owners": [
                {"types": "individual", "firstName": "ana", "lastName": "ruiz", "ownershipPercentage": 60.0},
                {"types": "entity", "entityName": "Lake Holdings", "ownershipPercentage": 40.0,
                 "homeAddress": "000000000000000000000003"}
            ]
        })
    }

    fn group() -> PifGroup {
        let mut group: PifGroup = serde_json::from_value(payload()).unwrap();
        group.normalize();
        group
    }

    #[test]
    fn test_valid_group() {
        let group = group();
        assert_eq!(group.legal_business_name, "Lakeside Medical Group LLC");
        assert_eq!(group.providers.len(), 1);
        assert!(group.validate().is_ok());
    }

    #[test]
    fn test_incomplete_practice_address_rejected() {
        let mut group = group();
        group.practice_address.city = None;
        let err = group.validate().unwrap_err();
        assert!(err.to_string().contains("practiceAddress"));
    }

    #[test]
    fn test_license_dates_must_be_ordered() {
        let mut group = group();
        group.licenses[0].expiry = group.licenses[0].effective - chrono::Duration::days(1);
        assert!(group.validate().is_err());
    }

    #[test]
    fn test_ownership_over_one_hundred_rejected() {
        let mut group = group();
        group.owners[1].ownership_percentage = Some(50.0);
        let err = group.validate().unwrap_err();
        assert!(err.to_string().contains("sum to 110"));
    }

    #[test]
    fn test_ownership_split_in_thirds_accepted() {
        let mut group = group();
        group.owners[0].ownership_percentage = Some(33.333333);
        group.owners[1].ownership_percentage = Some(66.666667);
        assert!(group.validate().is_ok());
    }

    #[test]
    fn test_entity_owner_requires_name() {
        let mut group = group();
        group.owners[1].entity_name = None;
        assert!(group.validate().is_err());
    }

    #[test]
    fn test_owner_display_names() {
        let group = group();
        assert_eq!(group.owners[0].display_name().as_deref(), Some("Ana Ruiz"));
        assert_eq!(group.owners[1].display_name().as_deref(), Some("Lake Holdings"));
    }

    #[test]
    fn test_references_cover_nested_fields() {
        let group = group();
        let fields: Vec<&str> = group.references().iter().map(|r| r.field).collect();
        assert_eq!(
            fields,
            vec!["providers", "licenses.uploads", "owners.homeAddress"]
        );
    }

    #[test]
    fn test_detach_nested_upload() {
        let mut group = group();
        let upload = DocumentId::new("000000000000000000000002").unwrap();
        assert!(group.detach(&upload));
        assert!(group.licenses[0].uploads.is_empty());
    }

    #[test]
    fn test_wire_form_omits_secrets() {
        use crate::domain::record::{Actor, Audit, LifecycleState, Record};

        let mut value = payload();
        value["owners"][0]["ssn"] = json!("123-45-6789");
        value["bankInformation"] = json!({"bankName": "First Lake", "accountNumber": "000111222"});
        let body: PifGroup = serde_json::from_value(value).unwrap();
        let record = Record {
            id: DocumentId::generate(),
            custom_id: None,
            version: 1,
            state: LifecycleState::Persisted,
            audit: Audit::stamp(&Actor::System, Utc::now()),
            body,
        };

        let wire = record.to_json().unwrap();
        assert!(wire["owners"][0].get("ssn").is_none());
        assert_eq!(wire["owners"][0]["firstName"], "ana");
        assert!(wire["bankInformation"].get("accountNumber").is_none());
        assert_eq!(wire["bankInformation"]["bankName"], "First Lake");

        let stored = record.to_stored().unwrap();
        assert_eq!(stored.body["owners"][0]["ssn"], "123-45-6789");
        assert_eq!(stored.body["bankInformation"]["accountNumber"], "000111222");
    }
}
