//! Provider Information Form for individual practitioners

use super::common::{MonthRange, PostalAddress};
use crate::config::SecretString;
use crate::domain::entity::{
    capitalize, detach_all, invalid, looks_like_email, require_ordered, trim_opt, Entity,
    Reference, References,
};
use crate::domain::ids::DocumentId;
use crate::domain::kind::EntityKind;
use crate::domain::result::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfessionalLicense {
    pub license_id: Option<String>,
    pub license_state: Option<String>,
    pub effective_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub license_type: Option<String>,
    pub uploads: Vec<DocumentId>,
}

/// DEA controlled-substance registration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeaRegistration {
    pub dea_number: Option<String>,
    pub license_state: Option<String>,
    pub effective_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub uploads: Vec<DocumentId>,
}

/// State controlled dangerous substances registration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CdsRegistration {
    pub cds_number: Option<String>,
    pub state: Option<String>,
    pub effective_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub uploads: Vec<DocumentId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Education {
    pub education_type: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub county: Option<String>,
    pub institution_or_school_name: Option<String>,
    pub degree: Option<String>,
    pub attendance_date_range: Option<MonthRange>,
    pub currently_attending: Option<bool>,
    pub uploads: Vec<DocumentId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfessionalTraining {
    pub training_type: Option<String>,
    pub other_training_type: Option<String>,
    pub institution_or_facility_name: Option<String>,
    pub affiliated_university: Option<String>,
    pub attendance_date_range: Option<MonthRange>,
    pub currently_attending: Option<bool>,
    pub uploads: Vec<DocumentId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecialtyCertification {
    pub specialty_priority: Option<String>,
    pub specialty: Option<String>,
    pub specialty_taxonomy: Option<String>,
    pub board_certified: Option<bool>,
    pub certifying_board: Option<String>,
    pub initial_certification_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub last_recertification_date: Option<DateTime<Utc>>,
    pub uploads: Vec<DocumentId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdmittingPrivilege {
    pub state: Option<String>,
    pub country: Option<String>,
    pub hospital_name: Option<String>,
    pub is_this_primary_hospital: Option<bool>,
    pub admitting_privilege_status: Option<String>,
    pub admitting_privilege_type: Option<String>,
    pub department: Option<String>,
    pub admitting_privilege_dates: Option<MonthRange>,
    pub uploads: Vec<DocumentId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdmittingArrangement {
    pub details: Option<Value>,
    pub uploads: Vec<DocumentId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfessionalLiabilityInsurance {
    pub policy_number: Option<String>,
    pub covered_practices: Option<Value>,
    pub effective: Option<DateTime<Utc>>,
    pub expiry: Option<DateTime<Utc>>,
    pub original_expiry: Option<DateTime<Utc>>,
    pub carrier_name: Option<String>,
    pub carrier_address: Option<Value>,
    pub carrier_phone: Option<String>,
    pub carrier_fax: Option<String>,
    pub has_unlimited_coverage: Option<bool>,
    pub type_of_coverage: Option<String>,
    pub coverage_per_occurrence: Option<f64>,
    pub coverage_per_aggregate: Option<f64>,
    pub has_made_any_claims: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmploymentDetail {
    pub practice_or_employer_name: Option<String>,
    pub department_or_specialty: Option<String>,
    pub address: Option<PostalAddress>,
    pub employment_dates: Option<MonthRange>,
}

/// Individual practitioner's information form
///
/// Almost every field is optional: the form is filled in over several
/// onboarding steps and saved after each one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PifIndividual {
    #[serde(alias = "provider")]
    pub providers: Vec<DocumentId>,
    #[serde(alias = "associateProvider")]
    pub associate_providers: Vec<DocumentId>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub home_address: Option<PostalAddress>,
    pub mailing_address: Option<PostalAddress>,
    pub mailing_address_same_as_home: Option<bool>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssn: Option<SecretString>,
    pub gender: Option<String>,
    pub dob: Option<DateTime<Utc>>,
    pub birth_city: Option<String>,
    pub birth_state: Option<String>,
    pub birth_country: Option<String>,
    pub race_or_ethnicity: Option<String>,
    pub languages: Vec<String>,
    pub professional_licenses: Vec<ProfessionalLicense>,
    pub dea: Vec<DeaRegistration>,
    pub cds: Vec<CdsRegistration>,
    pub medicaid: Option<Value>,
    pub medicare: Option<Value>,
    pub education: Vec<Education>,
    pub professional_training: Vec<ProfessionalTraining>,
    pub specialty_and_board_certification_details: Vec<SpecialtyCertification>,
    pub admitting_privileges: Vec<AdmittingPrivilege>,
    pub admitting_arrangements: Vec<AdmittingArrangement>,
    pub professional_liability_insurance: Vec<ProfessionalLiabilityInsurance>,
    pub employment_details: Vec<EmploymentDetail>,
    pub uploads: Vec<DocumentId>,
    pub provider_type: Option<String>,
    pub practicing_states: Vec<String>,
}

impl PifIndividual {
    /// First, middle and last name, each capitalised, skipping missing parts
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<String> = [&self.first_name, &self.middle_name, &self.last_name]
            .into_iter()
            .flatten()
            .map(|part| capitalize(part))
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }

    fn validate_ranges(&self) -> Result<()> {
        let kind = Self::KIND;
        for (i, license) in self.professional_licenses.iter().enumerate() {
            require_ordered(
                kind,
                &format!("professionalLicenses[{i}]"),
                license.effective_date,
                license.expiry_date,
            )?;
        }
        for (i, dea) in self.dea.iter().enumerate() {
            require_ordered(kind, &format!("dea[{i}]"), dea.effective_date, dea.expiry_date)?;
        }
        for (i, cds) in self.cds.iter().enumerate() {
            require_ordered(kind, &format!("cds[{i}]"), cds.effective_date, cds.expiry_date)?;
        }
        for (i, cert) in self.specialty_and_board_certification_details.iter().enumerate() {
            require_ordered(
                kind,
                &format!("specialtyAndBoardCertificationDetails[{i}]"),
                cert.initial_certification_date,
                cert.expiry_date,
            )?;
        }
        for (i, insurance) in self.professional_liability_insurance.iter().enumerate() {
            let field = format!("professionalLiabilityInsurance[{i}]");
            require_ordered(kind, &field, insurance.effective, insurance.expiry)?;
            if let (Some(occurrence), Some(aggregate)) = (
                insurance.coverage_per_occurrence,
                insurance.coverage_per_aggregate,
            ) {
                if occurrence > aggregate {
                    return Err(invalid(
                        kind,
                        format!("{field}: coveragePerOccurrence exceeds coveragePerAggregate"),
                    ));
                }
            }
        }

        for (i, education) in self.education.iter().enumerate() {
            if let Some(range) = &education.attendance_date_range {
                range.require_ordered(kind, &format!("education[{i}].attendanceDateRange"))?;
            }
        }
        for (i, training) in self.professional_training.iter().enumerate() {
            if let Some(range) = &training.attendance_date_range {
                range.require_ordered(
                    kind,
                    &format!("professionalTraining[{i}].attendanceDateRange"),
                )?;
            }
        }
        for (i, privilege) in self.admitting_privileges.iter().enumerate() {
            if let Some(range) = &privilege.admitting_privilege_dates {
                range.require_ordered(
                    kind,
                    &format!("admittingPrivileges[{i}].admittingPrivilegeDates"),
                )?;
            }
        }
        for (i, employment) in self.employment_details.iter().enumerate() {
            if let Some(range) = &employment.employment_dates {
                range.require_ordered(kind, &format!("employmentDetails[{i}].employmentDates"))?;
            }
        }
        Ok(())
    }
}

impl Entity for PifIndividual {
    const KIND: EntityKind = EntityKind::PifIndividual;
    const SECRET_FIELDS: &'static [&'static str] = &["ssn"];

    fn normalize(&mut self) {
        trim_opt(&mut self.first_name);
        trim_opt(&mut self.middle_name);
        trim_opt(&mut self.last_name);
        trim_opt(&mut self.email);
        trim_opt(&mut self.phone);
        if let Some(address) = &mut self.home_address {
            address.normalize();
        }
        if let Some(address) = &mut self.mailing_address {
            address.normalize();
        }
        self.languages.retain(|language| !language.trim().is_empty());
        self.practicing_states
            .retain(|state| !state.trim().is_empty());
    }

    fn validate(&self) -> Result<()> {
        if let Some(email) = &self.email {
            if !looks_like_email(email) {
                return Err(invalid(
                    Self::KIND,
                    format!("email '{email}' is not a valid address"),
                ));
            }
        }

        let primary_hospitals = self
            .admitting_privileges
            .iter()
            .filter(|privilege| privilege.is_this_primary_hospital == Some(true))
            .count();
        if primary_hospitals > 1 {
            return Err(invalid(
                Self::KIND,
                "admittingPrivileges can mark at most one primary hospital",
            ));
        }

        self.validate_ranges()
    }

    fn references(&self) -> Vec<Reference> {
        References::new()
            .each("providers", EntityKind::Provider, &self.providers)
            .each(
                "associateProviders",
                EntityKind::ProviderAssociate,
                &self.associate_providers,
            )
            .each(
                "professionalLicenses.uploads",
                EntityKind::Upload,
                self.professional_licenses.iter().flat_map(|x| &x.uploads),
            )
            .each(
                "dea.uploads",
                EntityKind::Upload,
                self.dea.iter().flat_map(|x| &x.uploads),
            )
            .each(
                "cds.uploads",
                EntityKind::Upload,
                self.cds.iter().flat_map(|x| &x.uploads),
            )
            .each(
                "education.uploads",
                EntityKind::Upload,
                self.education.iter().flat_map(|x| &x.uploads),
            )
            .each(
                "professionalTraining.uploads",
                EntityKind::Upload,
                self.professional_training.iter().flat_map(|x| &x.uploads),
            )
            .each(
                "specialtyAndBoardCertificationDetails.uploads",
                EntityKind::Upload,
                self.specialty_and_board_certification_details
                    .iter()
                    .flat_map(|x| &x.uploads),
            )
            .each(
                "admittingPrivileges.uploads",
                EntityKind::Upload,
                self.admitting_privileges.iter().flat_map(|x| &x.uploads),
            )
            .each(
                "admittingArrangements.uploads",
                EntityKind::Upload,
                self.admitting_arrangements.iter().flat_map(|x| &x.uploads),
            )
            .each("uploads", EntityKind::Upload, &self.uploads)
            .build()
    }

    fn detach(&mut self, target: &DocumentId) -> bool {
        let mut changed = detach_all(&mut self.providers, target);
        changed |= detach_all(&mut self.associate_providers, target);
        changed |= detach_all(&mut self.uploads, target);

        let nested = self
            .professional_licenses
            .iter_mut()
            .map(|x| &mut x.uploads)
            .chain(self.dea.iter_mut().map(|x| &mut x.uploads))
            .chain(self.cds.iter_mut().map(|x| &mut x.uploads))
            .chain(self.education.iter_mut().map(|x| &mut x.uploads))
            .chain(self.professional_training.iter_mut().map(|x| &mut x.uploads))
            .chain(
                self.specialty_and_board_certification_details
                    .iter_mut()
                    .map(|x| &mut x.uploads),
            )
            .chain(self.admitting_privileges.iter_mut().map(|x| &mut x.uploads))
            .chain(self.admitting_arrangements.iter_mut().map(|x| &mut x.uploads));
        for uploads in nested {
            changed |= detach_all(uploads, target);
        }
        changed
    }

    fn virtuals(&self) -> Vec<(&'static str, Value)> {
        match self.full_name() {
            Some(name) => vec![("displayName", Value::String(name))],
            None => Vec::new(),
        }
    }
}
