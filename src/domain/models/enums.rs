//! Closed value sets used by the entity models
//!
//! Wire values match the stored documents exactly, including the historical
//! `trail` plan name and the `readWriteDelete` access level.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $wire)] $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(format!(
                        "Invalid {}: '{}' (expected one of: {})",
                        stringify!($name),
                        other,
                        [$($wire),+].join(", ")
                    )),
                }
            }
        }
    };
}

wire_enum! {
    /// Role of a user account
    UserType {
        BillingAdmin => "billingAdmin",
        SuperAdmin => "superAdmin",
        Associate => "associate",
    }
}

wire_enum! {
    /// How a user signs in
    LoginMethod {
        Email => "email",
        Google => "google",
        Microsoft => "microsoft",
    }
}

impl Default for LoginMethod {
    fn default() -> Self {
        LoginMethod::Email
    }
}

wire_enum! {
    /// Permission a user holds on one provider
    AccessLevel {
        ReadOnly => "readonly",
        ReadWrite => "readwrite",
        /// Full access, including deletes
        Admin => "readWriteDelete",
    }
}

wire_enum! {
    /// Subscription plan of a billing account
    BillingAccountPlan {
        /// Trial plan; the stored value is spelled `trail`
        Trial => "trail",
        Basic => "basic",
        Plus => "plus",
        Premium => "premium",
    }
}

wire_enum! {
    /// Payer category
    PayerType {
        Federal => "federal",
        Commercial => "commercial",
        /// Managed-care organisation; stored as `individual`
        Mco => "individual",
    }
}

wire_enum! {
    /// Provider account type; decides which PIF document the provider links
    ProviderAccountType {
        Group => "group",
        Individual => "individual",
        GroupWithoutAssociateProviders => "groupWithoutAssociateProviders",
    }
}

impl ProviderAccountType {
    /// Group-style accounts link a PifGroup, individual accounts a PifIndividual
    pub fn is_group(&self) -> bool {
        matches!(
            self,
            ProviderAccountType::Group | ProviderAccountType::GroupWithoutAssociateProviders
        )
    }
}

wire_enum! {
    /// Owner category in a group PIF
    OwnershipType {
        Entity => "entity",
        Individual => "individual",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_level_wire_values() {
        assert_eq!(
            serde_json::to_string(&AccessLevel::Admin).unwrap(),
            "\"readWriteDelete\""
        );
        let level: AccessLevel = serde_json::from_str("\"readonly\"").unwrap();
        assert_eq!(level, AccessLevel::ReadOnly);
    }

    #[test]
    fn test_plan_keeps_stored_spelling() {
        assert_eq!(BillingAccountPlan::Trial.as_str(), "trail");
        assert_eq!(
            "trail".parse::<BillingAccountPlan>().unwrap(),
            BillingAccountPlan::Trial
        );
        assert!("trial".parse::<BillingAccountPlan>().is_err());
    }

    #[test]
    fn test_payer_and_provider_individual_are_distinct_types() {
        let payer: PayerType = serde_json::from_str("\"individual\"").unwrap();
        let account: ProviderAccountType = serde_json::from_str("\"individual\"").unwrap();
        assert_eq!(payer, PayerType::Mco);
        assert_eq!(account, ProviderAccountType::Individual);
    }

    #[test]
    fn test_unknown_value_rejected() {
        let err = "owner".parse::<UserType>().unwrap_err();
        assert!(err.contains("billingAdmin"));
        assert!(serde_json::from_str::<UserType>("\"owner\"").is_err());
    }

    #[test]
    fn test_group_account_types() {
        assert!(ProviderAccountType::Group.is_group());
        assert!(ProviderAccountType::GroupWithoutAssociateProviders.is_group());
        assert!(!ProviderAccountType::Individual.is_group());
    }

    #[test]
    fn test_login_method_default() {
        assert_eq!(LoginMethod::default(), LoginMethod::Email);
        assert_eq!(LoginMethod::ALL.len(), 3);
    }
}
