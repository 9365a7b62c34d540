//! Result type alias for Credo

use super::errors::CredoError;

/// Result type alias for Credo operations
///
/// # Examples
///
/// ```
/// use credo::domain::result::Result;
/// use credo::domain::errors::CredoError;
/// use credo::domain::EntityKind;
///
/// fn failing_function() -> Result<()> {
///     Err(CredoError::validation(EntityKind::User, "email is required"))
/// }
///
/// assert!(failing_function().is_err());
/// ```
pub type Result<T> = std::result::Result<T, CredoError>;
