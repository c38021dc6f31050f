//! Client-related types shared between server and client
//!
//! Request/response bodies of the auth and profile endpoints. The mock
//! backend serializes them and the session client decodes them.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::models::{Role, UserRecord};

/// Minimum length for a new password, checked by forms before submitting
pub const MIN_PASSWORD_LEN: usize = 6;

// =============================================================================
// Auth API DTOs
// =============================================================================

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Registration request
///
/// Business fields are only meaningful for sellers; a seller must at least
/// provide a business name.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
}

impl RegisterRequest {
    /// Request with the role-independent required fields
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        phone: impl Into<String>,
        address: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            phone: phone.into(),
            address: address.into(),
            city: None,
            state: None,
            zipcode: None,
            role,
            business_name: None,
            business_description: None,
            tax_id: None,
        }
    }

    pub fn with_location(
        mut self,
        city: impl Into<String>,
        state: impl Into<String>,
        zipcode: impl Into<String>,
    ) -> Self {
        self.city = Some(city.into());
        self.state = Some(state.into());
        self.zipcode = Some(zipcode.into());
        self
    }

    pub fn with_business(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        tax_id: impl Into<String>,
    ) -> Self {
        self.business_name = Some(name.into());
        self.business_description = Some(description.into());
        self.tax_id = Some(tax_id.into());
        self
    }

    /// Field validation plus the seller business-name rule.
    ///
    /// Returns the first human-readable problem.
    pub fn check(&self) -> Result<(), String> {
        self.validate()
            .map_err(|errors| first_validation_message(&errors))?;

        let has_business = self
            .business_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty());
        if self.role == Role::Seller && !has_business {
            return Err("Business name is required for sellers".to_string());
        }
        Ok(())
    }
}

/// Wire shape of a login/register success body, with every field optional so
/// a malformed body can be told apart from a decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserRecord>,
}

impl AuthResponse {
    /// Split into a session, naming the first missing field on failure
    pub fn into_session(self) -> Result<AuthSession, &'static str> {
        let token = self
            .token
            .filter(|t| !t.is_empty())
            .ok_or("token")?;
        let user = self.user.ok_or("user")?;
        Ok(AuthSession { token, user })
    }
}

/// A verified `{token, user}` pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: UserRecord,
}

/// `GET auth/me` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    #[serde(default)]
    pub data: Option<UserRecord>,
}

// =============================================================================
// Profile API DTOs
// =============================================================================

/// Partial profile update; absent fields are left untouched by the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
}

/// `PUT profile` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<UserRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Password change request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordUpdate {
    pub current_password: String,
    pub new_password: String,
}

impl PasswordUpdate {
    pub fn new(current: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            current_password: current.into(),
            new_password: new.into(),
        }
    }

    /// Caller-side policy check for the new password
    pub fn meets_length_policy(&self) -> bool {
        self.new_password.chars().count() >= MIN_PASSWORD_LEN
    }
}

/// Body of endpoints that only acknowledge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// First validator message, ordered by field name so the result is stable
pub fn first_validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .into_iter()
        .find_map(|(field, errs)| {
            errs.first().map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .unwrap_or_else(|| "Validation failed".to_string())
}
