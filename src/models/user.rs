//! User data models and API request/response types.
//!
//! This module defines:
//! - `User`: profile document stored in the users collection
//! - `NewUser`: attributes written when a user signs up
//! - `SignUpRequest` / `SignInRequest`: request bodies
//! - `UserResponse`: response body returned to clients

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::providers::NewCustomer;

/// Represents a user profile document.
///
/// # Collection
///
/// Lives in the configured users collection. `user_id` is the identity
/// provider's account id and is how the profile is found after sign-in.
/// Profiles are created at sign-up and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Document id assigned by the store
    #[serde(rename = "$id")]
    pub id: String,

    /// Identity provider account id
    pub user_id: String,

    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub date_of_birth: String,

    /// Processor customer id (last segment of `processor_customer_url`)
    pub processor_customer_id: String,

    /// Processor customer resource URL
    pub processor_customer_url: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Attributes of a new user document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub date_of_birth: String,
    pub processor_customer_id: String,
    pub processor_customer_url: String,
}

/// Request body for signing up.
///
/// Not `Debug`: carries the password and SSN.
///
/// # JSON Example
///
/// ```json
/// {
///   "first_name": "Ada",
///   "last_name": "Lovelace",
///   "address1": "1 Analytical Way",
///   "city": "New York",
///   "state": "NY",
///   "postal_code": "10001",
///   "date_of_birth": "1990-12-10",
///   "ssn": "1234",
///   "email": "ada@example.com",
///   "password": "correct horse"
/// }
/// ```
#[derive(Deserialize)]
pub struct SignUpRequest {
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub date_of_birth: String,
    /// Forwarded to the processor only; never stored
    pub ssn: String,
    pub email: String,
    pub password: String,
}

/// Minimum password length accepted by the identity provider.
pub const MIN_PASSWORD_LEN: usize = 8;

impl SignUpRequest {
    /// Reject obviously invalid input before any provider call.
    pub fn validate(&self) -> Result<(), AppError> {
        for (field, value) in [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("address1", &self.address1),
            ("city", &self.city),
            ("state", &self.state),
            ("postal_code", &self.postal_code),
            ("date_of_birth", &self.date_of_birth),
            ("ssn", &self.ssn),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::InvalidRequest(format!("{} is required", field)));
            }
        }

        validate_credentials(&self.email, &self.password)?;

        if chrono::NaiveDate::parse_from_str(&self.date_of_birth, "%Y-%m-%d").is_err() {
            return Err(AppError::InvalidRequest(
                "date_of_birth must be YYYY-MM-DD".to_string(),
            ));
        }

        Ok(())
    }

    /// Personal customer profile for the processor.
    pub fn customer(&self) -> NewCustomer {
        NewCustomer {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            customer_type: "personal".to_string(),
            address1: self.address1.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            postal_code: self.postal_code.clone(),
            date_of_birth: self.date_of_birth.clone(),
            ssn: self.ssn.clone(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Request body for signing in. Not `Debug`: carries the password.
#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

pub fn validate_credentials(email: &str, password: &str) -> Result<(), AppError> {
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !well_formed {
        return Err(AppError::InvalidRequest("email is invalid".to_string()));
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidRequest(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    Ok(())
}

/// Response body for user endpoints.
///
/// Address and date of birth stay server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub processor_customer_id: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            user_id: user.user_id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            processor_customer_id: user.processor_customer_id,
        }
    }
}

#[cfg(test)]
pub(crate) fn sign_up(email: &str, password: &str) -> SignUpRequest {
    SignUpRequest {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        address1: "1 Analytical Way".to_string(),
        city: "New York".to_string(),
        state: "NY".to_string(),
        postal_code: "10001".to_string(),
        date_of_birth: "1990-12-10".to_string(),
        ssn: "1234".to_string(),
        email: email.to_string(),
        password: password.to_string(),
    }
}
