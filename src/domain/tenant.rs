use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

fn is_valid_national_id(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 14 {
        return false;
    }
    let digit_positions: [usize; 11] = [0, 1, 2, 4, 5, 6, 8, 9, 10, 12, 13];
    let dot_positions: [usize; 2] = [3, 7];
    let dash_position = 11;
    for &i in &digit_positions {
        if !bytes[i].is_ascii_digit() {
            return false;
        }
    }
    for &i in &dot_positions {
        if bytes[i] != b'.' {
            return false;
        }
    }
    bytes[dash_position] == b'-'
}

/// Minimal shape check, not full RFC 5322 validation — good enough to
/// reject obviously malformed input without depending on a mail-address
/// parsing crate for a field that is otherwise free text.
fn is_plausible_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub full_name: String,
    national_id: String,
    pub phone: String,
    pub email: Option<String>,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(
        full_name: impl Into<String>,
        national_id: impl Into<String>,
        phone: impl Into<String>,
        email: Option<String>,
        document_type: Option<String>,
        document_number: Option<String>,
    ) -> Result<Self, AppError> {
        let full_name = full_name.into();
        if full_name.trim().is_empty() {
            return Err(AppError::validation("full name must not be empty"));
        }
        let phone = phone.into();
        if phone.trim().is_empty() {
            return Err(AppError::validation("phone must not be empty"));
        }
        let national_id = national_id.into();
        if !is_valid_national_id(&national_id) {
            return Err(AppError::validation(
                "national ID must match NNN.NNN.NNN-NN",
            ));
        }
        if let Some(ref email) = email {
            if !is_plausible_email(email) {
                return Err(AppError::validation("email is not well-formed"));
            }
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            full_name,
            national_id,
            phone,
            email,
            document_type,
            document_number,
            created_at: now,
            updated_at: now,
        })
    }

    /// National ID is immutable after creation; exposed only through a
    /// getter.
    pub fn national_id(&self) -> &str {
        &self.national_id
    }

    pub fn update_contact(
        &mut self,
        full_name: impl Into<String>,
        phone: impl Into<String>,
        email: Option<String>,
    ) -> Result<(), AppError> {
        let full_name = full_name.into();
        if full_name.trim().is_empty() {
            return Err(AppError::validation("full name must not be empty"));
        }
        let phone = phone.into();
        if phone.trim().is_empty() {
            return Err(AppError::validation("phone must not be empty"));
        }
        if let Some(ref email) = email {
            if !is_plausible_email(email) {
                return Err(AppError::validation("email is not well-formed"));
            }
        }
        self.full_name = full_name;
        self.phone = phone;
        self.email = email;
        self.updated_at = Utc::now();
        Ok(())
    }
}
