use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::Student;
use crate::schemas::user::format_primitive;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StudentCreate {
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: String,
    #[serde(alias = "fullName")]
    #[validate(length(min = 1, message = "full_name must not be empty"))]
    pub(crate) full_name: String,
    #[validate(custom(function = "validate_jmbag"))]
    pub(crate) jmbag: String,
    #[validate(range(min = 1, max = 5, message = "year must be between 1 and 5"))]
    pub(crate) year: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StudentUpdate {
    #[serde(alias = "fullName")]
    #[validate(length(min = 1, message = "full_name must not be empty"))]
    pub(crate) full_name: String,
    #[validate(custom(function = "validate_jmbag"))]
    pub(crate) jmbag: String,
    #[validate(range(min = 1, max = 5, message = "year must be between 1 and 5"))]
    pub(crate) year: i32,
}

/// JMBAG is the Croatian national student identifier, always ten digits.
pub(crate) fn validate_jmbag(value: &str) -> Result<(), validator::ValidationError> {
    if value.len() == 10 && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("jmbag")
            .with_message("jmbag must be exactly 10 digits".into()))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentResponse {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) jmbag: String,
    pub(crate) year: i32,
    pub(crate) avatar_url: Option<String>,
    pub(crate) created_at: String,
}

impl StudentResponse {
    pub(crate) fn from_db(student: Student) -> Self {
        Self {
            id: student.id,
            email: student.email,
            full_name: student.full_name,
            jmbag: student.jmbag,
            year: student.year,
            avatar_url: student.avatar_url,
            created_at: format_primitive(student.created_at),
        }
    }
}
