//! Patient models.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// The patient fields the clustering engine reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientProfile {
    /// Date of birth
    pub birthdate: NaiveDate,
    /// Role name (e.g., "Student", "Faculty", "Staff")
    pub role_name: Option<String>,
    /// Role category (e.g., "rcy", "employee")
    pub role_category: Option<String>,
}

impl PatientProfile {
    /// Create a patient profile with no role information.
    pub fn new(birthdate: NaiveDate) -> Self {
        Self {
            birthdate,
            role_name: None,
            role_category: None,
        }
    }

    /// Set the role name.
    pub fn with_role(mut self, role_name: impl Into<String>) -> Self {
        self.role_name = Some(role_name.into());
        self
    }

    /// Set the role category.
    pub fn with_category(mut self, role_category: impl Into<String>) -> Self {
        self.role_category = Some(role_category.into());
        self
    }

    /// Age in whole years on the given date.
    ///
    /// The year difference is reduced by one when `on` falls before the
    /// birthday in that year. Dates before the birthdate yield a negative age.
    pub fn age_on(&self, on: NaiveDate) -> i32 {
        let mut years = on.year() - self.birthdate.year();
        if (on.month(), on.day()) < (self.birthdate.month(), self.birthdate.day()) {
            years -= 1;
        }
        years
    }
}
