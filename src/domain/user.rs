use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Amount;

pub type UserId = Uuid;

/// An account holder. Owns zero or more income and expense records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub gender: Option<String>,
    pub qualifications: Option<String>,
    /// Reference to an externally stored picture (path or URL)
    pub profile_pic: Option<String>,
    pub account_balance: Amount,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, full_name: String, email: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            full_name,
            gender: None,
            qualifications: None,
            profile_pic: None,
            account_balance: 0.0,
            created_at: Utc::now(),
        }
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn with_qualifications(mut self, qualifications: impl Into<String>) -> Self {
        self.qualifications = Some(qualifications.into());
        self
    }

    /// Apply a partial profile update. Fields left as `None` keep their value.
    pub fn apply(&mut self, update: ProfileUpdate) {
        if let Some(full_name) = update.full_name {
            self.full_name = full_name;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(gender) = update.gender {
            self.gender = Some(gender);
        }
        if let Some(qualifications) = update.qualifications {
            self.qualifications = Some(qualifications);
        }
        if let Some(profile_pic) = update.profile_pic {
            self.profile_pic = Some(profile_pic);
        }
    }
}

/// Registration payload for a new user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub gender: Option<String>,
    pub qualifications: Option<String>,
}

/// Partial profile update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub gender: Option<String>,
    pub qualifications: Option<String>,
    pub profile_pic: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.email.is_none()
            && self.gender.is_none()
            && self.qualifications.is_none()
            && self.profile_pic.is_none()
    }
}
