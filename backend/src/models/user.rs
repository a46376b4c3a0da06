//! Users, roles and universities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::api::{UniversityId, UserId};

/// Account role.
///
/// `Admin` can only be granted out of band; profile updates never set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    General,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::General => "general",
            UserRole::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "general" => Ok(Self::General),
            "admin" => Ok(Self::Admin),
            other => Err(format!("Unknown user role: {}", other)),
        }
    }
}

/// A registered user and their travel profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub role: UserRole,
    pub university_id: Option<UniversityId>,
    pub budget_min: Option<i32>,
    pub budget_max: Option<i32>,
    #[serde(default)]
    pub preferred_types: Vec<String>,
    #[serde(default)]
    pub preferred_activities: Vec<String>,
}

/// Fields supplied by the sign-in layer when a user first appears.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

/// Fully resolved profile state written by `update_profile`.
///
/// Produced by the service layer after merging a request with the stored
/// user, so repositories can overwrite every field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub role: UserRole,
    pub university_id: Option<UniversityId>,
    pub budget_min: Option<i32>,
    pub budget_max: Option<i32>,
    pub preferred_types: Vec<String>,
    pub preferred_activities: Vec<String>,
}

/// The identity a request acts as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: UserId, role: UserRole) -> Self {
        Self { user_id, role }
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self::new(user.user_id, user.role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct University {
    pub university_id: UniversityId,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_str() {
        assert_eq!("Student".parse::<UserRole>().unwrap(), UserRole::Student);
        assert_eq!(" general ".parse::<UserRole>().unwrap(), UserRole::General);
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert!("leader".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&UserRole::General).unwrap(),
            "\"general\""
        );
    }
}
