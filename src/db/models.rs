use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::backend::Record;
use crate::error::PortalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }

    /// Landing page for a signed-in user of this role.
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Student => "/dashboard/student",
            Role::Admin => "/dashboard/admin",
        }
    }
}

impl FromStr for Role {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "admin" => Ok(Role::Admin),
            other => Err(PortalError::validation(format!("unknown role `{other}`"))),
        }
    }
}

/// Row of `users`; `id` is the auth user's UUID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Kept as text: the column is a convention, not an enforced enum.
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BannerType {
    Mobile,
    #[default]
    Desktop,
}

impl BannerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BannerType::Mobile => "mobile",
            BannerType::Desktop => "desktop",
        }
    }
}

impl fmt::Display for BannerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BannerType {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "mobile" => Ok(BannerType::Mobile),
            "desktop" => Ok(BannerType::Desktop),
            other => Err(PortalError::validation(format!(
                "Banner type must be `mobile` or `desktop`, got `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Banner {
    pub id: i64,
    pub title: String,
    pub image_url: String,
    pub active: bool,
    #[serde(rename = "type")]
    pub kind: BannerType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Facility {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub image_url: String,
}

/// Learning module shown on the student dashboard; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Module {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
}

/// Decode one stored row into its typed model.
pub fn from_record<T: serde::de::DeserializeOwned>(record: Record) -> Result<T, PortalError> {
    serde_json::from_value(serde_json::Value::Object(record))
        .map_err(|e| PortalError::RowShape(e.to_string()))
}
