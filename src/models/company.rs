use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanyStatus {
    #[serde(alias = "ACTIVE")]
    Active,
    #[serde(alias = "INACTIVE")]
    Inactive,
    #[serde(alias = "SUSPENDED")]
    Suspended,
}

impl CompanyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyStatus::Active => "active",
            CompanyStatus::Inactive => "inactive",
            CompanyStatus::Suspended => "suspended",
        }
    }
}

/// The tenant an identity belongs to, as returned by `GET /companies/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub company_code: Option<String>,
    pub status: CompanyStatus,
    #[serde(default)]
    pub subscription_plan: Option<String>,
    /// `-1` means unlimited.
    #[serde(default)]
    pub max_users: Option<i64>,
    #[serde(default)]
    pub max_vehicles: Option<i64>,
    #[serde(default)]
    pub siret: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Organization {
    pub fn is_active(&self) -> bool {
        self.status == CompanyStatus::Active
    }
}

/// Company part of `POST /companies/register`.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyDetails {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub siret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ManagerDetails {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

/// Wire payload of `POST /companies/register`.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyRegistrationRequest {
    pub company: CompanyDetails,
    pub manager_email: String,
    pub manager_password: String,
    pub manager_first_name: String,
    pub manager_last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_phone: Option<String>,
}

impl CompanyRegistrationRequest {
    pub fn new(company: CompanyDetails, manager: ManagerDetails) -> Self {
        Self {
            company,
            manager_email: manager.email,
            manager_password: manager.password,
            manager_first_name: manager.first_name,
            manager_last_name: manager.last_name,
            manager_phone: manager.phone,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRegistration {
    pub company_code: String,
    #[serde(default)]
    pub message: Option<String>,
}
