use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::views::View;

/// Role
///
/// The closed set of KRIB user roles. A role decides which views the gate lets through
/// and which links the sidebar shows. Serialized lowercase to match the API's `role`
/// field (`"landlord"`, `"manager"`, `"tenant"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Landlord,
    Manager,
    Tenant,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Landlord, Role::Manager, Role::Tenant];

    /// parse
    ///
    /// Maps a raw role string (as returned by `/api/auth/me/`) onto the enum.
    /// Unknown or empty strings yield `None`; callers treat that as "no role".
    pub fn parse(raw: &str) -> Option<Role> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "landlord" => Some(Role::Landlord),
            "manager" => Some(Role::Manager),
            "tenant" => Some(Role::Tenant),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Landlord => "landlord",
            Role::Manager => "manager",
            Role::Tenant => "tenant",
        }
    }

    /// home
    ///
    /// The landing view for the role. Used both after login and as the redirect target
    /// when the role is refused by a view's guard.
    pub fn home(self) -> View {
        match self {
            Role::Landlord => View::Dashboard,
            Role::Manager => View::ManagerHome,
            Role::Tenant => View::TenantHome,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
