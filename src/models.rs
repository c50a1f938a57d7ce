use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    config::PropertyFields,
    error::{PortalError, PortalResult},
    nav::NavLink,
    role::Role,
};

// --- API Responses (the few the portal reads) ---

/// TokenPair
///
/// Response of `POST /api/token/`. Both halves are optional on the wire so a partial
/// answer is reported as a failed login instead of a decode error.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TokenPair {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl TokenPair {
    pub fn into_tokens(self) -> PortalResult<(String, String)> {
        match (self.access, self.refresh) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                Ok((access, refresh))
            }
            _ => Err(PortalError::MissingTokens),
        }
    }
}

/// Me
///
/// Identity returned by `/api/auth/me/` and `/api/me/`. `role` stays a raw string
/// here; [`Role::parse`] decides whether the portal supports it.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Me {
    pub username: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

// --- Portal JSON Schemas (Output) ---

/// SessionInfo
///
/// Output of `GET /session`, read by browser scripts to draw the sidebar.
#[derive(Debug, Clone, Serialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SessionInfo {
    pub authenticated: bool,
    pub username: Option<String>,
    pub role: Option<Role>,
    pub home: Option<String>,
    pub links: Vec<NavLink>,
}

#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct HealthStatus {
    pub status: String,
    pub api_base_url: String,
}

// --- Form Payloads (Input) ---

/// Credentials
///
/// Login form; also the exact body of `POST /api/token/`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PropertyForm {
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub description: String,
}

impl PropertyForm {
    /// Builds the create payload using the field names the backend expects.
    pub fn payload(&self, fields: PropertyFields) -> Value {
        let (name_key, location_key) = fields.keys();
        let mut body = Map::new();
        body.insert(name_key.to_string(), json!(self.name.trim()));
        body.insert(location_key.to_string(), json!(self.location.trim()));
        body.insert("description".to_string(), json!(self.description));
        Value::Object(body)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AssignManagerForm {
    #[serde(default)]
    pub manager_id: String,
}

impl AssignManagerForm {
    pub fn payload(&self) -> PortalResult<Value> {
        let manager_id = self.manager_id.trim();
        if manager_id.is_empty() {
            return Err(PortalError::Validation(
                "Please enter a manager user ID".to_string(),
            ));
        }
        Ok(json!({ "manager_id": manager_id }))
    }
}

pub const UNIT_TYPES: [(&str, &str); 5] = [
    ("single", "Single"),
    ("bedsitter", "Bedsitter"),
    ("1br", "1BR"),
    ("2br", "2BR"),
    ("other", "Other"),
];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UnitForm {
    pub property_id: String,
    pub unit_number: String,
    pub unit_type: String,
    pub rent_amount: String,
    pub deposit: String,
}

impl UnitForm {
    pub fn payload(&self) -> PortalResult<Value> {
        if !UNIT_TYPES.iter().any(|(value, _)| *value == self.unit_type) {
            return Err(PortalError::Validation(format!(
                "Unknown unit type: {}",
                self.unit_type
            )));
        }
        Ok(serde_json::to_value(self)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TenantInviteForm {
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub property: String,
    #[serde(default)]
    pub unit: String,
    pub expires_at: String,
    // Asks the backend to attach a one-time code the invitee must confirm.
    #[serde(default)]
    pub send_otp: bool,
}

impl TenantInviteForm {
    /// Optional property/unit selections are omitted when left blank.
    pub fn payload(&self) -> Value {
        let mut body = json!({
            "full_name": self.full_name,
            "email": self.email,
            "phone": self.phone,
            "expires_at": self.expires_at,
            "send_otp": self.send_otp,
        });
        if let Value::Object(map) = &mut body {
            if !self.property.is_empty() {
                map.insert("property".into(), json!(self.property));
            }
            if !self.unit.is_empty() {
                map.insert("unit".into(), json!(self.unit));
            }
        }
        body
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ManagerInviteForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LeaseForm {
    pub property: String,
    pub tenant: String,
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    pub rent_amount: String,
}

impl LeaseForm {
    pub fn payload(&self) -> Value {
        let mut body = json!({
            "property": self.property,
            "tenant": self.tenant,
            "start_date": self.start_date,
            "rent_amount": self.rent_amount,
        });
        if !self.end_date.is_empty() {
            if let Value::Object(map) = &mut body {
                map.insert("end_date".into(), json!(self.end_date));
            }
        }
        body
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MaintenanceForm {
    pub property: String,
    pub issue: String,
}

/// Maintenance request raised from the tenant dashboard against the active lease.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TenantIssueForm {
    pub lease_id: String,
    pub issue: String,
}

/// StkPushForm
///
/// Rent payment request forwarded to `/api/payments/stk/initiate/`. The payment
/// protocol itself belongs to the backend; the portal only checks the amount is a
/// positive number before sending.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StkPushForm {
    pub lease_id: String,
    pub phone_number: String,
    pub amount: String,
}

impl StkPushForm {
    pub fn payload(&self) -> PortalResult<Value> {
        let amount = self.amount.trim();
        match amount.parse::<f64>() {
            Ok(value) if value > 0.0 && value.is_finite() => {}
            _ => return Err(PortalError::Validation("Enter a valid amount.".to_string())),
        }
        if self.phone_number.trim().is_empty() {
            return Err(PortalError::Validation("Enter the paying phone number.".to_string()));
        }
        Ok(json!({
            "lease_id": self.lease_id,
            "phone_number": self.phone_number.trim(),
            "amount": amount,
        }))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfileForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PasswordForm {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

impl PasswordForm {
    /// Rejects a confirmation mismatch before anything is sent.
    pub fn into_change(self) -> PortalResult<PasswordChange> {
        if self.new_password != self.confirm_password {
            return Err(PortalError::Validation("Passwords do not match.".to_string()));
        }
        Ok(PasswordChange {
            old_password: self.old_password,
            new_password: self.new_password,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OtpForm {
    pub otp: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AcceptInviteForm {
    pub password: String,
    #[serde(default)]
    pub otp: String,
}

impl AcceptInviteForm {
    /// The OTP travels with the acceptance only while the invite still requires one;
    /// a code verified in an earlier step is no longer required by the backend.
    pub fn payload(&self, otp_required: bool) -> Value {
        if otp_required {
            json!({ "password": self.password, "otp": self.otp })
        } else {
            json!({ "password": self.password })
        }
    }
}
