//! Host device and installation facts

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::lenient::{lenient_code, lenient_id};

/// Facts about the host application and device, supplied at SDK construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub application_version: String,
    pub device_model: String,
    pub os_name: String,
    pub os_version: String,
}

impl DeviceInfo {
    /// Operating system as reported on events, e.g. `"Android 14"`.
    #[must_use]
    pub fn operating_system(&self) -> String {
        format!("{} {}", self.os_name, self.os_version).trim().to_string()
    }
}

/// Form factor reported with the installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum DeviceType {
    #[default]
    Smartphone = 1,
    Tablet = 2,
    Desktop = 3,
    SmartTv = 4,
    Wearable = 5,
}

impl From<DeviceType> for i64 {
    fn from(device_type: DeviceType) -> Self {
        device_type as Self
    }
}

impl TryFrom<i64> for DeviceType {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Smartphone),
            2 => Ok(Self::Tablet),
            3 => Ok(Self::Desktop),
            4 => Ok(Self::SmartTv),
            5 => Ok(Self::Wearable),
            other => Err(format!("unknown device type {other}")),
        }
    }
}

/// This installation of the host application as registered with the
/// identity service, persisted under `InstallationRecord`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstallationRecord {
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub installation_id: Option<String>,
    #[serde(default)]
    pub installed_version: Option<String>,
    #[serde(rename = "DeviceTypeId", default, deserialize_with = "lenient_code")]
    pub device_type: Option<DeviceType>,
    #[serde(default)]
    pub operating_system_version: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub user_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub project_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub application_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_updated: Option<String>,
}

impl InstallationRecord {
    /// A record for a first registration; the service assigns the ids.
    #[must_use]
    pub fn for_device(
        device: &DeviceInfo,
        project_id: i64,
        application_id: i64,
        user_id: Option<i64>,
    ) -> Self {
        Self {
            installed_version: Some(device.application_version.clone()),
            device_type: Some(DeviceType::Smartphone),
            operating_system_version: Some(device.operating_system()),
            user_id,
            project_id: Some(project_id),
            application_id: Some(application_id),
            ..Self::default()
        }
    }

    /// Whether the host application changed version since registration.
    #[must_use]
    pub fn is_outdated(&self, device: &DeviceInfo) -> bool {
        self.installed_version.as_deref() != Some(device.application_version.as_str())
    }

    /// Copy carrying the device's current application and OS versions.
    #[must_use]
    pub fn updated_for(&self, device: &DeviceInfo) -> Self {
        Self {
            installed_version: Some(device.application_version.clone()),
            operating_system_version: Some(device.operating_system()),
            ..self.clone()
        }
    }

    /// Body element for the update request, which only accepts the mutable
    /// fields and the id.
    #[must_use]
    pub fn to_update_payload(&self) -> Value {
        json!({
            "Id": self.id,
            "InstalledVersion": self.installed_version,
            "DeviceTypeId": self.device_type,
            "OperatingSystemVersion": self.operating_system_version,
            "UserId": self.user_id,
        })
    }
}
