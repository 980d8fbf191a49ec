use serde::{Deserialize, Serialize};

use crate::{
    domain::{House, Organization, Resident, ServiceRequest, Specialization, StaffMember, StaffMemberId},
    paging::PageMeta,
};

/// A form body as submitted by the admin pages. Field names are the wire
/// names; missing fields read as empty strings.
pub trait FormPayload: Sized {
    fn to_fields(&self) -> Vec<(&'static str, String)>;
    fn from_lookup(lookup: &dyn Fn(&str) -> String) -> Self;
}

macro_rules! form_payload {
    ($(#[$meta:meta])* $name:ident { $($field:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name {
            $(pub $field: String,)+
        }

        impl FormPayload for $name {
            fn to_fields(&self) -> Vec<(&'static str, String)> {
                vec![$(($wire, self.$field.clone())),+]
            }

            fn from_lookup(lookup: &dyn Fn(&str) -> String) -> Self {
                Self {
                    $($field: lookup($wire),)+
                }
            }
        }
    };
}

form_payload!(LoginForm {
    phone_number => "phoneNumber",
    password => "password",
});

form_payload!(
    /// Checkbox fields carry `on` when ticked.
    RegisterForm {
        phone_number => "phoneNumber",
        password => "password",
        full_name => "fullName",
        is_resident => "isResident",
        is_staff_member => "isStaffMember",
    }
);

form_payload!(CreateRequestForm {
    house_id => "houseID",
    request_type => "requestType",
    complaint => "complaint",
});

form_payload!(UpdateRequestForm {
    id => "id",
    resident_id => "residentID",
    house_id => "houseID",
    request_type => "type",
    complaint => "complaint",
    cost => "cost",
    status => "status",
    responsible_id => "respID",
    organization_id => "organizationID",
});

form_payload!(CreateHouseForm {
    address => "address",
});

form_payload!(UpdateHouseForm {
    house_id => "houseID",
    address => "address",
});

form_payload!(AssignHouseForm {
    house_id => "houseID",
});

form_payload!(CreateOrganizationForm {
    name => "name",
});

form_payload!(UpdateOrganizationForm {
    organization_id => "organizationID",
    name => "name",
});

form_payload!(CreateSpecializationForm {
    job_name => "jobName",
});

form_payload!(AssignSpecializationForm {
    specialization_id => "specializationID",
});

pub const CHECKBOX_ON: &str = "on";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(
        rename = "phoneNumber",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResidentRequestsQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestPanelQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "residentID", default, skip_serializing_if = "Option::is_none")]
    pub resident_id: Option<String>,
    #[serde(rename = "houseID", default, skip_serializing_if = "Option::is_none")]
    pub house_id: Option<String>,
    #[serde(
        rename = "responsibleID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub responsible_id: Option<String>,
    #[serde(
        rename = "organizationID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub organization_id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub request_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complaint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResidentQuery {
    #[serde(rename = "residentID", default)]
    pub resident_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResidentHouseQuery {
    #[serde(rename = "residentID", default)]
    pub resident_id: String,
    #[serde(rename = "houseID", default)]
    pub house_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaffMemberQuery {
    #[serde(rename = "staffMemberID", default)]
    pub staff_member_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaffSpecializationQuery {
    #[serde(rename = "staffMemberID", default)]
    pub staff_member_id: String,
    #[serde(rename = "jobID", default)]
    pub job_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobQuery {
    #[serde(rename = "jobID", default)]
    pub job_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn success() -> Self {
        Self {
            message: "success".to_string(),
        }
    }
}

/// Login and registration share this shape; `type` is always `login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoginResponse {
    pub fn for_phone(phone: impl Into<String>) -> Self {
        Self {
            kind: "login".to_string(),
            message: phone.into(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestUpdatedResponse {
    pub message: Option<StaffMemberId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseList {
    pub houses: Vec<House>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationList {
    pub organizations: Vec<Organization>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecializationList {
    pub specializations: Vec<Specialization>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestList {
    pub requests: Vec<ServiceRequest>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneList {
    pub phones: Vec<String>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resident: Option<Resident>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff: Option<StaffMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidentHouses {
    pub houses: Vec<House>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffSpecializations {
    pub specializations: Vec<Specialization>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidentPhone {
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeastBusy {
    #[serde(rename = "leastBusy")]
    pub least_busy: StaffMemberId,
}
