use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

/// Random identifiers are 20 bytes rendered as 40 lowercase hex characters.
macro_rules! text_id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn generate() -> Self {
                Self(random_hex_id())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(HouseId);
id_newtype!(StaffMemberId);

text_id_newtype!(ResidentId);
text_id_newtype!(SpecializationId);
text_id_newtype!(OrganizationId);
text_id_newtype!(RequestId);

pub const RANDOM_ID_BYTES: usize = 20;

pub fn random_hex_id() -> String {
    let bytes: [u8; RANDOM_ID_BYTES] = rand::random();
    hex::encode(bytes)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} `{token}`")]
pub struct UnknownToken {
    pub kind: &'static str,
    pub token: String,
}

macro_rules! token_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $token:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $token)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownToken;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($token => Ok($name::$variant),)+
                    other => Err(UnknownToken {
                        kind: $kind,
                        token: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

token_enum!(StaffStatus, "staff status", {
    Active => "работает",
    Inactive => "уволился",
    Suspended => "недоступен",
});

token_enum!(RequestType, "request type", {
    ApartmentInternal => "ремонт_внутриквартирный",
    HouseCommon => "ремонт_общедомового_имущества",
});

token_enum!(RequestStatus, "request status", {
    Created => "создана",
    Assigned => "назначена_исполнителю",
    Completed => "выполнена",
    Cancelled => "отменена",
    Suspended => "приостановлена",
    Transferred => "передана_организации",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Staff,
    Resident,
}

/// Ordering applied to request lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestSort {
    StatusAsc,
    TypeAsc,
    CreatedAsc,
    #[default]
    CreatedDesc,
}

impl RequestSort {
    /// Unrecognised tokens fall back to newest-first.
    pub fn from_token(token: &str) -> Self {
        match token {
            "status_asc" => Self::StatusAsc,
            "type_asc" => Self::TypeAsc,
            "created_asc" => Self::CreatedAsc,
            _ => Self::CreatedDesc,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::StatusAsc => "status_asc",
            Self::TypeAsc => "type_asc",
            Self::CreatedAsc => "created_asc",
            Self::CreatedDesc => "created_desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct House {
    #[serde(rename = "ID")]
    pub id: HouseId,
    #[serde(rename = "Address")]
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resident {
    #[serde(rename = "ID")]
    pub id: ResidentId,
    #[serde(rename = "Phone")]
    pub phone: String,
    #[serde(rename = "FullName")]
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMember {
    #[serde(rename = "ID")]
    pub id: StaffMemberId,
    #[serde(rename = "FullName")]
    pub full_name: String,
    #[serde(rename = "Phone")]
    pub phone: String,
    #[serde(rename = "Status")]
    pub status: StaffStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specialization {
    #[serde(rename = "ID")]
    pub id: SpecializationId,
    #[serde(rename = "Title")]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    #[serde(rename = "ID")]
    pub id: OrganizationId,
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    #[serde(rename = "ID")]
    pub id: RequestId,
    #[serde(rename = "ResidentID")]
    pub resident_id: ResidentId,
    #[serde(rename = "HouseID")]
    pub house_id: HouseId,
    #[serde(rename = "RequestType")]
    pub request_type: RequestType,
    #[serde(rename = "Complaint")]
    pub complaint: String,
    #[serde(rename = "Cost")]
    pub cost: Option<f64>,
    #[serde(rename = "Status")]
    pub status: RequestStatus,
    #[serde(rename = "ResponsibleID")]
    pub responsible_id: Option<StaffMemberId>,
    #[serde(rename = "OrganizationID")]
    pub organization_id: Option<OrganizationId>,
    #[serde(rename = "CreatedAt")]
    pub created_at: DateTime<Utc>,
}
