use shared::error::ApiError;
use storage::Storage;

pub mod auth;
mod directory;
mod people;
mod requests;

pub use auth::{login, register, LoginOutcome, SessionClaims, SessionKeys, SESSION_COOKIE};
pub use directory::{
    create_house, create_organization, create_specialization, list_houses, list_organizations,
    list_specializations, update_organization,
};
pub use people::{
    add_resident_house, add_staff_specialization, deactivate_staff_specialization, delete_user, list_users,
    remove_resident_house, resident_houses, resident_phone, staff_specializations, update_house_address,
    user_details,
};
pub use requests::{create_request, delete_request, least_busy, request_panel, resident_requests, update_request};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub sessions: SessionKeys,
}

/// Logs the storage failure and hides it behind a fixed message.
pub(crate) fn internal(action: &'static str) -> impl FnOnce(anyhow::Error) -> ApiError {
    move |err| {
        tracing::error!(error = %err, "{action}");
        ApiError::internal(action)
    }
}

pub(crate) fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
