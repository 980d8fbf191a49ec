use std::collections::HashMap;

use anyhow::{bail, Result};
use chrono::Utc;
use rand::Rng;
use shared::{
    domain::{HouseId, RequestType, ResidentId, SpecializationId},
    error::ApiException,
};
use storage::{NewRequest, Storage};

pub const JOB_TITLES: [&str; 12] = [
    "plumber",
    "electrician",
    "locksmith",
    "carpenter",
    "painter",
    "heating_specialist",
    "roofer",
    "glazier",
    "cleaning",
    "gardener",
    "inspector",
    "mason",
];

pub const COMPLAINTS: [&str; 8] = [
    "Leaking pipe in kitchen",
    "No hot water",
    "Broken window",
    "Electrical short in corridor",
    "Clogged drain",
    "Broken lock",
    "Peeling paint in stairwell",
    "Elevator not working",
];

#[derive(Debug, Clone)]
pub struct SeedPlan {
    pub houses: u32,
    pub residents: u32,
    pub staff: u32,
    pub requests: u32,
    /// Shared by every seeded account.
    pub password: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub houses: usize,
    pub residents: usize,
    pub staff: usize,
    pub specializations: usize,
    pub requests: usize,
}

pub fn house_address(i: u32) -> String {
    format!("Seed St. {}, Building {}", i / 10 + 1, i % 10 + 1)
}

/// Fills the database with sample data. Individual failures are logged and
/// skipped; only an empty house set aborts the run.
pub async fn seed<R: Rng>(storage: &Storage, plan: &SeedPlan, rng: &mut R) -> Result<SeedSummary> {
    let password_hash = server_api::auth::hash_password(plan.password.clone())
        .await
        .map_err(ApiException::from)?;
    let mut summary = SeedSummary::default();

    let mut house_ids = Vec::new();
    for i in 1..=plan.houses {
        let address = house_address(i);
        match storage.create_house(&address).await {
            Ok(Some(house)) => house_ids.push(house.id),
            Ok(None) => tracing::warn!(%address, "house already exists"),
            Err(err) => tracing::warn!(%address, error = %err, "create house failed"),
        }
    }
    if house_ids.is_empty() {
        bail!("no houses created, aborting");
    }
    summary.houses = house_ids.len();

    let mut resident_ids: Vec<ResidentId> = Vec::new();
    let mut resident_houses: HashMap<ResidentId, Vec<HouseId>> = HashMap::new();
    for i in 1..=plan.residents {
        let phone = format!("700{i:07}");
        ensure_user(storage, &phone, &password_hash).await;

        let resident = match storage.create_resident(&phone, &format!("Resident Seed {i}")).await {
            Ok(Some(resident)) => resident,
            Ok(None) => {
                tracing::warn!(%phone, "resident already exists");
                continue;
            }
            Err(err) => {
                tracing::warn!(%phone, error = %err, "create resident failed");
                continue;
            }
        };

        let wanted = rng.random_range(1..=3usize).min(house_ids.len());
        let linked = resident_houses.entry(resident.id.clone()).or_default();
        let mut attempts = 0;
        while linked.len() < wanted && attempts < house_ids.len() * 2 {
            attempts += 1;
            let house_id = house_ids[rng.random_range(0..house_ids.len())];
            if linked.contains(&house_id) {
                continue;
            }
            match storage.link_resident_house(&resident.id, house_id).await {
                Ok(()) => linked.push(house_id),
                Err(err) => tracing::warn!(resident_id = %resident.id, %house_id, error = %err, "link house failed"),
            }
        }
        resident_ids.push(resident.id);
    }
    summary.residents = resident_ids.len();

    let mut specialization_ids: Vec<SpecializationId> = Vec::new();
    for title in JOB_TITLES {
        match storage.create_specialization(title).await {
            Ok(specialization) => specialization_ids.push(specialization.id),
            Err(err) => tracing::warn!(title, error = %err, "create specialization failed"),
        }
    }
    summary.specializations = specialization_ids.len();

    for i in 1..=plan.staff {
        let phone = format!("800{i:07}");
        ensure_user(storage, &phone, &password_hash).await;

        let member = match storage.create_staff_member(&phone, &format!("Staff Seed {i}")).await {
            Ok(Some(member)) => member,
            Ok(None) => {
                tracing::warn!(%phone, "staff member already exists");
                continue;
            }
            Err(err) => {
                tracing::warn!(%phone, error = %err, "create staff member failed");
                continue;
            }
        };
        summary.staff += 1;

        if specialization_ids.is_empty() {
            continue;
        }
        for _ in 0..rng.random_range(1..=2) {
            let specialization_id = &specialization_ids[rng.random_range(0..specialization_ids.len())];
            if let Err(err) = storage.assign_specialization(member.id, specialization_id).await {
                tracing::debug!(member_id = %member.id, %specialization_id, error = %err, "assign specialization failed");
            }
        }
    }

    if !resident_ids.is_empty() {
        for _ in 0..plan.requests {
            let resident_id = &resident_ids[rng.random_range(0..resident_ids.len())];
            // prefer one of the resident's own houses
            let house_id = match resident_houses.get(resident_id).filter(|houses| !houses.is_empty()) {
                Some(houses) => houses[rng.random_range(0..houses.len())],
                None => house_ids[rng.random_range(0..house_ids.len())],
            };
            let request_type = if rng.random_bool(0.5) {
                RequestType::HouseCommon
            } else {
                RequestType::ApartmentInternal
            };
            let new_request = NewRequest {
                resident_id: resident_id.clone(),
                house_id,
                request_type,
                complaint: COMPLAINTS[rng.random_range(0..COMPLAINTS.len())].to_string(),
                created_at: Utc::now(),
            };
            match storage.create_request(&new_request).await {
                Ok(_) => summary.requests += 1,
                Err(err) => tracing::debug!(%resident_id, %house_id, error = %err, "create request failed"),
            }
        }
    }

    tracing::info!(
        houses = summary.houses,
        residents = summary.residents,
        staff = summary.staff,
        specializations = summary.specializations,
        requests = summary.requests,
        "seed finished"
    );
    Ok(summary)
}

async fn ensure_user(storage: &Storage, phone: &str, password_hash: &str) {
    match storage.create_user(phone, password_hash).await {
        Ok(true) => {}
        Ok(false) => tracing::debug!(phone, "user already exists"),
        Err(err) => tracing::debug!(phone, error = %err, "user register skipped"),
    }
}

#[cfg(test)]
#[path = "tests/seed_tests.rs"]
mod tests;
