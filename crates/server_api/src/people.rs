use shared::{
    domain::{HouseId, ResidentId, SpecializationId, StaffMemberId},
    error::ApiError,
    paging::{PageMeta, PageRequest, DIRECTORY_LIMITS},
    protocol::{
        AssignHouseForm, AssignSpecializationForm, MessageResponse, PhoneList, ResidentHouseQuery, ResidentHouses,
        ResidentPhone, ResidentQuery, StaffMemberQuery, StaffSpecializationQuery, StaffSpecializations,
        UpdateHouseForm, UserDetails, UserListQuery,
    },
};
use storage::HouseRename;

use crate::{internal, non_empty, ApiContext};

const INVALID_DATA: &str = "invalid data provided";

fn parse_house_id(raw: &str) -> Option<HouseId> {
    raw.trim().parse::<i64>().ok().map(HouseId)
}

fn parse_staff_member_id(raw: &str) -> Result<StaffMemberId, ApiError> {
    raw.trim()
        .parse::<i64>()
        .map(StaffMemberId)
        .map_err(|_| ApiError::validation("staffMemberID must be an integer"))
}

pub async fn list_users(ctx: &ApiContext, query: &UserListQuery) -> Result<PhoneList, ApiError> {
    let page = PageRequest::parse(query.page.as_deref(), query.limit.as_deref(), DIRECTORY_LIMITS);
    let phones = ctx
        .storage
        .list_user_phones(query.phone_number.as_deref(), page)
        .await
        .map_err(internal("failed to get users"))?;
    Ok(PhoneList {
        meta: PageMeta::new(phones.total, page),
        phones: phones.items,
    })
}

/// Removes the account with its staff and resident records. Nothing is
/// removed unless all of it is.
pub async fn delete_user(ctx: &ApiContext, phone: &str) -> Result<MessageResponse, ApiError> {
    let removal = ctx
        .storage
        .delete_user(phone)
        .await
        .map_err(internal("failed to delete user"))?;

    let Some(removal) = removal else {
        return Err(ApiError::not_found("user not found"));
    };
    tracing::info!(
        phone,
        staff_removed = removal.staff,
        resident_removed = removal.resident,
        "user deleted"
    );
    Ok(MessageResponse::success())
}

pub async fn user_details(ctx: &ApiContext, phone: &str) -> Result<UserDetails, ApiError> {
    let staff = ctx
        .storage
        .staff_member_by_phone(phone)
        .await
        .map_err(internal("failed to look up staff member"))?;
    let resident = ctx
        .storage
        .resident_by_phone(phone)
        .await
        .map_err(internal("failed to look up resident"))?;
    Ok(UserDetails { resident, staff })
}

async fn existing_resident(ctx: &ApiContext, raw_id: &str) -> Result<ResidentId, ApiError> {
    let resident_id = ResidentId::from(raw_id);
    ctx.storage
        .resident_by_id(&resident_id)
        .await
        .map_err(internal("failed to look up resident"))?
        .ok_or_else(|| ApiError::not_found("resident not found"))?;
    Ok(resident_id)
}

pub async fn resident_houses(ctx: &ApiContext, query: &ResidentQuery) -> Result<ResidentHouses, ApiError> {
    let raw_id = non_empty(Some(&query.resident_id)).ok_or_else(|| ApiError::validation("residentID is required"))?;
    let resident_id = existing_resident(ctx, raw_id).await?;
    let houses = ctx
        .storage
        .houses_for_resident(&resident_id)
        .await
        .map_err(internal("failed to find houses"))?;
    Ok(ResidentHouses { houses })
}

pub async fn remove_resident_house(
    ctx: &ApiContext,
    query: &ResidentHouseQuery,
) -> Result<MessageResponse, ApiError> {
    let (Some(resident_id), Some(house_id)) = (non_empty(Some(&query.resident_id)), parse_house_id(&query.house_id))
    else {
        return Err(ApiError::validation(INVALID_DATA));
    };

    let removed = ctx
        .storage
        .unlink_resident_house(&ResidentId::from(resident_id), house_id)
        .await
        .map_err(internal("failed to delete house"))?;
    if !removed {
        return Err(ApiError::not_found("house is not linked to the resident"));
    }
    Ok(MessageResponse::success())
}

pub async fn add_resident_house(
    ctx: &ApiContext,
    query: &ResidentQuery,
    form: &AssignHouseForm,
) -> Result<MessageResponse, ApiError> {
    let (Some(resident_id), Some(house_id)) = (non_empty(Some(&query.resident_id)), parse_house_id(&form.house_id))
    else {
        return Err(ApiError::validation(INVALID_DATA));
    };

    let resident_id = existing_resident(ctx, resident_id).await?;
    ctx.storage
        .house_by_id(house_id)
        .await
        .map_err(internal("failed to look up house"))?
        .ok_or_else(|| ApiError::not_found("house not found"))?;
    ctx.storage
        .link_resident_house(&resident_id, house_id)
        .await
        .map_err(internal("failed to assign house"))?;
    tracing::info!(resident_id = %resident_id, house_id = %house_id, "house assigned");
    Ok(MessageResponse::success())
}

pub async fn update_house_address(ctx: &ApiContext, form: &UpdateHouseForm) -> Result<MessageResponse, ApiError> {
    let (Some(house_id), Some(address)) = (parse_house_id(&form.house_id), non_empty(Some(&form.address))) else {
        return Err(ApiError::validation(INVALID_DATA));
    };

    let outcome = ctx
        .storage
        .rename_house(house_id, address)
        .await
        .map_err(internal("failed to update house address"))?;
    match outcome {
        HouseRename::Renamed => Ok(MessageResponse::success()),
        HouseRename::NotFound => Err(ApiError::not_found("house not found")),
        HouseRename::AddressTaken => Err(ApiError::conflict("house already exists")),
    }
}

pub async fn resident_phone(ctx: &ApiContext, query: &ResidentQuery) -> Result<ResidentPhone, ApiError> {
    let raw_id = non_empty(Some(&query.resident_id)).ok_or_else(|| ApiError::validation("residentID is required"))?;
    let resident = ctx
        .storage
        .resident_by_id(&ResidentId::from(raw_id))
        .await
        .map_err(internal("failed to get resident"))?
        .ok_or_else(|| ApiError::not_found("resident not found"))?;
    Ok(ResidentPhone { phone: resident.phone })
}

pub async fn staff_specializations(
    ctx: &ApiContext,
    query: &StaffMemberQuery,
) -> Result<StaffSpecializations, ApiError> {
    let member_id = parse_staff_member_id(&query.staff_member_id)?;
    ctx.storage
        .staff_member_by_id(member_id)
        .await
        .map_err(internal("failed to find specializations"))?
        .ok_or_else(|| ApiError::not_found("staff member not found"))?;
    let specializations = ctx
        .storage
        .active_specializations(member_id)
        .await
        .map_err(internal("failed to find specializations"))?;
    Ok(StaffSpecializations { specializations })
}

pub async fn deactivate_staff_specialization(
    ctx: &ApiContext,
    query: &StaffSpecializationQuery,
) -> Result<MessageResponse, ApiError> {
    let job_id =
        non_empty(Some(&query.job_id)).ok_or_else(|| ApiError::validation("staffMemberID and jobID are required"))?;
    let member_id = parse_staff_member_id(&query.staff_member_id)?;

    let deactivated = ctx
        .storage
        .deactivate_specialization(member_id, &SpecializationId::from(job_id))
        .await
        .map_err(internal("failed to deactivate staff member specialization"))?;
    if !deactivated {
        return Err(ApiError::not_found("specialization is not active for this staff member"));
    }
    Ok(MessageResponse::success())
}

pub async fn add_staff_specialization(
    ctx: &ApiContext,
    query: &StaffMemberQuery,
    form: &AssignSpecializationForm,
) -> Result<MessageResponse, ApiError> {
    let (Some(raw_member_id), Some(specialization_id)) = (
        non_empty(Some(&query.staff_member_id)),
        non_empty(Some(&form.specialization_id)),
    ) else {
        return Err(ApiError::validation("staffMemberID and specializationID are required"));
    };
    let member_id = parse_staff_member_id(raw_member_id)?;
    let specialization_id = SpecializationId::from(specialization_id);

    ctx.storage
        .staff_member_by_id(member_id)
        .await
        .map_err(internal("failed to add staff specialization"))?
        .ok_or_else(|| ApiError::not_found("staff member not found"))?;
    ctx.storage
        .specialization_by_id(&specialization_id)
        .await
        .map_err(internal("failed to add staff specialization"))?
        .ok_or_else(|| ApiError::not_found("specialization not found"))?;
    ctx.storage
        .assign_specialization(member_id, &specialization_id)
        .await
        .map_err(internal("failed to add staff specialization"))?;
    Ok(MessageResponse::success())
}
