use shared::{
    domain::{OrganizationId, Specialization},
    error::ApiError,
    paging::{PageMeta, PageRequest, DIRECTORY_LIMITS},
    protocol::{
        CreateHouseForm, CreateOrganizationForm, CreateSpecializationForm, DirectoryQuery, HouseList,
        MessageResponse, OrganizationList, SpecializationList, UpdateOrganizationForm,
    },
};

use crate::{internal, non_empty, ApiContext};

fn directory_page(query: &DirectoryQuery) -> PageRequest {
    PageRequest::parse(query.page.as_deref(), query.limit.as_deref(), DIRECTORY_LIMITS)
}

pub async fn list_houses(ctx: &ApiContext, query: &DirectoryQuery) -> Result<HouseList, ApiError> {
    let page = directory_page(query);
    let houses = ctx
        .storage
        .list_houses(query.pattern.as_deref(), page)
        .await
        .map_err(internal("failed to get houses"))?;
    Ok(HouseList {
        meta: PageMeta::new(houses.total, page),
        houses: houses.items,
    })
}

pub async fn create_house(ctx: &ApiContext, form: &CreateHouseForm) -> Result<MessageResponse, ApiError> {
    let address = non_empty(Some(&form.address)).ok_or_else(|| ApiError::validation("address is required"))?;
    let house = ctx
        .storage
        .create_house(address)
        .await
        .map_err(internal("failed to create house"))?
        .ok_or_else(|| ApiError::conflict("house already exists"))?;
    tracing::info!(house_id = %house.id, address = %house.address, "created house");
    Ok(MessageResponse::success())
}

pub async fn list_organizations(ctx: &ApiContext, query: &DirectoryQuery) -> Result<OrganizationList, ApiError> {
    let page = directory_page(query);
    let organizations = ctx
        .storage
        .list_organizations(query.pattern.as_deref(), page)
        .await
        .map_err(internal("failed to get organizations"))?;
    Ok(OrganizationList {
        meta: PageMeta::new(organizations.total, page),
        organizations: organizations.items,
    })
}

pub async fn create_organization(
    ctx: &ApiContext,
    form: &CreateOrganizationForm,
) -> Result<MessageResponse, ApiError> {
    let name = non_empty(Some(&form.name)).ok_or_else(|| ApiError::validation("name is required"))?;
    let organization = ctx
        .storage
        .create_organization(name)
        .await
        .map_err(internal("failed to create organization"))?;
    tracing::info!(organization_id = %organization.id, "created organization");
    Ok(MessageResponse::success())
}

pub async fn update_organization(
    ctx: &ApiContext,
    form: &UpdateOrganizationForm,
) -> Result<MessageResponse, ApiError> {
    let (Some(organization_id), Some(name)) = (
        non_empty(Some(&form.organization_id)),
        non_empty(Some(&form.name)),
    ) else {
        return Err(ApiError::validation("organizationID and name are required"));
    };

    let renamed = ctx
        .storage
        .rename_organization(&OrganizationId::from(organization_id), name)
        .await
        .map_err(internal("failed to update organization"))?;
    if !renamed {
        return Err(ApiError::not_found("organization not found"));
    }
    Ok(MessageResponse::success())
}

pub async fn list_specializations(
    ctx: &ApiContext,
    query: &DirectoryQuery,
) -> Result<SpecializationList, ApiError> {
    let page = directory_page(query);
    let specializations = ctx
        .storage
        .list_specializations(query.pattern.as_deref(), page)
        .await
        .map_err(internal("failed to get all specializations"))?;
    Ok(SpecializationList {
        meta: PageMeta::new(specializations.total, page),
        specializations: specializations.items,
    })
}

/// Answers with the created record rather than a message.
pub async fn create_specialization(
    ctx: &ApiContext,
    form: &CreateSpecializationForm,
) -> Result<Specialization, ApiError> {
    let title = non_empty(Some(&form.job_name)).ok_or_else(|| ApiError::validation("jobName is required"))?;
    let specialization = ctx
        .storage
        .create_specialization(title)
        .await
        .map_err(internal("failed to create specialization"))?;
    tracing::info!(specialization_id = %specialization.id, title, "created specialization");
    Ok(specialization)
}
