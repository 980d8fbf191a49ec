use chrono::Utc;
use shared::{
    domain::{
        HouseId, OrganizationId, RequestId, RequestSort, RequestStatus, RequestType, ResidentId, ServiceRequest,
        SpecializationId, StaffMemberId,
    },
    error::{ApiError, ErrorCode},
    paging::{PageMeta, PageRequest, ADMIN_REQUEST_LIMITS, RESIDENT_REQUEST_LIMITS},
    protocol::{
        CreateRequestForm, JobQuery, LeastBusy, MessageResponse, RequestList, RequestPanelQuery,
        RequestUpdatedResponse, ResidentRequestsQuery, UpdateRequestForm,
    },
};
use storage::{NewRequest, RequestFilter, RequestUpdate};

use crate::{internal, non_empty, ApiContext};

fn sort_from(raw: Option<&str>) -> RequestSort {
    raw.map(RequestSort::from_token).unwrap_or_default()
}

/// Unparsable filter values are dropped rather than rejected.
fn lenient<T: std::str::FromStr>(field: &'static str, raw: Option<&str>) -> Option<T> {
    let raw = non_empty(raw)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::debug!(field, value = raw, "ignoring invalid request filter");
            None
        }
    }
}

pub async fn resident_requests(
    ctx: &ApiContext,
    phone: &str,
    query: &ResidentRequestsQuery,
) -> Result<RequestList, ApiError> {
    let page = PageRequest::parse(query.page.as_deref(), query.limit.as_deref(), RESIDENT_REQUEST_LIMITS);
    let filter = RequestFilter {
        resident_phone: Some(phone.to_string()),
        sort: sort_from(query.sort.as_deref()),
        ..RequestFilter::default()
    };
    let requests = ctx
        .storage
        .list_requests(&filter, page)
        .await
        .map_err(internal("failed to get userRequests"))?;
    Ok(RequestList {
        meta: PageMeta::new(requests.total, page),
        requests: requests.items,
    })
}

/// Residents may only file requests for houses linked to them.
pub async fn create_request(
    ctx: &ApiContext,
    phone: &str,
    form: &CreateRequestForm,
) -> Result<ServiceRequest, ApiError> {
    let house_id = form.house_id.trim().parse::<i64>().ok().map(HouseId);
    let request_type = form.request_type.parse::<RequestType>().ok();
    let complaint = non_empty(Some(&form.complaint));
    let (Some(house_id), Some(request_type), Some(complaint)) = (house_id, request_type, complaint) else {
        return Err(ApiError::validation("proper request type and complaint are required"));
    };

    let resident = ctx
        .storage
        .resident_by_phone(phone)
        .await
        .map_err(internal("failed to create request"))?
        .ok_or_else(|| ApiError::new(ErrorCode::Forbidden, "no permission"))?;

    let lives_there = ctx
        .storage
        .resident_lives_in(&resident.id, house_id)
        .await
        .map_err(internal("failed to create request"))?;
    if !lives_there {
        return Err(ApiError::new(
            ErrorCode::Forbidden,
            format!("no permission to send request for house {house_id}"),
        ));
    }

    let request = ctx
        .storage
        .create_request(&NewRequest {
            resident_id: resident.id,
            house_id,
            request_type,
            complaint: complaint.to_string(),
            created_at: Utc::now(),
        })
        .await
        .map_err(internal("failed to create request"))?;
    tracing::info!(request_id = %request.id, house_id = %house_id, "created request");
    Ok(request)
}

pub async fn request_panel(ctx: &ApiContext, query: &RequestPanelQuery) -> Result<RequestList, ApiError> {
    let page = PageRequest::parse(query.page.as_deref(), query.limit.as_deref(), ADMIN_REQUEST_LIMITS);
    let filter = RequestFilter {
        id: non_empty(query.id.as_deref()).map(RequestId::from),
        resident_id: non_empty(query.resident_id.as_deref()).map(ResidentId::from),
        resident_phone: None,
        house_id: lenient::<i64>("houseID", query.house_id.as_deref()).map(HouseId),
        request_type: lenient::<RequestType>("type", query.request_type.as_deref()),
        status: lenient::<RequestStatus>("status", query.status.as_deref()),
        complaint: non_empty(query.complaint.as_deref()).map(str::to_string),
        responsible_id: lenient::<i64>("responsibleID", query.responsible_id.as_deref()).map(StaffMemberId),
        organization_id: non_empty(query.organization_id.as_deref()).map(OrganizationId::from),
        sort: sort_from(query.sort.as_deref()),
    };
    let requests = ctx
        .storage
        .list_requests(&filter, page)
        .await
        .map_err(internal("failed to get filtered requests"))?;
    Ok(RequestList {
        meta: PageMeta::new(requests.total, page),
        requests: requests.items,
    })
}

fn parse_update(form: &UpdateRequestForm) -> Result<RequestUpdate, ApiError> {
    let id = non_empty(Some(&form.id));
    let resident_id = non_empty(Some(&form.resident_id));
    let house_id = form.house_id.trim().parse::<i64>().ok();
    let request_type = form.request_type.parse::<RequestType>().ok();
    let status = form.status.parse::<RequestStatus>().ok();
    let (Some(id), Some(resident_id), Some(house_id), Some(request_type), Some(status)) =
        (id, resident_id, house_id, request_type, status)
    else {
        return Err(ApiError::validation("invalid request"));
    };

    let cost = match non_empty(Some(&form.cost)) {
        None => None,
        Some(raw) => Some(
            raw.parse::<f64>()
                .ok()
                .filter(|cost| cost.is_finite())
                .ok_or_else(|| ApiError::validation("invalid cost"))?,
        ),
    };
    let responsible_id = match non_empty(Some(&form.responsible_id)) {
        None => None,
        Some(raw) => Some(StaffMemberId(
            raw.parse::<i64>()
                .map_err(|_| ApiError::validation("invalid responsible ID"))?,
        )),
    };

    Ok(RequestUpdate {
        id: RequestId::from(id),
        resident_id: ResidentId::from(resident_id),
        house_id: HouseId(house_id),
        request_type,
        complaint: form.complaint.clone(),
        cost,
        status,
        responsible_id,
        organization_id: non_empty(Some(&form.organization_id)).map(OrganizationId::from),
    })
}

/// Replaces every editable field; answers with the responsible staff id.
pub async fn update_request(
    ctx: &ApiContext,
    form: &UpdateRequestForm,
) -> Result<RequestUpdatedResponse, ApiError> {
    let update = parse_update(form)?;
    tracing::info!(request_id = %update.id, status = %update.status, "update request");

    let updated = ctx
        .storage
        .update_request(&update)
        .await
        .map_err(internal("failed to update request"))?;
    if !updated {
        return Err(ApiError::not_found("request not found"));
    }
    Ok(RequestUpdatedResponse {
        message: update.responsible_id,
    })
}

pub async fn least_busy(ctx: &ApiContext, query: &JobQuery) -> Result<LeastBusy, ApiError> {
    let job_id = non_empty(Some(&query.job_id)).ok_or_else(|| ApiError::validation("jobID is required"))?;
    let member = ctx
        .storage
        .least_busy_staff_member(&SpecializationId::from(job_id))
        .await
        .map_err(internal("failed to find least busy by jobID"))?
        .ok_or_else(|| ApiError::validation("failed to find least busy by jobID: staff member not found"))?;
    Ok(LeastBusy { least_busy: member })
}

pub async fn delete_request(ctx: &ApiContext, id: &str) -> Result<MessageResponse, ApiError> {
    let id = non_empty(Some(id)).ok_or_else(|| ApiError::validation("invalid id"))?;
    let deleted = ctx
        .storage
        .delete_request(&RequestId::from(id))
        .await
        .map_err(internal("failed to delete request"))?;
    if !deleted {
        return Err(ApiError::not_found("request not found"));
    }
    Ok(MessageResponse {
        message: format!("deleted {id}"),
    })
}
