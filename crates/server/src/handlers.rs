use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use shared::{
    domain::{ServiceRequest, Specialization},
    error::ApiError,
    protocol::{
        AssignHouseForm, AssignSpecializationForm, CreateHouseForm, CreateOrganizationForm, CreateRequestForm,
        CreateSpecializationForm, DirectoryQuery, HouseList, JobQuery, LeastBusy, LoginForm, LoginResponse,
        MessageResponse, OrganizationList, PhoneList, RegisterForm, RequestList, RequestPanelQuery,
        RequestUpdatedResponse, ResidentHouseQuery, ResidentHouses, ResidentPhone, ResidentQuery,
        ResidentRequestsQuery, SpecializationList, StaffMemberQuery, StaffSpecializationQuery,
        StaffSpecializations, UpdateHouseForm, UpdateOrganizationForm, UpdateRequestForm, UserDetails,
        UserListQuery,
    },
};

use crate::{
    app_state::AppState,
    error::{reject, ApiResult, HttpError},
    form::FormBody,
    session::{session_cookie, SessionUser},
};

type Shared = State<Arc<AppState>>;

fn respond<T>(result: Result<T, ApiError>) -> ApiResult<T> {
    result.map(Json).map_err(reject)
}

pub(crate) async fn healthz(State(state): Shared) -> Result<&'static str, HttpError> {
    state.api.storage.health_check().await.map_err(|err| {
        tracing::error!(error = %err, "health check failed");
        reject(ApiError::internal("storage unavailable"))
    })?;
    Ok("ok")
}

pub(crate) async fn login(
    State(state): Shared,
    FormBody(form): FormBody<LoginForm>,
) -> Result<Response, HttpError> {
    let outcome = server_api::login(&state.api, &form).await.map_err(reject)?;
    let cookie = session_cookie(
        &outcome.token,
        state.api.sessions.ttl_seconds(),
        state.secure_cookies,
    );
    Ok(([(header::SET_COOKIE, cookie)], Json(outcome.response)).into_response())
}

pub(crate) async fn register(
    State(state): Shared,
    Extension(user): Extension<SessionUser>,
    FormBody(form): FormBody<RegisterForm>,
) -> ApiResult<LoginResponse> {
    tracing::info!(by = %user.phone, phone = %form.phone_number, "registering user");
    respond(server_api::register(&state.api, &form).await)
}

pub(crate) async fn resident_requests(
    State(state): Shared,
    Extension(user): Extension<SessionUser>,
    Query(query): Query<ResidentRequestsQuery>,
) -> ApiResult<RequestList> {
    respond(server_api::resident_requests(&state.api, &user.phone, &query).await)
}

pub(crate) async fn create_request(
    State(state): Shared,
    Extension(user): Extension<SessionUser>,
    FormBody(form): FormBody<CreateRequestForm>,
) -> ApiResult<ServiceRequest> {
    respond(server_api::create_request(&state.api, &user.phone, &form).await)
}

pub(crate) async fn list_users(State(state): Shared, Query(query): Query<UserListQuery>) -> ApiResult<PhoneList> {
    respond(server_api::list_users(&state.api, &query).await)
}

pub(crate) async fn delete_user(State(state): Shared, Path(phone): Path<String>) -> ApiResult<MessageResponse> {
    respond(server_api::delete_user(&state.api, &phone).await)
}

pub(crate) async fn user_details(State(state): Shared, Path(phone): Path<String>) -> ApiResult<UserDetails> {
    respond(server_api::user_details(&state.api, &phone).await)
}

pub(crate) async fn resident_houses(
    State(state): Shared,
    Query(query): Query<ResidentQuery>,
) -> ApiResult<ResidentHouses> {
    respond(server_api::resident_houses(&state.api, &query).await)
}

pub(crate) async fn remove_resident_house(
    State(state): Shared,
    Query(query): Query<ResidentHouseQuery>,
) -> ApiResult<MessageResponse> {
    respond(server_api::remove_resident_house(&state.api, &query).await)
}

pub(crate) async fn add_resident_house(
    State(state): Shared,
    Query(query): Query<ResidentQuery>,
    FormBody(form): FormBody<AssignHouseForm>,
) -> ApiResult<MessageResponse> {
    respond(server_api::add_resident_house(&state.api, &query, &form).await)
}

pub(crate) async fn update_house_address(
    State(state): Shared,
    FormBody(form): FormBody<UpdateHouseForm>,
) -> ApiResult<MessageResponse> {
    respond(server_api::update_house_address(&state.api, &form).await)
}

pub(crate) async fn resident_phone(
    State(state): Shared,
    Query(query): Query<ResidentQuery>,
) -> ApiResult<ResidentPhone> {
    respond(server_api::resident_phone(&state.api, &query).await)
}

pub(crate) async fn staff_specializations(
    State(state): Shared,
    Query(query): Query<StaffMemberQuery>,
) -> ApiResult<StaffSpecializations> {
    respond(server_api::staff_specializations(&state.api, &query).await)
}

pub(crate) async fn deactivate_staff_specialization(
    State(state): Shared,
    Query(query): Query<StaffSpecializationQuery>,
) -> ApiResult<MessageResponse> {
    respond(server_api::deactivate_staff_specialization(&state.api, &query).await)
}

pub(crate) async fn add_staff_specialization(
    State(state): Shared,
    Query(query): Query<StaffMemberQuery>,
    FormBody(form): FormBody<AssignSpecializationForm>,
) -> ApiResult<MessageResponse> {
    respond(server_api::add_staff_specialization(&state.api, &query, &form).await)
}

pub(crate) async fn list_organizations(
    State(state): Shared,
    Query(query): Query<DirectoryQuery>,
) -> ApiResult<OrganizationList> {
    respond(server_api::list_organizations(&state.api, &query).await)
}

pub(crate) async fn create_organization(
    State(state): Shared,
    FormBody(form): FormBody<CreateOrganizationForm>,
) -> ApiResult<MessageResponse> {
    respond(server_api::create_organization(&state.api, &form).await)
}

pub(crate) async fn update_organization(
    State(state): Shared,
    FormBody(form): FormBody<UpdateOrganizationForm>,
) -> ApiResult<MessageResponse> {
    respond(server_api::update_organization(&state.api, &form).await)
}

pub(crate) async fn list_specializations(
    State(state): Shared,
    Query(query): Query<DirectoryQuery>,
) -> ApiResult<SpecializationList> {
    respond(server_api::list_specializations(&state.api, &query).await)
}

pub(crate) async fn create_specialization(
    State(state): Shared,
    FormBody(form): FormBody<CreateSpecializationForm>,
) -> ApiResult<Specialization> {
    respond(server_api::create_specialization(&state.api, &form).await)
}

pub(crate) async fn list_houses(State(state): Shared, Query(query): Query<DirectoryQuery>) -> ApiResult<HouseList> {
    respond(server_api::list_houses(&state.api, &query).await)
}

pub(crate) async fn create_house(
    State(state): Shared,
    FormBody(form): FormBody<CreateHouseForm>,
) -> ApiResult<MessageResponse> {
    respond(server_api::create_house(&state.api, &form).await)
}

pub(crate) async fn request_panel(
    State(state): Shared,
    Query(query): Query<RequestPanelQuery>,
) -> ApiResult<RequestList> {
    respond(server_api::request_panel(&state.api, &query).await)
}

pub(crate) async fn update_request(
    State(state): Shared,
    FormBody(form): FormBody<UpdateRequestForm>,
) -> ApiResult<RequestUpdatedResponse> {
    respond(server_api::update_request(&state.api, &form).await)
}

pub(crate) async fn least_busy(State(state): Shared, Query(query): Query<JobQuery>) -> ApiResult<LeastBusy> {
    respond(server_api::least_busy(&state.api, &query).await)
}

pub(crate) async fn delete_request(State(state): Shared, Path(id): Path<String>) -> ApiResult<MessageResponse> {
    respond(server_api::delete_request(&state.api, &id).await)
}
