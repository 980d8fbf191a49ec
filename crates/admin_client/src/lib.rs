//! Typed HTTP client for the HOA admin API.
//!
//! [`AdminClient`] keeps the session cookie issued by `/api/login` and sends it
//! with every later call. Form endpoints are posted as multipart unless noted.
//! [`ListController`] layers pagination state on top of the list endpoints.

use std::sync::Arc;

use reqwest::{
    header::{COOKIE, SET_COOKIE},
    multipart, redirect, Client, RequestBuilder, Response,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shared::{
    domain::{House, Organization, ServiceRequest, Specialization},
    paging::PageRequest,
    protocol::{
        AssignHouseForm, AssignSpecializationForm, CreateHouseForm, CreateOrganizationForm, CreateRequestForm,
        CreateSpecializationForm, FormPayload, LeastBusy, LoginForm, LoginResponse, MessageResponse,
        RegisterForm, RequestPanelQuery, RequestUpdatedResponse, ResidentHouses, ResidentPhone,
        StaffSpecializations, UpdateHouseForm, UpdateOrganizationForm, UpdateRequestForm, UserDetails,
    },
};
use tokio::sync::RwLock;
use url::Url;

mod error;
mod list;

pub use error::ClientError;
pub use list::{
    Houses, ListController, ListResource, Organizations, RequestPanel, ResidentRequests, Specializations, UserPhones,
};

const SESSION_COOKIE: &str = "hoa_session";

/// One page of a list endpoint. Meta fields are `None` when the server left
/// them out.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub page: Option<u32>,
    pub pages: Option<u32>,
    pub total: Option<i64>,
}

#[derive(Clone)]
pub struct AdminClient {
    http: Client,
    base: Url,
    session: Arc<RwLock<Option<String>>>,
}

impl AdminClient {
    pub fn new(server_url: &str) -> Result<Self, ClientError> {
        // `/logout` answers with a redirect to a page this client never renders
        let http = Client::builder().redirect(redirect::Policy::none()).build()?;
        Ok(Self {
            http,
            base: Url::parse(server_url)?,
            session: Arc::default(),
        })
    }

    pub async fn is_logged_in(&self) -> bool {
        self.session.read().await.is_some()
    }

    pub async fn login(&self, phone: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let form = LoginForm {
            phone_number: phone.to_string(),
            password: password.to_string(),
        };
        let response = self
            .execute(self.http.post(self.url("/api/login")?).form(&form.to_fields()))
            .await?;
        let cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .find(|pair| pair.starts_with(&format!("{SESSION_COOKIE}=")))
            .map(str::to_string);
        let body = read_json(response).await?;
        let login: LoginResponse = serde_json::from_value(body)?;

        match cookie {
            Some(cookie) => *self.session.write().await = Some(cookie),
            None => tracing::warn!(phone, "login succeeded without a session cookie"),
        }
        tracing::info!(phone, "logged in");
        Ok(login)
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        let response = self.execute(self.http.get(self.url("/logout")?)).await?;
        *self.session.write().await = None;
        let status = response.status();
        if status.is_success() || status.is_redirection() {
            return Ok(());
        }
        read_json(response).await.map(|_| ())
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base.join(path)?)
    }

    /// `path` followed by one percent-encoded segment.
    fn segment_url(&self, path: &str, segment: &str) -> Result<Url, ClientError> {
        let mut url = self.url(path)?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Invalid("server url cannot carry a path"))?
            .push(segment);
        Ok(url)
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let builder = match self.session.read().await.as_deref() {
            Some(cookie) => builder.header(COOKIE, cookie),
            None => builder,
        };
        Ok(builder.send().await?)
    }

    async fn call<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let body = read_json(self.execute(builder).await?).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn get<T, Q>(&self, path: &str, query: &Q) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.call(self.http.get(self.url(path)?).query(query)).await
    }

    async fn post_multipart<T, F>(&self, path: &str, query: &[(&str, &str)], form: &F) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        F: FormPayload,
    {
        let body = form
            .to_fields()
            .into_iter()
            .fold(multipart::Form::new(), |body, (name, value)| body.text(name, value));
        self.call(self.http.post(self.url(path)?).query(query).multipart(body))
            .await
    }

    async fn post_urlencoded<T, F>(&self, path: &str, form: &F) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        F: FormPayload,
    {
        self.call(self.http.post(self.url(path)?).form(&form.to_fields()))
            .await
    }

    async fn list<T, Q>(&self, path: &str, key: &str, query: &Q) -> Result<Listing<T>, ClientError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let body = read_json(self.execute(self.http.get(self.url(path)?).query(query)).await?).await?;
        let items = match body.get(key) {
            None | Some(Value::Null) => Vec::new(),
            Some(items) => serde_json::from_value(items.clone())?,
        };
        let meta = body.get("meta");
        let field = |name: &str| meta.and_then(|meta| meta.get(name)).and_then(Value::as_u64);
        Ok(Listing {
            items,
            page: field("page").and_then(|v| u32::try_from(v).ok()),
            pages: field("pages").and_then(|v| u32::try_from(v).ok()),
            total: field("total").and_then(|v| i64::try_from(v).ok()),
        })
    }

    pub async fn list_houses(&self, page: PageRequest, pattern: &str) -> Result<Listing<House>, ClientError> {
        self.list("/api/staff/houses/list", "houses", &directory_query(page, "pattern", pattern))
            .await
    }

    pub async fn list_organizations(
        &self,
        page: PageRequest,
        pattern: &str,
    ) -> Result<Listing<Organization>, ClientError> {
        self.list(
            "/api/staff/organizations/list",
            "organizations",
            &directory_query(page, "pattern", pattern),
        )
        .await
    }

    pub async fn list_specializations(
        &self,
        page: PageRequest,
        pattern: &str,
    ) -> Result<Listing<Specialization>, ClientError> {
        self.list(
            "/api/staff/specializations/list",
            "specializations",
            &directory_query(page, "pattern", pattern),
        )
        .await
    }

    pub async fn list_users(&self, page: PageRequest, phone: &str) -> Result<Listing<String>, ClientError> {
        self.list(
            "/api/staff/users/list",
            "phones",
            &directory_query(page, "phoneNumber", phone),
        )
        .await
    }

    pub async fn request_panel(
        &self,
        page: PageRequest,
        filter: &RequestPanelQuery,
    ) -> Result<Listing<ServiceRequest>, ClientError> {
        let query = RequestPanelQuery {
            page: Some(page.page.to_string()),
            limit: Some(page.limit.to_string()),
            ..filter.clone()
        };
        self.list("/api/staff/requests/panel", "requests", &query).await
    }

    pub async fn resident_requests(
        &self,
        page: PageRequest,
        sort: &str,
    ) -> Result<Listing<ServiceRequest>, ClientError> {
        self.list("/api/resident/requests", "requests", &directory_query(page, "sort", sort))
            .await
    }

    pub async fn register(&self, form: &RegisterForm) -> Result<LoginResponse, ClientError> {
        self.post_multipart("/api/staff/register", &[], form).await
    }

    pub async fn create_request(&self, form: &CreateRequestForm) -> Result<ServiceRequest, ClientError> {
        self.post_multipart("/api/resident/create-request", &[], form).await
    }

    pub async fn create_house(&self, form: &CreateHouseForm) -> Result<MessageResponse, ClientError> {
        require(&form.address, "address is required")?;
        self.post_multipart("/api/staff/houses/create", &[], form).await
    }

    pub async fn update_house_address(&self, form: &UpdateHouseForm) -> Result<MessageResponse, ClientError> {
        require(&form.house_id, "house id is required")?;
        self.post_multipart("/api/staff/users/resident/update-house", &[], form)
            .await
    }

    pub async fn create_organization(&self, form: &CreateOrganizationForm) -> Result<MessageResponse, ClientError> {
        require(&form.name, "organization name is required")?;
        self.post_multipart("/api/staff/organizations/create", &[], form)
            .await
    }

    /// Sent URL-encoded.
    pub async fn update_organization(&self, form: &UpdateOrganizationForm) -> Result<MessageResponse, ClientError> {
        require(&form.organization_id, "organization id is required")?;
        require(&form.name, "organization name is required")?;
        self.post_urlencoded("/api/staff/organizations/update", form).await
    }

    pub async fn create_specialization(
        &self,
        form: &CreateSpecializationForm,
    ) -> Result<Specialization, ClientError> {
        require(&form.job_name, "specialization name is required")?;
        self.post_multipart("/api/staff/specializations/create", &[], form)
            .await
    }

    pub async fn add_resident_house(
        &self,
        resident_id: &str,
        form: &AssignHouseForm,
    ) -> Result<MessageResponse, ClientError> {
        require(&form.house_id, "house id is required")?;
        self.post_multipart(
            "/api/staff/users/resident/add-house",
            &[("residentID", resident_id)],
            form,
        )
        .await
    }

    pub async fn add_staff_specialization(
        &self,
        staff_member_id: &str,
        form: &AssignSpecializationForm,
    ) -> Result<MessageResponse, ClientError> {
        require(&form.specialization_id, "specialization id is required")?;
        self.post_multipart(
            "/api/staff/users/staff/add-specialization",
            &[("staffMemberID", staff_member_id)],
            form,
        )
        .await
    }

    /// Sent URL-encoded.
    pub async fn update_request(&self, form: &UpdateRequestForm) -> Result<RequestUpdatedResponse, ClientError> {
        self.post_urlencoded("/api/staff/requests/panel/update", form).await
    }

    pub async fn user_details(&self, phone: &str) -> Result<UserDetails, ClientError> {
        let url = self.segment_url("/api/staff/users/info", phone)?;
        self.call(self.http.get(url)).await
    }

    pub async fn resident_houses(&self, resident_id: &str) -> Result<ResidentHouses, ClientError> {
        self.get("/api/staff/users/resident/info", &[("residentID", resident_id)])
            .await
    }

    pub async fn resident_phone(&self, resident_id: &str) -> Result<ResidentPhone, ClientError> {
        self.get("/api/staff/users/resident/get-number", &[("residentID", resident_id)])
            .await
    }

    pub async fn staff_specializations(&self, staff_member_id: &str) -> Result<StaffSpecializations, ClientError> {
        self.get("/api/staff/users/staff/info", &[("staffMemberID", staff_member_id)])
            .await
    }

    pub async fn least_busy(&self, job_id: &str) -> Result<LeastBusy, ClientError> {
        self.get("/api/staff/requests/panel/update/random-assign", &[("jobID", job_id)])
            .await
    }

    pub async fn delete_user(&self, phone: &str) -> Result<MessageResponse, ClientError> {
        let url = self.segment_url("/api/staff/users/delete", phone)?;
        self.call(self.http.get(url)).await
    }

    pub async fn remove_resident_house(&self, resident_id: &str, house_id: &str) -> Result<MessageResponse, ClientError> {
        self.get(
            "/api/staff/users/resident/remove-house",
            &[("residentID", resident_id), ("houseID", house_id)],
        )
        .await
    }

    pub async fn deactivate_staff_specialization(
        &self,
        staff_member_id: &str,
        job_id: &str,
    ) -> Result<MessageResponse, ClientError> {
        self.get(
            "/api/staff/users/staff/delete-spec",
            &[("staffMemberID", staff_member_id), ("jobID", job_id)],
        )
        .await
    }

    pub async fn delete_request(&self, id: &str) -> Result<MessageResponse, ClientError> {
        let url = self.segment_url("/api/staff/requests/panel/delete", id)?;
        self.call(self.http.get(url)).await
    }
}

async fn read_json(response: Response) -> Result<Value, ClientError> {
    let status = response.status().as_u16();
    let text = response.text().await?;
    let body = error::decode_body(&text);
    if !(200..300).contains(&status) {
        let message = error::error_message(status, &body);
        tracing::debug!(status, %message, "request rejected");
        return Err(ClientError::Api {
            status,
            message,
            body,
        });
    }
    Ok(body)
}

fn directory_query(page: PageRequest, filter_key: &'static str, filter: &str) -> Vec<(&'static str, String)> {
    let mut query = vec![("page", page.page.to_string()), ("limit", page.limit.to_string())];
    let filter = filter.trim();
    if !filter.is_empty() {
        query.push((filter_key, filter.to_string()));
    }
    query
}

fn require(value: &str, message: &'static str) -> Result<(), ClientError> {
    if value.trim().is_empty() {
        return Err(ClientError::Invalid(message));
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
