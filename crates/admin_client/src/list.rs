use async_trait::async_trait;
use shared::{
    domain::{House, Organization, ServiceRequest, Specialization},
    paging::{PageCursor, PageRequest},
    protocol::RequestPanelQuery,
};

use crate::{AdminClient, ClientError, Listing};

/// A list endpoint the controller can page through.
#[async_trait]
pub trait ListResource: Send + Sync {
    type Item: Send + Sync;
    type Filter: Default + Send + Sync;

    async fn fetch(
        &self,
        client: &AdminClient,
        page: PageRequest,
        filter: &Self::Filter,
    ) -> Result<Listing<Self::Item>, ClientError>;
}

pub struct Houses;
pub struct Organizations;
pub struct Specializations;
/// Filtered by phone number substring.
pub struct UserPhones;
/// Filtered by sort token.
pub struct ResidentRequests;
pub struct RequestPanel;

#[async_trait]
impl ListResource for Houses {
    type Item = House;
    type Filter = String;

    async fn fetch(&self, client: &AdminClient, page: PageRequest, filter: &String) -> Result<Listing<House>, ClientError> {
        client.list_houses(page, filter).await
    }
}

#[async_trait]
impl ListResource for Organizations {
    type Item = Organization;
    type Filter = String;

    async fn fetch(
        &self,
        client: &AdminClient,
        page: PageRequest,
        filter: &String,
    ) -> Result<Listing<Organization>, ClientError> {
        client.list_organizations(page, filter).await
    }
}

#[async_trait]
impl ListResource for Specializations {
    type Item = Specialization;
    type Filter = String;

    async fn fetch(
        &self,
        client: &AdminClient,
        page: PageRequest,
        filter: &String,
    ) -> Result<Listing<Specialization>, ClientError> {
        client.list_specializations(page, filter).await
    }
}

#[async_trait]
impl ListResource for UserPhones {
    type Item = String;
    type Filter = String;

    async fn fetch(&self, client: &AdminClient, page: PageRequest, filter: &String) -> Result<Listing<String>, ClientError> {
        client.list_users(page, filter).await
    }
}

#[async_trait]
impl ListResource for ResidentRequests {
    type Item = ServiceRequest;
    type Filter = String;

    async fn fetch(
        &self,
        client: &AdminClient,
        page: PageRequest,
        filter: &String,
    ) -> Result<Listing<ServiceRequest>, ClientError> {
        client.resident_requests(page, filter).await
    }
}

#[async_trait]
impl ListResource for RequestPanel {
    type Item = ServiceRequest;
    type Filter = RequestPanelQuery;

    async fn fetch(
        &self,
        client: &AdminClient,
        page: PageRequest,
        filter: &RequestPanelQuery,
    ) -> Result<Listing<ServiceRequest>, ClientError> {
        client.request_panel(page, filter).await
    }
}

/// Paging state, filter and the last fetched rows of one list view.
///
/// A failed fetch clears the rows and records the message but leaves the
/// page count alone. Changing the limit or the filter goes back to page 1.
pub struct ListController<R: ListResource> {
    resource: R,
    cursor: PageCursor,
    filter: R::Filter,
    items: Vec<R::Item>,
    error: Option<String>,
}

impl<R: ListResource> ListController<R> {
    pub fn new(resource: R, limit: u32) -> Self {
        Self {
            resource,
            cursor: PageCursor::new(limit),
            filter: R::Filter::default(),
            items: Vec::new(),
            error: None,
        }
    }

    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    pub fn items(&self) -> &[R::Item] {
        &self.items
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn filter(&self) -> &R::Filter {
        &self.filter
    }

    pub async fn reload(&mut self, client: &AdminClient) -> Result<(), ClientError> {
        match self
            .resource
            .fetch(client, self.cursor.request(), &self.filter)
            .await
        {
            Ok(listing) => {
                self.cursor.apply(listing.page, listing.pages, listing.total);
                self.items = listing.items;
                self.error = None;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, page = self.cursor.page, "list reload failed");
                self.items.clear();
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// `Ok(false)` when already on the last page.
    pub async fn next_page(&mut self, client: &AdminClient) -> Result<bool, ClientError> {
        if !self.cursor.next() {
            return Ok(false);
        }
        self.reload(client).await.map(|_| true)
    }

    pub async fn prev_page(&mut self, client: &AdminClient) -> Result<bool, ClientError> {
        if !self.cursor.prev() {
            return Ok(false);
        }
        self.reload(client).await.map(|_| true)
    }

    pub async fn set_limit(&mut self, client: &AdminClient, limit: u32) -> Result<(), ClientError> {
        self.cursor.set_limit(limit);
        self.reload(client).await
    }

    pub async fn set_filter(&mut self, client: &AdminClient, filter: R::Filter) -> Result<(), ClientError> {
        self.filter = filter;
        self.cursor.reset();
        self.reload(client).await
    }

    /// Reloads once if `outcome` is a success, otherwise hands the error back
    /// untouched.
    pub async fn reload_after<T>(
        &mut self,
        client: &AdminClient,
        outcome: Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        let value = outcome?;
        self.reload(client).await?;
        Ok(value)
    }
}
