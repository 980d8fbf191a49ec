use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};

use shared::{
    domain::{
        HouseId, OrganizationId, RequestId, RequestSort, RequestStatus, RequestType, ResidentId, ServiceRequest,
        StaffMemberId,
    },
    paging::PageRequest,
};

use crate::{contains_pattern, fold, parse_token, window, Page, Storage};

#[derive(Debug, Clone)]
pub struct NewRequest {
    pub resident_id: ResidentId,
    pub house_id: HouseId,
    pub request_type: RequestType,
    pub complaint: String,
    pub created_at: DateTime<Utc>,
}

/// Conjunction of optional equality filters; `complaint` is a substring match
/// and `resident_phone` selects the requests of one resident account.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub id: Option<RequestId>,
    pub resident_id: Option<ResidentId>,
    pub resident_phone: Option<String>,
    pub house_id: Option<HouseId>,
    pub request_type: Option<RequestType>,
    pub status: Option<RequestStatus>,
    pub complaint: Option<String>,
    pub responsible_id: Option<StaffMemberId>,
    pub organization_id: Option<OrganizationId>,
    pub sort: RequestSort,
}

/// Full replacement of a request's editable fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestUpdate {
    pub id: RequestId,
    pub resident_id: ResidentId,
    pub house_id: HouseId,
    pub request_type: RequestType,
    pub complaint: String,
    pub cost: Option<f64>,
    pub status: RequestStatus,
    pub responsible_id: Option<StaffMemberId>,
    pub organization_id: Option<OrganizationId>,
}

const REQUEST_COLUMNS: &str = "req.id, req.id_resident, req.id_house, req.type, req.complaint, req.cost, \
     req.status, req.id_responsible, req.id_organization, req.created_at";

const REQUEST_SOURCE: &str = " FROM requests req INNER JOIN residents res ON res.id = req.id_resident WHERE 1 = 1";

fn request_from_row(r: &SqliteRow) -> Result<ServiceRequest> {
    Ok(ServiceRequest {
        id: RequestId(r.get::<String, _>(0)),
        resident_id: ResidentId(r.get::<String, _>(1)),
        house_id: HouseId(r.get::<i64, _>(2)),
        request_type: parse_token(&r.get::<String, _>(3))?,
        complaint: r.get::<String, _>(4),
        cost: r.get::<Option<f64>, _>(5),
        status: parse_token(&r.get::<String, _>(6))?,
        responsible_id: r.get::<Option<i64>, _>(7).map(StaffMemberId),
        organization_id: r.get::<Option<String>, _>(8).map(OrganizationId),
        created_at: r.get::<DateTime<Utc>, _>(9),
    })
}

fn order_clause(sort: RequestSort) -> &'static str {
    match sort {
        RequestSort::StatusAsc => " ORDER BY req.status ASC, req.created_at DESC, req.id ASC",
        RequestSort::TypeAsc => " ORDER BY req.type ASC, req.created_at DESC, req.id ASC",
        RequestSort::CreatedAsc => " ORDER BY req.created_at ASC, req.id ASC",
        RequestSort::CreatedDesc => " ORDER BY req.created_at DESC, req.id ASC",
    }
}

impl RequestFilter {
    fn push_conditions<'a>(&'a self, qb: &mut QueryBuilder<'a, Sqlite>) {
        if let Some(id) = &self.id {
            qb.push(" AND req.id = ").push_bind(id.as_str());
        }
        if let Some(resident_id) = &self.resident_id {
            qb.push(" AND req.id_resident = ").push_bind(resident_id.as_str());
        }
        if let Some(phone) = &self.resident_phone {
            qb.push(" AND res.phone_number = ").push_bind(phone.as_str());
        }
        if let Some(house_id) = self.house_id {
            qb.push(" AND req.id_house = ").push_bind(house_id.0);
        }
        if let Some(request_type) = self.request_type {
            qb.push(" AND req.type = ").push_bind(request_type.as_str());
        }
        if let Some(status) = self.status {
            qb.push(" AND req.status = ").push_bind(status.as_str());
        }
        if let Some(complaint) = contains_pattern(self.complaint.as_deref()) {
            qb.push(" AND req.complaint_folded LIKE ")
                .push_bind(complaint)
                .push(" ESCAPE '\\'");
        }
        if let Some(responsible_id) = self.responsible_id {
            qb.push(" AND req.id_responsible = ").push_bind(responsible_id.0);
        }
        if let Some(organization_id) = &self.organization_id {
            qb.push(" AND req.id_organization = ").push_bind(organization_id.as_str());
        }
    }
}

impl Storage {
    /// New requests start in status `создана` with no cost or assignee.
    pub async fn create_request(&self, new_request: &NewRequest) -> Result<ServiceRequest> {
        let id = RequestId::generate();
        sqlx::query(
            "INSERT INTO requests (id, id_resident, id_house, type, complaint, complaint_folded, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.as_str())
        .bind(new_request.resident_id.as_str())
        .bind(new_request.house_id.0)
        .bind(new_request.request_type.as_str())
        .bind(&new_request.complaint)
        .bind(fold(&new_request.complaint))
        .bind(RequestStatus::Created.as_str())
        .bind(new_request.created_at)
        .execute(&self.pool)
        .await?;

        Ok(ServiceRequest {
            id,
            resident_id: new_request.resident_id.clone(),
            house_id: new_request.house_id,
            request_type: new_request.request_type,
            complaint: new_request.complaint.clone(),
            cost: None,
            status: RequestStatus::Created,
            responsible_id: None,
            organization_id: None,
            created_at: new_request.created_at,
        })
    }

    pub async fn request_by_id(&self, request_id: &RequestId) -> Result<Option<ServiceRequest>> {
        let row = sqlx::query(&format!("SELECT {REQUEST_COLUMNS} FROM requests req WHERE req.id = ?"))
            .bind(request_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(request_from_row).transpose()
    }

    pub async fn list_requests(&self, filter: &RequestFilter, page: PageRequest) -> Result<Page<ServiceRequest>> {
        let (limit, offset) = window(page);

        let mut count_query = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*){REQUEST_SOURCE}"));
        filter.push_conditions(&mut count_query);
        let total: i64 = count_query.build_query_scalar().fetch_one(&self.pool).await?;

        if total == 0 {
            return Ok(Page {
                items: Vec::new(),
                total,
            });
        }

        let mut rows_query = QueryBuilder::<Sqlite>::new(format!("SELECT {REQUEST_COLUMNS}{REQUEST_SOURCE}"));
        filter.push_conditions(&mut rows_query);
        rows_query
            .push(order_clause(filter.sort))
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let rows = rows_query.build().fetch_all(&self.pool).await?;

        let items = rows.iter().map(request_from_row).collect::<Result<Vec<_>>>()?;
        Ok(Page { items, total })
    }

    pub async fn update_request(&self, update: &RequestUpdate) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE requests
             SET id_resident = ?, id_house = ?, type = ?, complaint = ?, complaint_folded = ?,
                 cost = ?, status = ?,
                 id_responsible = ?, id_organization = ?
             WHERE id = ?",
        )
        .bind(update.resident_id.as_str())
        .bind(update.house_id.0)
        .bind(update.request_type.as_str())
        .bind(&update.complaint)
        .bind(fold(&update.complaint))
        .bind(update.cost)
        .bind(update.status.as_str())
        .bind(update.responsible_id.map(|id| id.0))
        .bind(update.organization_id.as_ref().map(OrganizationId::as_str))
        .bind(update.id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_request(&self, request_id: &RequestId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM requests WHERE id = ?")
            .bind(request_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
