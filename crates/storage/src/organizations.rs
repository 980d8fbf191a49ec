use anyhow::Result;
use sqlx::{sqlite::SqliteRow, Row};

use shared::{
    domain::{Organization, OrganizationId},
    paging::PageRequest,
};

use crate::{contains_pattern, fold, window, Page, Storage};

fn organization_from_row(r: &SqliteRow) -> Organization {
    Organization {
        id: OrganizationId(r.get::<String, _>(0)),
        name: r.get::<String, _>(1),
    }
}

impl Storage {
    pub async fn create_organization(&self, name: &str) -> Result<Organization> {
        let id = OrganizationId::generate();
        sqlx::query("INSERT INTO organizations (id, name, name_folded) VALUES (?, ?, ?)")
            .bind(id.as_str())
            .bind(name)
            .bind(fold(name))
            .execute(&self.pool)
            .await?;
        Ok(Organization {
            id,
            name: name.to_string(),
        })
    }

    pub async fn organization_by_id(&self, organization_id: &OrganizationId) -> Result<Option<Organization>> {
        let row = sqlx::query("SELECT id, name FROM organizations WHERE id = ?")
            .bind(organization_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(organization_from_row))
    }

    pub async fn rename_organization(&self, organization_id: &OrganizationId, name: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE organizations SET name = ?, name_folded = ? WHERE id = ?")
            .bind(name)
            .bind(fold(name))
            .bind(organization_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_organizations(
        &self,
        name_pattern: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Organization>> {
        let pattern = contains_pattern(name_pattern);
        let (limit, offset) = window(page);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM organizations
             WHERE (?1 IS NULL OR name_folded LIKE ?1 ESCAPE '\\')",
        )
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            "SELECT id, name FROM organizations
             WHERE (?1 IS NULL OR name_folded LIKE ?1 ESCAPE '\\')
             ORDER BY lower(name) ASC, id ASC
             LIMIT ?2 OFFSET ?3",
        )
        .bind(pattern.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items: rows.iter().map(organization_from_row).collect(),
            total,
        })
    }
}
