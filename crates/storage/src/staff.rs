use anyhow::Result;
use sqlx::{sqlite::SqliteRow, Row};

use shared::{
    domain::{RequestStatus, Specialization, SpecializationId, StaffMember, StaffMemberId, StaffStatus},
    paging::PageRequest,
};

use crate::{contains_pattern, fold, parse_token, window, Page, Storage};

fn staff_member_from_row(r: &SqliteRow) -> Result<StaffMember> {
    Ok(StaffMember {
        id: StaffMemberId(r.get::<i64, _>(0)),
        full_name: r.get::<String, _>(1),
        phone: r.get::<String, _>(2),
        status: parse_token(&r.get::<String, _>(3))?,
    })
}

fn specialization_from_row(r: &SqliteRow) -> Specialization {
    Specialization {
        id: SpecializationId(r.get::<String, _>(0)),
        title: r.get::<String, _>(1),
    }
}

impl Storage {
    /// New members start as `работает`. `None` when the phone is taken.
    pub async fn create_staff_member(&self, phone: &str, full_name: &str) -> Result<Option<StaffMember>> {
        let row = sqlx::query(
            "INSERT INTO staff_members (full_name, phone_number, status) VALUES (?, ?, ?)
             ON CONFLICT(phone_number) DO NOTHING
             RETURNING id, full_name, phone_number, status",
        )
        .bind(full_name)
        .bind(phone)
        .bind(StaffStatus::Active.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(staff_member_from_row).transpose()
    }

    pub async fn staff_member_by_phone(&self, phone: &str) -> Result<Option<StaffMember>> {
        let row = sqlx::query(
            "SELECT id, full_name, phone_number, status FROM staff_members WHERE phone_number = ?",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(staff_member_from_row).transpose()
    }

    pub async fn staff_member_by_id(&self, member_id: StaffMemberId) -> Result<Option<StaffMember>> {
        let row = sqlx::query("SELECT id, full_name, phone_number, status FROM staff_members WHERE id = ?")
            .bind(member_id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(staff_member_from_row).transpose()
    }

    pub async fn set_staff_status(&self, member_id: StaffMemberId, status: StaffStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE staff_members SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(member_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn create_specialization(&self, title: &str) -> Result<Specialization> {
        let id = SpecializationId::generate();
        sqlx::query("INSERT INTO specializations (id, name, name_folded) VALUES (?, ?, ?)")
            .bind(id.as_str())
            .bind(title)
            .bind(fold(title))
            .execute(&self.pool)
            .await?;
        Ok(Specialization {
            id,
            title: title.to_string(),
        })
    }

    pub async fn specialization_by_id(&self, specialization_id: &SpecializationId) -> Result<Option<Specialization>> {
        let row = sqlx::query("SELECT id, name FROM specializations WHERE id = ?")
            .bind(specialization_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(specialization_from_row))
    }

    pub async fn list_specializations(
        &self,
        title_pattern: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Specialization>> {
        let pattern = contains_pattern(title_pattern);
        let (limit, offset) = window(page);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM specializations
             WHERE (?1 IS NULL OR name_folded LIKE ?1 ESCAPE '\\')",
        )
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            "SELECT id, name FROM specializations
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
            items: rows.iter().map(specialization_from_row).collect(),
            total,
        })
    }

    /// Adds the link, or reactivates it if it was deactivated earlier.
    pub async fn assign_specialization(
        &self,
        member_id: StaffMemberId,
        specialization_id: &SpecializationId,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO staff_member_specialization (id_member, id_specialization, is_active)
             VALUES (?, ?, 1)
             ON CONFLICT(id_member, id_specialization) DO UPDATE SET is_active = 1",
        )
        .bind(member_id.0)
        .bind(specialization_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn deactivate_specialization(
        &self,
        member_id: StaffMemberId,
        specialization_id: &SpecializationId,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE staff_member_specialization SET is_active = 0
             WHERE id_member = ? AND id_specialization = ? AND is_active = 1",
        )
        .bind(member_id.0)
        .bind(specialization_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn active_specializations(&self, member_id: StaffMemberId) -> Result<Vec<Specialization>> {
        let rows = sqlx::query(
            "SELECT s.id, s.name
             FROM specializations s
             INNER JOIN staff_member_specialization sms ON sms.id_specialization = s.id
             WHERE sms.id_member = ? AND sms.is_active = 1
             ORDER BY lower(s.name) ASC",
        )
        .bind(member_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(specialization_from_row).collect())
    }

    /// Member with an active link to the specialization and the fewest
    /// requests currently assigned to them. Ties go to the lowest id.
    pub async fn least_busy_staff_member(
        &self,
        specialization_id: &SpecializationId,
    ) -> Result<Option<StaffMemberId>> {
        let id: Option<i64> = sqlx::query_scalar(
            "SELECT staff.id
             FROM staff_members staff
             INNER JOIN staff_member_specialization sms ON sms.id_member = staff.id
             LEFT JOIN requests req ON req.id_responsible = staff.id AND req.status = ?
             WHERE sms.id_specialization = ? AND sms.is_active = 1
             GROUP BY staff.id
             ORDER BY COUNT(req.id) ASC, staff.id ASC
             LIMIT 1",
        )
        .bind(RequestStatus::Assigned.as_str())
        .bind(specialization_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(id.map(StaffMemberId))
    }
}
