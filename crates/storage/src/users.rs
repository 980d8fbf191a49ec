use anyhow::Result;
use sqlx::Row;

use shared::paging::PageRequest;

use crate::{contains_pattern, window, Page, Storage};

/// Which role records went away together with an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserRemoval {
    pub staff: bool,
    pub resident: bool,
}

impl Storage {
    /// Returns `false` when the phone number is already registered.
    pub async fn create_user(&self, phone: &str, password_hash: &str) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO users (phone_number, password_hash) VALUES (?, ?)
             ON CONFLICT(phone_number) DO NOTHING",
        )
        .bind(phone)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn password_hash_for(&self, phone: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT password_hash FROM users WHERE phone_number = ?")
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    pub async fn list_user_phones(
        &self,
        phone_pattern: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<String>> {
        let pattern = contains_pattern(phone_pattern);
        let (limit, offset) = window(page);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users
             WHERE (?1 IS NULL OR phone_number LIKE ?1 ESCAPE '\\')",
        )
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            "SELECT phone_number FROM users
             WHERE (?1 IS NULL OR phone_number LIKE ?1 ESCAPE '\\')
             ORDER BY phone_number ASC
             LIMIT ?2 OFFSET ?3",
        )
        .bind(pattern.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items: rows.into_iter().map(|r| r.get::<String, _>(0)).collect(),
            total,
        })
    }

    /// Removes the staff record (its specialization links, unassigning its
    /// requests), the resident record (its house links and requests) and the
    /// account in one transaction. `None` when no such account exists.
    pub async fn delete_user(&self, phone: &str) -> Result<Option<UserRemoval>> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<String> = sqlx::query_scalar("SELECT phone_number FROM users WHERE phone_number = ?")
            .bind(phone)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let member_id: Option<i64> = sqlx::query_scalar("SELECT id FROM staff_members WHERE phone_number = ?")
            .bind(phone)
            .fetch_optional(&mut *tx)
            .await?;
        if let Some(member_id) = member_id {
            sqlx::query("DELETE FROM staff_member_specialization WHERE id_member = ?")
                .bind(member_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("UPDATE requests SET id_responsible = NULL WHERE id_responsible = ?")
                .bind(member_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM staff_members WHERE id = ?")
                .bind(member_id)
                .execute(&mut *tx)
                .await?;
        }

        let resident = sqlx::query("DELETE FROM residents WHERE phone_number = ?")
            .bind(phone)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE phone_number = ?")
            .bind(phone)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(UserRemoval {
            staff: member_id.is_some(),
            resident: resident.rows_affected() > 0,
        }))
    }
}
