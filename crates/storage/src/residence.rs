use anyhow::Result;
use sqlx::{sqlite::SqliteRow, Row};

use shared::{
    domain::{House, HouseId, Resident, ResidentId},
    paging::PageRequest,
};

use crate::{contains_pattern, fold, window, Page, Storage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HouseRename {
    Renamed,
    NotFound,
    AddressTaken,
}

fn resident_from_row(r: &SqliteRow) -> Resident {
    Resident {
        id: ResidentId(r.get::<String, _>(0)),
        phone: r.get::<String, _>(1),
        full_name: r.get::<String, _>(2),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

fn house_from_row(r: &SqliteRow) -> House {
    House {
        id: HouseId(r.get::<i64, _>(0)),
        address: r.get::<String, _>(1),
    }
}

impl Storage {
    /// `None` when a resident with this phone already exists. The user account
    /// must exist first.
    pub async fn create_resident(&self, phone: &str, full_name: &str) -> Result<Option<Resident>> {
        let id = ResidentId::generate();
        let result = sqlx::query(
            "INSERT INTO residents (id, phone_number, full_name) VALUES (?, ?, ?)
             ON CONFLICT(phone_number) DO NOTHING",
        )
        .bind(id.as_str())
        .bind(phone)
        .bind(full_name)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(Resident {
            id,
            phone: phone.to_string(),
            full_name: full_name.to_string(),
        }))
    }

    pub async fn resident_by_phone(&self, phone: &str) -> Result<Option<Resident>> {
        let row = sqlx::query("SELECT id, phone_number, full_name FROM residents WHERE phone_number = ?")
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(resident_from_row))
    }

    pub async fn resident_by_id(&self, resident_id: &ResidentId) -> Result<Option<Resident>> {
        let row = sqlx::query("SELECT id, phone_number, full_name FROM residents WHERE id = ?")
            .bind(resident_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(resident_from_row))
    }

    /// `None` when the address is already registered.
    pub async fn create_house(&self, address: &str) -> Result<Option<House>> {
        let row = sqlx::query(
            "INSERT INTO houses (address, address_folded) VALUES (?, ?)
             ON CONFLICT(address) DO NOTHING
             RETURNING id, address",
        )
        .bind(address)
        .bind(fold(address))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(house_from_row))
    }

    pub async fn house_by_id(&self, house_id: HouseId) -> Result<Option<House>> {
        let row = sqlx::query("SELECT id, address FROM houses WHERE id = ?")
            .bind(house_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(house_from_row))
    }

    pub async fn list_houses(&self, address_pattern: Option<&str>, page: PageRequest) -> Result<Page<House>> {
        let pattern = contains_pattern(address_pattern);
        let (limit, offset) = window(page);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM houses
             WHERE (?1 IS NULL OR address_folded LIKE ?1 ESCAPE '\\')",
        )
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            "SELECT id, address FROM houses
             WHERE (?1 IS NULL OR address_folded LIKE ?1 ESCAPE '\\')
             ORDER BY id ASC
             LIMIT ?2 OFFSET ?3",
        )
        .bind(pattern.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items: rows.iter().map(house_from_row).collect(),
            total,
        })
    }

    /// A single statement, so a concurrent rename onto the same address
    /// surfaces as the UNIQUE violation and maps to `AddressTaken`.
    pub async fn rename_house(&self, house_id: HouseId, address: &str) -> Result<HouseRename> {
        let updated = sqlx::query("UPDATE houses SET address = ?, address_folded = ? WHERE id = ?")
            .bind(address)
            .bind(fold(address))
            .bind(house_id.0)
            .execute(&self.pool)
            .await;
        match updated {
            Ok(result) if result.rows_affected() == 0 => Ok(HouseRename::NotFound),
            Ok(_) => Ok(HouseRename::Renamed),
            Err(err) if is_unique_violation(&err) => Ok(HouseRename::AddressTaken),
            Err(err) => Err(err.into()),
        }
    }

    /// Idempotent; linking an already linked house is not an error.
    pub async fn link_resident_house(&self, resident_id: &ResidentId, house_id: HouseId) -> Result<()> {
        sqlx::query(
            "INSERT INTO residents_houses (id_resident, id_house) VALUES (?, ?)
             ON CONFLICT(id_resident, id_house) DO NOTHING",
        )
        .bind(resident_id.as_str())
        .bind(house_id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn unlink_resident_house(&self, resident_id: &ResidentId, house_id: HouseId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM residents_houses WHERE id_resident = ? AND id_house = ?")
            .bind(resident_id.as_str())
            .bind(house_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn resident_lives_in(&self, resident_id: &ResidentId, house_id: HouseId) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM residents_houses WHERE id_resident = ? AND id_house = ?",
        )
        .bind(resident_id.as_str())
        .bind(house_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    pub async fn houses_for_resident(&self, resident_id: &ResidentId) -> Result<Vec<House>> {
        let rows = sqlx::query(
            "SELECT h.id, h.address
             FROM houses h
             INNER JOIN residents_houses rh ON rh.id_house = h.id
             WHERE rh.id_resident = ?
             ORDER BY h.id ASC",
        )
        .bind(resident_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(house_from_row).collect())
    }
}
