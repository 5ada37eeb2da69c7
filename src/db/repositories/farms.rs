use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Row};

use crate::{
    db::{
        helpers::{parse_datetime, parse_optional},
        models::StoredFarm,
        Database,
    },
    farm::FarmProfile,
};

fn row_to_farm(row: &Row) -> Result<StoredFarm> {
    let created_at: String = row.get("created_at")?;

    Ok(StoredFarm {
        id: row.get("id")?,
        profile: FarmProfile {
            name: row.get("name")?,
            size: row.get("size")?,
            location: row.get("location")?,
            soil_type: parse_optional(row.get("soil_type")?, "soil_type")?,
            irrigation_type: parse_optional(row.get("irrigation_type")?, "irrigation_type")?,
            climate_zone: parse_optional(row.get("climate_zone")?, "climate_zone")?,
        },
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_farm(&self, profile: &FarmProfile) -> Result<StoredFarm> {
        let profile = profile.clone();
        self.execute(move |conn| {
            let created_at = Utc::now();
            conn.execute(
                "INSERT INTO farms (name, size, location, soil_type, irrigation_type, climate_zone, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    profile.name,
                    profile.size,
                    profile.location,
                    profile.soil_type.map(|soil| soil.as_str()),
                    profile.irrigation_type.map(|kind| kind.as_str()),
                    profile.climate_zone.map(|zone| zone.as_str()),
                    created_at.to_rfc3339(),
                ],
            )
            .context("failed to insert farm")?;

            Ok(StoredFarm {
                id: conn.last_insert_rowid(),
                profile,
                created_at,
            })
        })
        .await
    }

    /// All farms, oldest first.
    pub async fn list_farms(&self) -> Result<Vec<StoredFarm>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, size, location, soil_type, irrigation_type, climate_zone, created_at
                 FROM farms
                 ORDER BY created_at ASC, id ASC",
            )?;
            let mut rows = stmt.query([])?;
            let mut farms = Vec::new();
            while let Some(row) = rows.next()? {
                farms.push(row_to_farm(row)?);
            }
            Ok(farms)
        })
        .await
    }
}
