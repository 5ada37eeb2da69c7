//! Farm profile creation.

use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::{
    db::{models::StoredFarm, Database},
    error::{Alert, AlertAction},
    forms::{non_blank, FieldErrors, SubmitError},
    navigation::{Navigator, Route},
};

const ENABLE_LOGS: bool = true;

use crate::log_info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoilType {
    Clay,
    Sandy,
    Loamy,
    Silt,
    Peaty,
    Chalky,
    Unknown,
}

impl SoilType {
    pub const ALL: [SoilType; 7] = [
        SoilType::Clay,
        SoilType::Sandy,
        SoilType::Loamy,
        SoilType::Silt,
        SoilType::Peaty,
        SoilType::Chalky,
        SoilType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SoilType::Clay => "Clay",
            SoilType::Sandy => "Sandy",
            SoilType::Loamy => "Loamy",
            SoilType::Silt => "Silt",
            SoilType::Peaty => "Peaty",
            SoilType::Chalky => "Chalky",
            SoilType::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IrrigationType {
    Drip,
    Sprinkler,
    Flood,
    #[serde(rename = "Center Pivot")]
    CenterPivot,
    None,
    Manual,
}

impl IrrigationType {
    pub const ALL: [IrrigationType; 6] = [
        IrrigationType::Drip,
        IrrigationType::Sprinkler,
        IrrigationType::Flood,
        IrrigationType::CenterPivot,
        IrrigationType::None,
        IrrigationType::Manual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IrrigationType::Drip => "Drip",
            IrrigationType::Sprinkler => "Sprinkler",
            IrrigationType::Flood => "Flood",
            IrrigationType::CenterPivot => "Center Pivot",
            IrrigationType::None => "None",
            IrrigationType::Manual => "Manual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClimateZone {
    Tropical,
    Subtropical,
    Temperate,
    Mediterranean,
    Desert,
    Alpine,
}

impl ClimateZone {
    pub const ALL: [ClimateZone; 6] = [
        ClimateZone::Tropical,
        ClimateZone::Subtropical,
        ClimateZone::Temperate,
        ClimateZone::Mediterranean,
        ClimateZone::Desert,
        ClimateZone::Alpine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClimateZone::Tropical => "Tropical",
            ClimateZone::Subtropical => "Subtropical",
            ClimateZone::Temperate => "Temperate",
            ClimateZone::Mediterranean => "Mediterranean",
            ClimateZone::Desert => "Desert",
            ClimateZone::Alpine => "Alpine",
        }
    }
}

fn parse_choice<T: Copy>(options: &[T], name: fn(&T) -> &'static str, raw: &str) -> Option<T> {
    options
        .iter()
        .find(|option| name(option).eq_ignore_ascii_case(raw.trim()))
        .copied()
}

impl FromStr for SoilType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_choice(&Self::ALL, Self::as_str, value)
            .ok_or_else(|| anyhow!("unknown soil type '{value}'"))
    }
}

impl FromStr for IrrigationType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_choice(&Self::ALL, Self::as_str, value)
            .ok_or_else(|| anyhow!("unknown irrigation type '{value}'"))
    }
}

impl FromStr for ClimateZone {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_choice(&Self::ALL, Self::as_str, value)
            .ok_or_else(|| anyhow!("unknown climate zone '{value}'"))
    }
}

/// Raw form contents as typed by the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FarmDraft {
    pub farm_name: String,
    pub farm_size: String,
    pub farm_location: String,
    pub soil_type: String,
    pub irrigation_type: String,
    pub climate_zone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmProfile {
    pub name: String,
    /// Free text, e.g. "25 acres".
    pub size: String,
    pub location: String,
    pub soil_type: Option<SoilType>,
    pub irrigation_type: Option<IrrigationType>,
    pub climate_zone: Option<ClimateZone>,
}

impl FarmDraft {
    pub fn validate(&self) -> Result<FarmProfile, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = non_blank(&self.farm_name);
        if name.is_none() {
            errors.add("farmName", "Farm name is required");
        }
        let size = non_blank(&self.farm_size);
        if size.is_none() {
            errors.add("farmSize", "Farm size is required");
        }
        let location = non_blank(&self.farm_location);
        if location.is_none() {
            errors.add("farmLocation", "Farm location is required");
        }

        let soil_type = optional_choice(&mut errors, "soilType", &self.soil_type);
        let irrigation_type = optional_choice(&mut errors, "irrigationType", &self.irrigation_type);
        let climate_zone = optional_choice(&mut errors, "climateZone", &self.climate_zone);

        match (name, size, location) {
            (Some(name), Some(size), Some(location)) if errors.is_empty() => Ok(FarmProfile {
                name: name.to_string(),
                size: size.to_string(),
                location: location.to_string(),
                soil_type,
                irrigation_type,
                climate_zone,
            }),
            _ => Err(errors),
        }
    }
}

fn optional_choice<T>(errors: &mut FieldErrors, field: &'static str, raw: &str) -> Option<T>
where
    T: FromStr<Err = anyhow::Error>,
{
    let value = non_blank(raw)?;
    match value.parse() {
        Ok(choice) => Some(choice),
        Err(err) => {
            errors.add(field, err.to_string());
            None
        }
    }
}

/// Validate, persist and move on to the dashboard.
pub async fn create_farm(
    db: &Database,
    navigator: &dyn Navigator,
    draft: &FarmDraft,
) -> Result<StoredFarm, SubmitError> {
    let profile = draft.validate()?;
    let stored = db
        .insert_farm(&profile)
        .await
        .map_err(|source| SubmitError::Store {
            message: "Failed to create farm. Please try again.",
            source,
        })?;

    log_info!("Created farm {} ({})", stored.id, stored.profile.name);
    navigator.push(Route::Dashboard);
    Ok(stored)
}

/// Dialog shown before skipping farm creation.
pub fn demo_mode_notice() -> Alert {
    Alert::new(
        "Demo Mode",
        "Skipping farm creation for demo purposes. Going to dashboard...",
        vec![AlertAction::Continue],
    )
}

/// Skip farm creation entirely.
pub fn enter_demo_mode(navigator: &dyn Navigator) {
    navigator.push(Route::Dashboard);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::RouteStack;

    fn draft() -> FarmDraft {
        FarmDraft {
            farm_name: "  Green Acres ".into(),
            farm_size: "25 acres".into(),
            farm_location: "Nakuru, Kenya".into(),
            irrigation_type: "center pivot".into(),
            ..Default::default()
        }
    }

    #[test]
    fn required_fields_are_reported_together() {
        let errors = FarmDraft {
            farm_name: "   ".into(),
            ..Default::default()
        }
        .validate()
        .unwrap_err();

        assert_eq!(errors.len(), 3);
        assert_eq!(errors.get("farmName"), Some("Farm name is required"));
        assert_eq!(errors.get("farmSize"), Some("Farm size is required"));
        assert_eq!(errors.get("farmLocation"), Some("Farm location is required"));
    }

    #[test]
    fn choices_parse_case_insensitively() {
        let profile = draft().validate().unwrap();
        assert_eq!(profile.name, "Green Acres");
        assert_eq!(profile.irrigation_type, Some(IrrigationType::CenterPivot));
        assert_eq!(profile.soil_type, None);

        let errors = FarmDraft {
            climate_zone: "Arctic".into(),
            ..draft()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["climateZone"]);
    }

    #[tokio::test]
    async fn created_farm_is_persisted_and_opens_dashboard() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("agrisense.db")).unwrap();
        let navigator = RouteStack::new(Route::CreateFarm);

        let stored = create_farm(&db, &navigator, &draft()).await.unwrap();
        assert_eq!(navigator.current(), Some(Route::Dashboard));
        assert_eq!(db.list_farms().await.unwrap(), vec![stored]);
    }

    #[tokio::test]
    async fn invalid_draft_stays_on_screen() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("agrisense.db")).unwrap();
        let navigator = RouteStack::new(Route::CreateFarm);

        let err = create_farm(&db, &navigator, &FarmDraft::default())
            .await
            .unwrap_err();
        assert_eq!(err.field_errors().map(FieldErrors::len), Some(3));
        assert!(err.alert().is_none());
        assert_eq!(navigator.depth(), 1);
        assert!(db.list_farms().await.unwrap().is_empty());
    }

    #[test]
    fn demo_mode_goes_straight_to_dashboard() {
        let navigator = RouteStack::new(Route::CreateFarm);
        assert_eq!(demo_mode_notice().actions, vec![AlertAction::Continue]);
        enter_demo_mode(&navigator);
        assert_eq!(navigator.current(), Some(Route::Dashboard));
    }
}
