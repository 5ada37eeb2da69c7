//! Manual soil sensor entry.
//!
//! The form arrives as raw strings straight from the text inputs. A valid form
//! becomes an immutable [`SensorInput`] for the analysis step.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::forms::{non_blank, FieldErrors};

pub const SOIL_TEXTURES: [&str; 6] = ["Clay", "Sandy", "Loamy", "Silt", "Peaty", "Chalky"];

const OPTIONAL_NUMERIC_FIELDS: [&str; 8] = [
    "organicMatter",
    "bulkDensity",
    "porosity",
    "electricalConductivity",
    "rainfall",
    "humidity",
    "windSpeed",
    "solarRadiation",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Numeric(f64),
    Choice(String),
}

impl Reading {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Reading::Numeric(value) => Some(*value),
            Reading::Choice(_) => None,
        }
    }
}

/// Validated readings, keyed by field name. Read-only after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorInput {
    readings: BTreeMap<String, Reading>,
}

impl SensorInput {
    pub fn get(&self, field: &str) -> Option<&Reading> {
        self.readings.get(field)
    }

    pub fn readings(&self) -> &BTreeMap<String, Reading> {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Flatten into string form fields, e.g. for the prediction upload.
    pub fn to_form_fields(&self) -> BTreeMap<String, String> {
        self.readings
            .iter()
            .map(|(key, reading)| {
                let value = match reading {
                    Reading::Numeric(number) => number.to_string(),
                    Reading::Choice(choice) => choice.clone(),
                };
                (key.clone(), value)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SensorForm {
    pub ph: String,
    pub moisture: String,
    pub temperature: String,
    pub nitrogen: String,
    pub phosphorus: String,
    pub potassium: String,
    pub organic_matter: String,
    pub soil_texture: String,
    pub bulk_density: String,
    pub porosity: String,
    pub electrical_conductivity: String,
    pub rainfall: String,
    pub humidity: String,
    pub wind_speed: String,
    pub solar_radiation: String,
}

impl SensorForm {
    fn optional_numeric(&self, field: &str) -> &str {
        match field {
            "organicMatter" => &self.organic_matter,
            "bulkDensity" => &self.bulk_density,
            "porosity" => &self.porosity,
            "electricalConductivity" => &self.electrical_conductivity,
            "rainfall" => &self.rainfall,
            "humidity" => &self.humidity,
            "windSpeed" => &self.wind_speed,
            "solarRadiation" => &self.solar_radiation,
            _ => "",
        }
    }

    pub fn validate(&self) -> Result<SensorInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut readings = BTreeMap::new();

        let mut required = |field: &'static str,
                            raw: &str,
                            label: &str,
                            range: Option<(f64, f64, &str)>| {
            let Some(value) = non_blank(raw) else {
                errors.add(field, format!("{label} is required"));
                return;
            };
            let Some(number) = parse_finite(value) else {
                errors.add(field, format!("{label} must be a number"));
                return;
            };
            if let Some((min, max, message)) = range {
                if !(min..=max).contains(&number) {
                    errors.add(field, message);
                    return;
                }
            }
            readings.insert(field.to_string(), Reading::Numeric(number));
        };

        required("ph", &self.ph, "pH level", Some((0.0, 14.0, "pH must be between 0 and 14")));
        required(
            "moisture",
            &self.moisture,
            "Moisture level",
            Some((0.0, 100.0, "Moisture must be between 0 and 100%")),
        );
        required("temperature", &self.temperature, "Temperature", None);
        required("nitrogen", &self.nitrogen, "Nitrogen level", None);
        required("phosphorus", &self.phosphorus, "Phosphorus level", None);
        required("potassium", &self.potassium, "Potassium level", None);

        for field in OPTIONAL_NUMERIC_FIELDS {
            let Some(value) = non_blank(self.optional_numeric(field)) else {
                continue;
            };
            match parse_finite(value) {
                Some(number) => {
                    readings.insert(field.to_string(), Reading::Numeric(number));
                }
                None => errors.add(field, "must be a number"),
            }
        }

        if let Some(texture) = non_blank(&self.soil_texture) {
            match SOIL_TEXTURES
                .iter()
                .find(|known| known.eq_ignore_ascii_case(texture))
            {
                Some(known) => {
                    readings.insert("soilTexture".into(), Reading::Choice((*known).to_string()));
                }
                None => errors.add(
                    "soilTexture",
                    format!("Soil texture must be one of {}", SOIL_TEXTURES.join(", ")),
                ),
            }
        }

        errors.into_result()?;
        Ok(SensorInput { readings })
    }
}

/// `f64::from_str` accepts `NaN` and `inf`; readings must be finite.
fn parse_finite(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|number| number.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic_form() -> SensorForm {
        SensorForm {
            ph: "6.5".into(),
            moisture: "40".into(),
            temperature: "24".into(),
            nitrogen: "30".into(),
            phosphorus: "12".into(),
            potassium: "18".into(),
            ..Default::default()
        }
    }

    #[test]
    fn basic_readings_validate() {
        let input = basic_form().validate().unwrap();
        assert_eq!(input.len(), 6);
        assert_eq!(input.get("ph").and_then(Reading::as_f64), Some(6.5));
    }

    #[test]
    fn empty_form_reports_every_required_field() {
        let errors = SensorForm::default().validate().unwrap_err();
        assert_eq!(errors.len(), 6);
        assert_eq!(errors.get("ph"), Some("pH level is required"));
        assert_eq!(errors.get("potassium"), Some("Potassium level is required"));
    }

    #[test]
    fn ranges_are_enforced() {
        let mut form = basic_form();
        form.ph = "15".into();
        form.moisture = "-1".into();

        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("ph"), Some("pH must be between 0 and 14"));
        assert_eq!(errors.get("moisture"), Some("Moisture must be between 0 and 100%"));
    }

    #[test]
    fn advanced_fields_are_optional_but_checked() {
        let mut form = basic_form();
        form.rainfall = "820".into();
        form.soil_texture = "loamy".into();
        let input = form.validate().unwrap();
        assert_eq!(input.get("rainfall"), Some(&Reading::Numeric(820.0)));
        assert_eq!(input.get("soilTexture"), Some(&Reading::Choice("Loamy".into())));

        let mut form = basic_form();
        form.soil_texture = "gravel".into();
        form.porosity = "high".into();
        let errors = form.validate().unwrap_err();
        assert!(errors.get("soilTexture").is_some());
        assert_eq!(errors.get("porosity"), Some("must be a number"));
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let mut form = basic_form();
        form.temperature = "NaN".into();
        form.nitrogen = "inf".into();
        form.humidity = "-infinity".into();

        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("temperature"), Some("Temperature must be a number"));
        assert_eq!(errors.get("nitrogen"), Some("Nitrogen level must be a number"));
        assert_eq!(errors.get("humidity"), Some("must be a number"));
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn readings_flatten_to_form_fields() {
        let fields = basic_form().validate().unwrap().to_form_fields();
        assert_eq!(fields.get("moisture").map(String::as_str), Some("40"));
    }
}
