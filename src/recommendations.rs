//! Crop suggestions shown once analysis completes.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GrowthRating {
    Excellent,
    Good,
    Fair,
}

impl GrowthRating {
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => GrowthRating::Excellent,
            60..=79 => GrowthRating::Good,
            _ => GrowthRating::Fair,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GrowthRating::Excellent => "Excellent",
            GrowthRating::Good => "Good",
            GrowthRating::Fair => "Fair",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CropRecommendation {
    pub rank: u8,
    pub name: &'static str,
    pub scientific_name: &'static str,
    /// 0..=100
    pub growth_score: u8,
    pub yield_outlook: &'static str,
    pub planting_season: &'static str,
    pub soil_suitability: &'static str,
    pub alternatives: &'static [&'static str],
    pub description: &'static str,
    pub water_needs: &'static str,
    pub temperature: &'static str,
    pub harvest_time: &'static str,
}

impl CropRecommendation {
    pub fn rating(&self) -> GrowthRating {
        GrowthRating::from_score(self.growth_score)
    }
}

static CATALOG: [CropRecommendation; 3] = [
    CropRecommendation {
        rank: 1,
        name: "Maize (Corn)",
        scientific_name: "Zea mays",
        growth_score: 85,
        yield_outlook: "High Yield",
        planting_season: "March – June",
        soil_suitability: "pH: 6.0-7.0 | Moisture: Medium | Nutrients: High",
        alternatives: &["Soybeans", "Cassava", "Sweet Potato"],
        description: "Excellent choice for your soil conditions. Maize thrives in well-drained, fertile soil with good organic matter content.",
        water_needs: "Medium",
        temperature: "18-32°C",
        harvest_time: "90-120 days",
    },
    CropRecommendation {
        rank: 2,
        name: "Soybeans",
        scientific_name: "Glycine max",
        growth_score: 78,
        yield_outlook: "Good Yield",
        planting_season: "April – May",
        soil_suitability: "pH: 6.0-6.8 | Moisture: Medium | Nutrients: Medium-High",
        alternatives: &["Cowpeas", "Groundnuts", "Pigeon Peas"],
        description: "Great nitrogen-fixing crop that improves soil fertility. Suitable for crop rotation and sustainable farming.",
        water_needs: "Medium",
        temperature: "20-30°C",
        harvest_time: "100-130 days",
    },
    CropRecommendation {
        rank: 3,
        name: "Cassava",
        scientific_name: "Manihot esculenta",
        growth_score: 72,
        yield_outlook: "Moderate-High",
        planting_season: "Year-round",
        soil_suitability: "pH: 5.5-7.0 | Moisture: Low-Medium | Nutrients: Low-Medium",
        alternatives: &["Yam", "Taro", "Sweet Potato"],
        description: "Drought-resistant root crop perfect for areas with variable rainfall. Low maintenance and high carbohydrate yield.",
        water_needs: "Low",
        temperature: "25-35°C",
        harvest_time: "8-18 months",
    },
];

/// Ranked suggestions. The list is fixed and does not depend on the analysed
/// sample.
pub fn catalog() -> &'static [CropRecommendation] {
    &CATALOG
}

pub fn by_rank(rank: u8) -> Option<&'static CropRecommendation> {
    CATALOG.iter().find(|crop| crop.rank == rank)
}
