//! Reference data. Loaded at startup and never mutated by end users.

use super::ids::{AttractionId, HotelId, RegionId, StationId, TaskId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub name_ru: String,
    pub name_en: String,
    pub name_kz: String,
    pub description_ru: String,
    pub description_en: String,
    pub description_kz: String,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attraction {
    pub id: AttractionId,
    pub region_id: RegionId,
    pub name_ru: String,
    pub name_en: String,
    pub name_kz: String,
    pub description_ru: String,
    pub description_en: String,
    pub description_kz: String,
    pub image_url: String,
    pub vr_url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotel {
    pub id: HotelId,
    pub region_id: RegionId,
    pub name: String,
    pub description: String,
    pub price_per_night: Decimal,
    pub is_partner: bool,
    pub capacity: u32,
    pub image_url: String,
    pub rating: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardTask {
    pub id: TaskId,
    pub title_ru: String,
    pub title_en: String,
    pub title_kz: String,
    pub description_ru: String,
    pub description_en: String,
    pub description_kz: String,
    pub reward_coins: u32,
    pub region_id: Option<RegionId>,
    pub r#type: String,
    pub image_required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargingStation {
    pub id: StationId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub availability: bool,
}

/// All reference data of the platform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub regions: Vec<Region>,
    pub attractions: Vec<Attraction>,
    pub hotels: Vec<Hotel>,
    pub tasks: Vec<RewardTask>,
    pub stations: Vec<ChargingStation>,
}

impl Catalog {
    /// Reference errors: rows pointing at regions that do not exist, or
    /// tasks that reward nothing.
    pub fn dangling_references(&self) -> Vec<String> {
        let known = |id: &RegionId| self.regions.iter().any(|r| &r.id == id);
        let mut problems = Vec::new();
        for a in &self.attractions {
            if !known(&a.region_id) {
                problems.push(format!("attraction {} references unknown region {}", a.id, a.region_id));
            }
        }
        for h in &self.hotels {
            if !known(&h.region_id) {
                problems.push(format!("hotel {} references unknown region {}", h.id, h.region_id));
            }
        }
        for t in &self.tasks {
            if let Some(region) = &t.region_id
                && !known(region)
            {
                problems.push(format!("task {} references unknown region {}", t.id, region));
            }
            if t.reward_coins == 0 {
                problems.push(format!("task {} has no reward", t.id));
            }
        }
        problems
    }
}
