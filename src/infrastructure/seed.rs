//! The catalog compiled into the binary, used when no catalog directory is
//! configured.

use crate::domain::catalog::Catalog;
use crate::error::Result;
use crate::interfaces::csv::catalog_reader::CatalogSources;

const REGIONS: &str = include_str!("../../catalog/regions.csv");
const ATTRACTIONS: &str = include_str!("../../catalog/attractions.csv");
const HOTELS: &str = include_str!("../../catalog/hotels.csv");
const TASKS: &str = include_str!("../../catalog/tasks.csv");
const STATIONS: &str = include_str!("../../catalog/stations.csv");

pub fn builtin_catalog() -> Result<Catalog> {
    CatalogSources {
        regions: REGIONS.as_bytes(),
        attractions: ATTRACTIONS.as_bytes(),
        hotels: HOTELS.as_bytes(),
        tasks: TASKS.as_bytes(),
        stations: STATIONS.as_bytes(),
    }
    .load()
}
