use crate::domain::catalog::Catalog;
use crate::error::{Result, WorkflowError};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const REGIONS_FILE: &str = "regions.csv";
pub const ATTRACTIONS_FILE: &str = "attractions.csv";
pub const HOTELS_FILE: &str = "hotels.csv";
pub const TASKS_FILE: &str = "tasks.csv";
pub const STATIONS_FILE: &str = "stations.csv";

/// Reads reference rows from a CSV source.
///
/// Wraps `csv::Reader`, trimming whitespace around every field. Empty fields
/// deserialize to `None` for optional columns.
pub struct CatalogReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CatalogReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes rows of `T`.
    pub fn rows<T: DeserializeOwned>(self) -> impl Iterator<Item = Result<T>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(WorkflowError::from))
    }
}

fn read_all<T: DeserializeOwned, R: Read>(source: R) -> Result<Vec<T>> {
    CatalogReader::new(source).rows().collect()
}

/// The five catalog tables as raw CSV text.
pub struct CatalogSources<R: Read> {
    pub regions: R,
    pub attractions: R,
    pub hotels: R,
    pub tasks: R,
    pub stations: R,
}

impl<R: Read> CatalogSources<R> {
    /// Parses every table and checks cross references.
    pub fn load(self) -> Result<Catalog> {
        let catalog = Catalog {
            regions: read_all(self.regions)?,
            attractions: read_all(self.attractions)?,
            hotels: read_all(self.hotels)?,
            tasks: read_all(self.tasks)?,
            stations: read_all(self.stations)?,
        };
        let problems = catalog.dangling_references();
        if !problems.is_empty() {
            return Err(WorkflowError::ValidationError(problems.join("; ")));
        }
        Ok(catalog)
    }
}

/// Loads a catalog from a directory holding the five CSV files.
pub fn load_catalog_dir(dir: &Path) -> Result<Catalog> {
    let open = |name: &str| {
        File::open(dir.join(name)).map_err(|e| {
            WorkflowError::IoError(std::io::Error::new(
                e.kind(),
                format!("{}: {e}", dir.join(name).display()),
            ))
        })
    };
    CatalogSources {
        regions: open(REGIONS_FILE)?,
        attractions: open(ATTRACTIONS_FILE)?,
        hotels: open(HOTELS_FILE)?,
        tasks: open(TASKS_FILE)?,
        stations: open(STATIONS_FILE)?,
    }
    .load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{Attraction, Hotel};
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = "id, region_id, name, description, price_per_night, is_partner, capacity, image_url, rating\n\
                    h1, burabay, Lodge, Quiet, 15000.50, true, 40, /h1.jpg, 4.5";
        let hotels: Vec<Result<Hotel>> = CatalogReader::new(data.as_bytes()).rows().collect();

        assert_eq!(hotels.len(), 1);
        let hotel = hotels[0].as_ref().unwrap();
        assert_eq!(hotel.price_per_night, dec!(15000.50));
        assert!(hotel.is_partner);
    }

    #[test]
    fn test_empty_optional_column_is_none() {
        let data = "id,region_id,name_ru,name_en,name_kz,description_ru,description_en,description_kz,image_url,vr_url,latitude,longitude\n\
                    a1,r1,A,A,A,d,d,d,/a.jpg,,43.1,51.2";
        let rows: Vec<Attraction> = read_all(data.as_bytes()).unwrap();
        assert_eq!(rows[0].vr_url, None);
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "id, region_id, name, description, price_per_night, is_partner, capacity, image_url, rating\n\
                    h1, burabay, Lodge, Quiet, cheap, true, 40, /h1.jpg, 4.5";
        let hotels: Vec<Result<Hotel>> = CatalogReader::new(data.as_bytes()).rows().collect();

        assert!(matches!(hotels[0], Err(WorkflowError::CsvError(_))));
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let result = load_catalog_dir(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(WorkflowError::IoError(_))));
    }
}
