use crate::application::reviews::ReviewEngine;
use crate::domain::access::{Caller, Capability};
use crate::domain::catalog::{Attraction, ChargingStation, Hotel, Region};
use crate::domain::ids::{AttractionId, RegionId};
use crate::domain::ports::CatalogStoreRef;
use crate::domain::review::RatingSummary;
use crate::error::{Result, WorkflowError};
use serde::Serialize;

/// An attraction together with its current rating over approved reviews.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttractionDetail {
    #[serde(flatten)]
    pub attraction: Attraction,
    #[serde(flatten)]
    pub rating: RatingSummary,
}

#[derive(Clone)]
pub struct CatalogService {
    catalog: CatalogStoreRef,
    reviews: ReviewEngine,
}

impl CatalogService {
    pub fn new(catalog: CatalogStoreRef, reviews: ReviewEngine) -> Self {
        Self { catalog, reviews }
    }

    pub async fn regions(&self, caller: &Caller) -> Result<Vec<Region>> {
        caller.require(Capability::ReadCatalog)?;
        self.catalog.regions().await
    }

    pub async fn attractions(&self, caller: &Caller, region_id: &RegionId) -> Result<Vec<AttractionDetail>> {
        caller.require(Capability::ReadCatalog)?;
        let mut details = Vec::new();
        for attraction in self.catalog.attractions(region_id).await? {
            let rating = self.reviews.summary(&attraction.id).await?;
            details.push(AttractionDetail { attraction, rating });
        }
        Ok(details)
    }

    pub async fn attraction(&self, caller: &Caller, id: &AttractionId) -> Result<AttractionDetail> {
        caller.require(Capability::ReadCatalog)?;
        let attraction = self
            .catalog
            .attraction(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("attraction", id))?;
        let rating = self.reviews.summary(id).await?;
        Ok(AttractionDetail { attraction, rating })
    }

    pub async fn hotels(&self, caller: &Caller, region_id: &RegionId) -> Result<Vec<Hotel>> {
        caller.require(Capability::ReadCatalog)?;
        self.catalog.hotels(region_id).await
    }

    pub async fn stations(&self, caller: &Caller) -> Result<Vec<ChargingStation>> {
        caller.require(Capability::ReadCatalog)?;
        self.catalog.stations().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::Role;
    use crate::domain::ids::AccountId;
    use crate::infrastructure::in_memory::in_memory_stores;
    use crate::infrastructure::seed::builtin_catalog;

    fn service() -> CatalogService {
        let stores = in_memory_stores(builtin_catalog().unwrap());
        let reviews = ReviewEngine::new(stores.catalog.clone(), stores.accounts, stores.reviews);
        CatalogService::new(stores.catalog, reviews)
    }

    fn tourist() -> Caller {
        Caller::new(AccountId::from("t"), Role::Tourist)
    }

    #[tokio::test]
    async fn test_attractions_by_region_carry_empty_rating() {
        let catalog = service();
        let burabay = catalog.attractions(&tourist(), &RegionId::from("burabay")).await.unwrap();
        assert_eq!(burabay.len(), 3);
        assert!(burabay.iter().all(|a| a.rating.review_count == 0));

        let json = serde_json::to_value(&burabay[0]).unwrap();
        assert_eq!(json["average_rating"], 0.0);
        assert!(json.get("name_en").is_some());
    }

    #[tokio::test]
    async fn test_unknown_attraction_and_empty_region() {
        let catalog = service();
        assert!(matches!(
            catalog.attraction(&tourist(), &AttractionId::from("nowhere")).await,
            Err(WorkflowError::NotFound { .. })
        ));
        assert!(catalog.hotels(&tourist(), &RegionId::from("nowhere")).await.unwrap().is_empty());
        assert_eq!(catalog.stations(&tourist()).await.unwrap().len(), 3);
        assert_eq!(catalog.regions(&tourist()).await.unwrap().len(), 5);
    }
}
