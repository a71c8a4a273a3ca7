use crate::domain::access::{Caller, Capability};
use crate::domain::ids::{AttractionId, ReviewId};
use crate::domain::lifecycle::Transition;
use crate::domain::ports::{AccountStoreRef, CatalogStoreRef, RecordStoreRef};
use crate::domain::review::{ModerationAction, Rating, RatingSummary, Review, ReviewStatus};
use crate::error::{Result, WorkflowError};
use tracing::info;

/// Attraction reviews and their moderation.
///
/// A review is created `pending` and only becomes visible to other accounts
/// once an admin approves it. Aggregates are recomputed from the approved
/// set on every read.
#[derive(Clone)]
pub struct ReviewEngine {
    catalog: CatalogStoreRef,
    accounts: AccountStoreRef,
    reviews: RecordStoreRef<Review>,
}

impl ReviewEngine {
    pub fn new(catalog: CatalogStoreRef, accounts: AccountStoreRef, reviews: RecordStoreRef<Review>) -> Self {
        Self {
            catalog,
            accounts,
            reviews,
        }
    }

    pub async fn submit(
        &self,
        caller: &Caller,
        attraction_id: &AttractionId,
        rating: i64,
        comment: &str,
    ) -> Result<Review> {
        caller.require(Capability::SubmitReview)?;
        let rating = Rating::new(rating)?;
        if self.catalog.attraction(attraction_id).await?.is_none() {
            return Err(WorkflowError::not_found("attraction", attraction_id));
        }
        let author = self
            .accounts
            .get(&caller.account_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("account", &caller.account_id))?;

        let review = Review::new(
            attraction_id.clone(),
            caller.account_id.clone(),
            &author.name,
            rating,
            comment,
        )?;
        let committed = self.reviews.insert(review, None).await?;
        info!(review = %committed.record.id, attraction = %attraction_id, "review submitted for moderation");
        Ok(committed.record)
    }

    pub async fn resolve(&self, caller: &Caller, id: &ReviewId, action: ModerationAction) -> Result<Review> {
        caller.require(Capability::ModerateReviews)?;
        let transition = Transition::new(ReviewStatus::Pending, action.target(), caller.account_id.clone());
        let committed = self.reviews.transition(id, transition, None).await?;
        info!(review = %id, status = %committed.record.status, "review moderated");
        Ok(committed.record)
    }

    /// Reviews of an attraction as seen by `caller`, newest first: approved
    /// ones plus the caller's own; admins see everything.
    pub async fn for_attraction(&self, caller: &Caller, attraction_id: &AttractionId) -> Result<Vec<Review>> {
        caller.require(Capability::ReadCatalog)?;
        let mut visible: Vec<_> = self
            .reviews
            .get_all()
            .await?
            .into_iter()
            .filter(|r| &r.attraction_id == attraction_id)
            .filter(|r| {
                r.status == ReviewStatus::Approved || r.account_id == caller.account_id || caller.is_admin()
            })
            .collect();
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(visible)
    }

    pub async fn summary(&self, attraction_id: &AttractionId) -> Result<RatingSummary> {
        let reviews = self.reviews.get_all().await?;
        Ok(RatingSummary::over(
            reviews.iter().filter(|r| &r.attraction_id == attraction_id),
        ))
    }

    /// Every review regardless of status, newest first.
    pub async fn queue(&self, caller: &Caller) -> Result<Vec<Review>> {
        caller.require(Capability::ModerateReviews)?;
        let mut all = self.reviews.get_all().await?;
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{Account, Role};
    use crate::domain::ids::AccountId;
    use crate::domain::ports::Stores;
    use crate::infrastructure::in_memory::in_memory_stores;
    use crate::infrastructure::seed::builtin_catalog;

    async fn setup() -> (ReviewEngine, Caller, Caller) {
        let stores: Stores = in_memory_stores(builtin_catalog().unwrap());
        let account = Account::new("Aru", "aru@example.kz", Role::Tourist, "h".into()).unwrap();
        let tourist = Caller::new(account.id.clone(), Role::Tourist);
        stores.accounts.insert(account).await.unwrap();
        let engine = ReviewEngine::new(stores.catalog, stores.accounts, stores.reviews);
        (engine, tourist, Caller::new(AccountId::from("root"), Role::Admin))
    }

    fn zhumbaktas() -> AttractionId {
        AttractionId::from("zhumbaktas")
    }

    #[tokio::test]
    async fn test_rating_out_of_range_creates_nothing() {
        let (reviews, tourist, admin) = setup().await;
        assert!(matches!(
            reviews.submit(&tourist, &zhumbaktas(), 6, "Great").await,
            Err(WorkflowError::InvalidRating(6))
        ));
        assert!(matches!(
            reviews.submit(&tourist, &zhumbaktas(), 0, "Bad").await,
            Err(WorkflowError::InvalidRating(0))
        ));
        assert!(reviews.queue(&admin).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_only_approved_reviews_count_and_show() {
        let (reviews, tourist, admin) = setup().await;
        let review = reviews.submit(&tourist, &zhumbaktas(), 4, "Mysterious rock").await.unwrap();
        assert_eq!(review.author_name, "Aru");

        let stranger = Caller::new(AccountId::from("stranger"), Role::Tourist);
        assert!(reviews.for_attraction(&stranger, &zhumbaktas()).await.unwrap().is_empty());
        assert_eq!(reviews.for_attraction(&tourist, &zhumbaktas()).await.unwrap().len(), 1);
        assert_eq!(reviews.summary(&zhumbaktas()).await.unwrap().review_count, 0);

        reviews.resolve(&admin, &review.id, ModerationAction::Approve).await.unwrap();
        assert_eq!(reviews.for_attraction(&stranger, &zhumbaktas()).await.unwrap().len(), 1);
        let summary = reviews.summary(&zhumbaktas()).await.unwrap();
        assert_eq!(summary.review_count, 1);
        assert_eq!(summary.average_rating, 4.0);
    }

    #[tokio::test]
    async fn test_resolving_twice_fails() {
        let (reviews, tourist, admin) = setup().await;
        let review = reviews.submit(&tourist, &zhumbaktas(), 5, "Superb").await.unwrap();
        reviews.resolve(&admin, &review.id, ModerationAction::Reject).await.unwrap();

        assert!(matches!(
            reviews.resolve(&admin, &review.id, ModerationAction::Approve).await,
            Err(WorkflowError::AlreadyResolved { .. })
        ));
        assert!(matches!(
            reviews.resolve(&tourist, &review.id, ModerationAction::Approve).await,
            Err(WorkflowError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_attraction() {
        let (reviews, tourist, _) = setup().await;
        assert!(matches!(
            reviews.submit(&tourist, &AttractionId::from("atlantis"), 3, "Hmm").await,
            Err(WorkflowError::NotFound { .. })
        ));
    }
}
