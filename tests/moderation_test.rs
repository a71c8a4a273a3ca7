mod common;

use common::{admin, caller, member, platform, platform_and_stores};
use ecoledger::infrastructure::seed::builtin_catalog;
use ecoledger::domain::account::Role;
use ecoledger::domain::ids::AttractionId;
use ecoledger::domain::review::{ModerationAction, ReviewStatus};
use ecoledger::error::WorkflowError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[tokio::test]
async fn test_out_of_range_rating_creates_no_row() {
    let platform = platform();
    let tourist = caller(&platform, "Gulnara", Role::Tourist).await;
    let admin = admin(&platform).await;

    assert!(matches!(
        platform
            .reviews
            .submit(&tourist, &AttractionId::from("charyn_canyon"), 6, "Amazing")
            .await,
        Err(WorkflowError::InvalidRating(6))
    ));
    assert!(platform.reviews.queue(&admin).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_aggregate_tracks_approved_reviews_only() {
    let (platform, stores) = platform_and_stores(builtin_catalog().unwrap(), 0);
    let admin = admin(&platform).await;
    let attraction = AttractionId::from("charyn_canyon");
    let mut rng = StdRng::seed_from_u64(0x5eed);

    let mut approved = Vec::new();
    for i in 0..30 {
        let tourist = member(&stores, &format!("Tourist{i}"), Role::Tourist).await;
        let rating = rng.gen_range(1..=5);
        let review = platform
            .reviews
            .submit(&tourist, &attraction, rating, "Visited with family")
            .await
            .unwrap();

        match rng.gen_range(0..3) {
            0 => {
                platform.reviews.resolve(&admin, &review.id, ModerationAction::Approve).await.unwrap();
                approved.push(rating);
            }
            1 => {
                platform.reviews.resolve(&admin, &review.id, ModerationAction::Reject).await.unwrap();
            }
            _ => {}
        }

        let summary = platform.reviews.summary(&attraction).await.unwrap();
        assert_eq!(summary.review_count, approved.len());
        let expected = if approved.is_empty() {
            0.0
        } else {
            let mean = approved.iter().sum::<i64>() as f64 / approved.len() as f64;
            (mean * 10.0).round() / 10.0
        };
        assert_eq!(summary.average_rating, expected);
    }

    let detail = platform.catalog.attraction(&admin, &attraction).await.unwrap();
    assert_eq!(detail.rating.review_count, approved.len());

    let stranger = member(&stores, "Stranger", Role::Tourist).await;
    let visible = platform.reviews.for_attraction(&stranger, &attraction).await.unwrap();
    assert_eq!(visible.len(), approved.len());
    assert!(visible.iter().all(|r| r.status == ReviewStatus::Approved));
}

#[tokio::test]
async fn test_moderation_is_terminal() {
    let platform = platform();
    let tourist = caller(&platform, "Kairat", Role::Tourist).await;
    let admin = admin(&platform).await;
    let review = platform
        .reviews
        .submit(&tourist, &AttractionId::from("kaindy_lake"), 4, "Cold water")
        .await
        .unwrap();

    platform.reviews.resolve(&admin, &review.id, ModerationAction::Approve).await.unwrap();
    for action in [ModerationAction::Approve, ModerationAction::Reject] {
        assert!(matches!(
            platform.reviews.resolve(&admin, &review.id, action).await,
            Err(WorkflowError::AlreadyResolved { .. })
        ));
    }
}
