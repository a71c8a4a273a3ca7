use super::ids::{AccountId, OrderId};
use super::lifecycle::{Lifecycle, Record, invalid_transition};
use crate::error::{Result, WorkflowError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pickup and drop-off closer than this on both axes are the same place.
pub const SAME_PLACE_DEGREES: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(WorkflowError::InvalidRoute(
                "coordinates must be finite numbers".to_string(),
            ));
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(WorkflowError::InvalidRoute(format!(
                "coordinates ({lat}, {lng}) are out of range"
            )));
        }
        Ok(Self { lat, lng })
    }

    pub fn near(&self, other: &GeoPoint) -> bool {
        (self.lat - other.lat).abs() < SAME_PLACE_DEGREES
            && (self.lng - other.lng).abs() < SAME_PLACE_DEGREES
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub label: String,
    pub point: GeoPoint,
}

/// A validated pickup → drop-off pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub from: Place,
    pub to: Place,
}

impl Route {
    pub fn new(
        from_label: &str,
        from: Option<(f64, f64)>,
        to_label: &str,
        to: Option<(f64, f64)>,
    ) -> Result<Self> {
        let (Some(from), Some(to)) = (from, to) else {
            return Err(WorkflowError::InvalidRoute(
                "pickup and drop-off coordinates are required".to_string(),
            ));
        };
        let (from_label, to_label) = (from_label.trim(), to_label.trim());
        if from_label.is_empty() || to_label.is_empty() {
            return Err(WorkflowError::InvalidRoute(
                "pickup and drop-off addresses are required".to_string(),
            ));
        }
        let from = GeoPoint::new(from.0, from.1)?;
        let to = GeoPoint::new(to.0, to.1)?;
        if from.near(&to) {
            return Err(WorkflowError::InvalidRoute(
                "pickup and drop-off are the same place".to_string(),
            ));
        }
        Ok(Self {
            from: Place {
                label: from_label.to_string(),
                point: from,
            },
            to: Place {
                label: to_label.to_string(),
                point: to,
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Accepted,
    Completed,
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxiOrder {
    pub id: OrderId,
    pub rider_account_id: AccountId,
    pub route: Route,
    pub status: OrderStatus,
    /// Set exactly once, by the transition into `Accepted`.
    pub driver_account_id: Option<AccountId>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaxiOrder {
    pub fn new(rider: AccountId, route: Route) -> Self {
        Self {
            id: OrderId::generate(),
            rider_account_id: rider,
            route,
            status: OrderStatus::Pending,
            driver_account_id: None,
            created_at: Utc::now(),
            accepted_at: None,
            finished_at: None,
        }
    }
}

impl Lifecycle for TaxiOrder {
    type Status = OrderStatus;

    fn status(&self) -> OrderStatus {
        self.status
    }

    fn enter(&mut self, next: OrderStatus, actor: &AccountId, at: DateTime<Utc>) {
        self.status = next;
        match next {
            OrderStatus::Accepted => {
                self.driver_account_id = Some(actor.clone());
                self.accepted_at = Some(at);
            }
            OrderStatus::Completed | OrderStatus::Cancelled => self.finished_at = Some(at),
            OrderStatus::Pending => {}
        }
    }

    fn conflict(&self, attempted: OrderStatus) -> WorkflowError {
        if attempted == OrderStatus::Accepted {
            WorkflowError::OrderAlreadyTaken(self.id.to_string())
        } else {
            invalid_transition(Self::ENTITY, &self.id, self.status, attempted)
        }
    }
}

impl Record for TaxiOrder {
    type Id = OrderId;
    const ENTITY: &'static str = "order";

    fn id(&self) -> &OrderId {
        &self.id
    }

    /// A rider has at most one order waiting for or riding with a driver.
    fn claim(&self) -> Option<String> {
        match self.status {
            OrderStatus::Pending | OrderStatus::Accepted => Some(self.rider_account_id.to_string()),
            OrderStatus::Completed | OrderStatus::Cancelled => None,
        }
    }

    fn duplicate(&self) -> WorkflowError {
        WorkflowError::Duplicate {
            entity: Self::ENTITY,
            detail: "the rider already has an active taxi order".to_string(),
        }
    }
}
