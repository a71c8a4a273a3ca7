use crate::domain::access::{Caller, Capability};
use crate::domain::account::Role;
use crate::domain::dispatch::{OrderStatus, Route, TaxiOrder};
use crate::domain::ids::OrderId;
use crate::domain::lifecycle::{Record, Transition};
use crate::domain::ports::RecordStoreRef;
use crate::error::{Result, WorkflowError};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct OrderRequest {
    #[serde(alias = "from_location")]
    pub from_address: String,
    pub from_lat: Option<f64>,
    pub from_lng: Option<f64>,
    #[serde(alias = "to_location")]
    pub to_address: String,
    pub to_lat: Option<f64>,
    pub to_lng: Option<f64>,
}

impl OrderRequest {
    fn route(&self) -> Result<Route> {
        Route::new(
            &self.from_address,
            self.from_lat.zip(self.from_lng),
            &self.to_address,
            self.to_lat.zip(self.to_lng),
        )
    }
}

/// Electric-taxi dispatch with first-accept-wins semantics.
///
/// `pending → accepted` is a compare-and-set in the store and the only way
/// a driver gets assigned: of several drivers accepting the same order, one
/// wins and the others get `OrderAlreadyTaken`.
#[derive(Clone)]
pub struct DispatchEngine {
    orders: RecordStoreRef<TaxiOrder>,
}

impl DispatchEngine {
    pub fn new(orders: RecordStoreRef<TaxiOrder>) -> Self {
        Self { orders }
    }

    pub async fn order(&self, caller: &Caller, request: &OrderRequest) -> Result<TaxiOrder> {
        caller.require(Capability::OrderTaxi)?;
        let order = TaxiOrder::new(caller.account_id.clone(), request.route()?);
        let committed = self.orders.insert(order, None).await?;
        info!(order = %committed.record.id, rider = %caller.account_id, "taxi ordered");
        Ok(committed.record)
    }

    pub async fn accept(&self, caller: &Caller, id: &OrderId) -> Result<TaxiOrder> {
        caller.require(Capability::DriveTaxi)?;
        let transition = Transition::new(OrderStatus::Pending, OrderStatus::Accepted, caller.account_id.clone());
        let committed = self.orders.transition(id, transition, None).await?;
        info!(order = %id, driver = %caller.account_id, "taxi order accepted");
        Ok(committed.record)
    }

    /// Only the assigned driver completes a ride.
    pub async fn complete(&self, caller: &Caller, id: &OrderId) -> Result<TaxiOrder> {
        caller.require(Capability::DriveTaxi)?;
        let order = self.get(id).await?;
        if order.driver_account_id.as_ref() != Some(&caller.account_id) {
            return Err(WorkflowError::Forbidden(
                "only the assigned driver may complete this order".to_string(),
            ));
        }
        let transition = Transition::new(OrderStatus::Accepted, OrderStatus::Completed, caller.account_id.clone());
        let committed = self.orders.transition(id, transition, None).await?;
        info!(order = %id, "taxi ride completed");
        Ok(committed.record)
    }

    /// Riders cancel their own orders while no driver has taken them.
    pub async fn cancel(&self, caller: &Caller, id: &OrderId) -> Result<TaxiOrder> {
        caller.require(Capability::OrderTaxi)?;
        let order = self.get(id).await?;
        if order.rider_account_id != caller.account_id {
            return Err(WorkflowError::Forbidden(
                "only the rider may cancel this order".to_string(),
            ));
        }
        let transition = Transition::new(OrderStatus::Pending, OrderStatus::Cancelled, caller.account_id.clone());
        let committed = self.orders.transition(id, transition, None).await?;
        info!(order = %id, "taxi order cancelled");
        Ok(committed.record)
    }

    async fn get(&self, id: &OrderId) -> Result<TaxiOrder> {
        self.orders
            .get(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(TaxiOrder::ENTITY, id))
    }

    /// Drivers see open orders plus their own rides, riders their own
    /// orders, admins everything. Newest first.
    pub async fn orders(&self, caller: &Caller) -> Result<Vec<TaxiOrder>> {
        let visible = |order: &TaxiOrder| match caller.role {
            Role::Admin => true,
            Role::TaxiDriver => {
                order.status == OrderStatus::Pending
                    || order.driver_account_id.as_ref() == Some(&caller.account_id)
            }
            Role::Tourist => order.rider_account_id == caller.account_id,
        };
        let mut orders: Vec<_> = self
            .orders
            .get_all()
            .await?
            .into_iter()
            .filter(|o| visible(o))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}
