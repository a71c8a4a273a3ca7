use super::catalog::Hotel;
use super::ids::{AccountId, BookingId, HotelId};
use super::lifecycle::{Lifecycle, Record, invalid_transition};
use crate::error::{Result, WorkflowError};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on the EcoCoins a single booking may spend.
pub const MAX_COIN_DISCOUNT: u64 = 100;

/// A validated check-in / check-out pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stay {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl Stay {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self> {
        if check_in < check_out {
            Ok(Self {
                check_in,
                check_out,
            })
        } else {
            Err(WorkflowError::InvalidDateRange)
        }
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

/// Coins a booking will spend: `min(requested, MAX_COIN_DISCOUNT, balance)`
/// for partner hotels, nothing otherwise.
pub fn coin_discount(hotel: &Hotel, requested: u64, balance: u64) -> u64 {
    if hotel.is_partner {
        requested.min(MAX_COIN_DISCOUNT).min(balance)
    } else {
        0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub hotel_id: HotelId,
    pub hotel_name: String,
    pub account_id: AccountId,
    #[serde(flatten)]
    pub stay: Stay,
    pub guests: u32,
    pub total_price: Decimal,
    pub coin_discount_applied: u64,
    pub amount_due: Decimal,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn new(hotel: &Hotel, account_id: AccountId, stay: Stay, guests: u32, coin_discount: u64) -> Self {
        let total_price = hotel.price_per_night * Decimal::from(stay.nights());
        let amount_due = (total_price - Decimal::from(coin_discount)).max(Decimal::ZERO);
        Self {
            id: BookingId::generate(),
            hotel_id: hotel.id.clone(),
            hotel_name: hotel.name.clone(),
            account_id,
            stay,
            guests,
            total_price,
            coin_discount_applied: coin_discount,
            amount_due,
            status: BookingStatus::Confirmed,
            created_at: Utc::now(),
            cancelled_at: None,
        }
    }

    /// Ledger reference of the discount debit.
    pub fn debit_reference(&self) -> String {
        self.id.to_string()
    }

    pub fn refund_reference(&self) -> String {
        format!("{}:refund", self.id)
    }
}

impl Lifecycle for Booking {
    type Status = BookingStatus;

    fn status(&self) -> BookingStatus {
        self.status
    }

    fn enter(&mut self, next: BookingStatus, _actor: &AccountId, at: DateTime<Utc>) {
        self.status = next;
        if next == BookingStatus::Cancelled {
            self.cancelled_at = Some(at);
        }
    }

    fn conflict(&self, attempted: BookingStatus) -> WorkflowError {
        match self.status {
            BookingStatus::Cancelled => WorkflowError::AlreadyResolved {
                entity: Self::ENTITY,
                id: self.id.to_string(),
            },
            BookingStatus::Confirmed => invalid_transition(Self::ENTITY, &self.id, self.status, attempted),
        }
    }
}

impl Record for Booking {
    type Id = BookingId;
    const ENTITY: &'static str = "booking";

    fn id(&self) -> &BookingId {
        &self.id
    }

    fn claim(&self) -> Option<String> {
        match self.status {
            BookingStatus::Confirmed => Some(format!(
                "{}:{}:{}:{}",
                self.account_id, self.hotel_id, self.stay.check_in, self.stay.check_out
            )),
            BookingStatus::Cancelled => None,
        }
    }

    fn duplicate(&self) -> WorkflowError {
        WorkflowError::Duplicate {
            entity: Self::ENTITY,
            detail: format!(
                "a confirmed booking at {} for {} to {} already exists",
                self.hotel_name, self.stay.check_in, self.stay.check_out
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::RegionId;
    use rust_decimal_macros::dec;

    fn hotel(is_partner: bool) -> Hotel {
        Hotel {
            id: HotelId::from("hotel_3"),
            region_id: RegionId::from("kolsay"),
            name: "Mountain Eco Camp".into(),
            description: String::new(),
            price_per_night: dec!(10000),
            is_partner,
            capacity: 4,
            image_url: String::new(),
            rating: dec!(4.3),
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_stay_requires_ordered_dates() {
        assert!(Stay::new(date("2026-07-01"), date("2026-07-03")).is_ok());
        assert!(matches!(
            Stay::new(date("2026-07-03"), date("2026-07-03")),
            Err(WorkflowError::InvalidDateRange)
        ));
        assert!(matches!(
            Stay::new(date("2026-07-04"), date("2026-07-03")),
            Err(WorkflowError::InvalidDateRange)
        ));
    }

    #[test]
    fn test_discount_is_capped() {
        let partner = hotel(true);
        assert_eq!(coin_discount(&partner, 100, 80), 80);
        assert_eq!(coin_discount(&partner, 500, 1000), MAX_COIN_DISCOUNT);
        assert_eq!(coin_discount(&partner, 30, 1000), 30);
        assert_eq!(coin_discount(&hotel(false), 100, 1000), 0);
    }

    #[test]
    fn test_price_covers_every_night() {
        let stay = Stay::new(date("2026-07-01"), date("2026-07-04")).unwrap();
        let booking = Booking::new(&hotel(true), AccountId::from("t1"), stay, 2, 80);
        assert_eq!(booking.total_price, dec!(30000));
        assert_eq!(booking.amount_due, dec!(29920));
        assert_eq!(booking.status, BookingStatus::Confirmed);
    }
}
