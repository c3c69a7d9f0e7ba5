use std::collections::HashSet;

use chrono::{DateTime as ChronoDateTime, Utc};
use mongodb::bson::{
    oid::ObjectId, serde_helpers::serialize_bson_datetime_as_rfc3339_string, DateTime,
};
use serde::{Deserialize, Serialize};

use crate::utils::{error::AppError, parse_object_id, serialize_oid};

use super::{movie_model::required_text, show_model::ShowDetail};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id", serialize_with = "serialize_oid")]
    pub id: ObjectId,
    #[serde(serialize_with = "serialize_oid")]
    pub user: ObjectId,
    #[serde(serialize_with = "serialize_oid")]
    pub show: ObjectId,
    pub seats: Vec<u32>,
    pub payment_ref: String,
    #[serde(serialize_with = "serialize_bson_datetime_as_rfc3339_string")]
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub user: ObjectId,
    pub show: ObjectId,
    pub seats: Vec<u32>,
    pub payment_ref: String,
    pub created_at: DateTime,
}

impl NewBooking {
    pub fn into_booking(self, id: ObjectId) -> Booking {
        Booking {
            id,
            user: self.user,
            show: self.show,
            seats: self.seats,
            payment_ref: self.payment_ref,
            created_at: self.created_at,
        }
    }
}

/// Sent by the client once the external checkout has succeeded.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub show: String,
    pub user: String,
    pub seats: Vec<u32>,
    pub payment_ref: String,
}

impl BookingRequest {
    pub fn into_new_booking(self, now: ChronoDateTime<Utc>) -> Result<NewBooking, AppError> {
        let show = parse_object_id(&self.show, "show")?;
        let user = parse_object_id(&self.user, "user")?;
        let payment_ref = required_text(self.payment_ref, "Payment reference")?;

        if self.seats.is_empty() {
            return Err(AppError::Validation("Select at least one seat".into()));
        }
        let mut seen = HashSet::with_capacity(self.seats.len());
        if let Some(seat) = self.seats.iter().find(|&&seat| !seen.insert(seat)) {
            return Err(AppError::Validation(format!(
                "Seat {seat} is selected more than once"
            )));
        }

        Ok(NewBooking {
            user,
            show,
            seats: self.seats,
            payment_ref,
            created_at: DateTime::from_chrono(now),
        })
    }
}

/// Returned after a successful booking.
#[derive(Debug, Serialize)]
pub struct BookingReceipt {
    #[serde(flatten)]
    pub booking: Booking,
    pub amount: f64,
}

/// A booking with its show (and the show's movie and theatre) joined in.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetail {
    #[serde(rename = "_id", serialize_with = "serialize_oid")]
    pub id: ObjectId,
    #[serde(serialize_with = "serialize_oid")]
    pub user: ObjectId,
    pub show: ShowDetail,
    pub seats: Vec<u32>,
    pub payment_ref: String,
    #[serde(serialize_with = "serialize_bson_datetime_as_rfc3339_string")]
    pub created_at: DateTime,
    #[serde(default)]
    pub amount: f64,
}

impl BookingDetail {
    pub fn with_amount(mut self) -> Self {
        self.amount = self.show.price_for_seats(&self.seats);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::show_model::test_support::{show_detail, theatre};

    fn request(seats: Vec<u32>) -> BookingRequest {
        BookingRequest {
            show: ObjectId::new().to_hex(),
            user: ObjectId::new().to_hex(),
            seats,
            payment_ref: "cs_test_a1b2c3".into(),
        }
    }

    #[test]
    fn seat_list_must_be_non_empty_and_unique() {
        assert!(matches!(
            request(Vec::new()).into_new_booking(Utc::now()),
            Err(AppError::Validation(_))
        ));
        match request(vec![3, 4, 3]).into_new_booking(Utc::now()) {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "Seat 3 is selected more than once"),
            other => panic!("unexpected: {other:?}"),
        }
        let booking = request(vec![3, 4]).into_new_booking(Utc::now()).unwrap();
        assert_eq!(booking.seats, vec![3, 4]);
    }

    #[test]
    fn payment_reference_is_required() {
        let mut req = request(vec![1]);
        req.payment_ref = "   ".into();
        assert!(req.into_new_booking(Utc::now()).is_err());
    }

    #[test]
    fn detail_amount_uses_show_tiers() {
        let show = show_detail(&theatre("Plaza"), "18:00");
        let detail = BookingDetail {
            id: ObjectId::new(),
            user: ObjectId::new(),
            show,
            seats: vec![1, 2, 110],
            payment_ref: "cs_test".into(),
            created_at: DateTime::now(),
            amount: 0.0,
        }
        .with_amount();
        assert_eq!(detail.amount, 150.0 * 2.0 + 400.0);
    }

    #[test]
    fn receipt_is_flat_json() {
        let booking = request(vec![8, 9])
            .into_new_booking(Utc::now())
            .unwrap()
            .into_booking(ObjectId::new());
        let receipt = BookingReceipt {
            booking,
            amount: 300.0,
        };
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["seats"], serde_json::json!([8, 9]));
        assert_eq!(json["paymentRef"], "cs_test_a1b2c3");
        assert_eq!(json["amount"], 300.0);
    }
}
