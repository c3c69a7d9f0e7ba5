use std::collections::HashSet;

use chrono::{DateTime as ChronoDateTime, NaiveTime, Utc};
use mongodb::bson::{
    doc, oid::ObjectId, serde_helpers::serialize_bson_datetime_as_rfc3339_string, Bson,
    DateTime, Document,
};
use serde::{Deserialize, Serialize};

use crate::utils::{error::AppError, midnight_utc, parse_calendar_date, parse_object_id, serialize_oid};

use super::{movie_model::{required_text, Movie}, theatre_model::Theatre};

/// Largest seat count a show may have.
pub const MAX_SEATS: u32 = 1000;

/// Price band of a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Economy,
    Middle,
    Premium,
}

impl Tier {
    /// Layout order, closest to the screen first.
    pub const ALL: [Tier; 3] = [Tier::Economy, Tier::Middle, Tier::Premium];

    pub fn label(self) -> &'static str {
        match self {
            Tier::Economy => "Economy",
            Tier::Middle => "Middle",
            Tier::Premium => "Premium",
        }
    }
}

/// Inclusive seat number range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatRange {
    pub start: u32,
    pub end: u32,
}

impl SeatRange {
    pub fn contains(&self, seat: u32) -> bool {
        seat >= self.start && seat <= self.end
    }

    pub fn len(&self) -> u32 {
        if self.end < self.start {
            0
        } else {
            (self.end - self.start).saturating_add(1)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatConfiguration {
    pub economy: SeatRange,
    pub middle: SeatRange,
    pub premium: SeatRange,
}

impl SeatConfiguration {
    pub fn range(&self, tier: Tier) -> SeatRange {
        match tier {
            Tier::Economy => self.economy,
            Tier::Middle => self.middle,
            Tier::Premium => self.premium,
        }
    }

    /// Tier of a seat, checked premium first, then middle. Anything else is
    /// priced as economy, including seats outside every range; use
    /// [`SeatConfiguration::strict_tier_of`] when that matters.
    pub fn tier_of(&self, seat: u32) -> Tier {
        if self.premium.contains(seat) {
            Tier::Premium
        } else if self.middle.contains(seat) {
            Tier::Middle
        } else {
            Tier::Economy
        }
    }

    pub fn strict_tier_of(&self, seat: u32) -> Option<Tier> {
        [Tier::Premium, Tier::Middle, Tier::Economy]
            .into_iter()
            .find(|&tier| self.range(tier).contains(seat))
    }

    pub fn seat_count(&self) -> u64 {
        Tier::ALL
            .iter()
            .map(|&tier| u64::from(self.range(tier).len()))
            .sum()
    }

    /// The three ranges must be non-empty, must not overlap and must tile
    /// `[1, total_seats]` without gaps.
    pub fn validate(&self, total_seats: u32) -> Result<(), AppError> {
        if total_seats == 0 {
            return Err(AppError::Validation("Total seats must be at least 1".into()));
        }
        if total_seats > MAX_SEATS {
            return Err(AppError::Validation(format!(
                "Total seats cannot exceed {MAX_SEATS}"
            )));
        }

        for tier in Tier::ALL {
            let range = self.range(tier);
            if range.start == 0 {
                return Err(AppError::Validation(format!(
                    "{} tier must start at seat 1 or above",
                    tier.label()
                )));
            }
            if range.start > range.end {
                return Err(AppError::Validation(format!(
                    "{} tier start ({}) is after its end ({})",
                    tier.label(),
                    range.start,
                    range.end
                )));
            }
            if range.end > MAX_SEATS {
                return Err(AppError::Validation(format!(
                    "{} tier ends past seat {MAX_SEATS}",
                    tier.label()
                )));
            }
        }

        let mut ordered: Vec<(Tier, SeatRange)> =
            Tier::ALL.iter().map(|&tier| (tier, self.range(tier))).collect();
        ordered.sort_by_key(|(_, range)| range.start);

        let mut next = 1u32;
        for (tier, range) in &ordered {
            if range.start < next {
                return Err(AppError::Validation(format!(
                    "{} tier overlaps another tier at seat {}",
                    tier.label(),
                    range.start
                )));
            }
            if range.start > next {
                return Err(AppError::Validation(format!(
                    "Seats {} to {} are not assigned to any tier",
                    next,
                    range.start - 1
                )));
            }
            next = range.end + 1;
        }

        let covered = next - 1;
        if covered > total_seats {
            return Err(AppError::Validation(format!(
                "Seat tiers cover {covered} seats but the show has {total_seats}"
            )));
        }
        if covered < total_seats {
            return Err(AppError::Validation(format!(
                "Seats {} to {} are not assigned to any tier",
                covered + 1,
                total_seats
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierPrices {
    pub economy: f64,
    pub middle: f64,
    pub premium: f64,
}

impl TierPrices {
    pub fn price_of(&self, tier: Tier) -> f64 {
        match tier {
            Tier::Economy => self.economy,
            Tier::Middle => self.middle,
            Tier::Premium => self.premium,
        }
    }

    pub fn total_for(&self, configuration: &SeatConfiguration, seats: &[u32]) -> f64 {
        seats
            .iter()
            .map(|&seat| self.price_of(configuration.tier_of(seat)))
            .sum()
    }

    pub fn validate(&self) -> Result<(), AppError> {
        for tier in Tier::ALL {
            let price = self.price_of(tier);
            if !price.is_finite() || price < 0.0 {
                return Err(AppError::Validation(format!(
                    "{} price must be zero or more",
                    tier.label()
                )));
            }
        }
        Ok(())
    }
}

/// A show as read from the `shows` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Show {
    #[serde(rename = "_id", serialize_with = "serialize_oid")]
    pub id: ObjectId,
    pub name: String,
    #[serde(serialize_with = "serialize_bson_datetime_as_rfc3339_string")]
    pub date: DateTime,
    pub time: String,
    #[serde(serialize_with = "serialize_oid")]
    pub movie: ObjectId,
    #[serde(serialize_with = "serialize_oid")]
    pub theatre: ObjectId,
    pub total_seats: u32,
    pub seat_configuration: SeatConfiguration,
    pub tier_prices: TierPrices,
    #[serde(default)]
    pub booked_seats: Vec<u32>,
    #[serde(serialize_with = "serialize_bson_datetime_as_rfc3339_string")]
    pub created_at: DateTime,
}

impl Show {
    pub fn is_deletable(&self) -> bool {
        self.booked_seats.is_empty()
    }

    pub fn available_seats(&self) -> u32 {
        self.total_seats.saturating_sub(self.booked_seats.len() as u32)
    }

    pub fn is_booked(&self, seat: u32) -> bool {
        self.booked_seats.contains(&seat)
    }

    pub fn price_for_seats(&self, seats: &[u32]) -> f64 {
        self.tier_prices.total_for(&self.seat_configuration, seats)
    }

    pub fn already_booked(&self, seats: &[u32]) -> Vec<u32> {
        let booked: HashSet<u32> = self.booked_seats.iter().copied().collect();
        seats.iter().copied().filter(|seat| booked.contains(seat)).collect()
    }

    /// Checks requested seats against this show: every seat must exist, belong
    /// to a tier and still be free.
    pub fn validate_booking(&self, seats: &[u32]) -> Result<(), AppError> {
        if let Some(&seat) = seats.iter().find(|&&seat| {
            seat == 0
                || seat > self.total_seats
                || self.seat_configuration.strict_tier_of(seat).is_none()
        }) {
            return Err(AppError::Validation(format!(
                "Seat {seat} does not exist in this show"
            )));
        }

        let taken = self.already_booked(seats);
        if !taken.is_empty() {
            return Err(AppError::Conflict(format!(
                "Seats {} are already booked",
                join_seats(&taken)
            )));
        }
        Ok(())
    }

    /// Error for a seat claim that matched nothing, judged against the show
    /// as it was re-read after the failed update.
    pub fn claim_conflict(&self, seats: &[u32]) -> AppError {
        let taken = self.already_booked(seats);
        if taken.is_empty() {
            AppError::Conflict("Some of the selected seats were just booked, please try again".into())
        } else {
            AppError::Conflict(format!("Seats {} are already booked", join_seats(&taken)))
        }
    }
}

/// A show with `movie` and `theatre` joined in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowDetail {
    #[serde(rename = "_id", serialize_with = "serialize_oid")]
    pub id: ObjectId,
    pub name: String,
    #[serde(serialize_with = "serialize_bson_datetime_as_rfc3339_string")]
    pub date: DateTime,
    pub time: String,
    pub movie: Movie,
    pub theatre: Theatre,
    pub total_seats: u32,
    pub seat_configuration: SeatConfiguration,
    pub tier_prices: TierPrices,
    #[serde(default)]
    pub booked_seats: Vec<u32>,
    #[serde(serialize_with = "serialize_bson_datetime_as_rfc3339_string")]
    pub created_at: DateTime,
}

impl ShowDetail {
    pub fn price_for_seats(&self, seats: &[u32]) -> f64 {
        self.tier_prices.total_for(&self.seat_configuration, seats)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewShow {
    pub name: String,
    pub date: DateTime,
    pub time: String,
    pub movie: ObjectId,
    pub theatre: ObjectId,
    pub total_seats: u32,
    pub seat_configuration: SeatConfiguration,
    pub tier_prices: TierPrices,
    pub booked_seats: Vec<u32>,
    pub created_at: DateTime,
}

impl NewShow {
    pub fn check_release_date(&self, movie: &Movie) -> Result<(), AppError> {
        if self.date.timestamp_millis() < movie.release_date.timestamp_millis() {
            return Err(AppError::Validation(
                "Show date cannot be before movie release date".into(),
            ));
        }
        Ok(())
    }

    pub fn into_show(self, id: ObjectId) -> Show {
        Show {
            id,
            name: self.name,
            date: self.date,
            time: self.time,
            movie: self.movie,
            theatre: self.theatre,
            total_seats: self.total_seats,
            seat_configuration: self.seat_configuration,
            tier_prices: self.tier_prices,
            booked_seats: self.booked_seats,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowRequest {
    pub name: String,
    pub date: String,
    pub time: String,
    pub movie: String,
    pub theatre: String,
    pub total_seats: u32,
    pub seat_configuration: SeatConfiguration,
    pub tier_prices: TierPrices,
}

impl ShowRequest {
    /// Validates everything that does not need the database. The release
    /// date is checked separately once the movie is loaded.
    pub fn into_new_show(self, now: ChronoDateTime<Utc>) -> Result<NewShow, AppError> {
        let name = required_text(self.name, "Show name")?;
        let movie = parse_object_id(&self.movie, "movie")?;
        let theatre = parse_object_id(&self.theatre, "theatre")?;

        let date = parse_calendar_date(&self.date)?;
        let time = NaiveTime::parse_from_str(self.time.trim(), "%H:%M").map_err(|_| {
            AppError::Validation(format!("Invalid show time '{}', expected HH:MM", self.time))
        })?;
        if date.and_time(time).and_utc() <= now {
            return Err(AppError::Validation("Show date must be in the future".into()));
        }

        self.seat_configuration.validate(self.total_seats)?;
        self.tier_prices.validate()?;

        Ok(NewShow {
            name,
            date: DateTime::from_chrono(midnight_utc(date)),
            time: time.format("%H:%M").to_string(),
            movie,
            theatre,
            total_seats: self.total_seats,
            seat_configuration: self.seat_configuration,
            tier_prices: self.tier_prices,
            booked_seats: Vec::new(),
            created_at: DateTime::from_chrono(now),
        })
    }
}

pub fn join_seats(seats: &[u32]) -> String {
    seats
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn seat_values(seats: &[u32]) -> Vec<Bson> {
    seats.iter().map(|&seat| Bson::Int64(i64::from(seat))).collect()
}

/// Filter and update that append `seats` to a show only while none of them
/// is booked yet.
pub fn seat_claim(show_id: ObjectId, seats: &[u32]) -> (Document, Document) {
    let values = seat_values(seats);
    (
        doc! { "_id": show_id, "bookedSeats": { "$nin": values.clone() } },
        doc! { "$push": { "bookedSeats": { "$each": values } } },
    )
}

/// Filter and update that give claimed seats back.
pub fn seat_release(show_id: ObjectId, seats: &[u32]) -> (Document, Document) {
    (
        doc! { "_id": show_id },
        doc! { "$pullAll": { "bookedSeats": seat_values(seats) } },
    )
}

/// Matches the show only while [`Show::is_deletable`] holds for it.
pub fn unbooked_show_filter(show_id: ObjectId) -> Document {
    doc! { "_id": show_id, "bookedSeats": { "$size": 0 } }
}

pub fn unbooked_shows_of_theatre(theatre_id: ObjectId) -> Document {
    doc! { "theatre": theatre_id, "bookedSeats": { "$size": 0 } }
}
