//! Seat map layout for the booking screen.
//!
//! Seats are drawn tier by tier (economy nearest the screen), in rows of at
//! most [`SEATS_PER_ROW`]. A short last row is flagged `centered` so the
//! client can center it under the full rows.

use std::collections::{BTreeMap, HashSet};

use mongodb::bson::oid::ObjectId;
use serde::Serialize;

use crate::models::show_model::{SeatRange, Show, Tier, TierPrices};
use crate::utils::serialize_oid;

pub const SEATS_PER_ROW: u32 = 12;

/// Row boundaries inside one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSpan {
    pub start: u32,
    pub seats: u32,
    pub centered: bool,
}

pub fn rows_for_range(range: SeatRange) -> Vec<RowSpan> {
    if range.is_empty() {
        return Vec::new();
    }
    let total_rows = range.len().div_ceil(SEATS_PER_ROW);

    (0..total_rows)
        .map(|row| {
            let start = range.start.saturating_add(row * SEATS_PER_ROW);
            let end = start.saturating_add(SEATS_PER_ROW - 1).min(range.end);
            let seats = end - start + 1;
            RowSpan {
                start,
                seats,
                centered: seats < SEATS_PER_ROW,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatState {
    Available,
    Selected,
    Booked,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatCell {
    pub number: u32,
    pub state: SeatState,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatRow {
    pub centered: bool,
    pub seats: Vec<SeatCell>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TierLayout {
    pub tier: Tier,
    pub label: &'static str,
    pub price: f64,
    pub rows: Vec<SeatRow>,
}

/// Seats the user has picked, each remembered with its tier.
#[derive(Debug, Clone, Default)]
pub struct SeatSelection {
    seats: BTreeMap<u32, Tier>,
}

impl SeatSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips a seat in or out of the selection. Booked seats and seats that
    /// belong to no tier are ignored. Returns whether the seat is selected
    /// afterwards.
    pub fn toggle(&mut self, show: &Show, seat: u32) -> bool {
        if self.seats.remove(&seat).is_some() {
            return false;
        }
        self.select(show, seat)
    }

    /// Adds a seat if it can be selected; an already selected seat stays.
    pub fn select(&mut self, show: &Show, seat: u32) -> bool {
        if seat > show.total_seats || show.is_booked(seat) {
            return false;
        }
        match show.seat_configuration.strict_tier_of(seat) {
            Some(tier) => {
                self.seats.insert(seat, tier);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, seat: u32) -> bool {
        self.seats.contains_key(&seat)
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn seat_numbers(&self) -> Vec<u32> {
        self.seats.keys().copied().collect()
    }

    pub fn total_price(&self, prices: &TierPrices) -> f64 {
        self.seats.values().map(|&tier| prices.price_of(tier)).sum()
    }

    /// Total in the currency's minor unit (paise), as checkout expects.
    pub fn amount_in_minor_units(&self, prices: &TierPrices) -> i64 {
        (self.total_price(prices) * 100.0).round() as i64
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatMap {
    #[serde(serialize_with = "serialize_oid")]
    pub show_id: ObjectId,
    pub total_seats: u32,
    pub available_seats: u32,
    pub tiers: Vec<TierLayout>,
    pub selected_seats: Vec<u32>,
    pub total_price: f64,
    pub amount: i64,
}

pub fn render(show: &Show, selection: &SeatSelection) -> SeatMap {
    let booked: HashSet<u32> = show.booked_seats.iter().copied().collect();

    let tiers = Tier::ALL
        .iter()
        .map(|&tier| {
            let rows = rows_for_range(show.seat_configuration.range(tier))
                .into_iter()
                .map(|span| SeatRow {
                    centered: span.centered,
                    seats: (span.start..span.start.saturating_add(span.seats))
                        .filter(|&number| number <= show.total_seats)
                        .map(|number| SeatCell {
                            number,
                            state: if booked.contains(&number) {
                                SeatState::Booked
                            } else if selection.contains(number) {
                                SeatState::Selected
                            } else {
                                SeatState::Available
                            },
                        })
                        .collect(),
                })
                .collect();

            TierLayout {
                tier,
                label: tier.label(),
                price: show.tier_prices.price_of(tier),
                rows,
            }
        })
        .collect();

    SeatMap {
        show_id: show.id,
        total_seats: show.total_seats,
        available_seats: show.available_seats(),
        tiers,
        selected_seats: selection.seat_numbers(),
        total_price: selection.total_price(&show.tier_prices),
        amount: selection.amount_in_minor_units(&show.tier_prices),
    }
}
