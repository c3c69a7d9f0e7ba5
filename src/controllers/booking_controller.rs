use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    Json,
};
use chrono::Utc;
use mongodb::{bson::doc, Database};
use tracing::{error, info, warn};

use crate::controllers::{
    collect_documents, inserted_object_id, show_controller::show_detail_stages,
};
use crate::models::{
    booking_model::{Booking, BookingDetail, BookingReceipt, BookingRequest, NewBooking},
    show_model::{join_seats, seat_claim, seat_release, Show},
    BOOKINGS, SHOWS,
};
use crate::utils::{error::AppError, parse_object_id, response::ApiResponse};

/// Records a paid booking.
///
/// Seats are claimed with a single conditional update that only matches while
/// none of them is booked, so two concurrent requests for the same seat cannot
/// both succeed. If the booking document cannot be written afterwards, the
/// claimed seats are released again.
#[tracing::instrument(skip_all)]
pub async fn book_show(
    Extension(db): Extension<Database>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<ApiResponse<BookingReceipt>, AppError> {
    let Json(request) = payload?;
    let new_booking = request.into_new_booking(Utc::now())?;

    let shows_collection = db.collection::<Show>(SHOWS);
    let show = shows_collection
        .find_one(doc! { "_id": new_booking.show }, None)
        .await?
        .ok_or_else(|| AppError::not_found("Show"))?;
    show.validate_booking(&new_booking.seats)?;

    let (claim_filter, claim_update) = seat_claim(show.id, &new_booking.seats);
    let claim = shows_collection
        .update_one(claim_filter, claim_update, None)
        .await?;

    if claim.matched_count == 0 {
        let current = shows_collection
            .find_one(doc! { "_id": show.id }, None)
            .await?
            .ok_or_else(|| AppError::not_found("Show"))?;
        warn!(show_id = %show.id, "Seat claim lost to another booking");
        return Err(current.claim_conflict(&new_booking.seats));
    }

    let insert_result = match db
        .collection::<NewBooking>(BOOKINGS)
        .insert_one(&new_booking, None)
        .await
    {
        Ok(result) => result,
        Err(insert_error) => {
            error!(show_id = %show.id, error = %insert_error, "Booking insert failed, releasing seats");
            let (release_filter, release_update) = seat_release(show.id, &new_booking.seats);
            if let Err(release_error) = shows_collection
                .update_one(release_filter, release_update, None)
                .await
            {
                error!(show_id = %show.id, error = %release_error, "Failed to release claimed seats");
            }
            return Err(insert_error.into());
        }
    };
    let booking_id = inserted_object_id(&insert_result.inserted_id)?;

    let amount = show.price_for_seats(&new_booking.seats);
    let booking: Booking = new_booking.into_booking(booking_id);
    info!(
        booking_id = %booking.id,
        show_id = %booking.show,
        seats = %join_seats(&booking.seats),
        amount,
        "Booking confirmed"
    );

    Ok(ApiResponse::success(
        BookingReceipt { booking, amount },
        "Booking confirmed",
    ))
}

/// A user's bookings, newest first, with show, movie and theatre joined in.
pub async fn load_user_bookings(
    Path(user_str): Path<String>,
    Extension(db): Extension<Database>,
) -> Result<ApiResponse<Vec<BookingDetail>>, AppError> {
    let user_id = parse_object_id(&user_str, "user")?;

    let mut show_pipeline = vec![doc! { "$match": { "$expr": { "$eq": ["$_id", "$$show_id"] } } }];
    show_pipeline.extend(show_detail_stages());

    let pipeline = vec![
        doc! { "$match": { "user": user_id } },
        doc! { "$sort": { "createdAt": -1 } },
        doc! {
            "$lookup": {
                "from": SHOWS,
                "let": { "show_id": "$show" },
                "pipeline": show_pipeline,
                "as": "show",
            }
        },
        doc! { "$unwind": "$show" },
    ];

    let cursor = db
        .collection::<Booking>(BOOKINGS)
        .aggregate(pipeline, None)
        .await?;
    let bookings: Vec<BookingDetail> = collect_documents(cursor).await?;
    let bookings = bookings.into_iter().map(BookingDetail::with_amount).collect();

    Ok(ApiResponse::success(bookings, "Bookings fetched successfully"))
}
