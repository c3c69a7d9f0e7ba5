use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    Json,
};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, from_document, DateTime, Document},
    Database,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::controllers::{collect_documents, inserted_object_id};
use crate::models::{
    movie_model::Movie,
    show_model::{unbooked_show_filter, NewShow, Show, ShowDetail, ShowRequest},
    theatre_model::{group_shows_by_theatre, TheatreShows},
    MOVIES, SHOWS, THEATRES,
};
use crate::seat_map::{self, SeatMap, SeatSelection};
use crate::utils::{
    day_bounds, error::AppError, midnight_utc, parse_calendar_date, parse_object_id,
    parse_seat_list, response::ApiResponse,
};

/// Stages that join a show's movie and theatre.
pub(crate) fn show_detail_stages() -> Vec<Document> {
    vec![
        doc! {
            "$lookup": {
                "from": MOVIES,
                "localField": "movie",
                "foreignField": "_id",
                "as": "movie",
            },
        },
        doc! {
            "$lookup": {
                "from": THEATRES,
                "localField": "theatre",
                "foreignField": "_id",
                "as": "theatre",
            },
        },
        doc! { "$unwind": "$movie" },
        doc! { "$unwind": "$theatre" },
    ]
}

pub async fn add_show(
    Extension(db): Extension<Database>,
    payload: Result<Json<ShowRequest>, JsonRejection>,
) -> Result<ApiResponse<Show>, AppError> {
    let Json(request) = payload?;
    let new_show = request.into_new_show(Utc::now())?;

    let movie = db
        .collection::<Movie>(MOVIES)
        .find_one(doc! { "_id": new_show.movie }, None)
        .await?
        .ok_or_else(|| AppError::not_found("Movie"))?;
    new_show.check_release_date(&movie)?;

    let theatres = db
        .collection::<Document>(THEATRES)
        .count_documents(doc! { "_id": new_show.theatre }, None)
        .await?;
    if theatres == 0 {
        return Err(AppError::not_found("Theatre"));
    }

    let insert_result = db
        .collection::<NewShow>(SHOWS)
        .insert_one(&new_show, None)
        .await?;
    let show_id = inserted_object_id(&insert_result.inserted_id)?;

    // A theatre or movie deleted while the show was being written would leave
    // it dangling, so check both again and take the show back if either is gone.
    let theatre_left = db
        .collection::<Document>(THEATRES)
        .count_documents(doc! { "_id": new_show.theatre }, None)
        .await?;
    let movie_left = db
        .collection::<Document>(MOVIES)
        .count_documents(doc! { "_id": new_show.movie }, None)
        .await?;
    if theatre_left == 0 || movie_left == 0 {
        warn!(show_id = %show_id, "Theatre or movie removed while adding show");
        db.collection::<Document>(SHOWS)
            .delete_one(unbooked_show_filter(show_id), None)
            .await?;
        return Err(AppError::not_found(if theatre_left == 0 { "Theatre" } else { "Movie" }));
    }

    info!(
        show_id = %show_id,
        movie = %new_show.movie,
        theatre = %new_show.theatre,
        "Show added"
    );

    Ok(ApiResponse::success(
        new_show.into_show(show_id),
        "Show added successfully",
    ))
}

/// Shows of one theatre from today on, newest first.
pub async fn load_shows_by_theatre(
    Path(id_str): Path<String>,
    Extension(db): Extension<Database>,
) -> Result<ApiResponse<Vec<ShowDetail>>, AppError> {
    let theatre_id = parse_object_id(&id_str, "theatre")?;
    let today = midnight_utc(Utc::now().date_naive());

    let mut pipeline = vec![doc! {
        "$match": {
            "theatre": theatre_id,
            "date": { "$gte": DateTime::from_chrono(today) },
        }
    }];
    pipeline.extend(show_detail_stages());
    pipeline.push(doc! { "$sort": { "createdAt": -1 } });

    let cursor = db.collection::<Show>(SHOWS).aggregate(pipeline, None).await?;
    let shows: Vec<ShowDetail> = collect_documents(cursor).await?;

    Ok(ApiResponse::success(shows, "Shows fetched successfully"))
}

#[derive(Debug, Deserialize)]
pub struct TheatresByMovieQuery {
    pub date: Option<String>,
}

/// Theatres screening a movie on one UTC day, each with its shows.
pub async fn load_theatres_by_movie(
    Path(id_str): Path<String>,
    Extension(db): Extension<Database>,
    query: Result<Query<TheatresByMovieQuery>, QueryRejection>,
) -> Result<ApiResponse<Vec<TheatreShows>>, AppError> {
    let movie_id = parse_object_id(&id_str, "movie")?;
    let Query(query) = query?;
    let date = match query.date.as_deref() {
        Some(raw) => parse_calendar_date(raw)?,
        None => Utc::now().date_naive(),
    };
    let (start_of_day, end_of_day) = day_bounds(date);

    let mut pipeline = vec![doc! {
        "$match": {
            "movie": movie_id,
            "date": {
                "$gte": DateTime::from_chrono(start_of_day),
                "$lte": DateTime::from_chrono(end_of_day),
            },
        }
    }];
    pipeline.extend(show_detail_stages());
    pipeline.push(doc! { "$sort": { "time": 1 } });

    let cursor = db.collection::<Show>(SHOWS).aggregate(pipeline, None).await?;
    let shows: Vec<ShowDetail> = collect_documents(cursor).await?;
    debug!(movie_id = %movie_id, %date, shows = shows.len(), "Shows found for day");

    Ok(ApiResponse::success(
        group_shows_by_theatre(shows),
        "Theatres fetched successfully",
    ))
}

pub async fn load_show(
    Path(id_str): Path<String>,
    Extension(db): Extension<Database>,
) -> Result<ApiResponse<ShowDetail>, AppError> {
    let show_id = parse_object_id(&id_str, "show")?;

    let mut pipeline = vec![doc! { "$match": { "_id": show_id } }];
    pipeline.extend(show_detail_stages());

    let mut cursor = db.collection::<Show>(SHOWS).aggregate(pipeline, None).await?;
    match cursor.try_next().await? {
        Some(doc) => {
            let show: ShowDetail = from_document(doc)?;
            Ok(ApiResponse::success(show, "Show fetched successfully"))
        }
        None => Err(AppError::not_found("Show")),
    }
}

/// Deletes a show only while nobody has booked a seat in it. The emptiness
/// check and the delete are one conditional write.
pub async fn delete_show(
    Path(id_str): Path<String>,
    Extension(db): Extension<Database>,
) -> Result<ApiResponse<()>, AppError> {
    let show_id = parse_object_id(&id_str, "show")?;
    let shows_collection = db.collection::<Show>(SHOWS);

    let delete_result = shows_collection
        .delete_one(unbooked_show_filter(show_id), None)
        .await?;
    if delete_result.deleted_count == 1 {
        info!(show_id = %show_id, "Show deleted");
        return Ok(ApiResponse::message("Show deleted successfully"));
    }

    match shows_collection.find_one(doc! { "_id": show_id }, None).await? {
        // The last booking was released between the delete and this read.
        Some(show) if show.is_deletable() => Err(AppError::Conflict(
            "Show changed while deleting, please try again".into(),
        )),
        Some(show) => Err(AppError::Conflict(format!(
            "Show has {} booked seat(s) and cannot be deleted",
            show.booked_seats.len()
        ))),
        None => Err(AppError::not_found("Show")),
    }
}

#[derive(Debug, Deserialize)]
pub struct SeatMapQuery {
    pub selected: Option<String>,
    /// Seat clicked on top of `selected`; it flips in or out of the selection.
    pub toggle: Option<u32>,
}

pub async fn load_seat_map(
    Path(id_str): Path<String>,
    Extension(db): Extension<Database>,
    query: Result<Query<SeatMapQuery>, QueryRejection>,
) -> Result<ApiResponse<SeatMap>, AppError> {
    let show_id = parse_object_id(&id_str, "show")?;
    let Query(query) = query?;
    let requested = match query.selected.as_deref() {
        Some(raw) => parse_seat_list(raw)?,
        None => Vec::new(),
    };

    let show = db
        .collection::<Show>(SHOWS)
        .find_one(doc! { "_id": show_id }, None)
        .await?
        .ok_or_else(|| AppError::not_found("Show"))?;

    let mut selection = SeatSelection::new();
    for seat in requested {
        if !selection.select(&show, seat) {
            debug!(show_id = %show_id, seat, "Seat cannot be selected");
        }
    }
    if let Some(seat) = query.toggle {
        selection.toggle(&show, seat);
    }
    if !selection.is_empty() {
        debug!(show_id = %show_id, selected = selection.len(), "Seat selection priced");
    }

    Ok(ApiResponse::success(
        seat_map::render(&show, &selection),
        "Seat map fetched successfully",
    ))
}
