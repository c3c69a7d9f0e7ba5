use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    Json,
};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    error::TRANSIENT_TRANSACTION_ERROR,
    options::FindOptions,
    ClientSession, Database,
};
use tracing::{info, warn};

use crate::controllers::inserted_object_id;
use crate::models::{
    show_model::unbooked_shows_of_theatre,
    theatre_model::{NewTheatre, Theatre, TheatreRequest, TheatreUpdate},
    SHOWS, THEATRES,
};
use crate::utils::{error::AppError, parse_object_id, response::ApiResponse};

fn newest_first() -> FindOptions {
    FindOptions::builder().sort(doc! { "createdAt": -1 }).build()
}

pub async fn load_theatres(
    Extension(db): Extension<Database>,
) -> Result<ApiResponse<Vec<Theatre>>, AppError> {
    let theatres: Vec<Theatre> = db
        .collection::<Theatre>(THEATRES)
        .find(None, newest_first())
        .await?
        .try_collect()
        .await?;

    Ok(ApiResponse::success(theatres, "Theatres fetched successfully"))
}

pub async fn load_theatres_by_owner(
    Path(owner_str): Path<String>,
    Extension(db): Extension<Database>,
) -> Result<ApiResponse<Vec<Theatre>>, AppError> {
    let owner_id = parse_object_id(&owner_str, "owner")?;

    let theatres: Vec<Theatre> = db
        .collection::<Theatre>(THEATRES)
        .find(doc! { "owner": owner_id }, newest_first())
        .await?
        .try_collect()
        .await?;

    Ok(ApiResponse::success(theatres, "Theatres fetched successfully"))
}

pub async fn add_theatre(
    Extension(db): Extension<Database>,
    payload: Result<Json<TheatreRequest>, JsonRejection>,
) -> Result<ApiResponse<Theatre>, AppError> {
    let Json(request) = payload?;
    let new_theatre = request.into_new_theatre(Utc::now())?;

    let insert_result = db
        .collection::<NewTheatre>(THEATRES)
        .insert_one(&new_theatre, None)
        .await?;
    let theatre_id = inserted_object_id(&insert_result.inserted_id)?;
    info!(theatre_id = %theatre_id, owner = %new_theatre.owner, "Theatre added");

    Ok(ApiResponse::success(
        new_theatre.into_theatre(theatre_id),
        "Theatre added successfully",
    ))
}

pub async fn update_theatre(
    Extension(db): Extension<Database>,
    Path(id_str): Path<String>,
    payload: Result<Json<TheatreUpdate>, JsonRejection>,
) -> Result<ApiResponse<Theatre>, AppError> {
    let theatre_id = parse_object_id(&id_str, "theatre")?;
    let Json(update_data) = payload?;
    let update = update_data.to_set_document()?;

    let theatres_collection = db.collection::<Theatre>(THEATRES);
    let update_result = theatres_collection
        .update_one(doc! { "_id": theatre_id }, update, None)
        .await?;
    if update_result.matched_count == 0 {
        return Err(AppError::not_found("Theatre"));
    }

    let theatre = theatres_collection
        .find_one(doc! { "_id": theatre_id }, None)
        .await?
        .ok_or_else(|| AppError::not_found("Theatre"))?;

    Ok(ApiResponse::success(theatre, "Theatre updated successfully"))
}

/// Removes a theatre together with its unbooked shows. Refused while any of
/// its shows has booked seats.
///
/// Runs in one transaction. A booking that lands on one of the shows while
/// this is in flight makes the transaction fail with a write conflict instead
/// of leaving a booked show without a theatre.
pub async fn delete_theatre(
    Path(id_str): Path<String>,
    Extension(db): Extension<Database>,
) -> Result<ApiResponse<()>, AppError> {
    let theatre_id = parse_object_id(&id_str, "theatre")?;

    let mut session = db.client().start_session(None).await?;
    session.start_transaction(None).await?;

    let removed_shows = match remove_theatre(&db, &mut session, theatre_id).await {
        Ok(removed) => removed,
        Err(err) => {
            if let Err(abort_error) = session.abort_transaction().await {
                warn!(theatre_id = %theatre_id, error = %abort_error, "Failed to abort theatre delete");
            }
            return Err(retryable_conflict(err));
        }
    };
    session
        .commit_transaction()
        .await
        .map_err(|err| retryable_conflict(err.into()))?;

    info!(theatre_id = %theatre_id, removed_shows, "Theatre deleted");
    Ok(ApiResponse::message("Theatre deleted successfully"))
}

async fn remove_theatre(
    db: &Database,
    session: &mut ClientSession,
    theatre_id: ObjectId,
) -> Result<u64, AppError> {
    let shows_collection = db.collection::<Document>(SHOWS);

    let removed = shows_collection
        .delete_many_with_session(unbooked_shows_of_theatre(theatre_id), None, session)
        .await?;
    // Whatever is left has booked seats.
    let booked_shows = shows_collection
        .count_documents_with_session(doc! { "theatre": theatre_id }, None, session)
        .await?;
    if booked_shows > 0 {
        return Err(AppError::Conflict(
            "Theatre has shows with booked seats and cannot be deleted".into(),
        ));
    }

    let delete_result = db
        .collection::<Theatre>(THEATRES)
        .delete_one_with_session(doc! { "_id": theatre_id }, None, session)
        .await?;
    if delete_result.deleted_count == 0 {
        return Err(AppError::not_found("Theatre"));
    }

    Ok(removed.deleted_count)
}

/// Turns a transaction write conflict into a conflict the client can retry.
fn retryable_conflict(err: AppError) -> AppError {
    match err {
        AppError::Database(db_error) if db_error.contains_label(TRANSIENT_TRANSACTION_ERROR) => {
            AppError::Conflict("Theatre changed while deleting, please try again".into())
        }
        other => other,
    }
}
