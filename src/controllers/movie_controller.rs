use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    Json,
};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::FindOptions,
    Database,
};
use tracing::info;

use crate::controllers::inserted_object_id;
use crate::models::{
    movie_model::{Movie, MovieRequest, MovieUpdate, NewMovie},
    MOVIES, SHOWS,
};
use crate::utils::{error::AppError, parse_object_id, response::ApiResponse};

pub async fn load_movies(
    Extension(db): Extension<Database>,
) -> Result<ApiResponse<Vec<Movie>>, AppError> {
    let movies_collection = db.collection::<Movie>(MOVIES);

    let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();
    let movies: Vec<Movie> = movies_collection.find(None, options).await?.try_collect().await?;

    Ok(ApiResponse::success(movies, "Movies fetched successfully"))
}

pub async fn load_movie(
    Path(id_str): Path<String>,
    Extension(db): Extension<Database>,
) -> Result<ApiResponse<Movie>, AppError> {
    let movie_id = parse_object_id(&id_str, "movie")?;

    let movie = db
        .collection::<Movie>(MOVIES)
        .find_one(doc! { "_id": movie_id }, None)
        .await?
        .ok_or_else(|| AppError::not_found("Movie"))?;

    Ok(ApiResponse::success(movie, "Movie fetched successfully"))
}

pub async fn add_movie(
    Extension(db): Extension<Database>,
    payload: Result<Json<MovieRequest>, JsonRejection>,
) -> Result<ApiResponse<Movie>, AppError> {
    let Json(request) = payload?;
    let new_movie = request.into_new_movie(Utc::now())?;

    let insert_result = db
        .collection::<NewMovie>(MOVIES)
        .insert_one(&new_movie, None)
        .await?;
    let movie_id = inserted_object_id(&insert_result.inserted_id)?;
    info!(movie_id = %movie_id, title = %new_movie.title, "Movie added");

    Ok(ApiResponse::success(
        new_movie.into_movie(movie_id),
        "Movie added successfully",
    ))
}

pub async fn update_movie(
    Extension(db): Extension<Database>,
    Path(id_str): Path<String>,
    payload: Result<Json<MovieUpdate>, JsonRejection>,
) -> Result<ApiResponse<Movie>, AppError> {
    let movie_id = parse_object_id(&id_str, "movie")?;
    let Json(update_data) = payload?;
    let update = update_data.to_set_document()?;

    let movies_collection = db.collection::<Movie>(MOVIES);
    let update_result = movies_collection
        .update_one(doc! { "_id": movie_id }, update, None)
        .await?;
    if update_result.matched_count == 0 {
        return Err(AppError::not_found("Movie"));
    }

    let movie = movies_collection
        .find_one(doc! { "_id": movie_id }, None)
        .await?
        .ok_or_else(|| AppError::not_found("Movie"))?;

    Ok(ApiResponse::success(movie, "Movie updated successfully"))
}

pub async fn delete_movie(
    Path(id_str): Path<String>,
    Extension(db): Extension<Database>,
) -> Result<ApiResponse<()>, AppError> {
    let movie_id = parse_object_id(&id_str, "movie")?;

    let scheduled = db
        .collection::<Document>(SHOWS)
        .count_documents(doc! { "movie": movie_id }, None)
        .await?;
    if scheduled > 0 {
        return Err(AppError::Conflict(format!(
            "Movie still has {scheduled} show(s) and cannot be deleted"
        )));
    }

    let delete_result = db
        .collection::<Movie>(MOVIES)
        .delete_one(doc! { "_id": movie_id }, None)
        .await?;
    if delete_result.deleted_count == 0 {
        return Err(AppError::not_found("Movie"));
    }

    info!(movie_id = %movie_id, "Movie deleted");
    Ok(ApiResponse::message("Movie deleted successfully"))
}
