use futures::TryStreamExt;
use mongodb::{
    bson::{from_document, oid::ObjectId, Bson, Document},
    Cursor,
};
use serde::de::DeserializeOwned;

use crate::utils::error::AppError;

pub mod booking_controller;
pub mod home_controller;
pub mod movie_controller;
pub mod show_controller;
pub mod theatre_controller;

/// Drains an aggregation cursor into typed documents.
pub(crate) async fn collect_documents<T>(mut cursor: Cursor<Document>) -> Result<Vec<T>, AppError>
where
    T: DeserializeOwned,
{
    let mut result = Vec::new();
    while let Some(doc) = cursor.try_next().await? {
        result.push(from_document(doc)?);
    }
    Ok(result)
}

pub(crate) fn inserted_object_id(inserted_id: &Bson) -> Result<ObjectId, AppError> {
    inserted_id
        .as_object_id()
        .ok_or_else(|| AppError::Internal(format!("Inserted id {inserted_id} is not an ObjectId")))
}
