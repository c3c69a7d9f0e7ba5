use chrono::{DateTime as ChronoDateTime, Utc};
use mongodb::bson::{
    doc, oid::ObjectId, serde_helpers::serialize_bson_datetime_as_rfc3339_string, DateTime,
    Document,
};
use serde::{Deserialize, Serialize};

use crate::utils::{error::AppError, midnight_utc, parse_calendar_date, serialize_oid};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    #[serde(rename = "_id", serialize_with = "serialize_oid")]
    pub id: ObjectId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub duration: i32,
    pub language: String,
    pub genre: String,
    #[serde(serialize_with = "serialize_bson_datetime_as_rfc3339_string")]
    pub release_date: DateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(serialize_with = "serialize_bson_datetime_as_rfc3339_string")]
    pub created_at: DateTime,
}

/// Insert shape of a movie, written to the `movies` collection as-is.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewMovie {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub duration: i32,
    pub language: String,
    pub genre: String,
    pub release_date: DateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    pub created_at: DateTime,
}

impl NewMovie {
    pub fn into_movie(self, id: ObjectId) -> Movie {
        Movie {
            id,
            title: self.title,
            description: self.description,
            duration: self.duration,
            language: self.language,
            genre: self.genre,
            release_date: self.release_date,
            poster: self.poster,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieRequest {
    pub title: String,
    pub description: Option<String>,
    pub duration: i32,
    pub language: String,
    pub genre: String,
    pub release_date: String,
    pub poster: Option<String>,
}

impl MovieRequest {
    pub fn into_new_movie(self, now: ChronoDateTime<Utc>) -> Result<NewMovie, AppError> {
        let title = required_text(self.title, "Movie title")?;
        if self.duration <= 0 {
            return Err(AppError::Validation(
                "Movie duration must be a positive number of minutes".into(),
            ));
        }
        let release_date = parse_calendar_date(&self.release_date)?;

        Ok(NewMovie {
            title,
            description: self.description,
            duration: self.duration,
            language: required_text(self.language, "Movie language")?,
            genre: required_text(self.genre, "Movie genre")?,
            release_date: DateTime::from_chrono(midnight_utc(release_date)),
            poster: self.poster,
            created_at: DateTime::from_chrono(now),
        })
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MovieUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration: Option<i32>,
    pub language: Option<String>,
    pub genre: Option<String>,
    pub release_date: Option<String>,
    pub poster: Option<String>,
}

impl MovieUpdate {
    /// Builds the `$set` body from the fields present in the request.
    pub fn to_set_document(&self) -> Result<Document, AppError> {
        let mut set = Document::new();
        if let Some(title) = &self.title {
            set.insert("title", required_text(title.clone(), "Movie title")?);
        }
        if let Some(description) = &self.description {
            set.insert("description", description.as_str());
        }
        if let Some(duration) = self.duration {
            if duration <= 0 {
                return Err(AppError::Validation(
                    "Movie duration must be a positive number of minutes".into(),
                ));
            }
            set.insert("duration", duration);
        }
        if let Some(language) = &self.language {
            set.insert("language", required_text(language.clone(), "Movie language")?);
        }
        if let Some(genre) = &self.genre {
            set.insert("genre", required_text(genre.clone(), "Movie genre")?);
        }
        if let Some(release_date) = &self.release_date {
            let date = parse_calendar_date(release_date)?;
            set.insert("releaseDate", DateTime::from_chrono(midnight_utc(date)));
        }
        if let Some(poster) = &self.poster {
            set.insert("poster", poster.as_str());
        }

        if set.is_empty() {
            return Err(AppError::Validation("Nothing to update".into()));
        }
        Ok(doc! { "$set": set })
    }
}

pub(crate) fn required_text(value: String, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> MovieRequest {
        MovieRequest {
            title: "  Interstellar ".into(),
            description: None,
            duration: 169,
            language: "English".into(),
            genre: "Sci-Fi".into(),
            release_date: "2030-11-07".into(),
            poster: None,
        }
    }

    #[test]
    fn release_date_is_stored_at_utc_midnight() {
        let movie = request().into_new_movie(Utc::now()).unwrap();
        assert_eq!(movie.title, "Interstellar");
        let release = movie.release_date.to_chrono();
        assert_eq!(release.to_rfc3339(), "2030-11-07T00:00:00+00:00");
    }

    #[test]
    fn duration_must_be_positive() {
        let mut req = request();
        req.duration = 0;
        assert!(matches!(
            req.into_new_movie(Utc::now()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn update_only_sets_present_fields() {
        let update = MovieUpdate {
            genre: Some("Drama".into()),
            release_date: Some("2031-01-02".into()),
            ..Default::default()
        };
        let body = update.to_set_document().unwrap();
        let set = body.get_document("$set").unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get_str("genre").unwrap(), "Drama");
        assert!(set.get_datetime("releaseDate").is_ok());
    }

    #[test]
    fn empty_update_is_rejected() {
        assert!(MovieUpdate::default().to_set_document().is_err());
    }
}
