use std::collections::HashMap;

use chrono::{DateTime as ChronoDateTime, Utc};
use mongodb::bson::{
    doc, oid::ObjectId, serde_helpers::serialize_bson_datetime_as_rfc3339_string, DateTime,
    Document,
};
use serde::{Deserialize, Serialize};

use crate::utils::{error::AppError, parse_object_id, serialize_oid};

use super::{movie_model::required_text, show_model::ShowDetail};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Theatre {
    #[serde(rename = "_id", serialize_with = "serialize_oid")]
    pub id: ObjectId,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    #[serde(serialize_with = "serialize_oid")]
    pub owner: ObjectId,
    #[serde(default)]
    pub is_active: bool,
    #[serde(serialize_with = "serialize_bson_datetime_as_rfc3339_string")]
    pub created_at: DateTime,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewTheatre {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub owner: ObjectId,
    pub is_active: bool,
    pub created_at: DateTime,
}

impl NewTheatre {
    pub fn into_theatre(self, id: ObjectId) -> Theatre {
        Theatre {
            id,
            name: self.name,
            address: self.address,
            phone: self.phone,
            email: self.email,
            owner: self.owner,
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TheatreRequest {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub owner: String,
    pub is_active: Option<bool>,
}

impl TheatreRequest {
    pub fn into_new_theatre(self, now: ChronoDateTime<Utc>) -> Result<NewTheatre, AppError> {
        Ok(NewTheatre {
            name: required_text(self.name, "Theatre name")?,
            address: required_text(self.address, "Theatre address")?,
            phone: required_text(self.phone, "Theatre phone")?,
            email: checked_email(self.email)?,
            owner: parse_object_id(&self.owner, "owner")?,
            // New theatres wait for an admin to activate them.
            is_active: self.is_active.unwrap_or(false),
            created_at: DateTime::from_chrono(now),
        })
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct TheatreUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

impl TheatreUpdate {
    pub fn to_set_document(&self) -> Result<Document, AppError> {
        let mut set = Document::new();
        if let Some(name) = &self.name {
            set.insert("name", required_text(name.clone(), "Theatre name")?);
        }
        if let Some(address) = &self.address {
            set.insert("address", required_text(address.clone(), "Theatre address")?);
        }
        if let Some(phone) = &self.phone {
            set.insert("phone", required_text(phone.clone(), "Theatre phone")?);
        }
        if let Some(email) = &self.email {
            set.insert("email", checked_email(email.clone())?);
        }
        if let Some(is_active) = self.is_active {
            set.insert("isActive", is_active);
        }

        if set.is_empty() {
            return Err(AppError::Validation("Nothing to update".into()));
        }
        Ok(doc! { "$set": set })
    }
}

fn checked_email(email: String) -> Result<String, AppError> {
    let email = required_text(email, "Theatre email")?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AppError::Validation(format!("Invalid email address '{email}'"))),
    }
}

/// One theatre with the shows it screens for the requested movie and day.
#[derive(Serialize, Debug)]
pub struct TheatreShows {
    #[serde(flatten)]
    pub theatre: Theatre,
    pub shows: Vec<ShowDetail>,
}

/// Groups shows under their theatre. Shows keep ascending `time` order and
/// theatres are listed in the order of their earliest show.
pub fn group_shows_by_theatre(mut shows: Vec<ShowDetail>) -> Vec<TheatreShows> {
    shows.sort_by(|a, b| a.time.cmp(&b.time));

    let mut groups: Vec<TheatreShows> = Vec::new();
    let mut index: HashMap<ObjectId, usize> = HashMap::new();

    for show in shows {
        match index.get(&show.theatre.id).copied() {
            Some(position) => groups[position].shows.push(show),
            None => {
                index.insert(show.theatre.id, groups.len());
                groups.push(TheatreShows {
                    theatre: show.theatre.clone(),
                    shows: vec![show],
                });
            }
        }
    }

    groups
}
