use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// A finished animation kept for the user's history page, stored in the
/// `animations` collection.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Animation {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub output_url: String,
    pub title: String,
    pub created_at: DateTime,
}

impl Animation {
    pub fn new(user_id: &str, output_url: &str, title: &str) -> Self {
        Animation {
            id: None,
            user_id: user_id.to_string(),
            output_url: output_url.to_string(),
            title: title.to_string(),
            created_at: DateTime::now(),
        }
    }
}
