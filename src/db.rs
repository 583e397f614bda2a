use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::recurrence::Repeat;

// stored at users/<username>
// unique: username, email, phone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

// stored at contactLists/<push id>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactList {
    pub owner: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub contacts: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    Online,
    Offline,
}

// stored at events/<push id>, never rewritten except for invitedUsers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub author: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: NaiveDate,
    pub start_time: String,
    pub end_date: NaiveDate,
    pub end_time: String,
    pub visibility: Visibility,
    #[serde(default)]
    pub can_invite: bool,
    pub location_type: LocationType,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub invited_users: Vec<String>,

    // siblings of one recurring definition share this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,
    #[serde(rename = "type", default)]
    pub repeat: Repeat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub every: Option<u32>,
}

impl Event {
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    pub fn has_joined(&self, email: &str) -> bool {
        self.invited_users.iter().any(|invited| invited == email)
    }

    pub fn invited_count(&self) -> usize {
        self.invited_users.len()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn events_use_camel_case_documents() {
        let event: Event = serde_json::from_value(json!({
            "author": "ann@x.io",
            "title": "Standup",
            "startDate": "2026-10-19",
            "startTime": "09:00",
            "endDate": "2026-10-19",
            "endTime": "09:15",
            "visibility": "public",
            "locationType": "online",
            "seriesId": "s1",
            "type": "daily",
            "every": 1
        }))
        .unwrap();

        assert!(event.is_public());
        assert!(event.invited_users.is_empty());
        assert_eq!(event.repeat, Repeat::Daily);
        assert_eq!(event.series_id.as_deref(), Some("s1"));

        let doc = serde_json::to_value(&event).unwrap();
        assert_eq!(doc["startDate"], "2026-10-19");
        assert_eq!(doc["invitedUsers"], json!([]));
        assert_eq!(doc["type"], "daily");
    }

    #[test]
    fn single_events_omit_series_fields() {
        let event: Event = serde_json::from_value(json!({
            "author": "a", "title": "t",
            "startDate": "2026-10-19", "startTime": "10:00",
            "endDate": "2026-10-19", "endTime": "11:00",
            "visibility": "private", "locationType": "offline",
            "invitedUsers": ["a", "b"]
        }))
        .unwrap();

        assert_eq!(event.repeat, Repeat::Single);
        assert!(event.has_joined("b"));
        assert_eq!(event.invited_count(), 2);

        let doc = serde_json::to_value(&event).unwrap();
        assert!(doc.get("seriesId").is_none());
        assert!(doc.get("every").is_none());
    }
}
