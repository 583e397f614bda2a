//! Fixtures shared by unit tests.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::{
    db::{ContactList, Event, LocationType, User, Visibility},
    recurrence::Repeat,
    service::Database,
    store::MemoryStore,
};

pub(crate) fn database() -> (MemoryStore, Database) {
    let store = MemoryStore::new();
    (store.clone(), Database::new(Arc::new(store), 3))
}

pub(crate) fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

pub(crate) fn user(username: &str, email: &str, photo: Option<&str>) -> User {
    User {
        username: username.to_owned(),
        email: email.to_owned(),
        phone: format!("+1-{username}"),
        photo: photo.map(str::to_owned),
    }
}

pub(crate) fn contact_list(owner: &str, contacts: &[&str]) -> ContactList {
    ContactList {
        owner: owner.to_owned(),
        name: "friends".to_owned(),
        contacts: contacts.iter().map(|c| c.to_string()).collect(),
    }
}

pub(crate) fn event(title: &str) -> Event {
    Event {
        author: "ann@x.io".to_owned(),
        title: title.to_owned(),
        description: String::new(),
        start_date: date("2026-10-19"),
        start_time: "10:00".to_owned(),
        end_date: date("2026-10-19"),
        end_time: "11:00".to_owned(),
        visibility: Visibility::Public,
        can_invite: false,
        location_type: LocationType::Online,
        location: "https://meet.example".to_owned(),
        invited_users: vec!["ann@x.io".to_owned()],
        series_id: None,
        repeat: Repeat::Single,
        every: None,
    }
}

pub(crate) fn in_series(mut event: Event, series_id: &str) -> Event {
    event.series_id = Some(series_id.to_owned());
    event.repeat = Repeat::Weekly;
    event.every = Some(1);
    event
}
