//! State of the event-creation form between requests.
//!
//! The whole controller is serialized into the visitor's session, so every
//! field here except the one-shot pending submission must round-trip
//! through serde.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime};
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::{
    appresult::{DataError, DataResult},
    db::{Event, LocationType, Visibility},
    recurrence::{self, Occurrence, Repeat},
    service::Database,
};

use super::address::Address;

const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub email: String,
    pub photo: String,
}

/// Named controls of the submitted form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFields {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: NaiveDate,
    pub start_time: String,
    pub end_date: NaiveDate,
    pub end_time: String,
    pub visibility: Visibility,
    // checkbox, only sent when ticked
    #[serde(default)]
    pub can_invite: Option<String>,
    pub location_type: LocationType,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub repeat: Repeat,
    #[serde(default)]
    pub every: Option<String>,
    #[serde(default)]
    pub repeat_until: Option<String>,
}

impl EventFields {
    fn address(&self) -> Address {
        Address {
            country: self.country.trim().to_owned(),
            city: self.city.trim().to_owned(),
            street: self.street.trim().to_owned(),
        }
    }

    fn every(&self) -> DataResult<u32> {
        let raw = self.every.as_deref().map(str::trim).unwrap_or_default();
        let every: u32 = raw
            .parse()
            .map_err(|_| DataError::Invalid(format!("repeat interval {raw:?} is not a number")))?;
        if every == 0 {
            return Err(DataError::Invalid("repeat interval must be at least 1".to_owned()));
        }
        Ok(every)
    }

    fn repeat_until(&self) -> DataResult<NaiveDate> {
        let raw = self.repeat_until.as_deref().map(str::trim).unwrap_or_default();
        raw.parse()
            .map_err(|_| DataError::Invalid("a recurring event needs a last date".to_owned()))
    }
}

fn parse_time(field: &str, raw: &str) -> DataResult<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), TIME_FORMAT)
        .map_err(|_| DataError::Invalid(format!("{field} {raw:?} is not HH:MM")))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventForm {
    /// Email the form was loaded for.
    pub owner: String,
    /// Autocomplete source, flattened from every contact list.
    pub contacts: Vec<Contact>,
    pub suggestions: Vec<Contact>,
    pub invited: Vec<Contact>,
    pub input: String,
    pub repeat: Repeat,
    pub loading: bool,
    pub error: Option<String>,
    #[serde(skip)]
    pending: Option<Vec<Event>>,
}

/// Photo of the user registered under `email`, empty when there is none.
async fn photo_of(db: &Database, email: &str) -> DataResult<String> {
    match db.get_user_details(email).await {
        Ok(users) => Ok(users.into_iter().find_map(|user| user.photo).unwrap_or_default()),
        Err(DataError::NotFound(_)) => Ok(String::new()),
        Err(err) => Err(err),
    }
}

/// Contacts of every list owned by `email`, in list order, each email once.
async fn contact_emails(db: &Database, email: &str) -> DataResult<Vec<String>> {
    let lists = match db.get_user_contact_lists(email).await {
        Ok(lists) => lists,
        Err(DataError::NotFound(_)) => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };

    let mut seen = HashSet::new();
    Ok(lists
        .into_iter()
        .flat_map(|(_, list)| list.contacts)
        .filter(|contact| seen.insert(contact.clone()))
        .collect())
}

impl EventForm {
    /// Resolves the contacts with their photos and invites the current user.
    /// A failure leaves an error message on the form instead.
    pub async fn load(db: &Database, email: &str) -> EventForm {
        let mut form = EventForm { owner: email.to_owned(), loading: true, ..Default::default() };

        let resolved = async {
            let emails = contact_emails(db, email).await?;
            let photos = try_join_all(emails.iter().map(|contact| photo_of(db, contact))).await?;
            let contacts: Vec<Contact> = emails
                .into_iter()
                .zip(photos)
                .map(|(email, photo)| Contact { email, photo })
                .collect();
            let me = Contact { email: email.to_owned(), photo: photo_of(db, email).await? };
            Ok::<_, DataError>((contacts, me))
        }
        .await;

        match resolved {
            Ok((contacts, me)) => {
                tracing::debug!(email, contacts = contacts.len(), "loaded event form");
                form.contacts = contacts;
                form.invited.push(me);
            }
            Err(err) => {
                tracing::warn!(email, error = %err, "could not load contacts");
                form.error = Some(err.to_string());
            }
        }
        form.loading = false;
        form
    }

    /// Keeps the invitations, typed input and repeat kind of an earlier form
    /// by the same user. Contacts stay as freshly loaded.
    pub fn carry_over(&mut self, previous: EventForm) {
        if previous.owner != self.owner {
            return;
        }
        if !previous.invited.is_empty() {
            self.invited = previous.invited;
        }
        self.input = previous.input;
        self.repeat = previous.repeat;
    }

    /// Literal, case-sensitive substring match on contact emails.
    pub fn on_invite_input(&mut self, input: &str) {
        self.input = input.to_owned();
        self.suggestions = if input.is_empty() {
            Vec::new()
        } else {
            self.contacts
                .iter()
                .filter(|contact| contact.email.contains(input))
                .cloned()
                .collect()
        };
    }

    pub fn select_suggestion(&mut self, email: &str) -> DataResult<()> {
        let Some(suggestion) = self.suggestions.iter().find(|s| s.email == email).cloned() else {
            return Err(DataError::Invalid(format!("{email} is not a suggestion")));
        };
        if !self.invited.iter().any(|user| user.email == suggestion.email) {
            self.invited.push(suggestion);
        }
        self.input.clear();
        self.suggestions.clear();
        Ok(())
    }

    pub fn dismiss_suggestions(&mut self) {
        self.suggestions.clear();
    }

    /// Switching kinds forgets the previous interval; the "every" selector
    /// renders with its default again.
    pub fn set_repeat(&mut self, repeat: Repeat) {
        self.repeat = repeat;
    }

    pub fn invited_emails(&self) -> Vec<String> {
        self.invited.iter().map(|user| user.email.clone()).collect()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Builds the record(s) for `fields` and arms the one-shot submission
    /// that [`EventForm::flush`] writes.
    pub fn submit(&mut self, author: &str, fields: EventFields, max_instances: usize) -> DataResult<()> {
        match self.assemble(author, fields, max_instances) {
            Ok(events) => {
                self.error = None;
                self.loading = true;
                self.pending = Some(events);
                Ok(())
            }
            Err(err) => {
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn assemble(&self, author: &str, fields: EventFields, max_instances: usize) -> DataResult<Vec<Event>> {
        let title = fields.title.trim();
        if title.is_empty() {
            return Err(DataError::Invalid("title is required".to_owned()));
        }

        let start_time = parse_time("start time", &fields.start_time)?;
        let end_time = parse_time("end time", &fields.end_time)?;
        if fields.start_date.and_time(start_time) > fields.end_date.and_time(end_time) {
            return Err(DataError::Invalid("event ends before it starts".to_owned()));
        }

        let address = fields.address();
        let location = if fields.location_type == LocationType::Offline && !address.is_empty() {
            address.validate()?;
            address.to_location()
        } else {
            fields.location.trim().to_owned()
        };
        if location.is_empty() {
            return Err(DataError::Invalid("location is required".to_owned()));
        }

        let first = Occurrence { start: fields.start_date, end: fields.end_date };
        let (occurrences, every, series_id) = if fields.repeat.is_recurring() {
            let every = fields.every()?;
            let until = fields.repeat_until()?;
            let occurrences = recurrence::expand(first, fields.repeat, every, until, max_instances)?;
            (occurrences, Some(every), Some(uuid::Uuid::now_v7().to_string()))
        } else {
            (vec![first], None, None)
        };
        if occurrences.is_empty() {
            return Err(DataError::Invalid("the series has no occurrences".to_owned()));
        }

        let template = Event {
            author: author.to_owned(),
            title: title.to_owned(),
            description: fields.description.trim().to_owned(),
            start_date: first.start,
            start_time: start_time.format(TIME_FORMAT).to_string(),
            end_date: first.end,
            end_time: end_time.format(TIME_FORMAT).to_string(),
            visibility: fields.visibility,
            can_invite: fields.can_invite.is_some(),
            location_type: fields.location_type,
            location,
            invited_users: self.invited_emails(),
            series_id,
            repeat: fields.repeat,
            every,
        };

        Ok(occurrences
            .into_iter()
            .map(|occurrence| Event {
                start_date: occurrence.start,
                end_date: occurrence.end,
                ..template.clone()
            })
            .collect())
    }

    /// Writes the pending submission, at most once.
    pub async fn flush(&mut self, db: &Database) -> DataResult<Vec<String>> {
        let Some(events) = self.pending.take() else {
            return Ok(Vec::new());
        };

        let result = match events.as_slice() {
            [single] if single.series_id.is_none() => db.add_event(single).await.map(|id| vec![id]),
            series => db.add_event_series(series).await,
        };
        self.loading = false;
        if let Err(err) = &result {
            self.error = Some(err.to_string());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        service::Database,
        store::{Root, Store},
        testing::{contact_list, database, date, user},
    };

    async fn seeded() -> Database {
        let (_, db) = database();
        db.create_user(&user("ann", "ann@x.io", Some("ann.png"))).await.unwrap();
        db.create_user(&user("bob", "bob@x.io", Some("bob.png"))).await.unwrap();
        db.create_user(&user("cat", "Cat@x.io", None)).await.unwrap();
        db.add_list(&contact_list("ann@x.io", &["bob@x.io", "Cat@x.io"])).await.unwrap();
        db.add_list(&contact_list("ann@x.io", &["bob@x.io", "dan@y.io"])).await.unwrap();
        db
    }

    fn fields() -> EventFields {
        EventFields {
            title: " Book club ".into(),
            description: "Chapter *one*".into(),
            start_date: date("2026-10-19"),
            start_time: "18:00".into(),
            end_date: date("2026-10-19"),
            end_time: "20:00".into(),
            visibility: Visibility::Public,
            can_invite: Some("on".into()),
            location_type: LocationType::Online,
            location: "https://meet.example/club".into(),
            country: String::new(),
            city: String::new(),
            street: String::new(),
            repeat: Repeat::Single,
            every: None,
            repeat_until: None,
        }
    }

    fn emails(contacts: &[Contact]) -> Vec<&str> {
        contacts.iter().map(|c| c.email.as_str()).collect()
    }

    #[tokio::test]
    async fn load_flattens_lists_and_resolves_photos() {
        let db = seeded().await;
        let form = EventForm::load(&db, "ann@x.io").await;

        assert!(!form.loading);
        assert_eq!(form.error, None);
        // bob is on both lists but offered once
        assert_eq!(emails(&form.contacts), vec!["bob@x.io", "Cat@x.io", "dan@y.io"]);
        assert_eq!(form.contacts[0].photo, "bob.png");
        assert_eq!(form.contacts[1].photo, "");
        assert_eq!(form.contacts[2].photo, "");
        assert_eq!(form.invited, vec![Contact { email: "ann@x.io".into(), photo: "ann.png".into() }]);
    }

    #[tokio::test]
    async fn load_without_lists_still_invites_self() {
        let (_, db) = database();
        let form = EventForm::load(&db, "new@x.io").await;
        assert!(form.contacts.is_empty());
        assert_eq!(emails(&form.invited), vec!["new@x.io"]);
        assert_eq!(form.error, None);
    }

    #[tokio::test]
    async fn load_reports_broken_store_data() {
        let (store, db) = database();
        store.set(Root::ContactLists, "l1", serde_json::json!({"owner": "ann@x.io", "contacts": 5})).await.unwrap();

        let form = EventForm::load(&db, "ann@x.io").await;
        assert!(form.error.is_some());
        assert!(form.invited.is_empty());
        assert!(!form.loading);
    }

    #[tokio::test]
    async fn suggestions_are_case_sensitive_substrings() {
        let db = seeded().await;
        let mut form = EventForm::load(&db, "ann@x.io").await;

        form.on_invite_input("@x.io");
        assert_eq!(emails(&form.suggestions), vec!["bob@x.io", "Cat@x.io"]);

        form.on_invite_input("cat");
        assert!(form.suggestions.is_empty());
        assert_eq!(form.input, "cat");

        form.on_invite_input("Cat");
        assert_eq!(emails(&form.suggestions), vec!["Cat@x.io"]);

        form.on_invite_input("");
        assert!(form.suggestions.is_empty());
    }

    #[tokio::test]
    async fn selecting_appends_once_and_clears_input() {
        let db = seeded().await;
        let mut form = EventForm::load(&db, "ann@x.io").await;

        form.on_invite_input("bob");
        form.select_suggestion("bob@x.io").unwrap();
        assert_eq!(emails(&form.invited), vec!["ann@x.io", "bob@x.io"]);
        assert!(form.input.is_empty());
        assert!(form.suggestions.is_empty());

        form.on_invite_input("bob");
        form.select_suggestion("bob@x.io").unwrap();
        assert_eq!(emails(&form.invited), vec!["ann@x.io", "bob@x.io"]);
        assert!(form.input.is_empty());

        form.on_invite_input("bob");
        assert!(form.select_suggestion("eve@x.io").is_err());
        assert_eq!(form.input, "bob");
    }

    #[test]
    fn dismissing_keeps_input() {
        let mut form = EventForm {
            contacts: vec![Contact { email: "bob@x.io".into(), photo: String::new() }],
            ..Default::default()
        };
        form.on_invite_input("b");
        form.dismiss_suggestions();
        assert!(form.suggestions.is_empty());
        assert_eq!(form.input, "b");
    }

    #[tokio::test]
    async fn single_submission_is_written_once() {
        let db = seeded().await;
        let mut form = EventForm::load(&db, "ann@x.io").await;
        form.on_invite_input("bob");
        form.select_suggestion("bob@x.io").unwrap();

        form.submit("ann@x.io", fields(), 10).unwrap();
        assert!(form.loading);
        assert!(form.is_pending());

        let ids = form.flush(&db).await.unwrap();
        assert_eq!(ids.len(), 1);
        assert!(!form.loading);
        assert!(form.flush(&db).await.unwrap().is_empty());

        let event = db.get_event(&ids[0]).await.unwrap();
        assert_eq!(event.title, "Book club");
        assert_eq!(event.invited_users, vec!["ann@x.io", "bob@x.io"]);
        assert!(event.can_invite);
        assert_eq!(event.series_id, None);
        assert_eq!(event.repeat, Repeat::Single);
    }

    #[tokio::test]
    async fn recurring_submission_creates_siblings() {
        let db = seeded().await;
        let mut form = EventForm::load(&db, "ann@x.io").await;
        form.set_repeat(Repeat::Weekly);

        let mut fields = fields();
        fields.repeat = Repeat::Weekly;
        fields.every = Some("1".into());
        fields.repeat_until = Some("2026-11-02".into());
        form.submit("ann@x.io", fields, 10).unwrap();
        let ids = form.flush(&db).await.unwrap();
        assert_eq!(ids.len(), 3);

        let events = db.get_all_events().await.unwrap();
        let series: HashSet<_> = events.iter().map(|(_, e)| e.series_id.clone()).collect();
        assert_eq!(series.len(), 1);
        assert!(series.iter().all(Option::is_some));
        let starts: Vec<_> = events.iter().map(|(_, e)| e.start_date.to_string()).collect();
        assert_eq!(starts, vec!["2026-10-19", "2026-10-26", "2026-11-02"]);
        assert!(events.iter().all(|(_, e)| e.every == Some(1)));
    }

    #[tokio::test]
    async fn invalid_submissions_set_the_banner() {
        let db = seeded().await;
        let mut form = EventForm::load(&db, "ann@x.io").await;

        let mut backwards = fields();
        backwards.end_time = "17:00".into();
        assert!(form.submit("ann@x.io", backwards, 10).is_err());
        assert!(form.error.is_some());
        assert!(!form.is_pending());

        let mut no_interval = fields();
        no_interval.repeat = Repeat::Daily;
        no_interval.repeat_until = Some("2026-10-25".into());
        assert!(matches!(form.submit("ann@x.io", no_interval, 10), Err(DataError::Invalid(_))));

        let mut bad_address = fields();
        bad_address.location_type = LocationType::Offline;
        bad_address.country = "X".into();
        bad_address.city = "Sofia".into();
        assert!(form.submit("ann@x.io", bad_address, 10).is_err());

        form.submit("ann@x.io", fields(), 10).unwrap();
        assert_eq!(form.error, None);
    }

    #[tokio::test]
    async fn reload_picks_up_new_contacts_and_keeps_progress() {
        let db = seeded().await;
        let mut first = EventForm::load(&db, "ann@x.io").await;
        first.on_invite_input("bob");
        first.select_suggestion("bob@x.io").unwrap();
        first.on_invite_input("eve");
        first.set_repeat(Repeat::Daily);

        db.add_list(&contact_list("ann@x.io", &["eve@x.io"])).await.unwrap();
        let mut form = EventForm::load(&db, "ann@x.io").await;
        form.carry_over(first);

        assert!(form.contacts.iter().any(|c| c.email == "eve@x.io"));
        assert_eq!(emails(&form.invited), vec!["ann@x.io", "bob@x.io"]);
        assert_eq!(form.input, "eve");
        assert_eq!(form.repeat, Repeat::Daily);
        assert!(form.suggestions.is_empty());
    }

    #[tokio::test]
    async fn another_users_form_is_not_carried_over() {
        let db = seeded().await;
        let anns = EventForm::load(&db, "ann@x.io").await;

        let mut form = EventForm::load(&db, "bob@x.io").await;
        form.carry_over(anns);
        assert_eq!(emails(&form.invited), vec!["bob@x.io"]);
        assert!(form.contacts.is_empty());
    }

    #[test]
    fn zero_instance_cap_is_rejected() {
        let form = EventForm::default();
        let mut daily = fields();
        daily.repeat = Repeat::Daily;
        daily.every = Some("1".into());
        daily.repeat_until = Some("2026-10-25".into());
        assert!(matches!(form.assemble("ann@x.io", daily, 0), Err(DataError::Invalid(_))));
    }

    #[test]
    fn offline_address_becomes_location() {
        let form = EventForm::default();
        let mut offline = fields();
        offline.location_type = LocationType::Offline;
        offline.location = String::new();
        offline.country = "Bulgaria".into();
        offline.city = "Sofia".into();

        let events = form.assemble("ann@x.io", offline, 10).unwrap();
        assert_eq!(events[0].location, "Sofia, Bulgaria");
    }

    #[tokio::test]
    async fn form_state_survives_serialization_without_pending_write() {
        let db = seeded().await;
        let mut form = EventForm::load(&db, "ann@x.io").await;
        form.set_repeat(Repeat::Monthly);
        form.on_invite_input("dan");
        form.submit("ann@x.io", fields(), 10).unwrap();

        let restored: EventForm = serde_json::from_value(serde_json::to_value(&form).unwrap()).unwrap();
        assert_eq!(restored.repeat, Repeat::Monthly);
        assert_eq!(emails(&restored.suggestions), vec!["dan@y.io"]);
        assert!(!restored.is_pending());
    }
}
