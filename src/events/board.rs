//! Discovery list of public events and the join action.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::{
    appresult::{DataError, DataResult},
    db::Event,
    service::{Database, JoinOutcome},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    #[default]
    All,
    Top,
    Today,
    Joined,
}

impl EventFilter {
    pub const ALL: [EventFilter; 4] = [EventFilter::All, EventFilter::Top, EventFilter::Today, EventFilter::Joined];

    /// Unknown or missing keys select the unfiltered list.
    pub fn from_key(key: Option<&str>) -> EventFilter {
        match key {
            Some("top") => EventFilter::Top,
            Some("today") => EventFilter::Today,
            Some("joined") => EventFilter::Joined,
            _ => EventFilter::All,
        }
    }

    pub fn key(&self) -> &'static str {
        use EventFilter::*;
        match self {
            All => "",
            Top => "top",
            Today => "today",
            Joined => "joined",
        }
    }

    pub fn heading(&self) -> &'static str {
        use EventFilter::*;
        match self {
            All => "All events",
            Top => "Top events",
            Today => "Today events",
            Joined => "Joined events",
        }
    }
}

pub fn public_only(events: Vec<(String, Event)>) -> Vec<(String, Event)> {
    events.into_iter().filter(|(_, event)| event.is_public()).collect()
}

/// Keeps the first event seen for each series id. Events outside any series
/// are all kept.
pub fn dedup_by_series(events: Vec<(String, Event)>) -> Vec<(String, Event)> {
    let mut seen = HashSet::new();
    events
        .into_iter()
        .filter(|(_, event)| match &event.series_id {
            Some(series_id) => seen.insert(series_id.clone()),
            None => true,
        })
        .collect()
}

pub fn apply_filter<'a>(
    filter: EventFilter,
    events: &'a [(String, Event)],
    today: NaiveDate,
    email: &str,
) -> Vec<&'a (String, Event)> {
    let mut shown: Vec<_> = events.iter().collect();
    match filter {
        EventFilter::All => {}
        // sort_by is stable, ties keep fetch order
        EventFilter::Top => shown.sort_by(|(_, a), (_, b)| b.invited_count().cmp(&a.invited_count())),
        EventFilter::Today => shown.retain(|(_, event)| event.start_date == today),
        EventFilter::Joined => shown.retain(|(_, event)| event.has_joined(email)),
    }
    shown
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JoinReport {
    pub joined: usize,
    pub already_joined: usize,
}

impl JoinReport {
    fn record(&mut self, outcome: JoinOutcome) {
        match outcome {
            JoinOutcome::Joined => self.joined += 1,
            JoinOutcome::AlreadyJoined => self.already_joined += 1,
        }
    }
}

/// Adds `email` to one event, or to every event of `series_id` in fetch
/// order. Writes are independent: the first failure stops the sequence and
/// the writes before it stay.
pub async fn join_event(db: &Database, email: &str, event_id: &str, series_id: Option<&str>) -> DataResult<JoinReport> {
    let mut report = JoinReport::default();

    let Some(series_id) = series_id.filter(|id| !id.is_empty()) else {
        report.record(db.add_user_to_event(event_id, email).await?);
        return Ok(report);
    };

    let siblings: Vec<String> = db
        .get_all_events()
        .await?
        .into_iter()
        .filter(|(_, event)| event.series_id.as_deref() == Some(series_id))
        .map(|(id, _)| id)
        .collect();
    if siblings.is_empty() {
        return Err(DataError::NotFound(format!("series {series_id}")));
    }

    for id in &siblings {
        report.record(db.add_user_to_event(id, email).await?);
    }
    Ok(report)
}

/// State behind the discovery page.
#[derive(Debug, Default, Clone)]
pub struct EventBoard {
    events: Vec<(String, Event)>,
    pub filter: EventFilter,
    pub error: Option<String>,
}

impl EventBoard {
    pub async fn load(db: &Database, filter: EventFilter) -> EventBoard {
        let mut board = EventBoard { filter, ..Default::default() };
        board.refresh(db).await;
        board
    }

    /// Deduplicated public events in fetch order.
    pub fn events(&self) -> &[(String, Event)] {
        &self.events
    }

    pub fn visible(&self, today: NaiveDate, email: &str) -> Vec<&(String, Event)> {
        apply_filter(self.filter, &self.events, today, email)
    }

    pub async fn refresh(&mut self, db: &Database) {
        match db.get_all_events().await {
            Ok(events) => self.events = dedup_by_series(public_only(events)),
            Err(err) => self.error = Some(err.to_string()),
        }
    }

    /// Joins, then refetches and switches to the joined view whatever the
    /// join's result was.
    pub async fn join(&mut self, db: &Database, email: &str, event_id: &str, series_id: Option<&str>) -> DataResult<JoinReport> {
        let result = join_event(db, email, event_id, series_id).await;
        self.refresh(db).await;
        self.filter = EventFilter::Joined;
        if let Err(err) = &result {
            self.error = Some(err.to_string());
        }
        result
    }
}
