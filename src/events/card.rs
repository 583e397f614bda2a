//! HTML rendering of the event pages.

use chrono::NaiveDate;

use crate::{
    db::Event,
    include_res,
    recurrence::Repeat,
    res::{escape_html, fill, markdown_to_html},
};

use super::{
    address::Address,
    board::EventBoard,
    form::{Contact, EventForm},
};

// others named on a card before the "more" line
const NAMED_GOING: usize = 2;
const MAX_EVERY: u32 = 30;

fn going(event: &Event, email: &str) -> String {
    let mut html: String = event
        .invited_users
        .iter()
        .filter(|invited| invited.as_str() != email)
        .take(NAMED_GOING)
        .map(|invited| format!("<p>{} is going</p>", escape_html(invited)))
        .collect();
    if event.invited_count() > NAMED_GOING {
        html += &format!("<p>and {} more..</p>", event.invited_count() - NAMED_GOING);
    }
    html
}

fn action(id: &str, event: &Event, email: &str) -> String {
    if event.has_joined(email) {
        return r#"<button class="btn joined" disabled>Joined</button>"#.to_owned();
    }
    fill(
        include_res!(str, "/pages/events/join.html"),
        &[
            ("id", escape_html(id).as_str()),
            ("series_id", escape_html(event.series_id.as_deref().unwrap_or_default()).as_str()),
        ],
    )
}

pub fn render_card(id: &str, event: &Event, email: &str) -> String {
    fill(
        include_res!(str, "/pages/events/card.html"),
        &[
            ("start", format!("{} {}", event.start_date, escape_html(&event.start_time)).as_str()),
            ("end", format!("{} {}", event.end_date, escape_html(&event.end_time)).as_str()),
            ("going", going(event, email).as_str()),
            ("action", action(id, event, email).as_str()),
            ("location", escape_html(&event.location).as_str()),
            ("title", escape_html(&event.title).as_str()),
            ("description", markdown_to_html(&event.description).as_str()),
        ],
    )
}

fn render_cards<'a>(events: impl IntoIterator<Item = &'a (String, Event)>, email: &str) -> String {
    let cards: String = events.into_iter().map(|(id, event)| render_card(id, event, email)).collect();
    if cards.is_empty() {
        return r#"<p id="no-events-text">No events</p>"#.to_owned();
    }
    cards
}

fn page(heading: &str, error: Option<&str>, cards: String) -> String {
    fill(
        include_res!(str, "/pages/events/board.html"),
        &[
            ("heading", heading),
            ("cards", cards.as_str()),
            ("error", escape_html(error.unwrap_or_default()).as_str()),
        ],
    )
}

pub fn render_board(board: &EventBoard, today: NaiveDate, email: &str) -> String {
    page(
        board.filter.heading(),
        board.error.as_deref(),
        render_cards(board.visible(today, email), email),
    )
}

pub fn render_mine(events: &[(String, Event)], error: Option<&str>, email: &str) -> String {
    page("My events", error, render_cards(events, email))
}

fn contact_item(contact: &Contact, action: &str) -> String {
    fill(
        include_res!(str, "/pages/events/contact.html"),
        &[
            ("action", action),
            ("photo", escape_html(&contact.photo).as_str()),
            ("email", escape_html(&contact.email).as_str()),
        ],
    )
}

fn suggestion(contact: &Contact) -> String {
    let pick = format!(
        r#"<form method="post" action="/e/new/invite"><input type="hidden" name="email" value="{}"><button class="btn">Invite</button></form>"#,
        escape_html(&contact.email)
    );
    contact_item(contact, &pick)
}

fn repeat_buttons(current: Repeat) -> String {
    Repeat::ALL
        .iter()
        .map(|kind| {
            let pressed = if *kind == current { " aria-pressed=\"true\"" } else { "" };
            format!(
                r#"<form method="post" action="/e/new/repeat"><input type="hidden" name="repeat" value="{kind}"><button class="btn"{pressed}>{kind}</button></form>"#
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn every(repeat: Repeat) -> String {
    if !repeat.is_recurring() {
        return String::new();
    }
    let options: String = (1..=MAX_EVERY)
        .map(|n| format!(r#"<option value="{n}">{n}</option>"#))
        .collect();
    format!(
        r#"<label>Every <select name="every">{options}</select> {unit}</label>
        <label>Until <input type="date" name="repeatUntil" required></label>"#,
        unit = repeat.unit(),
    )
}

fn address_fields() -> String {
    Address::hints()
        .iter()
        .map(|(field, hint)| {
            format!(r#"<label><input type="text" name="{field}" placeholder="{field}"> <small>{hint}</small></label>"#)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_form(form: &EventForm) -> String {
    let suggestions: String = form.suggestions.iter().map(suggestion).collect();
    let invited: String = form.invited.iter().map(|contact| contact_item(contact, "")).collect();

    fill(
        include_res!(str, "/pages/events/new.html"),
        &[
            ("repeat_buttons", repeat_buttons(form.repeat).as_str()),
            ("repeat", form.repeat.as_str()),
            ("every", every(form.repeat).as_str()),
            ("address", address_fields().as_str()),
            ("suggestions", suggestions.as_str()),
            ("invited", invited.as_str()),
            ("error", escape_html(form.error.as_deref().unwrap_or_default()).as_str()),
            ("input", escape_html(&form.input).as_str()),
        ],
    )
}
