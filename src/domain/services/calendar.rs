use crate::domain::models::event::Event;
use crate::error::AppError;
use icalendar::{Calendar, Component, Event as IcalEvent, EventLike};
use reqwest::Url;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CalendarLinks {
    pub google: String,
    pub outlook: String,
    pub ics: String,
}

/// Generates an iCalendar (.ics) document for an event.
pub fn generate_ics(event: &Event) -> String {
    let mut calendar = Calendar::new();
    calendar.name(&event.title);

    let mut ical_event = IcalEvent::new();
    ical_event
        .summary(&event.title)
        .description(&describe(event))
        .location(&event.location)
        .starts(event.start_time)
        .ends(event.end_time)
        .uid(&format!("{}@eventhub", event.id));
    if let Some(url) = &event.meeting_url {
        ical_event.add_property("URL", url);
    }

    calendar.push(ical_event.done());
    calendar.to_string()
}

/// "Add to calendar" links. `api_base` is the public origin serving the ICS export.
pub fn calendar_links(event: &Event, api_base: &str) -> Result<CalendarLinks, AppError> {
    let details = describe(event);

    let google_dates = format!(
        "{}/{}",
        event.start_time.format("%Y%m%dT%H%M%SZ"),
        event.end_time.format("%Y%m%dT%H%M%SZ")
    );
    let google = Url::parse_with_params(
        "https://calendar.google.com/calendar/render",
        &[
            ("action", "TEMPLATE"),
            ("text", event.title.as_str()),
            ("dates", google_dates.as_str()),
            ("details", details.as_str()),
            ("location", event.location.as_str()),
        ],
    )
    .map_err(|e| AppError::InternalWithMsg(format!("Invalid calendar link: {}", e)))?;

    let start = event.start_time.format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let end = event.end_time.format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let outlook = Url::parse_with_params(
        "https://outlook.live.com/calendar/0/deeplink/compose",
        &[
            ("path", "/calendar/action/compose"),
            ("rru", "addevent"),
            ("subject", event.title.as_str()),
            ("startdt", start.as_str()),
            ("enddt", end.as_str()),
            ("body", details.as_str()),
            ("location", event.location.as_str()),
        ],
    )
    .map_err(|e| AppError::InternalWithMsg(format!("Invalid calendar link: {}", e)))?;

    Ok(CalendarLinks {
        google: google.to_string(),
        outlook: outlook.to_string(),
        ics: format!("{}/api/v1/events/{}/calendar.ics", api_base.trim_end_matches('/'), event.id),
    })
}

fn describe(event: &Event) -> String {
    match &event.meeting_url {
        Some(url) => format!("{}\n\nJoin online: {}", event.description, url),
        None => event.description.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::event::NewEventParams;
    use chrono::{TimeZone, Utc};

    fn sample() -> Event {
        Event::new(NewEventParams {
            title: "Quantum Seminar".into(),
            description: "Entanglement & friends".into(),
            category_id: None,
            location: "Room 101".into(),
            meeting_url: Some("https://meet.example.org/q".into()),
            timezone: "Europe/Berlin".into(),
            start_time: Utc.with_ymd_and_hms(2030, 5, 1, 14, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2030, 5, 1, 16, 0, 0).unwrap(),
            capacity: 30,
            image_url: None,
            created_by: "u1".into(),
        })
    }

    #[test]
    fn ics_contains_event_fields() {
        let event = sample();
        let ics = generate_ics(&event);
        assert!(ics.contains("BEGIN:VCALENDAR"));
        assert!(ics.contains("SUMMARY:Quantum Seminar"));
        assert!(ics.contains("LOCATION:Room 101"));
        assert!(ics.contains("20300501T140000Z"));
        assert!(ics.contains(&format!("UID:{}@eventhub", event.id)));
    }

    #[test]
    fn links_are_url_encoded() {
        let event = sample();
        let links = calendar_links(&event, "https://api.example.org/").unwrap();

        assert!(links.google.starts_with("https://calendar.google.com/calendar/render?action=TEMPLATE"));
        assert!(links.google.contains("dates=20300501T140000Z%2F20300501T160000Z"));
        assert!(links.google.contains("text=Quantum+Seminar"));
        assert!(links.outlook.contains("startdt=2030-05-01T14%3A00%3A00Z"));
        assert_eq!(links.ics, format!("https://api.example.org/api/v1/events/{}/calendar.ics", event.id));
    }
}
