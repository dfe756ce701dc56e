//! Which emails a registration change triggers.

use chrono::{DateTime, Duration, Utc};
use crate::domain::models::{
    event::Event,
    job::{self, Job},
    registration::{Registration, RegistrationStatus},
};

pub const REMINDER_LEAD_HOURS: i64 = 24;

/// Jobs for a registration that was just created.
pub fn registration_jobs(registration: &Registration, event: &Event, now: DateTime<Utc>) -> Vec<Job> {
    match registration.status {
        RegistrationStatus::Waitlisted => vec![Job::for_registration(
            job::WAITLISTED,
            &registration.user_id,
            &event.id,
            &registration.id,
            now,
        )],
        _ => seated_jobs(job::REGISTRATION_CONFIRMED, registration, event, now),
    }
}

/// Jobs for a waitlisted registration that just got a seat.
pub fn promotion_jobs(registration: &Registration, event: &Event, now: DateTime<Utc>) -> Vec<Job> {
    seated_jobs(job::WAITLIST_PROMOTED, registration, event, now)
}

fn seated_jobs(job_type: &str, registration: &Registration, event: &Event, now: DateTime<Utc>) -> Vec<Job> {
    let mut jobs = vec![Job::for_registration(job_type, &registration.user_id, &event.id, &registration.id, now)];
    jobs.extend(reminder_job(registration, event, now));
    jobs
}

/// The reminder due `REMINDER_LEAD_HOURS` before the start, unless that moment has passed.
pub fn reminder_job(registration: &Registration, event: &Event, now: DateTime<Utc>) -> Option<Job> {
    let remind_at = event.start_time - Duration::hours(REMINDER_LEAD_HOURS);
    (remind_at > now).then(|| Job::for_registration(
        job::EVENT_REMINDER,
        &registration.user_id,
        &event.id,
        &registration.id,
        remind_at,
    ))
}
