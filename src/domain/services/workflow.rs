//! Review and publication workflow.
//!
//! ```text
//! DRAFT --submit--> PENDING_REVIEW --approve--> APPROVED --publish--> PUBLISHED
//!                   PENDING_REVIEW --reject---> DRAFT
//! any but CANCELLED --cancel--> CANCELLED
//! ```
//!
//! Every transition checks the acting user first (403) and the current state
//! second (409), then mutates the event in place. Persisting is up to the caller.

use chrono::Utc;
use crate::domain::models::{event::{Event, EventStatus}, user::User};
use crate::error::AppError;

pub fn is_creator(event: &Event, user: &User) -> bool {
    event.created_by == user.id
}

pub fn is_reviewer(event: &Event, user: &User) -> bool {
    event.reviewer_id.as_deref() == Some(user.id.as_str())
}

pub fn ensure_can_create(user: &User) -> Result<(), AppError> {
    if !user.can_create_events() {
        return Err(AppError::Forbidden("Only lecturers and staff can create events".into()));
    }
    Ok(())
}

pub fn ensure_can_edit(event: &Event, user: &User) -> Result<(), AppError> {
    if !(is_creator(event, user) || user.is_staff()) {
        return Err(AppError::Forbidden("Only the creator or staff can edit this event".into()));
    }
    match event.status {
        EventStatus::Draft => Ok(()),
        EventStatus::Cancelled => Err(AppError::Conflict("Cancelled events cannot be edited".into())),
        EventStatus::Approved | EventStatus::Published if user.is_staff() => Ok(()),
        _ => Err(AppError::Conflict(format!("Event cannot be edited while {}", event.status.as_str()))),
    }
}

pub fn ensure_can_delete(event: &Event, user: &User) -> Result<(), AppError> {
    if !(is_creator(event, user) || user.is_staff()) {
        return Err(AppError::Forbidden("Only the creator or staff can delete this event".into()));
    }
    if event.status != EventStatus::Draft {
        return Err(AppError::Conflict("Only draft events can be deleted; cancel it instead".into()));
    }
    Ok(())
}

pub fn submit(event: &mut Event, actor: &User, reviewer: &User) -> Result<(), AppError> {
    if !(is_creator(event, actor) || actor.is_staff()) {
        return Err(AppError::Forbidden("Only the creator or staff can submit this event".into()));
    }
    if !reviewer.is_staff() || !reviewer.is_active {
        return Err(AppError::Validation("Reviewer must be an active staff member".into()));
    }
    if reviewer.id == event.created_by {
        return Err(AppError::Validation("The creator cannot review their own event".into()));
    }
    expect_status(event, EventStatus::Draft, "submitted for review")?;

    let now = Utc::now();
    event.status = EventStatus::PendingReview;
    event.reviewer_id = Some(reviewer.id.clone());
    event.review_comment = None;
    event.submitted_at = Some(now);
    event.updated_at = now;
    Ok(())
}

pub fn approve(event: &mut Event, actor: &User, comment: Option<String>) -> Result<(), AppError> {
    ensure_reviewer(event, actor)?;
    expect_status(event, EventStatus::PendingReview, "approved")?;

    let now = Utc::now();
    event.status = EventStatus::Approved;
    event.review_comment = comment;
    event.reviewed_at = Some(now);
    event.updated_at = now;
    Ok(())
}

pub fn reject(event: &mut Event, actor: &User, comment: String) -> Result<(), AppError> {
    ensure_reviewer(event, actor)?;
    expect_status(event, EventStatus::PendingReview, "rejected")?;
    if comment.trim().is_empty() {
        return Err(AppError::Validation("A rejection needs a comment for the creator".into()));
    }

    let now = Utc::now();
    event.status = EventStatus::Draft;
    event.review_comment = Some(comment);
    event.reviewed_at = Some(now);
    event.updated_at = now;
    Ok(())
}

pub fn publish(event: &mut Event, actor: &User) -> Result<(), AppError> {
    if !(is_creator(event, actor) || (actor.is_staff() && is_reviewer(event, actor))) {
        return Err(AppError::Forbidden("Only the creator or the assigned reviewer can publish".into()));
    }
    expect_status(event, EventStatus::Approved, "published")?;

    let now = Utc::now();
    event.status = EventStatus::Published;
    event.published_at = Some(now);
    event.updated_at = now;
    Ok(())
}

pub fn cancel(event: &mut Event, actor: &User) -> Result<(), AppError> {
    if !(is_creator(event, actor) || actor.is_staff()) {
        return Err(AppError::Forbidden("Only the creator or staff can cancel this event".into()));
    }
    if event.status == EventStatus::Cancelled {
        return Err(AppError::Conflict("Event is already cancelled".into()));
    }

    event.status = EventStatus::Cancelled;
    event.updated_at = Utc::now();
    Ok(())
}

fn ensure_reviewer(event: &Event, actor: &User) -> Result<(), AppError> {
    if !actor.is_staff() || !is_reviewer(event, actor) {
        return Err(AppError::Forbidden("Only the assigned reviewer can review this event".into()));
    }
    Ok(())
}

fn expect_status(event: &Event, expected: EventStatus, verb: &str) -> Result<(), AppError> {
    if event.status != expected {
        return Err(AppError::Conflict(format!(
            "Event in status {} cannot be {}",
            event.status.as_str(),
            verb
        )));
    }
    Ok(())
}
