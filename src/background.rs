use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, info_span, Instrument};
use crate::state::AppState;
use crate::error::AppError;
use crate::domain::models::{
    communication::OutgoingMail,
    event::{Event, EventStatus},
    job::{self, Job},
    registration::{Registration, RegistrationStatus},
    user::User,
};
use crate::domain::services::calendar::generate_ics;
use crate::domain::services::communication_service::CommunicationService;
use crate::domain::services::email_templates::{render, template_for};
use crate::domain::services::notifications::REMINDER_LEAD_HOURS;
use chrono_tz::Tz;
use reqwest::Url;
use serde_json::{json, Map, Value};

const BATCH_SIZE: i32 = 10;
const POLL_INTERVAL: Duration = Duration::from_secs(5);

pub async fn start_background_worker(state: Arc<AppState>) {
    info!("Starting background job worker...");

    let comm_service = CommunicationService::new(state.communication_repo.clone());

    loop {
        if let Err(e) = process_pending_jobs(&state, &comm_service).await {
            error!("Failed to fetch pending jobs: {:?}", e);
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Claims one batch of due jobs and runs them. Returns how many were claimed.
pub async fn process_pending_jobs(state: &AppState, comm_service: &CommunicationService) -> Result<usize, AppError> {
    let jobs = state.job_repo.find_pending(BATCH_SIZE).await?;
    let claimed = jobs.len();

    for job in jobs {
        let span = info_span!(
            "background_job",
            job_id = %job.id,
            job_type = %job.job_type,
            user_id = %job.payload.user_id
        );

        async {
            info!("Processing job: {}", job.job_type);
            match process_job(state, comm_service, &job).await {
                Ok(_) => {
                    info!("Job completed successfully");
                    if let Err(e) = state.job_repo.update_status(&job.id, "COMPLETED", None).await {
                        error!("Failed to mark job as completed: {:?}", e);
                    }
                },
                Err(e) => {
                    let err_msg = format!("{}", e);
                    error!("Job failed with error: {}", err_msg);
                    if let Err(up_err) = state.job_repo.update_status(&job.id, "FAILED", Some(err_msg)).await {
                        error!("Failed to mark job as failed: {:?}", up_err);
                    }
                }
            }
        }
            .instrument(span)
            .await;
    }

    Ok(claimed)
}

async fn process_job(state: &AppState, comm_service: &CommunicationService, job: &Job) -> Result<(), AppError> {
    let Some((template_name, context_data, outgoing)) = build_mail(state, job).await? else {
        return Ok(());
    };

    if comm_service.skip_if_sent(&job.id, &outgoing.recipient, template_name, &context_data).await? {
        return Ok(());
    }

    info!("Sending {} email to {}", template_name, outgoing.recipient);
    state.email_service.send(
        &outgoing.recipient,
        &outgoing.subject,
        &outgoing.html_body,
        outgoing.attachment_name.as_deref(),
        outgoing.attachment_data.as_deref(),
    ).await?;
    comm_service.record_success(&job.id, &outgoing.recipient, template_name, &context_data).await
}

/// Renders the mail for a job, or `None` when the job no longer applies
/// (recipient gone, registration withdrawn, event cancelled).
async fn build_mail(state: &AppState, job: &Job) -> Result<Option<(&'static str, Value, OutgoingMail)>, AppError> {
    let template = template_for(&job.job_type)
        .ok_or_else(|| AppError::InternalWithMsg(format!("Unknown job type {}", job.job_type)))?;
    let payload = &job.payload;

    let Some(user) = state.user_repo.find_by_id(&payload.user_id).await?.filter(|u| u.is_active) else {
        info!("Recipient {} is gone or deactivated, skipping", payload.user_id);
        return Ok(None);
    };

    let event = match &payload.event_id {
        Some(id) => Some(
            state.event_repo.find_by_id(id).await?
                .ok_or(AppError::NotFound(format!("Event {} not found", id)))?,
        ),
        None => None,
    };

    let registration = match &payload.registration_id {
        Some(id) => match state.registration_repo.find_by_id(id).await? {
            Some(registration) => Some(registration),
            None => {
                info!("Registration {} was withdrawn, skipping", id);
                return Ok(None);
            }
        },
        None => None,
    };

    if !still_relevant(job, &user, event.as_ref(), registration.as_ref()) {
        info!("Job no longer applies, skipping");
        return Ok(None);
    }

    let context_data = build_context(state, job, &user, event.as_ref(), registration.as_ref())?;
    let (subject, html_body) = render(&template, &context_data)?;

    let (attachment_name, attachment_data) = match (&job.job_type[..], &event) {
        (job::REGISTRATION_CONFIRMED | job::WAITLIST_PROMOTED, Some(event)) => {
            (Some("event.ics".to_string()), Some(generate_ics(event).into_bytes()))
        }
        _ => (None, None),
    };

    let outgoing = OutgoingMail {
        recipient: user.email.clone(),
        subject,
        html_body,
        attachment_name,
        attachment_data,
    };
    Ok(Some((template.name, context_data, outgoing)))
}

fn still_relevant(job: &Job, user: &User, event: Option<&Event>, registration: Option<&Registration>) -> bool {
    match job.job_type.as_str() {
        job::VERIFY_EMAIL => !user.email_verified,
        job::EVENT_CANCELLED => true,
        job::EVENT_REMINDER => {
            event.is_some_and(|e| e.status == EventStatus::Published && reminder_is_current(job, e))
                && registration.is_some_and(|r| r.status.holds_seat())
        }
        job::REGISTRATION_CONFIRMED | job::WAITLIST_PROMOTED => {
            event.is_some_and(|e| e.status == EventStatus::Published)
                && registration.is_some_and(|r| r.status.holds_seat())
        }
        job::WAITLISTED => {
            event.is_some_and(|e| e.status == EventStatus::Published)
                && registration.is_some_and(|r| r.status == RegistrationStatus::Waitlisted)
        }
        _ => true,
    }
}

/// A reminder left over from before a start time change no longer lines up with the event.
fn reminder_is_current(job: &Job, event: &Event) -> bool {
    let expected = event.start_time - chrono::Duration::hours(REMINDER_LEAD_HOURS);
    (job.execute_at - expected).num_seconds().abs() < 60
}

fn build_context(state: &AppState, job: &Job, user: &User, event: Option<&Event>, registration: Option<&Registration>) -> Result<Value, AppError> {
    let frontend = state.config.frontend_url.trim_end_matches('/');

    let mut context = Map::new();
    context.insert("user_name".into(), json!(user.display_name()));
    context.insert("event_title".into(), json!(""));
    context.insert("event_start".into(), json!(""));
    context.insert("event_location".into(), json!(""));
    context.insert("meeting_url".into(), json!(""));
    context.insert("qr_code".into(), json!(""));
    context.insert("waitlist_position".into(), json!(0));
    context.insert("decision".into(), json!(""));
    context.insert("review_comment".into(), json!(""));
    context.insert("link".into(), json!(frontend));
    // Sends are told apart by when their job was scheduled; a retried job keeps its key.
    context.insert("scheduled_for".into(), json!(job.execute_at.to_rfc3339()));

    if let Some(event) = event {
        let tz: Tz = event.timezone.parse().unwrap_or(chrono_tz::UTC);
        let start = event.start_time.with_timezone(&tz);

        context.insert("event_title".into(), json!(event.title));
        context.insert("event_start".into(), json!(format!("{} ({})", start.format("%Y-%m-%d %H:%M"), event.timezone)));
        context.insert("event_location".into(), json!(event.location));
        context.insert("meeting_url".into(), json!(event.meeting_url.clone().unwrap_or_default()));
        context.insert("link".into(), json!(format!("{}/events/{}", frontend, event.id)));

        if job.job_type == job::REVIEW_DECISION {
            let decision = if event.status == EventStatus::Draft { "rejected" } else { "approved" };
            context.insert("decision".into(), json!(decision));
            context.insert("review_comment".into(), json!(event.review_comment.clone().unwrap_or_default()));
        }
    }

    if let Some(registration) = registration {
        context.insert("qr_code".into(), json!(registration.qr_code.clone().unwrap_or_default()));
        context.insert("waitlist_position".into(), json!(registration.waitlist_position.unwrap_or(0)));
    }

    if let Some(token) = &job.payload.token {
        let path = match job.job_type.as_str() {
            job::PASSWORD_RESET => "reset-password",
            _ => "verify-email",
        };
        let link = Url::parse_with_params(&format!("{}/{}", frontend, path), &[("token", token.as_str())])
            .map_err(|e| AppError::InternalWithMsg(format!("Invalid frontend URL: {}", e)))?;
        context.insert("link".into(), json!(link.to_string()));
    }

    Ok(Value::Object(context))
}
