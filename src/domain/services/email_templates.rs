use crate::domain::models::job;
use crate::error::AppError;
use serde_json::Value;
use tera::{Context, Tera};

/// Built-in MJML template for a job type. Subject and body are tera templates.
#[derive(Debug, Clone, Copy)]
pub struct EmailTemplate {
    pub name: &'static str,
    pub subject: &'static str,
    pub body: &'static str,
}

pub fn template_for(job_type: &str) -> Option<EmailTemplate> {
    let (name, subject, body) = match job_type {
        job::REGISTRATION_CONFIRMED => (
            "registration_confirmed",
            "Registration confirmed: {{ event_title }}",
            include_str!("../../../templates/emails/registration_confirmed.mjml"),
        ),
        job::WAITLISTED => (
            "waitlisted",
            "Waitlist position {{ waitlist_position }}: {{ event_title }}",
            include_str!("../../../templates/emails/waitlisted.mjml"),
        ),
        job::WAITLIST_PROMOTED => (
            "waitlist_promoted",
            "You got a seat: {{ event_title }}",
            include_str!("../../../templates/emails/waitlist_promoted.mjml"),
        ),
        job::EVENT_REMINDER => (
            "event_reminder",
            "Reminder: {{ event_title }} starts soon",
            include_str!("../../../templates/emails/event_reminder.mjml"),
        ),
        job::EVENT_CANCELLED => (
            "event_cancelled",
            "Cancelled: {{ event_title }}",
            include_str!("../../../templates/emails/event_cancelled.mjml"),
        ),
        job::REVIEW_REQUESTED => (
            "review_requested",
            "Review requested: {{ event_title }}",
            include_str!("../../../templates/emails/review_requested.mjml"),
        ),
        job::REVIEW_DECISION => (
            "review_decision",
            "Your event was {{ decision }}: {{ event_title }}",
            include_str!("../../../templates/emails/review_decision.mjml"),
        ),
        job::VERIFY_EMAIL => (
            "verify_email",
            "Confirm your EventHub account",
            include_str!("../../../templates/emails/verify_email.mjml"),
        ),
        job::PASSWORD_RESET => (
            "password_reset",
            "Reset your EventHub password",
            include_str!("../../../templates/emails/password_reset.mjml"),
        ),
        _ => return None,
    };
    Some(EmailTemplate { name, subject, body })
}

/// Substitutes variables with tera, then compiles the MJML body to HTML.
pub fn render(template: &EmailTemplate, context_data: &Value) -> Result<(String, String), AppError> {
    let context = Context::from_value(context_data.clone())
        .map_err(|e| AppError::InternalWithMsg(format!("Invalid template context: {:?}", e)))?;

    let subject = Tera::one_off(template.subject, &context, false)
        .map_err(|e| AppError::InternalWithMsg(format!("Tera subject render error: {:?}", e)))?;
    let mjml = Tera::one_off(template.body, &context, true)
        .map_err(|e| AppError::InternalWithMsg(format!("Tera render error: {:?}", e)))?;

    Ok((subject, render_mjml(&mjml)?))
}

fn render_mjml(body: &str) -> Result<String, AppError> {
    let root = mrml::parse(body)
        .map_err(|e| AppError::InternalWithMsg(format!("MJML parse error: {:?}", e)))?;
    let opts = mrml::prelude::render::RenderOptions::default();
    root.element
        .render(&opts)
        .map_err(|e| AppError::InternalWithMsg(format!("MJML render error: {:?}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ALL: [&str; 9] = [
        job::REGISTRATION_CONFIRMED,
        job::WAITLISTED,
        job::WAITLIST_PROMOTED,
        job::EVENT_REMINDER,
        job::EVENT_CANCELLED,
        job::REVIEW_REQUESTED,
        job::REVIEW_DECISION,
        job::VERIFY_EMAIL,
        job::PASSWORD_RESET,
    ];

    fn context() -> Value {
        json!({
            "user_name": "Ada",
            "event_title": "Compilers 101",
            "event_start": "2030-05-01 16:00 (Europe/Berlin)",
            "event_location": "Room 4",
            "meeting_url": null,
            "qr_code": "EVH-abc",
            "waitlist_position": 3,
            "link": "https://eventhub.example.org/events/1",
            "decision": "approved",
            "review_comment": null,
        })
    }

    #[test]
    fn every_job_type_has_a_renderable_template() {
        for job_type in ALL {
            let template = template_for(job_type).unwrap_or_else(|| panic!("missing template for {}", job_type));
            let (subject, html) = render(&template, &context())
                .unwrap_or_else(|e| panic!("{} failed to render: {:?}", job_type, e));
            assert!(!subject.is_empty());
            assert!(html.contains("<html"), "{} did not compile to HTML", job_type);
            assert!(html.contains("Ada"), "{} lost the user name", job_type);
        }
    }

    #[test]
    fn subject_substitutes_variables() {
        let template = template_for(job::WAITLISTED).unwrap();
        let (subject, html) = render(&template, &context()).unwrap();
        assert_eq!(subject, "Waitlist position 3: Compilers 101");
        assert!(html.contains("number 3 on the waitlist"));
    }

    #[test]
    fn confirmation_carries_the_check_in_code() {
        let template = template_for(job::REGISTRATION_CONFIRMED).unwrap();
        let (_, html) = render(&template, &context()).unwrap();
        assert!(html.contains("EVH-abc"));
    }

    #[test]
    fn unknown_job_types_have_no_template() {
        assert!(template_for("SOMETHING_ELSE").is_none());
    }
}
