use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct EventMaterial {
    pub id: String,
    pub event_id: String,
    pub file_name: String,
    #[serde(skip_serializing)]
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
}

impl EventMaterial {
    pub fn new(event_id: String, file_name: String, content_type: String, size_bytes: i64, uploaded_by: String) -> Self {
        let id = Uuid::new_v4().to_string();
        let storage_key = format!("events/{}/{}-{}", event_id, id, sanitize_file_name(&file_name));
        Self {
            id,
            event_id,
            file_name,
            storage_key,
            content_type,
            size_bytes,
            uploaded_by,
            created_at: Utc::now(),
        }
    }
}

/// Keeps storage keys to `[A-Za-z0-9._-]` so user-supplied names never escape the storage root.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.chars().take(120).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories_and_odd_characters() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\slides\\Week 1 (final).pdf"), "Week_1__final_.pdf");
        assert_eq!(sanitize_file_name("..."), "file");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
    }

    #[test]
    fn storage_key_is_scoped_to_event() {
        let m = EventMaterial::new("ev1".into(), "notes.pdf".into(), "application/pdf".into(), 10, "u1".into());
        assert!(m.storage_key.starts_with("events/ev1/"));
        assert!(m.storage_key.ends_with("-notes.pdf"));
    }
}
