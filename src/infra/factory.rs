use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::{info, warn};
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::error::AppError;
use crate::state::AppState;
use crate::domain::models::user::{normalize_email, Role, User};
use crate::domain::ports::{EmailService, FileStorage};
use crate::domain::services::{auth_service::{hash_password, AuthService}, lounge::LoungeHub};
use crate::infra::email::http_email_service::HttpEmailService;
use crate::infra::storage::local_file_storage::LocalFileStorage;
use crate::infra::repositories::{
    postgres_auth_repo::PostgresAuthRepo, postgres_category_repo::PostgresCategoryRepo,
    postgres_communication_repo::PostgresCommunicationRepo, postgres_event_repo::PostgresEventRepo,
    postgres_job_repo::PostgresJobRepo, postgres_material_repo::PostgresMaterialRepo,
    postgres_registration_repo::PostgresRegistrationRepo, postgres_user_repo::PostgresUserRepo,
    sqlite_auth_repo::SqliteAuthRepo, sqlite_category_repo::SqliteCategoryRepo,
    sqlite_communication_repo::SqliteCommunicationRepo, sqlite_event_repo::SqliteEventRepo,
    sqlite_job_repo::SqliteJobRepo, sqlite_material_repo::SqliteMaterialRepo,
    sqlite_registration_repo::SqliteRegistrationRepo, sqlite_user_repo::SqliteUserRepo,
};

pub async fn bootstrap_state(config: &Config) -> Result<AppState, AppError> {
    let database_url = &config.database_url;
    let email_service = Arc::new(HttpEmailService::new(
        config.mail_service_url.clone(),
        config.mail_service_token.clone(),
    ));
    let file_storage = Arc::new(LocalFileStorage::new(
        &config.storage_dir,
        &format!("{}/files", config.public_url.trim_end_matches('/')),
    ));

    let state = if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");

        let opts: PgConnectOptions = database_url.parse().map_err(AppError::Database)?;
        let opts = opts.log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await?;

        run_postgres_migrations(&pool).await?;
        postgres_state(pool, config.clone(), email_service, file_storage)?
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;

        run_sqlite_migrations(&pool).await?;
        sqlite_state(pool, config.clone(), email_service, file_storage)?
    };

    ensure_bootstrap_staff(&state).await?;
    Ok(state)
}

pub fn sqlite_state(
    pool: SqlitePool,
    config: Config,
    email_service: Arc<dyn EmailService>,
    file_storage: Arc<dyn FileStorage>,
) -> Result<AppState, AppError> {
    let auth_repo = Arc::new(SqliteAuthRepo::new(pool.clone()));
    let auth_service = Arc::new(AuthService::new(auth_repo.clone(), config.clone())?);

    Ok(AppState {
        config,
        user_repo: Arc::new(SqliteUserRepo::new(pool.clone())),
        auth_repo,
        category_repo: Arc::new(SqliteCategoryRepo::new(pool.clone())),
        event_repo: Arc::new(SqliteEventRepo::new(pool.clone())),
        registration_repo: Arc::new(SqliteRegistrationRepo::new(pool.clone())),
        material_repo: Arc::new(SqliteMaterialRepo::new(pool.clone())),
        job_repo: Arc::new(SqliteJobRepo::new(pool.clone())),
        communication_repo: Arc::new(SqliteCommunicationRepo::new(pool)),
        auth_service,
        email_service,
        file_storage,
        lounge: Arc::new(LoungeHub::new()),
    })
}

pub fn postgres_state(
    pool: PgPool,
    config: Config,
    email_service: Arc<dyn EmailService>,
    file_storage: Arc<dyn FileStorage>,
) -> Result<AppState, AppError> {
    let auth_repo = Arc::new(PostgresAuthRepo::new(pool.clone()));
    let auth_service = Arc::new(AuthService::new(auth_repo.clone(), config.clone())?);

    Ok(AppState {
        config,
        user_repo: Arc::new(PostgresUserRepo::new(pool.clone())),
        auth_repo,
        category_repo: Arc::new(PostgresCategoryRepo::new(pool.clone())),
        event_repo: Arc::new(PostgresEventRepo::new(pool.clone())),
        registration_repo: Arc::new(PostgresRegistrationRepo::new(pool.clone())),
        material_repo: Arc::new(PostgresMaterialRepo::new(pool.clone())),
        job_repo: Arc::new(PostgresJobRepo::new(pool.clone())),
        communication_repo: Arc::new(PostgresCommunicationRepo::new(pool)),
        auth_service,
        email_service,
        file_storage,
        lounge: Arc::new(LoungeHub::new()),
    })
}

/// Creates (or promotes) the configured initial STAFF account so a fresh
/// installation has someone who can review events and manage roles.
pub async fn ensure_bootstrap_staff(state: &AppState) -> Result<(), AppError> {
    let (Some(email), Some(password)) = (&state.config.bootstrap_staff_email, &state.config.bootstrap_staff_password) else {
        return Ok(());
    };
    let email = normalize_email(email);

    match state.user_repo.find_by_email(&email).await? {
        Some(mut user) => {
            if user.role != Role::Staff || !user.is_active || !user.email_verified {
                warn!("Promoting existing account {} to bootstrap STAFF", user.id);
                user.role = Role::Staff;
                user.is_active = true;
                user.email_verified = true;
                user.updated_at = chrono::Utc::now();
                state.user_repo.update(&user).await?;
            }
        }
        None => {
            let mut user = User::new(email.clone(), "Administrator".to_string(), hash_password(password)?);
            user.role = Role::Staff;
            user.email_verified = true;
            state.user_repo.create(&user).await?;
            info!("Bootstrap STAFF account created: {}", email);
        }
    }
    Ok(())
}

async fn run_postgres_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .map_err(|e| AppError::InternalWithMsg(format!("Failed to run Postgres migrations: {}", e)))
}

async fn run_sqlite_migrations(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .map_err(|e| AppError::InternalWithMsg(format!("Failed to run SQLite migrations: {}", e)))
}
