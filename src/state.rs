use std::sync::Arc;
use crate::domain::ports::{
    AuthRepository, CategoryRepository, CommunicationRepository, EmailService, EventRepository,
    FileStorage, JobRepository, MaterialRepository, RegistrationRepository, UserRepository,
};
use crate::domain::services::{auth_service::AuthService, lounge::LoungeHub};
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub user_repo: Arc<dyn UserRepository>,
    pub auth_repo: Arc<dyn AuthRepository>,
    pub category_repo: Arc<dyn CategoryRepository>,
    pub event_repo: Arc<dyn EventRepository>,
    pub registration_repo: Arc<dyn RegistrationRepository>,
    pub material_repo: Arc<dyn MaterialRepository>,
    pub job_repo: Arc<dyn JobRepository>,
    pub communication_repo: Arc<dyn CommunicationRepository>,
    pub auth_service: Arc<AuthService>,
    pub email_service: Arc<dyn EmailService>,
    pub file_storage: Arc<dyn FileStorage>,
    pub lounge: Arc<LoungeHub>,
}
