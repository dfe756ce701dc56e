pub mod auth_service;
pub mod calendar;
pub mod communication_service;
pub mod email_templates;
pub mod lounge;
pub mod notifications;
pub mod waitlist;
pub mod workflow;
