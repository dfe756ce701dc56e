pub mod access;
pub mod auth;
pub mod calendar;
pub mod categories;
pub mod checkin;
pub mod events;
pub mod files;
pub mod health;
pub mod jobs;
pub mod lounge;
pub mod materials;
pub mod profile;
pub mod registrations;
pub mod review;
pub mod users;
