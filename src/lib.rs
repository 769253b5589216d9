//! Back-office core for the agency website.
//!
//! Two pieces carry the decision logic the front-end relies on:
//!
//! - [`timing`] turns a calendar date into the day's opening hours and the
//!   half-hourly call slots a visitor can book from the contact form.
//! - [`session`] gates the admin area: it checks the configured credentials,
//!   issues a day-long session token, persists it through a pluggable store
//!   and answers whether a protected page may render.
//!
//! [`server`] exposes both over a small JSON API.

pub mod config;
pub mod contact;
pub mod database;
pub mod error;
pub mod server;
pub mod session;
pub mod timing;

pub const ISO_FORMAT_DATE: &str = "%Y-%m-%d";
