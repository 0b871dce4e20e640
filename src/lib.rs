//! Rol-Aju API Library
//!
//! Backend for the Rol-Aju tourism directory of Aracaju: the contact form
//! mail relay and the place search proxy in front of the geocoding providers
//! (Geoapify, Nominatim).
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `integrations`: External service integrations.
//! - `circuit_breaker`: Circuit breaker for geocoding provider calls.
//! - `config`: Configuration management.
//! - `contact`: Contact form validation and relay.
//! - `errors`: Error handling types.
//! - `geoapify_models`: Geoapify response models and normalization.
//! - `handlers`: HTTP request handlers and routes.
//! - `mail`: Outbound mail and the SMTP transport.
//! - `models`: Core data models.
//! - `nominatim_models`: Nominatim response models and normalization.
//! - `places`: Place search orchestration (fail-to-empty, map aggregate).
//! - `services`: Geocoding provider clients.

pub mod api;
pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and the binary
pub mod circuit_breaker;
pub mod config;
pub mod contact;
pub mod errors;
pub mod geoapify_models;
pub mod handlers;
pub mod mail;
pub mod models;
pub mod nominatim_models;
pub mod places;
pub mod services;
