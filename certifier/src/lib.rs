//! Participation certificates for community events.
//!
//! Two batch jobs share this crate. [`services::merge::generate_certificates`]
//! reads the participants sheet and renders one PDF per distinct name;
//! [`services::mail::send_certificates`] reads the same sheet and emails each
//! participant the certificate the first job produced. The only thing the two
//! share at run time is the output directory, and the file names in it come
//! from [`common::model::filename::FilenamePlan`].

pub mod config;
pub mod error;
pub mod services;

pub use config::Settings;
pub use error::BatchError;
