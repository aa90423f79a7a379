//! Pipeline actions - entry-point business logic called from HTTP routes.

pub mod submit_job;

pub use submit_job::{is_valid_email, submit_job, SubmitJobInput, ValidSubmission};
