// Business domains
pub mod jobs;
pub mod pipeline;
