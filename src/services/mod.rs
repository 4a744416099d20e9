// Webtrail services
// Services provide core functionality: blocklist filtering, classification,
// analytics aggregation, domain parsing, and configuration.

pub mod analytics;
pub mod blocklist;
pub mod classifier;
pub mod config;
pub mod domains;
