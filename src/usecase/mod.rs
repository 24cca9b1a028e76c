pub mod check_health;
pub mod search_media;

pub use check_health::{CheckHealthUseCase, HealthReport, HealthStatus};
pub use search_media::{SearchMediaError, SearchMediaUseCase};
