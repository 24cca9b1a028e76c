use std::sync::Arc;

use serde::Serialize;

use crate::domain::repository::{MediaSearchRepository, SearchCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// 検索は可能だが、すべてのリクエストがストアに到達する。
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub elasticsearch: bool,
    pub cache: bool,
}

impl HealthReport {
    pub fn from_checks(elasticsearch: bool, cache: bool) -> Self {
        let status = match (elasticsearch, cache) {
            (true, true) => HealthStatus::Healthy,
            (true, false) => HealthStatus::Degraded,
            (false, _) => HealthStatus::Unhealthy,
        };
        Self {
            status,
            elasticsearch,
            cache,
        }
    }
}

/// CheckHealthUseCase はストアとキャッシュへの疎通を並行して確認する。
pub struct CheckHealthUseCase {
    repo: Arc<dyn MediaSearchRepository>,
    cache: Arc<dyn SearchCache>,
}

impl CheckHealthUseCase {
    pub fn new(repo: Arc<dyn MediaSearchRepository>, cache: Arc<dyn SearchCache>) -> Self {
        Self { repo, cache }
    }

    pub async fn execute(&self) -> HealthReport {
        let (elasticsearch, cache) = tokio::join!(self.repo.ping(), self.cache.ping());
        HealthReport::from_checks(elasticsearch, cache)
    }
}
