use crate::error::RemraError;
use crate::shared::usecase::UseCase;
use remra_domain::{UserStatistics, ID};
use remra_infra::RemraContext;

/// Point read of a user's counters. Users that never produced an event get
/// the zero-valued statistics back rather than an error.
#[derive(Debug)]
pub struct GetUserStatisticsUseCase {
    pub user_id: ID,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    StorageError,
}

impl From<UseCaseError> for RemraError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait]
impl UseCase for GetUserStatisticsUseCase {
    type Response = UserStatistics;

    type Error = UseCaseError;

    const NAME: &'static str = "GetUserStatistics";

    async fn execute(&mut self, ctx: &RemraContext) -> Result<Self::Response, Self::Error> {
        let stats = ctx
            .repos
            .analytics
            .find_by_user(&self.user_id)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        Ok(stats
            .unwrap_or_else(|| UserStatistics::zeroed(self.user_id.clone(), ctx.sys.now())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_user_gets_zeroed_statistics() {
        let ctx = RemraContext::create_inmemory();
        let user_id = ID::new();

        let stats = GetUserStatisticsUseCase {
            user_id: user_id.clone(),
        }
        .execute(&ctx)
        .await
        .unwrap();

        assert_eq!(stats.user_id, user_id);
        assert_eq!(stats.total_created, 0);
        assert_eq!(stats.active, 0);
        assert_eq!(stats.completion_rate, 0.0);
    }
}
