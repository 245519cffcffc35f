//! In-memory insight repository for dev/test.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use conveyor_core::{InsightId, JobId, StoreError};

use crate::insight::Insight;
use crate::ports::InsightRepository;

#[derive(Debug, Default)]
pub struct InMemoryInsightRepository {
    insights: RwLock<HashMap<InsightId, Insight>>,
}

impl InMemoryInsightRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl InsightRepository for InMemoryInsightRepository {
    async fn create(&self, insight: &Insight) -> Result<(), StoreError> {
        let mut insights = self.insights.write().unwrap();
        if insights.contains_key(&insight.id) {
            return Err(StoreError::Duplicate(insight.id.to_string()));
        }
        insights.insert(insight.id, insight.clone());
        Ok(())
    }

    async fn get(&self, id: InsightId) -> Result<Option<Insight>, StoreError> {
        Ok(self.insights.read().unwrap().get(&id).cloned())
    }

    async fn get_by_job_id(&self, job_id: JobId) -> Result<Option<Insight>, StoreError> {
        let insights = self.insights.read().unwrap();
        let mut matching: Vec<_> = insights
            .values()
            .filter(|i| i.job_id == job_id)
            .cloned()
            .collect();
        // Oldest wins, mirroring the store query's created_at ordering.
        matching.sort_by_key(|i| i.created_at);
        Ok(matching.into_iter().next())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Insight>, StoreError> {
        let insights = self.insights.read().unwrap();
        let mut result: Vec<_> = insights.values().cloned().collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn delete(&self, id: InsightId) -> Result<bool, StoreError> {
        Ok(self.insights.write().unwrap().remove(&id).is_some())
    }
}
