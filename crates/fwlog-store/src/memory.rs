//! In-memory log store (process lifetime only).

use async_trait::async_trait;
use fwlog_types::{LogPage, LogQuery, LogRecord, LogStore, StoreError, StoredLog};
use tokio::sync::RwLock;

struct Inner {
    rows: Vec<StoredLog>,
    next_id: i64,
}

/// Vec-backed store; ids start at 1.
pub struct InMemoryLogStore {
    inner: RwLock<Inner>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                rows: Vec::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for InMemoryLogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    async fn insert_batch(&self, records: &[LogRecord]) -> Result<Vec<i64>, StoreError> {
        let mut guard = self.inner.write().await;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let id = guard.next_id;
            guard.next_id += 1;
            guard.rows.push(StoredLog {
                id,
                record: record.clone(),
            });
            ids.push(id);
        }
        Ok(ids)
    }

    async fn get(&self, id: i64) -> Result<Option<StoredLog>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.rows.iter().find(|r| r.id == id).cloned())
    }

    async fn query(&self, query: &LogQuery) -> Result<LogPage<StoredLog>, StoreError> {
        let guard = self.inner.read().await;
        let mut matched: Vec<&StoredLog> = guard
            .rows
            .iter()
            .filter(|r| query.matches(&r.record))
            .collect();
        matched.sort_by(|a, b| {
            b.record
                .timestamp
                .cmp(&a.record.timestamp)
                .then_with(|| b.id.cmp(&a.id))
        });
        let total = matched.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let items: Vec<StoredLog> = matched
            .into_iter()
            .skip(offset)
            .take(query.page_size as usize)
            .cloned()
            .collect();
        Ok(LogPage::new(query, total, items))
    }
}
