//! Count, enumerate, then mutate every alert matching a query.
//!
//! The count and the list are two separate round trips against a collection other clients
//! keep changing, so the number of listed records may differ from the count. Progress is
//! always reported against the count and exactly the listed records are processed.

use tracing::{debug, info};

use crate::{client::ApiClient, query::Query, transport::Transport, ClientError};

/// Mutation applied to each matching alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkAction {
    Tag(Vec<String>),
    Untag(Vec<String>),
    Ack,
    Unack,
    Close,
    Delete,
}

impl BulkAction {
    /// Present participle shown while the action runs, e.g. "Closing".
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Tag(_) => "Tagging",
            Self::Untag(_) => "Un-tagging",
            Self::Ack => "Acking",
            Self::Unack => "un-Acking",
            Self::Close => "Closing",
            Self::Delete => "Deleting",
        }
    }

    async fn apply<T: Transport>(
        &self,
        client: &ApiClient<T>,
        id: &str,
    ) -> Result<(), ClientError> {
        match self {
            Self::Tag(tags) => client.tag_alert(id, tags).await,
            Self::Untag(tags) => client.untag_alert(id, tags).await,
            Self::Ack => client.ack_alert(id).await,
            Self::Unack => client.unack_alert(id).await,
            Self::Close => client.close_alert(id).await,
            Self::Delete => client.delete_alert(id).await,
        }
    }
}

/// Observer of a bulk run. `advanced` is called once per record, before it is processed.
pub trait BulkProgress {
    fn counted(&mut self, _total: u64) {}

    fn advanced(&mut self, index: u64, total: u64);

    /// Called only when every listed record was processed.
    fn finished(&mut self, _total: u64) {}
}

/// Progress sink that reports nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl BulkProgress for Silent {
    fn advanced(&mut self, _index: u64, _total: u64) {}
}

/// Whole percentage of `total` covered by `index` processed records.
pub fn percent(index: u64, total: u64) -> u64 {
    if total == 0 {
        return 100;
    }
    (index.saturating_mul(100) / total).min(100)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkReport {
    /// The count reported before enumeration started.
    pub total: u64,
    pub processed: u64,
}

impl<T: Transport> ApiClient<T> {
    /// Apply `action` to every alert matching `query`, stopping at the first failure.
    pub async fn bulk<P: BulkProgress>(
        &self,
        action: &BulkAction,
        query: &Query,
        progress: &mut P,
    ) -> Result<BulkReport, ClientError> {
        let total = self.get_count(query).await?;
        progress.counted(total);
        debug!("{} {total} alerts", action.verb());

        let mut processed = 0;
        if total > 0 {
            let list = self.get_alerts(query).await?;
            if list.alerts.len() as u64 != total {
                debug!("count reported {total} alerts but list returned {}", list.alerts.len());
            }
            for record in &list.alerts {
                progress.advanced(processed, total);
                action.apply(self, record.id()).await?;
                processed += 1;
            }
        }

        progress.finished(total);
        info!("{} done: {processed} of {total} alerts", action.verb());
        Ok(BulkReport { total, processed })
    }
}
