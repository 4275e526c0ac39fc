//! Prefetch scheduler.
//!
//! Warms caches for data the user is likely to ask for next. Single-target
//! prefetches run on detached tasks and go through the normal accessors, so a
//! fresh entry short-circuits them. `warm_all` walks the whole catalog
//! through the refresh entry points with a bounded worker pool.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::InventoryApi;
use crate::cache::{CacheTarget, InventoryCache};
use crate::error::InventoryError;
use crate::models::Subcategory;

/// Outcome of a bulk warm.
#[derive(Debug, Default)]
pub struct WarmReport {
    pub categories: usize,
    pub subcategories: usize,
    pub instruments: usize,
    pub failures: Vec<(CacheTarget, String)>,
}

impl WarmReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Prefetcher<A> {
    cache: InventoryCache<A>,
}

impl<A: InventoryApi> Prefetcher<A> {
    pub fn new(cache: InventoryCache<A>) -> Self {
        Self { cache }
    }

    /// Fire-and-forget read of `target`. Errors are logged and dropped.
    pub fn prefetch(&self, target: CacheTarget) -> JoinHandle<()> {
        let cache = self.cache.clone();
        tokio::spawn(async move {
            match cache.load(target).await {
                Ok(source) => debug!(%target, ?source, "Prefetched"),
                Err(e) => warn!(%target, error = %e, "Prefetch failed"),
            }
        })
    }

    /// A category was expanded: warm instruments for its first few subcategories.
    pub fn on_category_expanded(&self, subcategories: &[Subcategory]) -> Vec<JoinHandle<()>> {
        let count = self.cache.settings().adjacent_prefetch_count;
        self.prefetch_instruments(subcategories.iter().take(count))
    }

    /// The subcategory at `index` was hovered or opened: warm the next one.
    pub fn on_subcategory_focused(
        &self,
        subcategories: &[Subcategory],
        index: usize,
    ) -> Option<JoinHandle<()>> {
        subcategories
            .get(index + 1)
            .map(|next| self.prefetch(CacheTarget::Instruments(next.id)))
    }

    /// The user is on `page` of a paginated subcategory list: warm the first
    /// few subcategories of the next and previous pages.
    pub fn on_page_boundary(
        &self,
        subcategories: &[Subcategory],
        page: usize,
        page_size: usize,
    ) -> Vec<JoinHandle<()>> {
        if page_size == 0 {
            return Vec::new();
        }
        let count = self.cache.settings().adjacent_prefetch_count.min(page_size);
        let mut handles = Vec::new();

        let next_start = (page + 1) * page_size;
        handles.extend(self.prefetch_instruments(subcategories.iter().skip(next_start).take(count)));

        if page > 0 {
            let prev_start = (page - 1) * page_size;
            handles.extend(self.prefetch_instruments(subcategories.iter().skip(prev_start).take(count)));
        }
        handles
    }

    fn prefetch_instruments<'a>(
        &self,
        subcategories: impl Iterator<Item = &'a Subcategory>,
    ) -> Vec<JoinHandle<()>> {
        subcategories
            .map(|sub| self.prefetch(CacheTarget::Instruments(sub.id)))
            .collect()
    }

    /// Refresh every category, subcategory list and instrument list.
    ///
    /// Failures are collected in the report; they never stop the walk.
    pub async fn warm_all(&self) -> WarmReport {
        let concurrency = self.cache.settings().prefetch_concurrency.max(1);
        let mut report = WarmReport::default();
        info!(concurrency, "Warming inventory cache");

        let categories = match self.cache.refresh_categories().await {
            Ok(categories) => categories,
            Err(e) => {
                report.failures.push((CacheTarget::Categories, e.to_string()));
                return report;
            }
        };
        report.categories = categories.len();

        let category_ids: Vec<i64> = categories.iter().map(|c| c.id).collect();
        let sub_results = run_pool(category_ids, concurrency, |category_id| {
            let cache = self.cache.clone();
            async move { cache.refresh_subcategories_for(category_id).await }
        })
        .await;

        let mut subcategory_ids = Vec::new();
        for (category_id, result) in sub_results {
            match result {
                Ok(subs) => {
                    report.subcategories += subs.len();
                    subcategory_ids.extend(subs.iter().map(|s| s.id));
                }
                Err(e) => report
                    .failures
                    .push((CacheTarget::Subcategories(category_id), e.to_string())),
            }
        }

        let item_results = run_pool(subcategory_ids, concurrency, |subcategory_id| {
            let cache = self.cache.clone();
            async move { cache.refresh_instruments_for(subcategory_id).await }
        })
        .await;

        for (subcategory_id, result) in item_results {
            match result {
                Ok(items) => report.instruments += items.len(),
                Err(e) => report
                    .failures
                    .push((CacheTarget::Instruments(subcategory_id), e.to_string())),
            }
        }

        info!(
            categories = report.categories,
            subcategories = report.subcategories,
            instruments = report.instruments,
            failures = report.failures.len(),
            "Cache warm complete"
        );
        report
    }
}

/// Run `work` over `tasks` with at most `concurrency` workers.
/// Each worker pulls from a shared queue until it is empty.
async fn run_pool<T, R, F, Fut>(
    tasks: Vec<T>,
    concurrency: usize,
    work: F,
) -> Vec<(T, Result<R, InventoryError>)>
where
    T: Copy,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R, InventoryError>>,
{
    let workers = concurrency.min(tasks.len());
    let queue = Mutex::new(tasks.into_iter().collect::<VecDeque<T>>());
    let results = Mutex::new(Vec::new());

    let (queue_ref, results_ref, work_ref) = (&queue, &results, &work);

    join_all((0..workers).map(|_| async move {
        loop {
            let next = queue_ref.lock().ok().and_then(|mut q| q.pop_front());
            let Some(task) = next else { break };
            let outcome = work_ref(task).await;
            if let Ok(mut done) = results_ref.lock() {
                done.push((task, outcome));
            }
        }
    }))
    .await;

    results.into_inner().unwrap_or_default()
}
