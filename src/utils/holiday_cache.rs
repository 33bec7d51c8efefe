use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::{Datelike, NaiveDate};
use futures_util::StreamExt;
use moka::future::Cache;
use sqlx::MySqlPool;

use crate::model::holiday::Holiday;
use crate::services::calendar::month_bounds;

type MonthKey = (i32, u32);

/// Holidays per (year, month). Writes to the holidays table must call `invalidate`.
#[derive(Clone)]
pub struct HolidayCache {
    months: Cache<MonthKey, Arc<Vec<Holiday>>>,
    // bumped by every invalidate; a warmup snapshot older than this is stale
    epoch: Arc<AtomicU64>,
}

impl HolidayCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            months: Cache::builder()
                .max_capacity(240) // twenty years of months
                .time_to_live(Duration::from_secs(ttl_secs))
                .build(),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Holidays of one month, loaded from the database on a miss.
    pub async fn month(
        &self,
        pool: &MySqlPool,
        year: i32,
        month: u32,
    ) -> Result<Arc<Vec<Holiday>>, Arc<sqlx::Error>> {
        self.months
            .try_get_with((year, month), async move {
                fetch_month(pool, year, month).await.map(Arc::new)
            })
            .await
    }

    pub async fn is_holiday(
        &self,
        pool: &MySqlPool,
        date: NaiveDate,
    ) -> Result<bool, Arc<sqlx::Error>> {
        let holidays = self.month(pool, date.year(), date.month()).await?;
        Ok(holidays.iter().any(|h| h.date == date))
    }

    pub async fn invalidate(&self, date: NaiveDate) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.months.invalidate(&(date.year(), date.month())).await;
    }

    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Loads a snapshot read since `started`. Months already cached are kept,
    /// and the rest of the snapshot is dropped once a write has invalidated
    /// anything. Returns the number of months inserted.
    async fn fill(&self, started: u64, snapshot: BTreeMap<MonthKey, Vec<Holiday>>) -> usize {
        let mut inserted = 0;
        for (key, holidays) in snapshot {
            if self.epoch() != started {
                log::warn!(
                    "Holiday cache warmup interrupted by a write, remaining months load lazily"
                );
                break;
            }
            let entry = self.months.entry(key).or_insert(Arc::new(holidays)).await;
            if entry.is_fresh() {
                inserted += 1;
            }
        }
        inserted
    }

    #[cfg(test)]
    async fn prime(&self, year: i32, month: u32, holidays: Vec<Holiday>) {
        self.months.insert((year, month), Arc::new(holidays)).await;
    }

    #[cfg(test)]
    async fn cached(&self, year: i32, month: u32) -> Option<Arc<Vec<Holiday>>> {
        self.months.get(&(year, month)).await
    }
}

pub async fn fetch_month(
    pool: &MySqlPool,
    year: i32,
    month: u32,
) -> Result<Vec<Holiday>, sqlx::Error> {
    let Some((first, last)) = month_bounds(year, month) else {
        return Ok(Vec::new());
    };

    sqlx::query_as::<_, Holiday>(
        r#"
        SELECT id, date, name
        FROM holidays
        WHERE date BETWEEN ? AND ?
        ORDER BY date
        "#,
    )
    .bind(first)
    .bind(last)
    .fetch_all(pool)
    .await
}

/// Streams the whole holidays table into the cache at startup.
pub async fn warmup_holiday_cache(cache: &HolidayCache, pool: &MySqlPool) -> Result<()> {
    let started = cache.epoch();
    let mut stream = sqlx::query_as::<_, Holiday>(
        "SELECT id, date, name FROM holidays ORDER BY date",
    )
    .fetch(pool);

    let mut by_month: BTreeMap<MonthKey, Vec<Holiday>> = BTreeMap::new();
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let holiday = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;
        by_month
            .entry((holiday.date.year(), holiday.date.month()))
            .or_default()
            .push(holiday);
        total += 1;
    }

    let months = cache.fill(started, by_month).await;

    log::info!(
        "Holiday cache warmup complete: {} holidays across {} months",
        total,
        months
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holiday(day: u32, name: &str) -> Holiday {
        Holiday {
            id: day as u64,
            date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            name: name.to_string(),
        }
    }

    #[actix_web::test]
    async fn test_invalidate_drops_only_that_month() {
        let cache = HolidayCache::new(60);
        cache.prime(2026, 3, vec![holiday(4, "Holi")]).await;
        cache.prime(2026, 4, Vec::new()).await;

        assert_eq!(cache.cached(2026, 3).await.unwrap().len(), 1);

        cache
            .invalidate(NaiveDate::from_ymd_opt(2026, 3, 20).unwrap())
            .await;

        assert!(cache.cached(2026, 3).await.is_none());
        assert!(cache.cached(2026, 4).await.is_some());
    }

    #[actix_web::test]
    async fn test_fill_keeps_months_already_cached() {
        let cache = HolidayCache::new(60);
        let started = cache.epoch();
        cache.prime(2026, 3, vec![holiday(4, "Holi"), holiday(26, "Independence Day")]).await;

        let mut snapshot = BTreeMap::new();
        snapshot.insert((2026, 3), vec![holiday(4, "Holi")]);
        snapshot.insert((2026, 4), Vec::new());

        assert_eq!(cache.fill(started, snapshot).await, 1);
        assert_eq!(cache.cached(2026, 3).await.unwrap().len(), 2);
        assert!(cache.cached(2026, 4).await.is_some());
    }

    #[actix_web::test]
    async fn test_fill_drops_snapshot_after_invalidate() {
        let cache = HolidayCache::new(60);
        let started = cache.epoch();

        // a holiday created while the warmup was still streaming
        cache
            .invalidate(NaiveDate::from_ymd_opt(2026, 3, 26).unwrap())
            .await;

        let mut snapshot = BTreeMap::new();
        snapshot.insert((2026, 3), vec![holiday(4, "Holi")]);

        assert_eq!(cache.fill(started, snapshot).await, 0);
        assert!(cache.cached(2026, 3).await.is_none());
    }
}
