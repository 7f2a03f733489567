use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use moka::future::Cache;
use once_cell::sync::Lazy;

use crate::store::AccountStore;

/// Emails known to be registered. Only taken emails are stored.
pub static EMAIL_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(500_000)
        .time_to_live(Duration::from_secs(86400))
        .build()
});

pub async fn mark_taken(email: &str) {
    EMAIL_CACHE.insert(email.trim().to_lowercase(), true).await;
}

pub async fn is_taken(email: &str) -> bool {
    EMAIL_CACHE
        .get(&email.trim().to_lowercase())
        .await
        .unwrap_or(false)
}

async fn batch_mark(emails: &[String]) {
    let inserts: Vec<_> = emails
        .iter()
        .map(|e| EMAIL_CACHE.insert(e.to_lowercase(), true))
        .collect();

    futures::future::join_all(inserts).await;
}

/// Loads the emails of accounts that signed in during the last `days`.
pub async fn warmup_email_cache(store: &dyn AccountStore, days: i64, batch_size: usize) -> Result<()> {
    let since = Utc::now() - chrono::Duration::days(days);
    let emails = store.recent_emails(since).await?;

    for batch in emails.chunks(batch_size.max(1)) {
        batch_mark(batch).await;
    }

    log::info!(
        "Email cache warmup complete: {} recent accounts (last {} days)",
        emails.len(),
        days
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn marked_emails_read_as_taken() {
        assert!(!is_taken("cache.test@hostel.edu").await);
        mark_taken("Cache.Test@hostel.edu").await;
        assert!(is_taken("cache.test@hostel.edu").await);
    }
}
