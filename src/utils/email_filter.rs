use std::sync::RwLock;

use anyhow::Result;
use autoscale_cuckoo_filter::CuckooFilter;
use once_cell::sync::Lazy;

use crate::store::AccountStore;

/// Expected capacity and false-positive rate.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static EMAIL_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

#[inline]
fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// False means the email is certainly unregistered. True may be a false
/// positive.
pub fn might_exist(email: &str) -> bool {
    let email = normalize(email);
    EMAIL_FILTER
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .contains(&email)
}

pub fn insert(email: &str) {
    let email = normalize(email);
    EMAIL_FILTER
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .add(&email);
}

/// Loads every registered email into the filter, `batch_size` per lock.
pub async fn warmup_email_filter(store: &dyn AccountStore, batch_size: usize) -> Result<()> {
    let emails = store.list_emails().await?;

    for batch in emails.chunks(batch_size.max(1)) {
        insert_batch(batch);
    }

    log::info!("Email filter warmup complete: {} accounts", emails.len());
    Ok(())
}

fn insert_batch(emails: &[String]) {
    let mut filter = EMAIL_FILTER.write().unwrap_or_else(|e| e.into_inner());

    for email in emails {
        filter.add(&normalize(email));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_emails_are_found_case_insensitively() {
        insert("Filter.Test@Hostel.edu");
        assert!(might_exist("filter.test@hostel.edu"));
    }
}
