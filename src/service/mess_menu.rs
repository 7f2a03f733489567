use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use super::ServiceResult;
use crate::model::mess_menu::{MealType, MessMenu};
use crate::store::HostelStore;

/// Read-only access to the weekly menu. The full menu is cached since it
/// changes rarely.
pub struct MessMenuService {
    store: Arc<dyn HostelStore>,
    cache: Cache<(), Arc<Vec<MessMenu>>>,
}

impl MessMenuService {
    pub fn new(store: Arc<dyn HostelStore>, ttl: Duration) -> Self {
        Self {
            store,
            cache: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    /// Ordered by day of week, then meal.
    pub async fn list(&self) -> ServiceResult<Arc<Vec<MessMenu>>> {
        if let Some(menus) = self.cache.get(&()).await {
            return Ok(menus);
        }

        let menus = Arc::new(self.store.list_menus().await?);
        debug!(entries = menus.len(), "Mess menu loaded");
        self.cache.insert((), menus.clone()).await;
        Ok(menus)
    }

    pub async fn for_day(&self, day: &str) -> ServiceResult<Vec<MessMenu>> {
        Ok(self
            .list()
            .await?
            .iter()
            .filter(|m| m.day_of_week.eq_ignore_ascii_case(day))
            .cloned()
            .collect())
    }

    pub async fn find(&self, day: &str, meal: MealType) -> ServiceResult<Option<MessMenu>> {
        Ok(self
            .list()
            .await?
            .iter()
            .find(|m| m.day_of_week.eq_ignore_ascii_case(day) && m.meal_type == meal)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn service() -> MessMenuService {
        MessMenuService::new(Arc::new(MemoryStore::seeded()), Duration::from_secs(60))
    }

    #[actix_web::test]
    async fn full_week_in_order() {
        let menus = service().list().await.unwrap();
        assert_eq!(menus.len(), 21);
        assert_eq!(menus[0].day_of_week, "monday");
        assert_eq!(menus[0].meal_type, MealType::Breakfast);
        assert_eq!(menus[20].day_of_week, "sunday");
        assert_eq!(menus[20].meal_type, MealType::Dinner);
    }

    #[actix_web::test]
    async fn filter_by_day_and_meal() {
        let menus = service();
        let friday = menus.for_day("Friday").await.unwrap();
        assert_eq!(friday.len(), 3);

        let lunch = menus.find("friday", MealType::Lunch).await.unwrap().unwrap();
        assert_eq!(lunch.meal_type, MealType::Lunch);
        assert!(menus.find("funday", MealType::Lunch).await.unwrap().is_none());
    }
}
