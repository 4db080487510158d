use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use std::future::ready;
use std::time::Duration;
use uuid::Uuid;

use crate::services::capture::CaptureForm;

/// Open capture forms, keyed by form id.
///
/// A form lives until it is submitted, discarded, or its TTL runs out.
/// Changes go through per-key compute operations, so an edit never brings
/// back a form that was taken in the meantime.
#[derive(Clone)]
pub struct FormCache {
    forms: Cache<Uuid, CaptureForm>,
}

impl FormCache {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        Self {
            forms: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, id: &Uuid) -> Option<CaptureForm> {
        self.forms.get(id).await
    }

    /// Inserts or replaces the form. Replacing restarts its TTL.
    pub async fn put(&self, form: CaptureForm) {
        self.forms.insert(form.id, form).await;
    }

    /// Applies `change` to the stored form, if there still is one.
    pub async fn update<F>(&self, id: &Uuid, change: F) -> Option<CaptureForm>
    where
        F: FnOnce(&mut CaptureForm),
    {
        let result = self
            .forms
            .entry(*id)
            .and_compute_with(|entry| {
                let op = match entry {
                    Some(entry) => {
                        let mut form = entry.into_value();
                        change(&mut form);
                        Op::Put(form)
                    }
                    None => Op::Nop,
                };
                ready(op)
            })
            .await;

        match result {
            CompResult::ReplacedWith(entry) => Some(entry.into_value()),
            _ => None,
        }
    }

    /// Removes the form and hands it to the caller. At most one caller wins.
    pub async fn take(&self, id: &Uuid) -> Option<CaptureForm> {
        let result = self
            .forms
            .entry(*id)
            .and_compute_with(|entry| {
                ready(match entry {
                    Some(_) => Op::Remove,
                    None => Op::Nop,
                })
            })
            .await;

        match result {
            CompResult::Removed(entry) => Some(entry.into_value()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn form() -> CaptureForm {
        let at = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(7, 45, 0)
            .unwrap();
        CaptureForm::open(Uuid::new_v4(), at)
    }

    #[actix_web::test]
    async fn test_put_get_take() {
        let cache = FormCache::new(Duration::from_secs(60), 100);
        let f = form();
        cache.put(f.clone()).await;

        assert_eq!(cache.get(&f.id).await.map(|g| g.id), Some(f.id));
        assert!(cache.take(&f.id).await.is_some());
        assert!(cache.take(&f.id).await.is_none());
        assert!(cache.get(&f.id).await.is_none());
    }

    #[actix_web::test]
    async fn test_update_only_touches_present_forms() {
        let cache = FormCache::new(Duration::from_secs(60), 100);
        let f = form();
        cache.put(f.clone()).await;

        let updated = cache.update(&f.id, |form| form.faces = Some(2)).await;
        assert_eq!(updated.map(|g| g.faces), Some(Some(2)));
        assert_eq!(cache.get(&f.id).await.unwrap().faces, Some(2));

        cache.take(&f.id).await;
        assert!(cache.update(&f.id, |form| form.faces = Some(1)).await.is_none());
        assert!(cache.get(&f.id).await.is_none());
    }

    #[actix_web::test]
    async fn test_forms_expire() {
        let cache = FormCache::new(Duration::from_millis(50), 100);
        let f = form();
        cache.put(f.clone()).await;
        std::thread::sleep(Duration::from_millis(120));
        assert!(cache.get(&f.id).await.is_none());
    }
}
