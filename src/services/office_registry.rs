//! Office resolution and administration.
//!
//! Resolution order for an office ID: an active persisted office, then the
//! configured fallback table, otherwise `InvalidOffice`. Resolved offices are
//! cached per process; every administrative write evicts the affected entry.
//!
//! Each write also bumps a generation counter. A resolve that read the store
//! before a write landed drops its own cache insert, so a moved or
//! deactivated office is never cached with its old geofence.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::FallbackOffice;
use crate::error::{EngineError, EngineResult};
use crate::models::{DEFAULT_OFFICE_RADIUS_METERS, GeoPoint, Office, OfficeSource, ResolvedOffice};
use crate::storage::OfficeStore;

/// Fields for registering an office.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOffice {
    /// Unique key.
    pub office_id: String,
    /// Display name.
    pub name: String,
    /// Centre of the geofence.
    pub location: GeoPoint,
    /// Defaults to [`DEFAULT_OFFICE_RADIUS_METERS`].
    pub radius: Option<f64>,
    /// Street address.
    pub address: Option<String>,
}

/// Partial update of an office. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfficeUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New geofence centre.
    pub location: Option<GeoPoint>,
    /// New radius in meters.
    pub radius: Option<f64>,
    /// New address; blank clears it.
    pub address: Option<String>,
    /// Activates or deactivates the office.
    pub is_active: Option<bool>,
}

const OFFICE_CACHE_CAPACITY: u64 = 10_000;
const OFFICE_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Resolves office IDs to geofences and manages persisted offices.
pub struct OfficeRegistry {
    store: Arc<dyn OfficeStore>,
    fallback: BTreeMap<String, FallbackOffice>,
    default_radius: f64,
    clock: Arc<dyn Clock>,
    cache: Cache<String, ResolvedOffice>,
    generation: AtomicU64,
}

impl OfficeRegistry {
    /// Creates a registry. `default_radius` applies to fallback offices
    /// configured without a radius.
    pub fn new(
        store: Arc<dyn OfficeStore>,
        fallback: BTreeMap<String, FallbackOffice>,
        default_radius: f64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            fallback,
            default_radius,
            clock,
            cache: Cache::builder()
                .max_capacity(OFFICE_CACHE_CAPACITY)
                .time_to_live(OFFICE_CACHE_TTL)
                .build(),
            generation: AtomicU64::new(0),
        }
    }

    /// Resolves `office_id` to the geofence checks are evaluated against.
    pub async fn resolve(&self, office_id: &str) -> EngineResult<ResolvedOffice> {
        if let Some(hit) = self.cache.get(office_id).await {
            return Ok(hit);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let resolved = self.load(office_id).await?;
        debug!(office_id = %office_id, source = ?resolved.source, "Office resolved");

        self.cache
            .insert(office_id.to_string(), resolved.clone())
            .await;
        // An admin write since the load may have missed this insert.
        if self.generation.load(Ordering::SeqCst) != generation {
            self.cache.invalidate(office_id).await;
        }
        Ok(resolved)
    }

    async fn load(&self, office_id: &str) -> EngineResult<ResolvedOffice> {
        let resolved = match self.store.get_office(office_id).await? {
            Some(office) if office.is_active => ResolvedOffice::from(&office),
            _ => self
                .fallback
                .get(office_id)
                .map(|entry| ResolvedOffice {
                    office_id: office_id.to_string(),
                    name: entry.name.clone(),
                    coordinates: entry.coordinates,
                    radius: entry.radius.unwrap_or(self.default_radius),
                    source: OfficeSource::Fallback,
                })
                .ok_or_else(|| EngineError::InvalidOffice {
                    office_id: office_id.to_string(),
                })?,
        };
        Ok(resolved)
    }

    /// Evicts one cached office.
    pub async fn invalidate(&self, office_id: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate(office_id).await;
    }

    /// Evicts every cached office.
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate_all();
    }

    /// All persisted offices.
    pub async fn list_offices(&self) -> EngineResult<Vec<Office>> {
        self.store.list_offices().await
    }

    /// One persisted office, active or not.
    pub async fn get_office(&self, office_id: &str) -> EngineResult<Office> {
        self.store
            .get_office(office_id)
            .await?
            .ok_or_else(|| EngineError::OfficeNotFound {
                office_id: office_id.to_string(),
            })
    }

    /// Registers a new active office.
    pub async fn create_office(&self, new: NewOffice) -> EngineResult<Office> {
        let office_id = new.office_id.trim().to_string();
        if office_id.is_empty() {
            return Err(EngineError::validation("officeId", "is required"));
        }
        if new.name.trim().is_empty() {
            return Err(EngineError::validation("name", "is required"));
        }
        validate_location(new.location)?;
        let radius = new.radius.unwrap_or(DEFAULT_OFFICE_RADIUS_METERS);
        validate_radius(radius)?;

        let now = self.clock.now();
        let office = self
            .store
            .insert_office(Office {
                office_id: office_id.clone(),
                name: new.name.trim().to_string(),
                location: new.location,
                radius,
                address: new.address.filter(|a| !a.trim().is_empty()),
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await?;

        self.invalidate(&office_id).await;
        info!(office_id = %office_id, radius, "Office created");
        Ok(office)
    }

    /// Applies a partial update to a persisted office.
    pub async fn update_office(&self, office_id: &str, update: OfficeUpdate) -> EngineResult<Office> {
        let mut office = self.get_office(office_id).await?;

        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(EngineError::validation("name", "must not be empty"));
            }
            office.name = name.trim().to_string();
        }
        if let Some(location) = update.location {
            validate_location(location)?;
            office.location = location;
        }
        if let Some(radius) = update.radius {
            validate_radius(radius)?;
            office.radius = radius;
        }
        if let Some(address) = update.address {
            office.address = Some(address).filter(|a| !a.trim().is_empty());
        }
        if let Some(is_active) = update.is_active {
            office.is_active = is_active;
        }
        office.updated_at = self.clock.now();

        let office = self.store.update_office(office).await?;
        self.invalidate(office_id).await;
        info!(office_id = %office_id, is_active = office.is_active, "Office updated");
        Ok(office)
    }

    /// Removes a persisted office. A fallback entry with the same ID resolves again afterwards.
    pub async fn delete_office(&self, office_id: &str) -> EngineResult<()> {
        self.store.delete_office(office_id).await?;
        self.invalidate(office_id).await;
        info!(office_id = %office_id, "Office deleted");
        Ok(())
    }
}

fn validate_location(location: GeoPoint) -> EngineResult<()> {
    if location.is_in_range() {
        Ok(())
    } else {
        Err(EngineError::validation(
            "coordinates",
            format!("{} is not a valid [longitude, latitude] pair", location),
        ))
    }
}

fn validate_radius(radius: f64) -> EngineResult<()> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(EngineError::validation("radius", "must be a positive number of meters"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    /// Pauses the next `get_office` after it has read the store.
    struct PausableOffices {
        inner: MemoryStore,
        pause: Mutex<Option<(oneshot::Sender<()>, oneshot::Receiver<()>)>>,
    }

    impl PausableOffices {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                pause: Mutex::new(None),
            }
        }

        /// Returns a receiver that fires once a read is paused, and the
        /// sender that resumes it.
        fn pause_next_read(&self) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
            let (paused_tx, paused_rx) = oneshot::channel();
            let (resume_tx, resume_rx) = oneshot::channel();
            *self.pause.lock().unwrap() = Some((paused_tx, resume_rx));
            (paused_rx, resume_tx)
        }
    }

    #[async_trait]
    impl OfficeStore for PausableOffices {
        async fn get_office(&self, office_id: &str) -> EngineResult<Option<Office>> {
            let office = self.inner.get_office(office_id).await?;
            let pause = self.pause.lock().unwrap().take();
            if let Some((paused, resume)) = pause {
                let _ = paused.send(());
                let _ = resume.await;
            }
            Ok(office)
        }

        async fn list_offices(&self) -> EngineResult<Vec<Office>> {
            self.inner.list_offices().await
        }

        async fn insert_office(&self, office: Office) -> EngineResult<Office> {
            self.inner.insert_office(office).await
        }

        async fn update_office(&self, office: Office) -> EngineResult<Office> {
            self.inner.update_office(office).await
        }

        async fn delete_office(&self, office_id: &str) -> EngineResult<()> {
            self.inner.delete_office(office_id).await
        }
    }

    fn registry() -> OfficeRegistry {
        let mut fallback = BTreeMap::new();
        fallback.insert(
            "main".to_string(),
            FallbackOffice {
                name: "Main Office".to_string(),
                coordinates: GeoPoint::new(106.667976, 10.846469),
                radius: Some(50.0),
            },
        );
        fallback.insert(
            "annex".to_string(),
            FallbackOffice {
                name: "Annex".to_string(),
                coordinates: GeoPoint::new(106.7, 10.8),
                radius: None,
            },
        );
        OfficeRegistry::new(
            Arc::new(MemoryStore::new()),
            fallback,
            100.0,
            Arc::new(SystemClock),
        )
    }

    fn branch() -> NewOffice {
        NewOffice {
            office_id: "branch".to_string(),
            name: "Branch".to_string(),
            location: GeoPoint::new(105.8, 21.0),
            radius: None,
            address: Some("12 Hang Bai".to_string()),
        }
    }

    #[tokio::test]
    async fn test_fallback_resolves_main() {
        let registry = registry();
        let office = registry.resolve("main").await.unwrap();
        assert_eq!(office.source, OfficeSource::Fallback);
        assert_eq!(office.coordinates, GeoPoint::new(106.667976, 10.846469));
        assert_eq!(office.radius, 50.0);
    }

    #[tokio::test]
    async fn test_fallback_without_radius_uses_default() {
        let registry = registry();
        assert_eq!(registry.resolve("annex").await.unwrap().radius, 100.0);
    }

    #[tokio::test]
    async fn test_unknown_office_is_invalid() {
        let registry = registry();
        assert!(matches!(
            registry.resolve("nowhere").await,
            Err(EngineError::InvalidOffice { .. })
        ));
    }

    #[tokio::test]
    async fn test_persisted_office_takes_precedence() {
        let registry = registry();
        assert_eq!(
            registry.resolve("main").await.unwrap().source,
            OfficeSource::Fallback
        );

        registry
            .create_office(NewOffice {
                office_id: "main".to_string(),
                radius: Some(80.0),
                ..branch()
            })
            .await
            .unwrap();

        let office = registry.resolve("main").await.unwrap();
        assert_eq!(office.source, OfficeSource::Persisted);
        assert_eq!(office.radius, 80.0);
    }

    #[tokio::test]
    async fn test_new_office_gets_default_radius() {
        let registry = registry();
        let office = registry.create_office(branch()).await.unwrap();
        assert_eq!(office.radius, DEFAULT_OFFICE_RADIUS_METERS);
        assert!(office.is_active);
    }

    #[tokio::test]
    async fn test_duplicate_office_is_rejected() {
        let registry = registry();
        registry.create_office(branch()).await.unwrap();
        assert!(matches!(
            registry.create_office(branch()).await,
            Err(EngineError::OfficeAlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_validates_fields() {
        let registry = registry();
        let swapped = NewOffice {
            location: GeoPoint::new(21.0, 105.8),
            ..branch()
        };
        assert!(matches!(
            registry.create_office(swapped).await,
            Err(EngineError::Validation { .. })
        ));

        let bad_radius = NewOffice {
            radius: Some(0.0),
            ..branch()
        };
        assert!(matches!(
            registry.create_office(bad_radius).await,
            Err(EngineError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_evicts_cache() {
        let registry = registry();
        registry.create_office(branch()).await.unwrap();
        assert_eq!(registry.resolve("branch").await.unwrap().radius, 200.0);

        registry
            .update_office(
                "branch",
                OfficeUpdate {
                    radius: Some(75.0),
                    ..OfficeUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(registry.resolve("branch").await.unwrap().radius, 75.0);
    }

    #[tokio::test]
    async fn test_inactive_office_does_not_resolve() {
        let registry = registry();
        registry.create_office(branch()).await.unwrap();
        registry.resolve("branch").await.unwrap();

        registry
            .update_office(
                "branch",
                OfficeUpdate {
                    is_active: Some(false),
                    ..OfficeUpdate::default()
                },
            )
            .await
            .unwrap();
        assert!(matches!(
            registry.resolve("branch").await,
            Err(EngineError::InvalidOffice { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_restores_fallback() {
        let registry = registry();
        registry
            .create_office(NewOffice {
                office_id: "main".to_string(),
                ..branch()
            })
            .await
            .unwrap();
        registry.resolve("main").await.unwrap();

        registry.delete_office("main").await.unwrap();
        assert_eq!(
            registry.resolve("main").await.unwrap().source,
            OfficeSource::Fallback
        );
        assert!(matches!(
            registry.delete_office("main").await,
            Err(EngineError::OfficeNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_during_resolve_is_not_cached_stale() {
        let store = Arc::new(PausableOffices::new());
        let registry = Arc::new(OfficeRegistry::new(
            store.clone(),
            BTreeMap::new(),
            100.0,
            Arc::new(SystemClock),
        ));
        registry
            .create_office(NewOffice {
                office_id: "hq".to_string(),
                location: GeoPoint::new(105.0, 21.0),
                ..branch()
            })
            .await
            .unwrap();

        let (paused, resume) = store.pause_next_read();
        let in_flight = tokio::spawn({
            let registry = registry.clone();
            async move { registry.resolve("hq").await }
        });
        paused.await.unwrap();

        registry
            .update_office(
                "hq",
                OfficeUpdate {
                    location: Some(GeoPoint::new(106.0, 10.0)),
                    ..OfficeUpdate::default()
                },
            )
            .await
            .unwrap();
        resume.send(()).unwrap();

        // The resolve that started before the update may see the old location.
        let earlier = in_flight.await.unwrap().unwrap();
        assert_eq!(earlier.coordinates, GeoPoint::new(105.0, 21.0));

        let office = registry.resolve("hq").await.unwrap();
        assert_eq!(office.coordinates, GeoPoint::new(106.0, 10.0));
    }

    #[tokio::test]
    async fn test_invalidate_all_picks_up_direct_store_writes() {
        let store = Arc::new(MemoryStore::new());
        let registry = OfficeRegistry::new(
            store.clone(),
            BTreeMap::new(),
            100.0,
            Arc::new(SystemClock),
        );
        let mut office = registry.create_office(branch()).await.unwrap();
        assert_eq!(registry.resolve("branch").await.unwrap().radius, 200.0);

        office.radius = 30.0;
        store.update_office(office).await.unwrap();
        assert_eq!(registry.resolve("branch").await.unwrap().radius, 200.0);

        registry.invalidate_all();
        assert_eq!(registry.resolve("branch").await.unwrap().radius, 30.0);
    }
}
