//! In-memory storage backend.
//!
//! Every collection sits behind its own `tokio::sync::RwLock`. Writes that
//! must be atomic (the one-open-shift check, salary read-modify-write) run
//! entirely under a single write guard.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{AttendanceRecord, Office, SalaryRecord, User};

use super::traits::{
    AttendanceFilter, AttendanceStore, OfficeStore, SalaryMutation, SalaryStore, UserDirectory,
};

type SalaryKey = (String, u32, i32);

/// Process-local implementation of every storage trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    attendance: RwLock<HashMap<Uuid, AttendanceRecord>>,
    salaries: RwLock<HashMap<SalaryKey, SalaryRecord>>,
    offices: RwLock<BTreeMap<String, Office>>,
    users: RwLock<BTreeMap<String, User>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose user directory holds `users`.
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let users = users.into_iter().map(|u| (u.id.clone(), u)).collect();
        Self {
            users: RwLock::new(users),
            ..Self::default()
        }
    }

    /// Adds or replaces a user in the directory.
    pub async fn put_user(&self, user: User) {
        self.users.write().await.insert(user.id.clone(), user);
    }
}

fn has_open_shift(records: &HashMap<Uuid, AttendanceRecord>, user_id: &str) -> bool {
    records
        .values()
        .any(|r| r.user_id == user_id && r.is_open())
}

fn most_recent<'a>(
    records: impl Iterator<Item = &'a AttendanceRecord>,
) -> Option<AttendanceRecord> {
    records
        .max_by_key(|r| (r.check_in_time, r.created_at))
        .cloned()
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn create_open_shift(&self, record: AttendanceRecord) -> EngineResult<AttendanceRecord> {
        let mut records = self.attendance.write().await;
        if has_open_shift(&records, &record.user_id) {
            return Err(EngineError::DuplicateCheckIn {
                user_id: record.user_id,
            });
        }
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn insert_record(&self, record: AttendanceRecord) -> EngineResult<AttendanceRecord> {
        if record.is_open() {
            return self.create_open_shift(record).await;
        }
        self.attendance
            .write()
            .await
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_open_shift(&self, user_id: &str) -> EngineResult<Option<AttendanceRecord>> {
        let records = self.attendance.read().await;
        Ok(most_recent(
            records
                .values()
                .filter(|r| r.user_id == user_id && r.is_open()),
        ))
    }

    async fn find_open_shift_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> EngineResult<Option<AttendanceRecord>> {
        let records = self.attendance.read().await;
        Ok(most_recent(records.values().filter(|r| {
            r.user_id == user_id
                && r.is_open()
                && r.check_in_time >= from
                && r.check_in_time < before
        })))
    }

    async fn update_record(&self, record: &AttendanceRecord) -> EngineResult<()> {
        let mut records = self.attendance.write().await;
        match records.get_mut(&record.id) {
            Some(stored) => {
                *stored = record.clone();
                Ok(())
            }
            None => Err(EngineError::persistence(
                "update_record",
                format!("attendance record {} does not exist", record.id),
            )),
        }
    }

    async fn list_records(&self, filter: &AttendanceFilter) -> EngineResult<Vec<AttendanceRecord>> {
        let records = self.attendance.read().await;
        let mut matching: Vec<AttendanceRecord> = records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.check_in_time
                .cmp(&a.check_in_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(matching)
    }
}

#[async_trait]
impl SalaryStore for MemoryStore {
    async fn find_salary(
        &self,
        user_id: &str,
        month: u32,
        year: i32,
    ) -> EngineResult<Option<SalaryRecord>> {
        let salaries = self.salaries.read().await;
        Ok(salaries.get(&(user_id.to_string(), month, year)).cloned())
    }

    async fn modify_salary(
        &self,
        user_id: &str,
        month: u32,
        year: i32,
        mutation: SalaryMutation,
    ) -> EngineResult<SalaryRecord> {
        let key = (user_id.to_string(), month, year);
        let mut salaries = self.salaries.write().await;
        let updated = mutation(salaries.get(&key).cloned())?;
        salaries.insert(key, updated.clone());
        Ok(updated)
    }

    async fn list_salaries_for_user(
        &self,
        user_id: &str,
        year: Option<i32>,
    ) -> EngineResult<Vec<SalaryRecord>> {
        let salaries = self.salaries.read().await;
        let mut records: Vec<SalaryRecord> = salaries
            .values()
            .filter(|s| s.user_id == user_id && year.is_none_or(|y| s.year == y))
            .cloned()
            .collect();
        records.sort_by(|a, b| (b.year, b.month).cmp(&(a.year, a.month)));
        Ok(records)
    }

    async fn list_salaries_for_month(
        &self,
        month: u32,
        year: i32,
    ) -> EngineResult<Vec<SalaryRecord>> {
        let salaries = self.salaries.read().await;
        let mut records: Vec<SalaryRecord> = salaries
            .values()
            .filter(|s| s.month == month && s.year == year)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(records)
    }
}

#[async_trait]
impl OfficeStore for MemoryStore {
    async fn get_office(&self, office_id: &str) -> EngineResult<Option<Office>> {
        Ok(self.offices.read().await.get(office_id).cloned())
    }

    async fn list_offices(&self) -> EngineResult<Vec<Office>> {
        Ok(self.offices.read().await.values().cloned().collect())
    }

    async fn insert_office(&self, office: Office) -> EngineResult<Office> {
        let mut offices = self.offices.write().await;
        if offices.contains_key(&office.office_id) {
            return Err(EngineError::OfficeAlreadyExists {
                office_id: office.office_id,
            });
        }
        offices.insert(office.office_id.clone(), office.clone());
        Ok(office)
    }

    async fn update_office(&self, office: Office) -> EngineResult<Office> {
        let mut offices = self.offices.write().await;
        match offices.get_mut(&office.office_id) {
            Some(stored) => {
                *stored = office.clone();
                Ok(office)
            }
            None => Err(EngineError::OfficeNotFound {
                office_id: office.office_id,
            }),
        }
    }

    async fn delete_office(&self, office_id: &str) -> EngineResult<()> {
        self.offices
            .write()
            .await
            .remove(office_id)
            .map(|_| ())
            .ok_or_else(|| EngineError::OfficeNotFound {
                office_id: office_id.to_string(),
            })
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn get_user(&self, user_id: &str) -> EngineResult<Option<User>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn list_users(&self) -> EngineResult<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn set_hourly_rate(&self, user_id: &str, hourly_rate: Decimal) -> EngineResult<User> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| EngineError::UserNotFound {
                user_id: user_id.to_string(),
            })?;
        user.hourly_rate = hourly_rate;
        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceStatus, GeoPoint, Role};
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap()
    }

    fn open(user_id: &str, start: DateTime<Utc>) -> AttendanceRecord {
        AttendanceRecord::open(user_id, "main", start, GeoPoint::origin(), None)
    }

    fn closed(user_id: &str, start: DateTime<Utc>, minutes: i64) -> AttendanceRecord {
        let mut record = open(user_id, start);
        record.close(start + Duration::minutes(minutes), None, minutes);
        record
    }

    fn user(id: &str, name: &str, role: Role) -> User {
        User {
            id: id.to_string(),
            name: name.to_string(),
            username: id.to_string(),
            email: String::new(),
            role,
            hourly_rate: Decimal::new(25_000, 0),
        }
    }

    fn salary(user_id: &str, month: u32, year: i32) -> SalaryRecord {
        let now = at(30, 10);
        SalaryRecord {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            month,
            year,
            hourly_rate: Decimal::new(25_000, 0),
            total_hours: Decimal::ZERO,
            total_salary: Decimal::ZERO,
            daily_records: vec![],
            bonuses: vec![],
            deductions: vec![],
            final_salary: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_second_open_shift_is_rejected() {
        let store = MemoryStore::new();
        store.create_open_shift(open("u1", at(2, 1))).await.unwrap();

        let result = store.create_open_shift(open("u1", at(2, 2))).await;
        assert!(matches!(result, Err(EngineError::DuplicateCheckIn { .. })));

        // Other users are unaffected.
        store.create_open_shift(open("u2", at(2, 2))).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_open_shift_inserts_admit_one() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .create_open_shift(open("u1", at(2, 1) + Duration::seconds(i)))
                    .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_insert_closed_record_skips_open_check() {
        let store = MemoryStore::new();
        store.create_open_shift(open("u1", at(3, 1))).await.unwrap();
        store.insert_record(closed("u1", at(2, 1), 60)).await.unwrap();

        let all = store
            .list_records(&AttendanceFilter::for_user("u1"))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_find_open_shift_ignores_closed_records() {
        let store = MemoryStore::new();
        store.insert_record(closed("u1", at(2, 1), 60)).await.unwrap();
        assert!(store.find_open_shift("u1").await.unwrap().is_none());

        let record = store.create_open_shift(open("u1", at(3, 1))).await.unwrap();
        let found = store.find_open_shift("u1").await.unwrap().unwrap();
        assert_eq!(found.id, record.id);
    }

    #[tokio::test]
    async fn test_find_open_shift_between_is_half_open() {
        let store = MemoryStore::new();
        store.create_open_shift(open("u1", at(3, 0))).await.unwrap();

        assert!(
            store
                .find_open_shift_between("u1", at(2, 0), at(3, 0))
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .find_open_shift_between("u1", at(3, 0), at(4, 0))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_update_record_persists_changes() {
        let store = MemoryStore::new();
        let mut record = store.create_open_shift(open("u1", at(2, 1))).await.unwrap();
        record.close(at(2, 3), None, 120);
        store.update_record(&record).await.unwrap();

        assert!(store.find_open_shift("u1").await.unwrap().is_none());
        let listed = store
            .list_records(&AttendanceFilter::for_user("u1"))
            .await
            .unwrap();
        assert_eq!(listed[0].status, AttendanceStatus::CheckedOut);
        assert_eq!(listed[0].work_duration, Some(120));
    }

    #[tokio::test]
    async fn test_update_unknown_record_is_persistence_error() {
        let store = MemoryStore::new();
        let result = store.update_record(&open("u1", at(2, 1))).await;
        assert!(matches!(result, Err(EngineError::Persistence { .. })));
    }

    #[tokio::test]
    async fn test_list_records_filters_and_sorts_descending() {
        let store = MemoryStore::new();
        store.insert_record(closed("u1", at(2, 1), 60)).await.unwrap();
        store.insert_record(closed("u1", at(4, 1), 60)).await.unwrap();
        store.insert_record(closed("u1", at(6, 1), 60)).await.unwrap();
        store.insert_record(closed("u2", at(4, 1), 60)).await.unwrap();
        store.create_open_shift(open("u1", at(5, 1))).await.unwrap();

        let filter = AttendanceFilter {
            user_id: Some("u1".to_string()),
            checked_in_from: Some(at(2, 1)),
            checked_in_before: Some(at(6, 1)),
            status: Some(AttendanceStatus::CheckedOut),
        };
        let records = store.list_records(&filter).await.unwrap();

        let starts: Vec<_> = records.iter().map(|r| r.check_in_time).collect();
        assert_eq!(starts, vec![at(4, 1), at(2, 1)]);
    }

    #[tokio::test]
    async fn test_modify_salary_sees_existing_record() {
        let store = MemoryStore::new();
        store
            .modify_salary("u1", 6, 2025, Box::new(|existing| {
                assert!(existing.is_none());
                Ok(salary("u1", 6, 2025))
            }))
            .await
            .unwrap();

        let updated = store
            .modify_salary("u1", 6, 2025, Box::new(|existing| {
                let mut record = existing.expect("record from first write");
                record.total_salary = Decimal::new(1_000, 0);
                Ok(record)
            }))
            .await
            .unwrap();
        assert_eq!(updated.total_salary, Decimal::new(1_000, 0));

        let stored = store.find_salary("u1", 6, 2025).await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_store_untouched() {
        let store = MemoryStore::new();
        let result = store
            .modify_salary("u1", 6, 2025, Box::new(|_| {
                Err(EngineError::validation("month", "nope"))
            }))
            .await;
        assert!(result.is_err());
        assert!(store.find_salary("u1", 6, 2025).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_salary_listings_are_ordered() {
        let store = MemoryStore::new();
        for (user, month, year) in [("u1", 1, 2025), ("u1", 12, 2024), ("u1", 6, 2025), ("u2", 6, 2025)] {
            store
                .modify_salary(user, month, year, Box::new(move |_| Ok(salary(user, month, year))))
                .await
                .unwrap();
        }

        let history = store.list_salaries_for_user("u1", None).await.unwrap();
        let keys: Vec<_> = history.iter().map(|s| (s.month, s.year)).collect();
        assert_eq!(keys, vec![(6, 2025), (1, 2025), (12, 2024)]);

        let only_2024 = store.list_salaries_for_user("u1", Some(2024)).await.unwrap();
        assert_eq!(only_2024.len(), 1);

        let june = store.list_salaries_for_month(6, 2025).await.unwrap();
        let users: Vec<_> = june.iter().map(|s| s.user_id.as_str()).collect();
        assert_eq!(users, vec!["u1", "u2"]);
    }

    #[tokio::test]
    async fn test_office_crud() {
        let store = MemoryStore::new();
        let now = at(1, 0);
        let office = Office {
            office_id: "hq".to_string(),
            name: "HQ".to_string(),
            location: GeoPoint::new(106.7, 10.8),
            radius: 150.0,
            address: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        store.insert_office(office.clone()).await.unwrap();
        assert!(matches!(
            store.insert_office(office.clone()).await,
            Err(EngineError::OfficeAlreadyExists { .. })
        ));

        let mut renamed = office.clone();
        renamed.name = "Head Office".to_string();
        store.update_office(renamed).await.unwrap();
        assert_eq!(
            store.get_office("hq").await.unwrap().unwrap().name,
            "Head Office"
        );

        store.delete_office("hq").await.unwrap();
        assert!(matches!(
            store.delete_office("hq").await,
            Err(EngineError::OfficeNotFound { .. })
        ));
        assert!(store.list_offices().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_directory() {
        let store = MemoryStore::with_users([
            user("u2", "Binh", Role::Staff),
            user("u1", "An", Role::Staff),
        ]);

        let names: Vec<_> = store
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, vec!["An", "Binh"]);

        let updated = store
            .set_hourly_rate("u1", Decimal::new(40_000, 0))
            .await
            .unwrap();
        assert_eq!(updated.hourly_rate, Decimal::new(40_000, 0));
        assert!(matches!(
            store.set_hourly_rate("ghost", Decimal::ONE).await,
            Err(EngineError::UserNotFound { .. })
        ));
    }
}
