use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use streamgate_core::{ClientMeta, EndUserId, MonthlyUsageRecord, PeriodKey, TenantCode, UsageKey};

use crate::cache::CacheStore;
use crate::error::StoreError;
use crate::ledger::{InsertOutcome, UsageLedger};

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, day, hour, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

fn period(s: &str) -> PeriodKey {
    s.parse().unwrap_or_else(|_| PeriodKey::from_datetime(&Utc::now()))
}

fn usage_key(tenant: &str, user: &str, p: &str) -> UsageKey {
    UsageKey::new(TenantCode::new(tenant), EndUserId::new(user), period(p))
}

/// Run the full cache store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance.
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_cache_conformance_tests(store: &dyn CacheStore) -> Result<(), StoreError> {
    test_cache_get_missing(store).await?;
    test_cache_set_and_get(store).await?;
    test_cache_overwrite(store).await?;
    test_cache_delete(store).await?;
    Ok(())
}

async fn test_cache_get_missing(store: &dyn CacheStore) -> Result<(), StoreError> {
    let val = store.get("conformance:missing").await?;
    assert!(val.is_none(), "get on missing key should return None");
    Ok(())
}

async fn test_cache_set_and_get(store: &dyn CacheStore) -> Result<(), StoreError> {
    store
        .set("conformance:set-get", "[1,2,3]", Duration::from_secs(60))
        .await?;
    let val = store.get("conformance:set-get").await?;
    assert_eq!(val.as_deref(), Some("[1,2,3]"));
    Ok(())
}

async fn test_cache_overwrite(store: &dyn CacheStore) -> Result<(), StoreError> {
    let key = "conformance:overwrite";
    store.set(key, "old", Duration::from_secs(60)).await?;
    store.set(key, "new", Duration::from_secs(60)).await?;
    assert_eq!(store.get(key).await?.as_deref(), Some("new"));
    Ok(())
}

async fn test_cache_delete(store: &dyn CacheStore) -> Result<(), StoreError> {
    let key = "conformance:delete";
    store.set(key, "bye", Duration::from_secs(60)).await?;
    assert!(store.delete(key).await?, "delete should report existing key");
    assert!(store.get(key).await?.is_none(), "get after delete should miss");
    assert!(!store.delete(key).await?, "second delete should report missing");
    Ok(())
}

/// Run the full usage ledger conformance test suite.
///
/// Each check uses its own tenant code so the suite can run against a
/// shared database.
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_ledger_conformance_tests(ledger: &dyn UsageLedger) -> Result<(), StoreError> {
    test_ledger_find_missing(ledger).await?;
    test_ledger_insert_then_find(ledger).await?;
    test_ledger_insert_is_unique(ledger).await?;
    test_ledger_touch(ledger).await?;
    test_ledger_touch_missing(ledger).await?;
    test_ledger_count_scoped(ledger).await?;
    test_ledger_list_order(ledger).await?;
    Ok(())
}

async fn test_ledger_find_missing(ledger: &dyn UsageLedger) -> Result<(), StoreError> {
    let found = ledger.find(&usage_key("CF-MISS", "nobody", "2024-07")).await?;
    assert!(found.is_none(), "find on missing key should return None");
    Ok(())
}

async fn test_ledger_insert_then_find(ledger: &dyn UsageLedger) -> Result<(), StoreError> {
    let key = usage_key("CF-INS", "alice", "2024-07");
    let record =
        MonthlyUsageRecord::first_seen(key.clone(), at(1, 8), ClientMeta::new("VLC", "10.0.0.1"));
    assert_eq!(ledger.insert(&record).await?, InsertOutcome::Inserted);

    let found = ledger.find(&key).await?;
    assert_eq!(found.as_ref(), Some(&record));
    Ok(())
}

async fn test_ledger_insert_is_unique(ledger: &dyn UsageLedger) -> Result<(), StoreError> {
    let key = usage_key("CF-UNIQ", "bob", "2024-07");
    let first = MonthlyUsageRecord::first_seen(key.clone(), at(1, 8), ClientMeta::default());
    let second = MonthlyUsageRecord::first_seen(key.clone(), at(2, 8), ClientMeta::default());

    assert_eq!(ledger.insert(&first).await?, InsertOutcome::Inserted);
    assert_eq!(
        ledger.insert(&second).await?,
        InsertOutcome::AlreadyExists,
        "second insert for the same key must not create a row"
    );

    let stored = ledger.find(&key).await?;
    assert_eq!(
        stored.map(|r| r.first_seen_at),
        Some(at(1, 8)),
        "original row should be untouched"
    );
    let tenant = TenantCode::new("CF-UNIQ");
    assert_eq!(ledger.count_active(&tenant, &period("2024-07")).await?, 1);
    Ok(())
}

async fn test_ledger_touch(ledger: &dyn UsageLedger) -> Result<(), StoreError> {
    let key = usage_key("CF-TOUCH", "carol", "2024-07");
    let record =
        MonthlyUsageRecord::first_seen(key.clone(), at(3, 8), ClientMeta::new("Kodi", "10.0.0.3"));
    ledger.insert(&record).await?;

    let updated = ledger
        .touch(&key, at(3, 10), &ClientMeta::new("", "10.0.0.4"))
        .await?;
    let updated = updated.ok_or_else(|| StoreError::Backend("touch lost the row".into()))?;
    assert_eq!(updated.last_seen_at, at(3, 10));
    assert_eq!(updated.first_seen_at, at(3, 8));
    assert_eq!(updated.client_meta, ClientMeta::new("Kodi", "10.0.0.4"));

    let stale = ledger.touch(&key, at(3, 9), &ClientMeta::default()).await?;
    assert_eq!(
        stale.map(|r| r.last_seen_at),
        Some(at(3, 10)),
        "last_seen_at must never move backwards"
    );
    Ok(())
}

async fn test_ledger_touch_missing(ledger: &dyn UsageLedger) -> Result<(), StoreError> {
    let key = usage_key("CF-TOUCH-MISS", "ghost", "2024-07");
    let touched = ledger.touch(&key, at(4, 8), &ClientMeta::default()).await?;
    assert!(touched.is_none(), "touch must not create rows");
    Ok(())
}

async fn test_ledger_count_scoped(ledger: &dyn UsageLedger) -> Result<(), StoreError> {
    for (tenant, user, p) in [
        ("CF-COUNT-A", "u1", "2024-07"),
        ("CF-COUNT-A", "u2", "2024-07"),
        ("CF-COUNT-A", "u1", "2024-08"),
        ("CF-COUNT-B", "u1", "2024-07"),
    ] {
        let rec =
            MonthlyUsageRecord::first_seen(usage_key(tenant, user, p), at(5, 8), ClientMeta::default());
        ledger.insert(&rec).await?;
    }
    let mut inactive = MonthlyUsageRecord::first_seen(
        usage_key("CF-COUNT-A", "u3", "2024-07"),
        at(5, 8),
        ClientMeta::default(),
    );
    inactive.is_active = false;
    ledger.insert(&inactive).await?;

    let a = TenantCode::new("CF-COUNT-A");
    let b = TenantCode::new("CF-COUNT-B");
    assert_eq!(ledger.count_active(&a, &period("2024-07")).await?, 2);
    assert_eq!(ledger.count_active(&a, &period("2024-08")).await?, 1);
    assert_eq!(ledger.count_active(&b, &period("2024-07")).await?, 1);
    assert_eq!(ledger.count_active(&b, &period("2024-09")).await?, 0);
    Ok(())
}

async fn test_ledger_list_order(ledger: &dyn UsageLedger) -> Result<(), StoreError> {
    for (user, hour) in [("early", 6), ("late", 20), ("mid", 12)] {
        let rec = MonthlyUsageRecord::first_seen(
            usage_key("CF-LIST", user, "2024-07"),
            at(6, hour),
            ClientMeta::default(),
        );
        ledger.insert(&rec).await?;
    }
    let rows = ledger
        .list_active(&TenantCode::new("CF-LIST"), &period("2024-07"))
        .await?;
    let users: Vec<&str> = rows.iter().map(|r| r.end_user.as_str()).collect();
    assert_eq!(users, vec!["late", "mid", "early"]);
    Ok(())
}
