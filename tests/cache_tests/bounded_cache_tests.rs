//! Tests for BoundedCache
//!
//! These tests verify:
//! - Admission when the budget allows it
//! - FIFO eviction by byte budget and by entry count
//! - Budget re-sampling between calls
//! - Loader behaviour (skipped on hits, errors not cached)
//! - Concurrent misses on the same key

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use blobkv::cache::{BoundedCache, DEFAULT_CAPACITY};
use blobkv::BlobError;
use bytes::Bytes;

// =============================================================================
// Helper Functions
// =============================================================================

fn load(cache: &BoundedCache, key: &str, data: &[u8]) -> Bytes {
    let data = Bytes::copy_from_slice(data);
    cache.get_or_load(key, |_| Ok(data)).unwrap()
}

/// Cache whose budget can be changed from the test
fn cache_with_budget(initial: u64) -> (BoundedCache, Arc<AtomicU64>) {
    let budget = Arc::new(AtomicU64::new(initial));
    let sampled = Arc::clone(&budget);
    let cache = BoundedCache::new(move || sampled.load(Ordering::SeqCst));
    (cache, budget)
}

// =============================================================================
// Admission Tests
// =============================================================================

#[test]
fn test_element_is_added_when_memory_allows() {
    let cache = BoundedCache::new(|| 10u64);
    let data = [1u8, 2, 42];

    assert_eq!(load(&cache, "key", &data), &data[..]);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.resident_bytes(), 3);
    assert_eq!(cache.capacity(), DEFAULT_CAPACITY);
}

#[test]
fn test_zero_memory_still_returns_data() {
    let cache = BoundedCache::new(|| 0u64);
    let data = [1u8, 2, 42];

    assert!(cache.is_empty());
    assert_eq!(load(&cache, "key", &data), &data[..]);
    assert!(cache.is_empty());
}

#[test]
fn test_element_is_returned_even_if_it_never_fits() {
    let cache = BoundedCache::new(|| 3u64);
    let big = [10u8, 9, 8, 7, 6, 5, 4, 3, 2, 1];

    assert_eq!(load(&cache, "key", &big), &big[..]);
    assert_eq!(cache.len(), 0);
    assert_eq!(cache.resident_bytes(), 0);
}

// =============================================================================
// Eviction Tests
// =============================================================================

#[test]
fn test_elements_are_evicted_when_memory_runs_out() {
    let cache = BoundedCache::new(|| 10u64);

    load(&cache, "key1", &[1, 2, 42]);
    load(&cache, "key2", &[1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(cache.len(), 2);

    load(&cache, "big", &[10, 9, 8, 7, 6, 5, 4, 3, 2, 1]);

    assert_eq!(cache.len(), 1);
    assert!(cache.contains_key("big"));
    assert_eq!(cache.resident_bytes(), 10);
}

#[test]
fn test_hits_do_not_requeue() {
    let cache = BoundedCache::new(|| 10u64);
    let data = [1u8, 2, 42];
    let big = [10u8, 9, 8, 7, 6, 5, 4, 3, 2, 1];

    load(&cache, "key", &data);
    load(&cache, "key", &data);
    load(&cache, "big", &big);

    assert_eq!(cache.len(), 1);
    assert!(!cache.contains_key("key"));
    assert_eq!(cache.peek("big").unwrap(), &big[..]);
}

#[test]
fn test_first_admitted_is_evicted_first() {
    let cache = BoundedCache::new(|| 10u64);
    let data1 = [1u8, 2, 42];
    let data2 = [1u8, 2, 3];
    let data3 = [1u8, 2, 3, 4, 5, 6, 7];

    load(&cache, "key1", &data1);
    load(&cache, "key2", &data2);
    // A hit on key1 must not protect it
    load(&cache, "key1", &data1);
    load(&cache, "key3", &data3);

    assert_eq!(cache.len(), 2);
    assert!(!cache.contains_key("key1"));
    assert_eq!(cache.peek("key2").unwrap(), &data2[..]);
    assert_eq!(cache.peek("key3").unwrap(), &data3[..]);
}

#[test]
fn test_shrinking_budget_evicts_more() {
    let (cache, budget) = cache_with_budget(10);
    let data1 = [1u8, 2, 42];

    load(&cache, "key1", &data1);
    load(&cache, "key2", &[1, 2, 3]);
    load(&cache, "key3", &[1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(cache.len(), 2);

    budget.store(3, Ordering::SeqCst);
    load(&cache, "key1", &data1);

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.peek("key1").unwrap(), &data1[..]);
}

#[test]
fn test_growing_budget_admits_more() {
    let (cache, budget) = cache_with_budget(10);
    let data1 = [1u8, 2, 42];

    load(&cache, "key1", &data1);
    load(&cache, "key2", &[1, 2, 3]);
    load(&cache, "key3", &[1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(cache.len(), 2);

    budget.store(20, Ordering::SeqCst);
    load(&cache, "key1", &data1);

    assert_eq!(cache.len(), 3);
    assert_eq!(cache.resident_bytes(), 13);
}

#[test]
fn test_capacity_evicts_oldest_even_with_memory_left() {
    let cache = BoundedCache::with_capacity(|| 10u64, 1);
    let data2 = [1u8, 2, 3];

    load(&cache, "key1", &[1, 2, 42]);
    load(&cache, "key2", &data2);

    assert_eq!(cache.len(), 1);
    assert!(!cache.contains_key("key1"));
    assert_eq!(cache.peek("key2").unwrap(), &data2[..]);
}

#[test]
fn test_zero_capacity_behaves_as_one() {
    let cache = BoundedCache::with_capacity(|| 100u64, 0);

    load(&cache, "key1", &[1]);
    load(&cache, "key2", &[2]);

    assert_eq!(cache.capacity(), 1);
    assert_eq!(cache.len(), 1);
    assert!(cache.contains_key("key2"));
}

#[test]
fn test_resident_set_matches_fifo_simulation() {
    let capacity = 4;
    let budget = 40u64;
    let cache = BoundedCache::with_capacity(move || budget, capacity);
    let sizes = [5usize, 12, 3, 20, 8, 1, 30, 2, 9, 9, 14, 6, 41, 4, 7];

    // Reference model: evict oldest while full or over budget, then admit if it fits
    let mut model: VecDeque<(String, u64)> = VecDeque::new();
    for (i, &size) in sizes.iter().enumerate() {
        let key = format!("key{}", i);
        load(&cache, &key, &vec![i as u8; size]);

        let incoming = size as u64;
        loop {
            let resident: u64 = model.iter().map(|(_, s)| s).sum();
            if model.is_empty() || (model.len() < capacity && resident + incoming <= budget) {
                break;
            }
            model.pop_front();
        }
        let resident: u64 = model.iter().map(|(_, s)| s).sum();
        if resident + incoming <= budget {
            model.push_back((key, incoming));
        }
    }

    let expected: HashMap<String, u64> = model.into_iter().collect();
    assert_eq!(cache.len(), expected.len());
    assert_eq!(cache.resident_bytes(), expected.values().sum::<u64>());
    for (key, size) in &expected {
        assert_eq!(cache.peek(key).unwrap().len() as u64, *size);
    }
}

#[test]
fn test_clear_empties_cache() {
    let cache = BoundedCache::new(|| 100u64);
    load(&cache, "key1", &[1, 2, 3]);
    load(&cache, "key2", &[4, 5]);

    cache.clear();

    assert!(cache.is_empty());
    assert_eq!(cache.resident_bytes(), 0);
}

// =============================================================================
// Loader Tests
// =============================================================================

#[test]
fn test_loader_is_skipped_on_hit() {
    let cache = BoundedCache::new(|| 100u64);
    let calls = AtomicUsize::new(0);

    for _ in 0..3 {
        let value = cache
            .get_or_load("key", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Bytes::from_static(b"value"))
            })
            .unwrap();
        assert_eq!(value, &b"value"[..]);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_loader_error_is_propagated_and_not_cached() {
    let cache = BoundedCache::new(|| 100u64);

    let result = cache.get_or_load("missing", |key| Err(BlobError::NotFound(key.to_string())));

    assert!(matches!(result, Err(BlobError::NotFound(ref k)) if k == "missing"));
    assert!(cache.is_empty());
}

#[test]
fn test_loader_receives_requested_key() {
    let cache = BoundedCache::new(|| 100u64);

    let value = cache
        .get_or_load("echo", |key| Ok(Bytes::copy_from_slice(key.as_bytes())))
        .unwrap();

    assert_eq!(value, &b"echo"[..]);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_misses_admit_key_once() {
    let cache = Arc::new(BoundedCache::new(|| 1024u64));
    let calls = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(8));

    let mut handles = vec![];
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        let calls = Arc::clone(&calls);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            cache
                .get_or_load("shared", |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Bytes::from_static(b"payload"))
                })
                .unwrap()
        }));
    }

    for handle in handles {
        assert_eq!(handle.join().unwrap(), &b"payload"[..]);
    }

    // Redundant loads are tolerated, duplicate admissions are not
    assert!(calls.load(Ordering::SeqCst) >= 1);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.resident_bytes(), 7);
}

#[test]
fn test_concurrent_distinct_keys_respect_budget() {
    let cache = Arc::new(BoundedCache::with_capacity(|| 100u64, 16));

    let mut handles = vec![];
    for t in 0..4 {
        let cache = Arc::clone(&cache);
        handles.push(thread::spawn(move || {
            for i in 0..50 {
                let key = format!("t{}_k{}", t, i);
                let data = vec![t as u8; 1 + (i % 10)];
                let value = cache.get_or_load(&key, |_| Ok(Bytes::from(data.clone()))).unwrap();
                assert_eq!(value, data);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(cache.len() <= 16);
    assert!(cache.resident_bytes() <= 100);
}
