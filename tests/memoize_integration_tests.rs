//! Integration Tests for Memoization
//!
//! Drives the public API end to end with a controlled clock.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::{json, Value};
use ttl_memo::{
    CacheConfig, CacheKey, CallArgs, ManualClock, MemoError, Memoizer, NamedArgs, SingleFlight,
};

// == Helper Functions ==

fn create_test_cache(maxsize: usize, timeout_secs: u64) -> (Memoizer<Value, ManualClock>, ManualClock) {
    let clock = ManualClock::starting_at(1_700_000_000_000);
    let cache = Memoizer::with_clock(CacheConfig::new(maxsize, timeout_secs), clock.clone())
        .expect("valid config");
    (cache, clock)
}

fn int_arg(n: i64) -> CallArgs {
    CallArgs::new().arg(n).unwrap()
}

/// Identity function that records every argument it was invoked with.
struct Recorder {
    calls: RefCell<Vec<Value>>,
}

impl Recorder {
    fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
        }
    }

    fn call(&self, args: &CallArgs) -> Value {
        let value = args.get(0).cloned().unwrap_or(Value::Null);
        self.calls.borrow_mut().push(value.clone());
        value
    }

    fn calls(&self) -> Vec<Value> {
        self.calls.borrow().clone()
    }
}

// == Idempotent Hit ==

#[test]
fn test_identical_calls_within_ttl_compute_once() {
    let (cache, clock) = create_test_cache(255, 60);
    let recorder = Recorder::new();
    let f = cache.wrap(|args: &CallArgs| recorder.call(args));

    let first = f.call(&int_arg(42)).unwrap();
    clock.advance(Duration::from_secs(59));
    let second = f.call(&int_arg(42)).unwrap();

    assert_eq!(first, second);
    assert_eq!(recorder.calls(), vec![json!(42)]);
}

// == Expiry ==

#[test]
fn test_call_after_ttl_recomputes() {
    let (cache, clock) = create_test_cache(255, 30);
    let recorder = Recorder::new();
    let f = cache.wrap(|args: &CallArgs| recorder.call(args));

    f.call(&int_arg(1)).unwrap();
    clock.advance(Duration::from_millis(30_001));
    f.call(&int_arg(1)).unwrap();

    assert_eq!(recorder.calls().len(), 2);
    // Re-stored in place: still a single entry
    assert_eq!(cache.len(), 1);
}

// == Size Bound ==

#[test]
fn test_size_bound_evicts_oldest_insertions() {
    let maxsize = 5;
    let (cache, _) = create_test_cache(maxsize, 60);
    let f = cache.wrap(|args: &CallArgs| args.get(0).cloned().unwrap_or(Value::Null));

    for n in 0..(maxsize as i64 + 3) {
        f.call(&int_arg(n)).unwrap();
        assert!(cache.len() <= maxsize);
    }

    let expected: Vec<CacheKey> = (3..8)
        .map(|n| cache.derive_key(&int_arg(n)).unwrap())
        .collect();
    assert_eq!(cache.keys(), expected);
    assert_eq!(cache.stats().evictions, 3);
}

// == Type-Sensitive Keying ==

#[test]
fn test_int_and_string_arguments_are_distinct() {
    let (cache, _) = create_test_cache(255, 60);
    let recorder = Recorder::new();
    let f = cache.wrap(|args: &CallArgs| recorder.call(args));

    assert_eq!(f.call(&int_arg(1)).unwrap(), json!(1));
    assert_eq!(f.call(&CallArgs::new().arg("1").unwrap()).unwrap(), json!("1"));

    assert_eq!(recorder.calls(), vec![json!(1), json!("1")]);
    assert_eq!(
        cache.derive_key(&int_arg(1)).unwrap().as_str(),
        "1<int>"
    );
}

// == Overwrite Resets Recency ==

#[test]
fn test_restore_exempts_key_from_next_eviction() {
    let (cache, _) = create_test_cache(3, 60);

    for name in ["a", "b", "c"] {
        cache.store(CacheKey::new(name), json!(name));
    }
    cache.store(CacheKey::new("a"), json!("a2"));

    assert_eq!(cache.store(CacheKey::new("d"), json!("d")), Some(CacheKey::new("b")));
    assert_eq!(cache.lookup(&CacheKey::new("a")), Some(json!("a2")));
}

// == Failure Leaves No Entry ==

#[derive(Debug, PartialEq)]
enum LookupError {
    Cache(MemoError),
    Unavailable,
}

impl From<MemoError> for LookupError {
    fn from(err: MemoError) -> Self {
        LookupError::Cache(err)
    }
}

#[test]
fn test_failed_computation_is_not_cached() {
    let (cache, _) = create_test_cache(255, 60);
    let attempts = RefCell::new(0);
    let f = cache.wrap_fallible(|_: &CallArgs| {
        *attempts.borrow_mut() += 1;
        if *attempts.borrow() < 3 {
            Err(LookupError::Unavailable)
        } else {
            Ok(json!("finally"))
        }
    });

    assert_eq!(f.call(&int_arg(7)), Err(LookupError::Unavailable));
    assert_eq!(f.call(&int_arg(7)), Err(LookupError::Unavailable));
    assert!(!cache.contains_key(&cache.derive_key(&int_arg(7)).unwrap()));

    assert_eq!(f.call(&int_arg(7)), Ok(json!("finally")));
    assert_eq!(f.call(&int_arg(7)), Ok(json!("finally")));
    assert_eq!(*attempts.borrow(), 3);
    assert_eq!(cache.stats().failures, 2);
}

#[test]
fn test_unrepresentable_argument_is_rejected_before_call() {
    let mut weird = BTreeMap::new();
    weird.insert((1, 2), "tuple key");

    let result = CallArgs::new().arg(weird);
    assert!(matches!(result, Err(MemoError::KeyDerivation(_))));
}

#[test]
fn test_infinite_float_never_served_from_none_entry() {
    let (cache, _) = create_test_cache(10, 100);
    let recorder = Recorder::new();
    let f = cache.wrap(|args: &CallArgs| recorder.call(args));

    f.call(&CallArgs::new().arg(None::<f64>).unwrap()).unwrap();
    for value in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
        let result = CallArgs::new().arg(value);
        assert!(matches!(result, Err(MemoError::KeyDerivation(_))));
    }

    assert_eq!(recorder.calls(), vec![Value::Null]);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_fractional_timeout() {
    let clock = ManualClock::starting_at(1_700_000_000_000);
    let config = CacheConfig::new(10, 60).with_timeout(Duration::from_millis(2500));
    let cache: Memoizer<Value, _> = Memoizer::with_clock(config, clock.clone()).unwrap();
    let recorder = Recorder::new();
    let f = cache.wrap(|args: &CallArgs| recorder.call(args));

    f.call(&int_arg(1)).unwrap();
    clock.advance(Duration::from_millis(2499));
    f.call(&int_arg(1)).unwrap();
    assert_eq!(recorder.calls().len(), 1);

    clock.advance(Duration::from_millis(1));
    f.call(&int_arg(1)).unwrap();
    assert_eq!(recorder.calls().len(), 2);
}

// == Hits Do Not Reorder ==

#[test]
fn test_fifo_scenario_with_two_slots() {
    let (cache, _) = create_test_cache(2, 100);
    let recorder = Recorder::new();
    let f = cache.wrap(|args: &CallArgs| recorder.call(args));

    f.call(&int_arg(1)).unwrap(); // miss
    f.call(&int_arg(2)).unwrap(); // miss
    f.call(&int_arg(1)).unwrap(); // hit, does not reorder
    f.call(&int_arg(3)).unwrap(); // miss, evicts 1 (oldest insertion)

    assert_eq!(recorder.calls(), vec![json!(1), json!(2), json!(3)]);
    assert!(!cache.contains_key(&cache.derive_key(&int_arg(1)).unwrap()));

    f.call(&int_arg(2)).unwrap(); // still cached
    f.call(&int_arg(1)).unwrap(); // miss, evicts 2
    assert_eq!(
        recorder.calls(),
        vec![json!(1), json!(2), json!(3), json!(1)]
    );
    assert_eq!(
        cache.keys(),
        vec![
            cache.derive_key(&int_arg(3)).unwrap(),
            cache.derive_key(&int_arg(1)).unwrap()
        ]
    );
}

// == Lazy Expiry ==

#[test]
fn test_expired_entry_is_kept_until_overwritten() {
    let (cache, clock) = create_test_cache(255, 1);
    let f = cache.wrap(|_: &CallArgs| json!("v"));

    f.call(&int_arg(1)).unwrap();
    clock.advance(Duration::from_secs(2));

    let key = cache.derive_key(&int_arg(1)).unwrap();
    assert_eq!(cache.lookup(&key), None);
    assert!(cache.contains_key(&key));
    assert_eq!(cache.len(), 1);

    cache.clear();
    assert!(cache.is_empty());
}

// == Named Arguments ==

#[test]
fn test_named_arguments_key_but_are_dropped_by_default() {
    let (cache, _) = create_test_cache(255, 60);
    let seen = RefCell::new(Vec::new());
    let f = cache.wrap(|args: &CallArgs| {
        seen.borrow_mut().push(args.clone());
        json!(null)
    });

    let args = CallArgs::new()
        .arg("report")
        .unwrap()
        .named("format", "pdf")
        .unwrap();
    f.call(&args).unwrap();

    assert_eq!(seen.borrow()[0], args.without_named());
    assert_eq!(
        cache.derive_key(&args).unwrap().as_str(),
        "report<str>pdf<str>"
    );
}

#[test]
fn test_named_arguments_forwarded_on_request() {
    let clock = ManualClock::new();
    let config = CacheConfig::new(8, 60).with_named_args(NamedArgs::Forward);
    let cache: Memoizer<Value, ManualClock> = Memoizer::with_clock(config, clock).unwrap();
    let f = cache.wrap(|args: &CallArgs| args.get_named("format").cloned().unwrap_or(Value::Null));

    let args = CallArgs::new().named("format", "pdf").unwrap();
    assert_eq!(f.call(&args).unwrap(), json!("pdf"));
}

// == Configuration ==

#[test]
fn test_invalid_configuration_is_rejected() {
    let zero_size = Memoizer::<Value>::new(CacheConfig::new(0, 60));
    assert!(matches!(zero_size, Err(MemoError::Config(_))));

    let zero_timeout = Memoizer::<Value>::new(CacheConfig::new(1, 0));
    assert!(matches!(zero_timeout, Err(MemoError::Config(_))));
}

#[test]
fn test_default_configuration() {
    let config = CacheConfig::default();
    assert_eq!(config.maxsize, 255);
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert!(Memoizer::<Value>::new(config).is_ok());
}

// == Single Flight ==

#[test]
fn test_single_flight_serves_from_shared_cache() {
    let (cache, _) = create_test_cache(255, 60);
    let f = cache.wrap(|_: &CallArgs| json!("sync"));
    f.call(&int_arg(9)).unwrap();

    let flight = SingleFlight::new(cache.clone());
    let result = tokio_test::block_on(flight.get_or_compute(&int_arg(9), |_| async {
        Ok::<Value, MemoError>(json!("async"))
    }));

    assert_eq!(result, Ok(json!("sync")));
}
