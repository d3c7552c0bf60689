//! Synchronous callers driving remote functions through a full bridge.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use await_sync::{create_bridge, Bridge, BridgeConfig, BridgeError, CancelSignal, StaticRegistry, Value};
use parking_lot::Mutex;

use crate::{fixture_registry, reference_bytes, FIXED_LEN};

fn bridge_with(signal: Option<&CancelSignal>) -> Bridge {
    let _ = env_logger::builder().is_test(true).try_init();
    create_bridge(fixture_registry(), signal).expect("bridge")
}

#[test]
fn large_result_arrives_intact() -> Result<()> {
    let bridge = Bridge::with_config(fixture_registry(), BridgeConfig::default(), None)?;
    assert_eq!(bridge.window_capacity(), 8184);
    let fixed = bridge.register("fixed_20000");
    let bytes = fixed.invoke(Vec::new())?;
    assert_eq!(bytes.len(), FIXED_LEN);
    assert_eq!(bytes, reference_bytes(FIXED_LEN));
    Ok(())
}

#[test]
fn arguments_of_each_kind_reach_the_worker() -> Result<()> {
    let bridge = bridge_with(None);
    let echo = bridge.register("echo");
    assert_eq!(echo.invoke(vec![Value::from(&b"\x00\xffraw"[..])])?, b"\x00\xffraw");
    assert_eq!(echo.invoke(vec!["text".into()])?, b"text");
    assert_eq!(echo.invoke(vec![Value::Number(2.5)])?, b"Number(2.5)");
    assert_eq!(echo.invoke(Vec::new())?, Vec::<u8>::new());
    Ok(())
}

#[test]
fn rejection_is_raised_with_trace() {
    let bridge = bridge_with(None);
    let reject = bridge.register("reject");
    match reject.invoke(Vec::new()) {
        Err(err @ BridgeError::Execution { .. }) => {
            assert_eq!(err.message(), Some("boom"));
            assert_eq!(err.trace(), Some("stack-trace"));
        }
        other => panic!("expected execution error, got {other:?}"),
    }
}

#[test]
fn non_byte_results_violate_contract() {
    let bridge = bridge_with(None);
    for (name, type_name) in [("number", "number"), ("text", "string")] {
        let err = bridge
            .register(name)
            .invoke(Vec::new())
            .expect_err("contract violation");
        assert_eq!(
            err.message(),
            Some(format!("result must be a byte buffer, got: {type_name}").as_str())
        );
    }
}

#[test]
fn suspending_function_blocks_caller_until_settled() -> Result<()> {
    let bridge = bridge_with(None);
    let delayed = bridge.register_with("delayed", |bytes| String::from_utf8(bytes));
    let started = Instant::now();
    let text = delayed.invoke(vec![Value::from(30)])??;
    assert_eq!(text, "slept");
    assert!(started.elapsed() >= Duration::from_millis(30));
    Ok(())
}

#[test]
fn calls_issued_before_loading_completes_are_served() -> Result<()> {
    let bridge = bridge_with(None);
    let sized = bridge.register("sized");
    // No readiness barrier: the first call races the load and must still land.
    assert_eq!(sized.invoke(vec![Value::from(100)])?, reference_bytes(100));
    Ok(())
}

#[test]
fn unknown_definition_reports_load_failure() {
    let bridge = bridge_with(None);
    let err = bridge
        .register("does_not_exist")
        .invoke(Vec::new())
        .expect_err("load failure");
    assert_eq!(
        err.message(),
        Some("failed to load function: unknown function: does_not_exist")
    );
}

#[test]
fn sequential_calls_never_interleave() -> Result<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let worker_log = Arc::clone(&log);
    let registry = StaticRegistry::new().with("record", move |args: Vec<Value>| {
        let log = Arc::clone(&worker_log);
        async move {
            let n = args.first().and_then(Value::as_i64).unwrap_or(-1);
            log.lock().push(format!("run {n}"));
            Ok(Value::Bytes(reference_bytes(10_000 + n as usize)))
        }
    });
    let bridge = Bridge::with_config(registry, BridgeConfig::default().with_capacity(1024), None)?;
    let record = bridge.register("record");

    for n in 0..3 {
        log.lock().push(format!("send {n}"));
        let bytes = record.invoke(vec![Value::from(n)])?;
        assert_eq!(bytes, reference_bytes(10_000 + n as usize));
        log.lock().push(format!("drained {n}"));
    }

    let expected: Vec<String> = (0..3)
        .flat_map(|n| [format!("send {n}"), format!("run {n}"), format!("drained {n}")])
        .collect();
    assert_eq!(*log.lock(), expected);
    Ok(())
}

#[test]
fn concurrent_callers_are_serialised() {
    let bridge = Bridge::with_config(
        fixture_registry(),
        BridgeConfig::default().with_capacity(128),
        None,
    )
    .expect("bridge");
    let sized = bridge.register("sized");

    let callers: Vec<_> = (0..4)
        .map(|i| {
            let sized = sized.clone();
            thread::spawn(move || -> Result<()> {
                for round in 0..10 {
                    let len = 500 + i * 97 + round;
                    let bytes = sized.invoke(vec![Value::from(len as i64)])?;
                    if bytes != reference_bytes(len) {
                        return Err(anyhow!("caller {i} round {round} got foreign bytes"));
                    }
                }
                Ok(())
            })
        })
        .collect();

    for caller in callers {
        caller.join().expect("caller thread").expect("caller result");
    }
}

#[test]
fn cancelled_bridge_fails_fast() {
    let signal = CancelSignal::new();
    let bridge = bridge_with(Some(&signal));
    let echo = bridge.register("echo");
    assert_eq!(echo.invoke(vec!["before".into()]).expect("call"), b"before");

    signal.cancel();
    assert!(bridge.is_terminated());

    let started = Instant::now();
    assert!(matches!(
        echo.invoke(vec!["after".into()]),
        Err(BridgeError::Terminated)
    ));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn signal_cancelled_before_creation_tears_down_immediately() {
    let signal = CancelSignal::new();
    signal.cancel();
    let bridge = bridge_with(Some(&signal));
    assert!(bridge.is_terminated());
    assert!(matches!(
        bridge.register("echo").invoke(Vec::new()),
        Err(BridgeError::Terminated)
    ));
}

#[test]
fn cancellation_releases_blocked_caller() {
    let signal = CancelSignal::new();
    let bridge = bridge_with(Some(&signal));
    let never = bridge.register("never");

    let canceller = {
        let signal = signal.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            signal.cancel();
        })
    };

    assert!(matches!(never.invoke(Vec::new()), Err(BridgeError::Terminated)));
    canceller.join().expect("canceller");
}
