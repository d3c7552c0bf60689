//! Transfer-window behaviour over a real worker thread, below the bridge API.

use std::sync::Arc;
use std::thread;

use futures::channel::mpsc;
use transport::{begin_call, read_result, SharedChannel, HEADER_SIZE};
use worker_runtime::{spawn_worker, Bootstrap, Value};

use crate::{fixture_registry, reference_bytes, FIXED_LEN};

#[test]
fn fixed_result_takes_three_rounds() {
    let _ = env_logger::builder().is_test(true).try_init();
    let channel = Arc::new(SharedChannel::new(8192).expect("channel"));
    assert_eq!(channel.window_capacity(), 8184);

    let worker = spawn_worker(fixture_registry(), "chunk-worker").expect("worker");
    let (args, rx) = mpsc::unbounded();
    assert!(worker.register(Bootstrap {
        definition: "fixed_20000".into(),
        args: rx,
        channel: Arc::clone(&channel),
    }));

    begin_call(&channel).expect("begin");
    args.unbounded_send(Vec::new()).expect("send");
    let transfer = read_result(&channel).expect("read");

    assert!(transfer.ok);
    assert_eq!(transfer.chunk_lens, vec![8184, 8184, 3632]);
    assert_eq!(transfer.bytes.len(), FIXED_LEN);
    assert_eq!(transfer.bytes, reference_bytes(FIXED_LEN));
}

#[test]
fn boundary_lengths_through_worker() {
    const W: usize = 32;
    let channel = Arc::new(SharedChannel::new(HEADER_SIZE + W).expect("channel"));
    let worker = spawn_worker(fixture_registry(), "boundary-worker").expect("worker");
    let (args, rx) = mpsc::unbounded();
    worker.register(Bootstrap {
        definition: "sized".into(),
        args: rx,
        channel: Arc::clone(&channel),
    });

    for len in [0, 1, W - 1, W, W + 1, 3 * W] {
        begin_call(&channel).expect("begin");
        args.unbounded_send(vec![Value::from(len as i64)])
            .expect("send");
        let transfer = read_result(&channel).expect("read");
        assert!(transfer.ok, "length {len}");
        assert_eq!(transfer.bytes, reference_bytes(len), "length {len}");
        assert_eq!(transfer.chunk_lens.len(), len.div_ceil(W), "length {len}");
    }
}

#[test]
fn teardown_mid_transfer_releases_both_threads() {
    const W: usize = 16;
    let channel = Arc::new(SharedChannel::new(HEADER_SIZE + W).expect("channel"));
    let worker = spawn_worker(fixture_registry(), "teardown-worker").expect("worker");
    let (args, rx) = mpsc::unbounded();
    worker.register(Bootstrap {
        definition: "sized".into(),
        args: rx,
        channel: Arc::clone(&channel),
    });

    // Publish the request, then never drain: the worker parks awaiting an ack.
    begin_call(&channel).expect("begin");
    args.unbounded_send(vec![Value::from(4 * W as i64)])
        .expect("send");
    transport::wait::wait_while(&channel.header().remaining, transport::window::PENDING, || {
        false
    });

    let killer = {
        let channel = Arc::clone(&channel);
        thread::spawn(move || channel.terminate())
    };
    killer.join().expect("terminate");
    worker.shutdown();
    assert!(worker.join(), "worker thread exits after teardown");
}
