//! Invariant 9 from spec.md §8: submitting `M` tasks to the work-stealing
//! thread pool yields exactly `M` completions, with futures resolving in
//! finite time, even when tasks are wildly uneven in duration (forcing
//! stealing to matter).

use rayshape_kernel::ThreadPool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn uneven_workload_completes_exactly_once_per_task() {
    let pool = ThreadPool::new(4);
    let counter = Arc::new(AtomicUsize::new(0));

    let futures: Vec<_> = (0..500)
        .map(|i| {
            let counter = counter.clone();
            pool.commit(move || {
                if i % 23 == 0 {
                    std::thread::sleep(Duration::from_micros(200));
                }
                counter.fetch_add(1, Ordering::SeqCst);
                i
            })
        })
        .collect();

    let mut results: Vec<usize> = futures.into_iter().map(|f| f.join()).collect();
    results.sort_unstable();

    assert_eq!(counter.load(Ordering::SeqCst), 500);
    assert_eq!(results, (0..500).collect::<Vec<_>>());
    pool.deinit();
}

#[test]
fn pool_of_one_worker_still_drains_every_task() {
    let pool = ThreadPool::new(1);
    let counter = Arc::new(AtomicUsize::new(0));
    let futures: Vec<_> = (0..50)
        .map(|_| {
            let counter = counter.clone();
            pool.commit(move || counter.fetch_add(1, Ordering::SeqCst))
        })
        .collect();
    for f in futures {
        f.join();
    }
    assert_eq!(counter.load(Ordering::SeqCst), 50);
    pool.deinit();
}
