//! End-to-end tests for the dedicated thread pool and scheduler adapter

use dedicated_thread_pool::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_throughput_small_pool() {
    init_logging();
    // Two workers chew through a large batch of trivial items.
    let pool = DedicatedThreadPool::new(PoolSettings::new(2).with_name("throughput"))
        .expect("Failed to create pool");

    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..1000 {
        let counter = Arc::clone(&counter);
        assert!(pool.submit(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        }));
    }

    assert!(pool.wait_for_exit_timeout(Duration::from_secs(5)));
    assert_eq!(counter.load(Ordering::Relaxed), 1000);
}

#[test]
fn test_backpressure_throttles_producer() {
    init_logging();
    // A single slow worker and a tiny queue bound: the producer must be
    // paced by the consumer instead of racing ahead, and every submission
    // still succeeds.
    let pool = DedicatedThreadPool::new(
        PoolSettings::new(1)
            .with_name("backpressure")
            .with_max_queue_size(10),
    )
    .expect("Failed to create pool");

    let executed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();
    for _ in 0..50 {
        let executed = Arc::clone(&executed);
        assert!(pool.submit(move || {
            thread::sleep(Duration::from_millis(10));
            executed.fetch_add(1, Ordering::SeqCst);
        }));
    }
    let submit_elapsed = start.elapsed();

    // 50 items at 10ms each behind a bound of 10 means the submission loop
    // itself had to wait for a good share of the work to finish.
    assert!(
        submit_elapsed >= Duration::from_millis(100),
        "producer was not throttled: submissions finished in {:?}",
        submit_elapsed
    );

    assert!(pool.wait_for_exit_timeout(Duration::from_secs(10)));
    assert_eq!(executed.load(Ordering::SeqCst), 50);
}

#[test]
fn test_panic_then_success_on_same_worker() {
    init_logging();
    let caught = Arc::new(AtomicUsize::new(0));
    let caught_clone = Arc::clone(&caught);
    let pool = DedicatedThreadPool::new(
        PoolSettings::new(1)
            .with_name("panicky")
            .with_panic_handler(move |_| {
                caught_clone.fetch_add(1, Ordering::SeqCst);
            }),
    )
    .expect("Failed to create pool");

    assert!(pool.submit(|| panic!("intentional panic for testing")));

    let executed = Arc::new(AtomicUsize::new(0));
    let executed_clone = Arc::clone(&executed);
    assert!(pool.submit(move || {
        executed_clone.fetch_add(1, Ordering::SeqCst);
    }));

    assert!(pool.wait_for_exit_timeout(Duration::from_secs(5)));
    assert_eq!(caught.load(Ordering::SeqCst), 1);
    assert_eq!(executed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_submit_after_shutdown_is_refused() {
    init_logging();
    let pool =
        DedicatedThreadPool::new(PoolSettings::new(2)).expect("Failed to create pool");
    pool.shutdown();
    assert!(pool.is_shut_down());
    assert!(!pool.submit(|| unreachable!("must never run")));
    assert!(pool.wait_for_exit_timeout(Duration::from_secs(5)));
}

#[test]
fn test_concurrency_never_exceeds_thread_count() {
    init_logging();
    let pool = DedicatedThreadPool::new(PoolSettings::new(3).with_name("bounded"))
        .expect("Failed to create pool");

    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    for _ in 0..60 {
        let active = Arc::clone(&active);
        let peak = Arc::clone(&peak);
        assert!(pool.submit(move || {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            active.fetch_sub(1, Ordering::SeqCst);
        }));
    }

    assert!(pool.wait_for_exit_timeout(Duration::from_secs(10)));
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(peak.load(Ordering::SeqCst) >= 1);
}

#[test]
fn test_exactly_once_under_contention() {
    init_logging();
    // Many producers, many consumers: every item runs exactly once.
    let pool = Arc::new(
        DedicatedThreadPool::new(PoolSettings::new(4).with_name("exactly-once"))
            .expect("Failed to create pool"),
    );

    let per_item = Arc::new(
        (0..800)
            .map(|_| AtomicUsize::new(0))
            .collect::<Vec<_>>(),
    );

    let producers: Vec<_> = (0..8)
        .map(|p| {
            let pool = Arc::clone(&pool);
            let per_item = Arc::clone(&per_item);
            thread::spawn(move || {
                for i in 0..100 {
                    let per_item = Arc::clone(&per_item);
                    let index = p * 100 + i;
                    assert!(pool.submit(move || {
                        per_item[index].fetch_add(1, Ordering::SeqCst);
                    }));
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().expect("producer panicked");
    }

    assert!(pool.wait_for_exit_timeout(Duration::from_secs(10)));
    for (index, runs) in per_item.iter().enumerate() {
        assert_eq!(runs.load(Ordering::SeqCst), 1, "item {} ran wrong count", index);
    }
}

struct CountingTask {
    runs: AtomicUsize,
}

impl Task for CountingTask {
    fn run(&self, _ctx: &TaskContext) {
        self.runs.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_scheduler_runs_queued_tasks_on_pool_threads() {
    init_logging();
    let pool = Arc::new(
        DedicatedThreadPool::new(PoolSettings::new(2).with_name("scheduled"))
            .expect("Failed to create pool"),
    );
    let scheduler = PoolTaskScheduler::new(Arc::clone(&pool));
    assert_eq!(scheduler.maximum_concurrency(), 2);

    let tasks: Vec<_> = (0..100)
        .map(|_| {
            Arc::new(CountingTask {
                runs: AtomicUsize::new(0),
            })
        })
        .collect();
    for task in &tasks {
        scheduler.queue_task(task.clone());
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline
        && tasks.iter().any(|t| t.runs.load(Ordering::SeqCst) == 0)
    {
        thread::sleep(Duration::from_millis(5));
    }

    for task in &tasks {
        assert_eq!(task.runs.load(Ordering::SeqCst), 1);
    }
    pool.wait_for_exit();
}

#[test]
fn test_scheduler_drain_concurrency_bounded_by_pool() {
    struct SlowTask {
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }
    impl Task for SlowTask {
        fn run(&self, _ctx: &TaskContext) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    init_logging();
    // The pool has spare threads, but the scheduler only ever asks for as
    // many drain jobs as the pool has threads.
    let pool = Arc::new(
        DedicatedThreadPool::new(PoolSettings::new(2).with_name("drain-bound"))
            .expect("Failed to create pool"),
    );
    let scheduler = PoolTaskScheduler::new(Arc::clone(&pool));

    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    for _ in 0..40 {
        scheduler.queue_task(Arc::new(SlowTask {
            active: Arc::clone(&active),
            peak: Arc::clone(&peak),
        }));
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline && scheduler.pending_len() > 0 {
        thread::sleep(Duration::from_millis(5));
    }

    pool.wait_for_exit();
    assert_eq!(scheduler.pending_len(), 0);
    assert!(peak.load(Ordering::SeqCst) <= 2);
}

#[test]
fn test_scheduler_survives_panicking_task() {
    init_logging();

    struct PanickingTask;
    impl Task for PanickingTask {
        fn run(&self, _ctx: &TaskContext) {
            panic!("intentional panic for testing");
        }
    }

    // One thread, so the panicking node and its successor share a drain job.
    let pool = Arc::new(
        DedicatedThreadPool::new(PoolSettings::new(1).with_name("panicky-sched"))
            .expect("Failed to create pool"),
    );
    let scheduler = PoolTaskScheduler::new(Arc::clone(&pool));

    scheduler.queue_task(Arc::new(PanickingTask));
    let survivor = Arc::new(CountingTask {
        runs: AtomicUsize::new(0),
    });
    scheduler.queue_task(survivor.clone());

    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline && survivor.runs.load(Ordering::SeqCst) == 0 {
        thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(survivor.runs.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.pending_len(), 0);

    // Tasks queued after the panic still get fresh drain jobs.
    let later = Arc::new(CountingTask {
        runs: AtomicUsize::new(0),
    });
    scheduler.queue_task(later.clone());
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline && later.runs.load(Ordering::SeqCst) == 0 {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(later.runs.load(Ordering::SeqCst), 1);
    pool.wait_for_exit();
}
