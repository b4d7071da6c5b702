use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use vitalsync_sync::{MainBound, MainContext, SyncError};

#[test]
fn test_thread_is_not_main() {
    assert!(!MainContext::is_current());
}

#[tokio::test]
async fn run_executes_on_the_main_thread() {
    let main = MainContext::spawn("test-main").unwrap();

    let (on_main, name) = main
        .run(|| {
            (
                MainContext::is_current(),
                std::thread::current().name().map(str::to_string),
            )
        })
        .await
        .unwrap();

    assert!(on_main);
    assert_eq!(name.as_deref(), Some("test-main"));
    assert!(!MainContext::is_current());
}

#[tokio::test]
async fn jobs_run_in_order() {
    let main = MainContext::spawn("test-main").unwrap();
    let bound = MainBound::new(main, Vec::new());

    for i in 0..10 {
        bound.update(move |v: &mut Vec<i32>| v.push(i)).await.unwrap();
    }

    let seen = bound.read(|v| v.clone()).await.unwrap();
    assert_eq!(seen, (0..10).collect::<Vec<_>>());
}

#[tokio::test]
async fn dispatched_jobs_are_not_awaited_but_run() {
    let main = MainContext::spawn("test-main").unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..5 {
        let counter = Arc::clone(&counter);
        main.dispatch(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }
    main.run(|| ()).await.unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn panicking_job_does_not_stop_the_context() {
    let main = MainContext::spawn("test-main").unwrap();

    let panicked = main.run::<u8, _>(|| panic!("boom")).await;
    assert!(matches!(panicked, Err(SyncError::MainContextClosed)));

    let after = main.run(|| 7).await.unwrap();
    assert_eq!(after, 7);
}

#[tokio::test]
async fn clones_share_state() {
    let main = MainContext::spawn("test-main").unwrap();
    let a = MainBound::new(main, 0u32);
    let b = a.clone();

    a.update(|n| *n += 1).await.unwrap();
    b.update(|n| *n += 1).await.unwrap();

    assert_eq!(a.read(|n| *n).await.unwrap(), 2);
}
