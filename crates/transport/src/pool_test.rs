use super::*;
use std::time::Duration;

use syslane_config::TransportConfig;
use tokio::net::TcpListener;

async fn target() -> (TcpListener, Dialer) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let dialer = Dialer::new(TransportConfig::tcp("127.0.0.1", port)).unwrap();
    (listener, dialer)
}

fn config() -> PoolConfig {
    PoolConfig {
        eviction_run_interval: Duration::ZERO,
        ..PoolConfig::default()
    }
}

#[tokio::test]
async fn test_second_acquire_times_out_when_exhausted() {
    let (_listener, dialer) = target().await;
    let pool = ConnectionPool::new(
        "test",
        dialer,
        PoolConfig {
            max_active: 1,
            max_wait: Duration::from_millis(100),
            ..config()
        },
    );

    let _held = pool.acquire().await.unwrap();

    let started = Instant::now();
    let err = pool.acquire().await.unwrap_err();
    assert!(matches!(err, TransportError::PoolExhausted { .. }));
    assert!(started.elapsed() >= Duration::from_millis(90));
    assert_eq!(pool.metrics().exhausted, 1);
    assert_eq!(pool.active_count(), Some(1));
}

#[tokio::test]
async fn test_waiter_gets_released_connection() {
    let (_listener, dialer) = target().await;
    let pool = Arc::new(ConnectionPool::new(
        "test",
        dialer,
        PoolConfig {
            max_active: 1,
            max_wait: Duration::from_secs(2),
            ..config()
        },
    ));

    let held = pool.acquire().await.unwrap();

    let waiter = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move { pool.acquire().await.map(|_| ()) })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(held);

    waiter.await.unwrap().unwrap();
    // The waiter reused the returned connection
    assert_eq!(pool.metrics().created, 1);
}

#[tokio::test]
async fn test_released_connection_is_reused() {
    let (_listener, dialer) = target().await;
    let pool = ConnectionPool::new("test", dialer, config());

    let conn = pool.acquire().await.unwrap();
    drop(conn);
    assert_eq!(pool.idle_count(), 1);

    let _conn = pool.acquire().await.unwrap();
    assert_eq!(pool.idle_count(), 0);

    let m = pool.metrics();
    assert_eq!(m.created, 1);
    assert_eq!(m.borrowed, 2);
    assert_eq!(m.returned, 1);
}

#[tokio::test]
async fn test_invalidate_destroys() {
    let (_listener, dialer) = target().await;
    let pool = ConnectionPool::new("test", dialer, config());

    pool.acquire().await.unwrap().invalidate();
    assert_eq!(pool.idle_count(), 0);
    assert_eq!(pool.metrics().destroyed, 1);
}

#[tokio::test]
async fn test_borrow_probe_discards_dead_connection() {
    let (listener, dialer) = target().await;
    let pool = ConnectionPool::new(
        "test",
        dialer,
        PoolConfig {
            test_on_borrow: true,
            ..config()
        },
    );

    drop(pool.acquire().await.unwrap());
    let (server_side, _) = listener.accept().await.unwrap();
    drop(server_side);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let conn = pool.acquire().await.unwrap();
    assert!(conn.is_alive());

    let m = pool.metrics();
    assert_eq!(m.created, 2);
    assert_eq!(m.destroyed, 1);
}

#[tokio::test]
async fn test_return_probe_discards_dead_connection() {
    let (listener, dialer) = target().await;
    let pool = ConnectionPool::new(
        "test",
        dialer,
        PoolConfig {
            test_on_return: true,
            ..config()
        },
    );

    let conn = pool.acquire().await.unwrap();
    let (server_side, _) = listener.accept().await.unwrap();
    drop(server_side);
    tokio::time::sleep(Duration::from_millis(50)).await;

    drop(conn);
    assert_eq!(pool.idle_count(), 0);
    assert_eq!(pool.metrics().destroyed, 1);
}

async fn fill_idle(pool: &ConnectionPool, count: usize) {
    let mut held = Vec::new();
    for _ in 0..count {
        held.push(pool.acquire().await.unwrap());
    }
    drop(held);
    assert_eq!(pool.idle_count(), count);
}

#[tokio::test]
async fn test_sweep_evicts_past_min_evictable() {
    let (_listener, dialer) = target().await;
    let pool = ConnectionPool::new(
        "test",
        dialer,
        PoolConfig {
            min_evictable_idle_time: Duration::from_millis(10),
            num_tests_per_eviction_run: 0,
            min_idle: 1,
            ..config()
        },
    );

    fill_idle(&pool, 2).await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    let report = pool.evict_sweep();
    assert_eq!(report.examined, 2);
    // Hard eviction ignores min_idle
    assert_eq!(report.evicted, 2);
    assert_eq!(pool.idle_count(), 0);
}

#[tokio::test]
async fn test_soft_eviction_keeps_min_idle() {
    let (_listener, dialer) = target().await;
    let pool = ConnectionPool::new(
        "test",
        dialer,
        PoolConfig {
            min_evictable_idle_time: Duration::ZERO,
            soft_min_evictable_idle_time: Duration::from_millis(10),
            num_tests_per_eviction_run: 0,
            min_idle: 1,
            ..config()
        },
    );

    fill_idle(&pool, 3).await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    let report = pool.evict_sweep();
    assert_eq!(report.soft_evicted, 2);
    assert_eq!(report.evicted, 0);
    assert_eq!(pool.idle_count(), 1);
}

#[tokio::test]
async fn test_sweep_examines_limited_number() {
    let (_listener, dialer) = target().await;
    let pool = ConnectionPool::new(
        "test",
        dialer,
        PoolConfig {
            min_evictable_idle_time: Duration::from_millis(10),
            num_tests_per_eviction_run: 1,
            ..config()
        },
    );

    fill_idle(&pool, 3).await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    let report = pool.evict_sweep();
    assert_eq!(report.examined, 1);
    assert_eq!(pool.idle_count(), 2);
}

#[tokio::test]
async fn test_sweep_keeps_fresh_connections() {
    let (_listener, dialer) = target().await;
    let pool = ConnectionPool::new("test", dialer, config());

    fill_idle(&pool, 2).await;
    let report = pool.evict_sweep();
    assert_eq!(report.closed(), 0);
    assert_eq!(pool.idle_count(), 2);
}

#[tokio::test]
async fn test_idle_probe_closes_dead() {
    let (listener, dialer) = target().await;
    let pool = ConnectionPool::new(
        "test",
        dialer,
        PoolConfig {
            test_while_idle: true,
            num_tests_per_eviction_run: 0,
            ..config()
        },
    );

    fill_idle(&pool, 1).await;
    let (server_side, _) = listener.accept().await.unwrap();
    drop(server_side);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let report = pool.evict_sweep();
    assert_eq!(report.failed_probe, 1);
    assert_eq!(pool.idle_count(), 0);
}

#[tokio::test]
async fn test_ensure_min_idle_refills() {
    let (_listener, dialer) = target().await;
    let pool = ConnectionPool::new(
        "test",
        dialer,
        PoolConfig {
            min_idle: 2,
            max_active: 4,
            ..config()
        },
    );

    assert_eq!(pool.ensure_min_idle().await, 2);
    assert_eq!(pool.idle_count(), 2);
    assert_eq!(pool.ensure_min_idle().await, 0);
}

#[tokio::test]
async fn test_close_fails_acquire_and_drops_idle() {
    let (_listener, dialer) = target().await;
    let pool = ConnectionPool::new("test", dialer, config());

    fill_idle(&pool, 2).await;
    pool.close().await;

    assert!(pool.is_closed());
    assert_eq!(pool.idle_count(), 0);
    assert!(matches!(
        pool.acquire().await,
        Err(TransportError::PoolClosed)
    ));
}

#[tokio::test]
async fn test_unbounded_pool() {
    let (_listener, dialer) = target().await;
    let pool = ConnectionPool::new(
        "test",
        dialer,
        PoolConfig {
            max_active: 0,
            max_wait: Duration::ZERO,
            ..config()
        },
    );

    let mut held = Vec::new();
    for _ in 0..12 {
        held.push(pool.acquire().await.unwrap());
    }
    assert_eq!(pool.active_count(), None);
}
