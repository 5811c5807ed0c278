use crate::*;
use clfs_core::wire::PAGE_SIZE;
use clfs_core::Outcome;

/// Concurrent PUTs to one id are serialized: none fails, nothing hangs, and
/// the survivor is exactly one of the written versions.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_puts_same_id() {
    let server = TestServer::start().await.unwrap();
    let len = 5 * PAGE_SIZE + 100;

    let mut tasks = Vec::new();
    for seed in 0..8u8 {
        let client = server.client();
        tasks.push(tokio::spawn(async move {
            client.put(77, &blob(len, seed)).await
        }));
    }

    for task in tasks {
        let outcome = tokio::time::timeout(CLIENT_TIMEOUT * 4, task)
            .await
            .expect("concurrent PUT deadlocked")
            .unwrap()
            .unwrap();
        assert_eq!(outcome, Outcome::Ok);
    }

    let stored = server.client().get(77, len as u32).await.unwrap();
    assert!(
        (0..8u8).any(|seed| stored[..] == blob(len, seed)[..]),
        "stored object is a mix of several writers"
    );
}

/// Traffic on distinct ids proceeds in parallel and stays independent.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_distinct_ids() {
    let server = TestServer::start().await.unwrap();

    let mut tasks = Vec::new();
    for id in 0..16u32 {
        let client = server.client();
        tasks.push(tokio::spawn(async move {
            let data = blob(PAGE_SIZE * (id as usize % 4) + id as usize, id as u8);
            assert_eq!(client.put(id, &data).await.unwrap(), Outcome::Ok);
            let fetched = client.get(id, data.len() as u32).await.unwrap();
            assert!(fetched[..] == data[..], "object {id} corrupted");
        }));
    }

    for task in tasks {
        tokio::time::timeout(CLIENT_TIMEOUT * 4, task)
            .await
            .expect("parallel transfer hung")
            .unwrap();
    }
    assert!(server.store_files().is_empty());
}

/// PUT, GET and RM racing on one id never crash or wedge the server.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mixed_operations_same_id() {
    let server = TestServer::start().await.unwrap();
    let data = blob(3 * PAGE_SIZE, 5);

    let mut tasks = Vec::new();
    for i in 0..12 {
        let client = server.client();
        let data = data.clone();
        tasks.push(tokio::spawn(async move {
            match i % 3 {
                0 => {
                    client.put(90, &data).await.unwrap();
                }
                1 => {
                    // May find the object or not; either answer is fine.
                    let _ = client.get(90, data.len() as u32).await;
                }
                _ => {
                    let _ = client.remove(90).await.unwrap();
                }
            }
        }));
    }

    for task in tasks {
        tokio::time::timeout(CLIENT_TIMEOUT * 4, task)
            .await
            .expect("mixed operations hung")
            .unwrap();
    }

    // The server still answers afterwards.
    let outcome = server.client().remove(90).await.unwrap();
    assert!(matches!(outcome, Outcome::Ok | Outcome::NotFound));
}
