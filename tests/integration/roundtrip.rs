use crate::*;
use clfs_core::wire::PAGE_SIZE;
use clfs_core::Outcome;
use libclfs::ClientError;

async fn round_trip(len: usize) {
    let server = TestServer::start().await.unwrap();
    let client = server.client();
    let data = blob(len, len as u8);

    let outcome = client.put(1, &data).await.unwrap();
    assert_eq!(outcome, Outcome::Ok, "PUT of {len} bytes");

    let fetched = client.get(1, len as u32).await.unwrap();
    assert_eq!(fetched.len(), len);
    assert!(fetched[..] == data[..], "content mismatch for {len} bytes");

    let again = client.get(1, len as u32).await;
    assert!(
        matches!(again, Err(ClientError::Rejected(Outcome::NotFound))),
        "object of {len} bytes should be consumed, got {again:?}"
    );
    assert!(server.store_files().is_empty());
}

#[tokio::test]
async fn test_round_trip_empty() {
    round_trip(0).await;
}

#[tokio::test]
async fn test_round_trip_one_byte() {
    round_trip(1).await;
}

#[tokio::test]
async fn test_round_trip_just_under_a_page() {
    round_trip(PAGE_SIZE - 1).await;
}

#[tokio::test]
async fn test_round_trip_exactly_one_page() {
    round_trip(PAGE_SIZE).await;
}

#[tokio::test]
async fn test_round_trip_one_past_a_page() {
    round_trip(PAGE_SIZE + 1).await;
}

#[tokio::test]
async fn test_round_trip_exactly_two_pages() {
    round_trip(2 * PAGE_SIZE).await;
}

#[tokio::test]
async fn test_round_trip_many_pages() {
    round_trip(64 * PAGE_SIZE + 123).await;
}

/// PUT replaces an existing object with the same id.
#[tokio::test]
async fn test_put_overwrites() {
    let server = TestServer::start().await.unwrap();
    let client = server.client();

    assert_eq!(client.put(7, b"first version").await.unwrap(), Outcome::Ok);
    assert_eq!(client.put(7, b"second").await.unwrap(), Outcome::Ok);
    assert_eq!(&client.get(7, 6).await.unwrap()[..], b"second");
}

/// Objects are stored under `<id>.dat` and nothing else is left behind.
#[tokio::test]
async fn test_store_layout() {
    let server = TestServer::start().await.unwrap();
    let client = server.client();

    client.put(4242, &blob(10, 1)).await.unwrap();
    assert_eq!(server.store_files(), vec!["4242.dat".to_string()]);
    assert_eq!(
        std::fs::read(server.store.object_path(4242)).unwrap(),
        blob(10, 1)
    );
}

/// Without the closing OK, a fetched object stays on the server.
#[tokio::test]
async fn test_get_without_ack_retains_object() {
    let server = TestServer::start().await.unwrap();
    let client = server.client();
    let data = blob(PAGE_SIZE * 3, 9);

    client.put(2, &data).await.unwrap();
    let first = client.get_without_ack(2, data.len() as u32).await.unwrap();
    assert!(first[..] == data[..]);

    let second = client.get(2, data.len() as u32).await.unwrap();
    assert!(second[..] == data[..]);
    assert!(!server.store.contains(2).await);
}
