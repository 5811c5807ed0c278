use crate::*;
use clfs_core::Outcome;
use libclfs::ClientError;

#[tokio::test]
async fn test_rm_existing_object() {
    let server = TestServer::start().await.unwrap();
    let client = server.client();

    client.put(11, &blob(5000, 3)).await.unwrap();
    assert_eq!(client.remove(11).await.unwrap(), Outcome::Ok);
    assert!(matches!(
        client.get(11, 5000).await,
        Err(ClientError::Rejected(Outcome::NotFound))
    ));
}

#[tokio::test]
async fn test_rm_missing_object() {
    let server = TestServer::start().await.unwrap();
    let client = server.client();

    assert_eq!(client.remove(12).await.unwrap(), Outcome::NotFound);
    assert!(matches!(
        client.get(12, 0).await,
        Err(ClientError::Rejected(Outcome::NotFound))
    ));
}

#[tokio::test]
async fn test_rm_only_touches_its_own_object() {
    let server = TestServer::start().await.unwrap();
    let client = server.client();

    client.put(1, b"one").await.unwrap();
    client.put(2, b"two").await.unwrap();
    assert_eq!(client.remove(1).await.unwrap(), Outcome::Ok);
    assert_eq!(&client.get(2, 3).await.unwrap()[..], b"two");
}
