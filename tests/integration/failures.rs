use crate::*;
use clfs_core::framing::{read_page, read_status, write_page, write_request, write_status};
use clfs_core::wire::PAGE_SIZE;
use clfs_core::{Outcome, Page, PagePayload, Request, Status};
use libclfs::ClientError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Read everything the server sends until it closes the connection.
async fn drain(stream: &mut TcpStream) -> Vec<u8> {
    let mut rest = Vec::new();
    tokio::time::timeout(CLIENT_TIMEOUT, stream.read_to_end(&mut rest))
        .await
        .expect("server should close the connection")
        .unwrap();
    rest
}

#[tokio::test]
async fn test_unknown_operation_is_rejected() {
    let server = TestServer::start().await.unwrap();
    let mut stream = server.raw().await.unwrap();

    let mut header = Request::put(5, 4096).encode();
    header[0..4].copy_from_slice(&3u32.to_le_bytes());
    stream.write_all(&header).await.unwrap();

    assert_eq!(
        read_status(&mut stream, CLIENT_TIMEOUT).await.unwrap(),
        Status::Error
    );
    assert!(drain(&mut stream).await.is_empty());
    assert!(server.store_files().is_empty());
}

#[tokio::test]
async fn test_short_header_is_rejected() {
    let server = TestServer::start().await.unwrap();
    let mut stream = server.raw().await.unwrap();

    stream.write_all(&Request::get(5).encode()[..8]).await.unwrap();
    stream.shutdown().await.unwrap();

    assert_eq!(
        read_status(&mut stream, CLIENT_TIMEOUT).await.unwrap(),
        Status::Error
    );
    assert!(server.store_files().is_empty());
}

/// A client that sends nothing is cut off by the idle timeout.
#[tokio::test]
async fn test_silent_client_is_timed_out() {
    let server = TestServer::start().await.unwrap();
    let mut stream = server.raw().await.unwrap();

    let status = read_status(&mut stream, SERVER_TIMEOUT + CLIENT_TIMEOUT)
        .await
        .unwrap();
    assert_eq!(status, Status::Error);
}

/// The client disappears after one page of a three-page PUT.
#[tokio::test]
async fn test_truncated_put_is_not_served() {
    let server = TestServer::start().await.unwrap();
    let client = server.client();

    {
        let mut stream = server.raw().await.unwrap();
        write_request(&mut stream, &Request::put(20, (3 * PAGE_SIZE) as u32))
            .await
            .unwrap();
        assert_eq!(
            read_status(&mut stream, CLIENT_TIMEOUT).await.unwrap(),
            Status::Ok
        );
        write_page(&mut stream, &Page::continuation(&[0xaa; PAGE_SIZE]))
            .await
            .unwrap();
        assert_eq!(
            read_status(&mut stream, CLIENT_TIMEOUT).await.unwrap(),
            Status::Next
        );
    }

    // Same id: this GET waits for the aborted PUT to clean up.
    assert!(matches!(
        client.get(20, (3 * PAGE_SIZE) as u32).await,
        Err(ClientError::Rejected(Outcome::NotFound))
    ));
    assert!(server.store_files().is_empty());
}

/// Declaring more than is sent ends in ERROR and nothing is stored.
#[tokio::test]
async fn test_declared_length_mismatch() {
    let server = TestServer::start().await.unwrap();
    let mut stream = server.raw().await.unwrap();

    write_request(&mut stream, &Request::put(21, 1000)).await.unwrap();
    assert_eq!(read_status(&mut stream, CLIENT_TIMEOUT).await.unwrap(), Status::Ok);
    write_page(&mut stream, &Page::last(&[1u8; 10]).unwrap())
        .await
        .unwrap();
    assert_eq!(read_status(&mut stream, CLIENT_TIMEOUT).await.unwrap(), Status::End);
    assert_eq!(read_status(&mut stream, CLIENT_TIMEOUT).await.unwrap(), Status::Error);

    assert!(!server.store.contains(21).await);
}

/// Sending more than declared is accepted.
#[tokio::test]
async fn test_surplus_bytes_are_accepted() {
    let server = TestServer::start().await.unwrap();
    let mut stream = server.raw().await.unwrap();

    write_request(&mut stream, &Request::put(22, 4)).await.unwrap();
    assert_eq!(read_status(&mut stream, CLIENT_TIMEOUT).await.unwrap(), Status::Ok);
    write_page(&mut stream, &Page::last(b"abcdefgh").unwrap())
        .await
        .unwrap();
    assert_eq!(read_status(&mut stream, CLIENT_TIMEOUT).await.unwrap(), Status::End);
    assert_eq!(read_status(&mut stream, CLIENT_TIMEOUT).await.unwrap(), Status::Ok);

    assert_eq!(std::fs::read(server.store.object_path(22)).unwrap(), b"abcdefgh");
}

/// GET page layout on the wire: full pages never carry a final length, and
/// the end of an exact-multiple object is a zero-length page.
#[tokio::test]
async fn test_get_page_boundaries_on_the_wire() {
    let server = TestServer::start().await.unwrap();
    server.client().put(30, &blob(PAGE_SIZE, 4)).await.unwrap();

    let mut stream = server.raw().await.unwrap();
    write_request(&mut stream, &Request::get(30)).await.unwrap();
    assert_eq!(read_status(&mut stream, CLIENT_TIMEOUT).await.unwrap(), Status::Ok);

    let mut page = Page::empty();
    read_page(&mut stream, &mut page, CLIENT_TIMEOUT).await.unwrap();
    assert_eq!(page.final_length(), 0);
    assert_eq!(page.payload().unwrap(), PagePayload::More(&blob(PAGE_SIZE, 4)[..]));

    read_page(&mut stream, &mut page, CLIENT_TIMEOUT).await.unwrap();
    assert_eq!(page.final_length(), 0);
    assert!(page.payload().unwrap().bytes().iter().all(|&b| b == 0));

    write_status(&mut stream, Status::Ok).await.unwrap();
    assert!(drain(&mut stream).await.is_empty());
    assert!(!server.store.contains(30).await);
}

/// A closing status other than OK leaves the object in place.
#[tokio::test]
async fn test_get_with_error_ack_retains_object() {
    let server = TestServer::start().await.unwrap();
    server.client().put(31, b"precious").await.unwrap();

    let mut stream = server.raw().await.unwrap();
    write_request(&mut stream, &Request::get(31)).await.unwrap();
    assert_eq!(read_status(&mut stream, CLIENT_TIMEOUT).await.unwrap(), Status::Ok);
    let mut page = Page::empty();
    read_page(&mut stream, &mut page, CLIENT_TIMEOUT).await.unwrap();
    assert_eq!(page.payload().unwrap(), PagePayload::Last(b"precious"));
    write_status(&mut stream, Status::Error).await.unwrap();
    drain(&mut stream).await;

    assert!(server.store.contains(31).await);
}

/// Dropping the connection instead of acknowledging also retains it.
#[tokio::test]
async fn test_get_with_dropped_connection_retains_object() {
    let server = TestServer::start().await.unwrap();
    let client = server.client();
    client.put(32, b"still here").await.unwrap();

    {
        let mut stream = server.raw().await.unwrap();
        write_request(&mut stream, &Request::get(32)).await.unwrap();
        assert_eq!(read_status(&mut stream, CLIENT_TIMEOUT).await.unwrap(), Status::Ok);
    }

    assert_eq!(&client.get(32, 10).await.unwrap()[..], b"still here");
}

/// Asking for less than is stored must not consume the object.
#[tokio::test]
async fn test_get_shorter_than_stored_retains_object() {
    let server = TestServer::start().await.unwrap();
    let client = server.client();
    let data = blob(2 * PAGE_SIZE + 10, 8);
    assert_eq!(client.put(40, &data).await.unwrap(), Outcome::Ok);

    assert!(matches!(
        client.get(40, PAGE_SIZE as u32).await,
        Err(ClientError::LengthMismatch { expected: 4096, .. })
    ));
    assert!(server.store.contains(40).await);
    assert_eq!(client.get(40, data.len() as u32).await.unwrap(), data);
}

/// Asking for more than an exact-multiple object holds ends promptly in a
/// mismatch rather than waiting out the server's idle timeout.
#[tokio::test]
async fn test_get_longer_than_stored_reports_mismatch() {
    let server = TestServer::start().await.unwrap();
    let client = server.client();
    let data = blob(PAGE_SIZE, 9);
    assert_eq!(client.put(41, &data).await.unwrap(), Outcome::Ok);

    let started = std::time::Instant::now();
    assert!(matches!(
        client.get(41, 3 * PAGE_SIZE as u32).await,
        Err(ClientError::LengthMismatch { expected: 12288, received: 4096 })
    ));
    assert!(started.elapsed() < std::time::Duration::from_secs(1));
    assert!(server.store.contains(41).await);
}
