//! Shared fixtures for unit tests: in-memory archives and a loopback HTTP
//! server that serves a fixed body.

use std::io::Write;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Gzip-compresses a payload in memory.
pub(crate) fn gz_bytes(payload: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(payload).unwrap();
    encoder.finish().unwrap()
}

/// Builds a gzip-compressed tar archive in memory.
pub(crate) fn tar_gz_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_path(name).unwrap();
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append(&header, *data).unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap()
}

/// Serves one body per connection in order, repeating the last body once the
/// sequence is exhausted; returns the URL the fixture is reachable under.
pub(crate) async fn serve_fixture_sequence(bodies: Vec<Vec<u8>>, file_name: &str) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let mut served = 0usize;
        loop {
            let Ok((mut sock, _)) = listener.accept().await else {
                break;
            };
            let body = bodies[served.min(bodies.len() - 1)].clone();
            served += 1;
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let _ = sock.read(&mut buf).await;
                let header = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = sock.write_all(header.as_bytes()).await;
                let _ = sock.write_all(&body).await;
                let _ = sock.shutdown().await;
            });
        }
    });

    format!("http://127.0.0.1:{port}/{file_name}")
}

/// Serves `body` to every connection on a loopback port; returns the URL the
/// fixture is reachable under.
pub(crate) async fn serve_fixture(body: Vec<u8>, file_name: &str) -> String {
    serve_fixture_sequence(vec![body], file_name).await
}
