#![allow(dead_code, unused_variables)]

use bytes::{Buf, Bytes, BytesMut};
use minikv::domains::query_io::FrameError;
use minikv::prelude::{LinkState, QueryIO, deserialize};
use minikv::{Environment, StartUpFacade};
use std::net::SocketAddr;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

pub struct TestServer {
    pub addr: SocketAddr,
    pub facade: StartUpFacade,
    // holds the snapshot directory alive for the duration of the test
    pub dir: TempDir,
}

impl TestServer {
    pub fn bind_addr(&self) -> String {
        self.addr.to_string()
    }

    pub async fn client(&self) -> TestClient {
        TestClient::connect(self.addr).await
    }

    pub async fn wait_for_link_state(&self, expected: LinkState) {
        let mut observer = self.facade.replication_controller().subscribe();
        timeout(Duration::from_secs(5), observer.wait_for(|state| *state == expected))
            .await
            .expect("link state not reached in time")
            .unwrap();
    }
}

/// Starts an in-process server on an ephemeral port with its own empty snapshot directory.
pub async fn start_server(args: Vec<&str>) -> TestServer {
    start_server_in(TempDir::new().unwrap(), args).await.unwrap()
}

pub async fn start_server_in(dir: TempDir, args: Vec<&str>) -> anyhow::Result<TestServer> {
    let mut flags = vec!["--dir".to_string(), dir.path().display().to_string()];
    flags.extend(args.into_iter().map(str::to_string));
    let env = Environment::from_args(flags)?;

    let facade =
        StartUpFacade::new(&env).await?.with_replica_backoff(Duration::from_millis(100));
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(facade.clone().serve(listener));

    Ok(TestServer { addr, facade, dir })
}

pub struct TestClient {
    stream: TcpStream,
    buffer: BytesMut,
}

impl TestClient {
    pub async fn connect(addr: impl tokio::net::ToSocketAddrs) -> Self {
        Self { stream: TcpStream::connect(addr).await.unwrap(), buffer: BytesMut::new() }
    }

    pub async fn send(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }

    pub async fn send_and_get(&mut self, bytes: &[u8]) -> Bytes {
        self.send(bytes).await;
        self.get_reply().await.serialize()
    }

    /// Reads exactly one reply frame.
    pub async fn get_reply(&mut self) -> QueryIO {
        loop {
            match deserialize(&self.buffer) {
                | Ok((reply, len)) => {
                    self.buffer.advance(len);
                    return reply;
                },
                | Err(FrameError::Incomplete) => {},
                | Err(err) => panic!("undecodable reply: {err}"),
            }

            let read = timeout(Duration::from_secs(5), self.stream.read_buf(&mut self.buffer))
                .await
                .expect("no reply in time")
                .unwrap();
            assert_ne!(read, 0, "connection closed before a full reply arrived");
        }
    }

    /// True once the server has closed the connection and nothing else is pending.
    pub async fn is_closed(&mut self) -> bool {
        let mut rest = Vec::new();
        match timeout(Duration::from_secs(5), self.stream.read_to_end(&mut rest)).await {
            | Ok(Ok(_)) => rest.is_empty() && self.buffer.is_empty(),
            | Ok(Err(_)) => true,
            | Err(_) => false,
        }
    }
}

pub fn array(arr: Vec<&str>) -> Bytes {
    binary_array(arr.into_iter().map(|s| Bytes::copy_from_slice(s.as_bytes())).collect())
}

pub fn binary_array(arr: Vec<Bytes>) -> Bytes {
    QueryIO::Array(arr.into_iter().map(QueryIO::BulkString).collect()).serialize()
}

pub fn bulk_strings(reply: QueryIO) -> Vec<String> {
    let QueryIO::Array(items) = reply else {
        panic!("expected an array reply, got {reply:?}");
    };
    items
        .into_iter()
        .map(|item| match item {
            | QueryIO::BulkString(s) => String::from_utf8_lossy(&s).into_owned(),
            | other => panic!("expected bulk string, got {other:?}"),
        })
        .collect()
}
