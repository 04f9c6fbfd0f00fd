//! End-to-end tests for the socket server.
//!
//! A real TCP listener is driven with the plain-text protocol while the
//! estimator is replaced by an in-process fake.

use compadre_core::{
    load_segment_file, CompadreServer, EstimatorOptions, EstimatorOutput, ModelRow,
    RelatednessEstimator, Result, ServeExit, ServerSettings,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

/// Fake estimator: second degree for single pairs, files "written" for bulk.
#[derive(Default)]
struct FakeErsa {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl RelatednessEstimator for FakeErsa {
    async fn run(&self, options: EstimatorOptions) -> Result<EstimatorOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if options.return_output {
            Ok(EstimatorOutput::Rows(vec![
                ModelRow {
                    degree: 2,
                    log_likelihood: 0.0,
                },
                ModelRow {
                    degree: 1,
                    log_likelihood: 5.0,
                },
            ]))
        } else {
            std::fs::write(&options.model_output_file, "model")?;
            Ok(EstimatorOutput::Written)
        }
    }
}

fn write_segments(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("segments.txt");
    std::fs::write(
        &path,
        "id1\tid2\tstart\tend\tcm\tchrom\tibd\n\
         A\tB\t100\t200\t6.00\t1\t2\n\
         A\tB\t300\t400\t3.00\t1\t2\n\
         A\tC\t100\t900\t12.50\t4\t1\n",
    )
    .unwrap();
    path
}

async fn start(dir: &TempDir) -> (SocketAddr, Arc<FakeErsa>, JoinHandle<Result<ServeExit>>) {
    let match_file = write_segments(dir.path());
    let index = Arc::new(load_segment_file(&match_file).unwrap());
    assert_eq!(index.ibd2_count(), 2);

    let settings = ServerSettings::with_host(&match_file, 0, Some("127.0.0.1".into()));
    let listener = CompadreServer::<FakeErsa>::bind(&settings).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let estimator = Arc::new(FakeErsa::default());
    let server = Arc::new(CompadreServer::new(index, estimator.clone(), &match_file));
    let handle = tokio::spawn(async move { server.serve(listener).await });
    (addr, estimator, handle)
}

async fn send(addr: SocketAddr, message: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(message.as_bytes()).await.unwrap();
    let mut reply = String::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_string(&mut reply))
        .await
        .expect("reply timed out")
        .unwrap();
    reply
}

#[tokio::test]
async fn test_pairwise_requests_over_tcp() {
    let dir = TempDir::new().unwrap();
    let (addr, estimator, handle) = start(&dir).await;

    assert_eq!(send(addr, "fam_A|fam_B|0.1,0.2,0,0,0,0|X").await, "0.1,0.2,0.7,0,0,0");
    assert_eq!(estimator.calls.load(Ordering::SeqCst), 1);

    // Reversed order is a different key.
    assert_eq!(send(addr, "B|A|0.1,0.2,0,0,0,0|X").await, "0.1,0.2,0,0,0,0");
    assert_eq!(estimator.calls.load(Ordering::SeqCst), 1);

    assert_eq!(send(addr, "close").await, "Closing server");
    assert_eq!(handle.await.unwrap().unwrap(), ServeExit::CloseRequested);
}

#[tokio::test]
async fn test_miss_echoes_prior_byte_for_byte() {
    let dir = TempDir::new().unwrap();
    let (addr, _estimator, handle) = start(&dir).await;

    let prior = "0.010,0.020,0.3,0.3,0.2,0.17";
    assert_eq!(send(addr, &format!("X|Y|{prior}|pairwise")).await, prior);

    send(addr, "close").await;
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_bulk_request_returns_output_prefix() {
    let dir = TempDir::new().unwrap();
    let (addr, _estimator, handle) = start(&dir).await;

    let reply = send(addr, "padre|all").await;
    let prefix = dir.path().join("ersa").join("output_all_ersa");
    assert_eq!(reply, prefix.to_string_lossy());
    assert!(prefix.with_extension("model").exists());

    send(addr, "close").await;
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_malformed_request_does_not_stop_server() {
    let dir = TempDir::new().unwrap();
    let (addr, _estimator, handle) = start(&dir).await;

    assert!(send(addr, "only|two").await.starts_with("ERROR: "));
    assert_eq!(send(addr, "A|C|0.25,0.25|X").await, "0.25,0.25,0.5,0,0,0");

    send(addr, "close").await;
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_close_stops_accepting() {
    let dir = TempDir::new().unwrap();
    let (addr, _estimator, handle) = start(&dir).await;

    assert_eq!(send(addr, "close").await, "Closing server");
    handle.await.unwrap().unwrap();

    assert!(TcpStream::connect(addr).await.is_err());
}
