//! End-to-end tests against the reference server over loopback TCP

use std::fs;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use filevault::network::{self, Server, UserLocks};
use filevault::protocol::{decode_response_header, encode_request, Request};
use filevault::{Client, ClientId, Config, StatusCode, PROTOCOL_VERSION};
use parking_lot::Mutex;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

struct TestServer {
    server: Arc<Server>,
    handle: Option<JoinHandle<()>>,
    root: TempDir,
}

impl TestServer {
    fn start() -> Self {
        Self::start_with_read_timeout(5000)
    }

    fn start_with_read_timeout(read_timeout_ms: u64) -> Self {
        let root = TempDir::new().unwrap();
        let config = Config::builder()
            .listen_addr("127.0.0.1:0")
            .root_dir(root.path())
            .read_timeout_ms(read_timeout_ms)
            .build();

        let server = Arc::new(Server::bind(config).unwrap());
        let runner = Arc::clone(&server);
        let handle = thread::spawn(move || runner.run().unwrap());

        Self {
            server,
            handle: Some(handle),
            root,
        }
    }

    fn client_config(&self, download_dir: &Path) -> Config {
        Config::builder()
            .server_addr(self.server.local_addr().to_string())
            .download_dir(download_dir)
            .chunk_size(512)
            .build()
    }

    fn user_dir(&self, id: u32) -> PathBuf {
        self.root.path().join(id.to_string())
    }

    fn staging_dir(&self) -> PathBuf {
        self.root.path().join(".incoming")
    }

    /// Stop accepting and wait for `run` to return
    fn stop(&mut self) {
        self.server.shutdown();
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
    }
}

fn wait_for_len(path: &Path, len: u64) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while fs::metadata(path).map(|m| m.len()).unwrap_or(0) < len {
        assert!(Instant::now() < deadline, "{} never reached {} bytes", path.display(), len);
        thread::sleep(Duration::from_millis(10));
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// =============================================================================
// Full Session Tests
// =============================================================================

#[test]
fn test_full_backup_cycle() {
    let server = TestServer::start();
    let local = TempDir::new().unwrap();
    let config = server.client_config(local.path());
    let client = Client::new(ClientId::new(4242), &config).unwrap();

    let first = local.path().join("first.txt");
    let second = local.path().join("second.bin");
    let second_data: Vec<u8> = (0..5000).map(|i| (i * 7 % 256) as u8).collect();
    fs::write(&first, b"first file contents").unwrap();
    fs::write(&second, &second_data).unwrap();

    // Nothing stored yet
    let list = client.generate_files_list(&mut network::connect(&config).unwrap()).unwrap();
    assert_eq!(list.status, StatusCode::ErrorUserHasNoFiles);

    let status = client.backup_file(&first, &mut network::connect(&config).unwrap()).unwrap();
    assert_eq!(status, StatusCode::SuccessBackupFile);
    let status = client.backup_file(&second, &mut network::connect(&config).unwrap()).unwrap();
    assert_eq!(status, StatusCode::SuccessBackupFile);
    assert_eq!(fs::read(server.user_dir(4242).join("second.bin")).unwrap(), second_data);

    let list = client.generate_files_list(&mut network::connect(&config).unwrap()).unwrap();
    assert_eq!(list.status, StatusCode::SuccessGenerateFileList);
    assert_eq!(list.name.as_deref(), Some("__file_list.txt"));
    assert_eq!(list.entries().unwrap(), vec!["first.txt", "second.bin"]);

    // Local copy exists, so the restore lands in tmp
    let restored = client.restore_file(&second, &mut network::connect(&config).unwrap()).unwrap();
    assert_eq!(restored.status, StatusCode::SuccessRestoreFile);
    assert_eq!(restored.path, Some(local.path().join("tmp")));
    assert_eq!(fs::read(local.path().join("tmp")).unwrap(), second_data);

    let status = client.delete_file(&first, &mut network::connect(&config).unwrap()).unwrap();
    assert_eq!(status, StatusCode::SuccessDeleteFile);

    let restored = client.restore_file(&first, &mut network::connect(&config).unwrap()).unwrap();
    assert_eq!(restored.status, StatusCode::ErrorFileDoesntExist);

    let status = client.delete_file(&second, &mut network::connect(&config).unwrap()).unwrap();
    assert_eq!(status, StatusCode::SuccessDeleteFile);

    // Only the generated list remains, which does not count as a stored file
    let restored = client.restore_file(&first, &mut network::connect(&config).unwrap()).unwrap();
    assert_eq!(restored.status, StatusCode::ErrorUserHasNoFiles);
}

#[test]
fn test_restore_into_fresh_path() {
    let server = TestServer::start();
    let local = TempDir::new().unwrap();
    let config = server.client_config(local.path());
    let client = Client::new(ClientId::new(77), &config).unwrap();

    let path = local.path().join("photo.raw");
    fs::write(&path, vec![0xAB; 1500]).unwrap();
    let status = client.backup_file(&path, &mut network::connect(&config).unwrap()).unwrap();
    assert_eq!(status, StatusCode::SuccessBackupFile);

    fs::remove_file(&path).unwrap();
    let restored = client.restore_file(&path, &mut network::connect(&config).unwrap()).unwrap();

    assert_eq!(restored.status, StatusCode::SuccessRestoreFile);
    assert_eq!(restored.path.as_deref(), Some(path.as_path()));
    assert_eq!(fs::read(&path).unwrap(), vec![0xAB; 1500]);

    // The completed upload left nothing behind in staging
    assert_eq!(fs::read_dir(server.staging_dir()).unwrap().count(), 0);
}

#[test]
fn test_clients_are_isolated() {
    let server = TestServer::start();
    let local = TempDir::new().unwrap();
    let config = server.client_config(local.path());
    let alice = Client::new(ClientId::new(1), &config).unwrap();
    let bob = Client::new(ClientId::new(2), &config).unwrap();

    let path = local.path().join("secret.txt");
    fs::write(&path, b"alice only").unwrap();
    alice.backup_file(&path, &mut network::connect(&config).unwrap()).unwrap();

    let list = bob.generate_files_list(&mut network::connect(&config).unwrap()).unwrap();
    assert_eq!(list.status, StatusCode::ErrorUserHasNoFiles);
}

#[test]
fn test_backup_with_path_in_name_rejected() {
    let server = TestServer::start();

    let request = Request::Backup {
        name: "../escape.txt".to_string(),
        size: 4,
    };
    let mut stream = TcpStream::connect(server.server.local_addr()).unwrap();
    stream
        .write_all(&encode_request(5, PROTOCOL_VERSION, &request).unwrap())
        .unwrap();
    stream.write_all(b"evil").unwrap();

    let header = decode_response_header(&mut stream).unwrap();
    assert_eq!(header.status, StatusCode::ErrorGeneric);
    assert!(!server.root.path().join("escape.txt").exists());
}

#[test]
fn test_shutdown_mid_upload_stores_nothing() {
    let mut server = TestServer::start_with_read_timeout(1000);

    let request = Request::Backup {
        name: "big.bin".to_string(),
        size: 10_000,
    };
    let mut stream = TcpStream::connect(server.server.local_addr()).unwrap();
    stream
        .write_all(&encode_request(9, PROTOCOL_VERSION, &request).unwrap())
        .unwrap();
    stream.write_all(&[0x5A; 100]).unwrap();

    let staged = server.staging_dir().join("9.big.bin");
    wait_for_len(&staged, 100);
    assert!(!server.user_dir(9).join("big.bin").exists());

    // run() drains the session, which times out waiting for the rest
    server.stop();

    assert!(!server.user_dir(9).join("big.bin").exists());
    assert!(!staged.exists());
    drop(stream);
}

#[test]
fn test_malformed_request_gets_generic_error() {
    let server = TestServer::start();

    let mut stream = TcpStream::connect(server.server.local_addr()).unwrap();
    // Unknown op code 0x63
    stream.write_all(&[1, 0, 0, 0, PROTOCOL_VERSION, 0x63]).unwrap();

    let header = decode_response_header(&mut stream).unwrap();
    assert_eq!(header.status, StatusCode::ErrorGeneric);

    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).unwrap();
    assert!(rest.is_empty());
}

// =============================================================================
// User Lock Tests
// =============================================================================

#[test]
fn test_user_lock_serialises_same_client() {
    let locks = Arc::new(UserLocks::new());
    let events = Arc::new(Mutex::new(Vec::new()));

    let guard = locks.lock(10);
    assert!(locks.is_locked(10));

    let waiter = {
        let locks = Arc::clone(&locks);
        let events = Arc::clone(&events);
        thread::spawn(move || {
            let _guard = locks.lock(10);
            events.lock().push("second");
        })
    };

    thread::sleep(Duration::from_millis(100));
    events.lock().push("first");
    drop(guard);

    waiter.join().unwrap();
    assert_eq!(*events.lock(), vec!["first", "second"]);
    assert!(!locks.is_locked(10));
}

#[test]
fn test_user_lock_other_clients_not_blocked() {
    let locks = UserLocks::new();
    let _held = locks.lock(1);

    let start = Instant::now();
    let _other = locks.lock(2);
    assert!(start.elapsed() < Duration::from_secs(1));
}
