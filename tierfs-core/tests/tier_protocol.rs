use serde_json::{Value, json};
use std::path::Path;
use tierfs_core::protocol::{read_frame, write_frame};
use tierfs_core::{
    Dispatcher, DriveConfig, DuplexChannel, ErrorKind, IndexSnapshot, Payload, Response, Tier,
    TierConfig, serve,
};
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;

const MAX_FRAME: u32 = 1024 * 1024;

/// Supervisor side of a tier channel.
struct Supervisor {
    reader: ReadHalf<DuplexStream>,
    writer: WriteHalf<DuplexStream>,
    server: JoinHandle<tierfs_core::Result<u64>>,
}

impl Supervisor {
    fn spawn(root: &Path, drives: &[&str]) -> Self {
        let configs: Vec<DriveConfig> = drives
            .iter()
            .map(|name| {
                let mount_point = root.join(name);
                std::fs::create_dir_all(&mount_point).unwrap();
                DriveConfig::new(*name, mount_point)
            })
            .collect();
        let tier = Tier::builder()
            .config(TierConfig::new("integration"))
            .drives(configs)
            .build()
            .unwrap();
        let mut dispatcher = Dispatcher::new(tier).unwrap();

        let (client, server) = tokio::io::duplex(64 * 1024);
        let server = tokio::spawn(async move {
            let (reader, writer) = tokio::io::split(server);
            let mut channel = DuplexChannel::new(reader, writer, MAX_FRAME);
            serve(&mut channel, &mut dispatcher).await
        });

        let (reader, writer) = tokio::io::split(client);
        Self {
            reader,
            writer,
            server,
        }
    }

    async fn call(&mut self, message: Value) -> Response {
        let body = serde_json::to_vec(&message).unwrap();
        write_frame(&mut self.writer, &body).await.unwrap();
        let reply = read_frame(&mut self.reader, MAX_FRAME).await.unwrap().unwrap();
        serde_json::from_slice(&reply).unwrap()
    }

    async fn ok(&mut self, message: Value) -> Payload {
        match self.call(message.clone()).await {
            Response::Ok { payload } => payload,
            Response::Error { kind, message: text } => {
                panic!("{} failed with {:?}: {}", message, kind, text)
            }
        }
    }

    async fn exists(&mut self, path: &str) -> bool {
        match self.ok(json!(["EXISTS", path])).await {
            Payload::Exists(exists) => exists,
            other => panic!("unexpected payload {:?}", other),
        }
    }

    async fn dump(&mut self) -> IndexSnapshot {
        match self.ok(json!(["DUMP_INDEX"])).await {
            Payload::Snapshot(snapshot) => snapshot,
            other => panic!("unexpected payload {:?}", other),
        }
    }

    async fn close(self) -> u64 {
        drop(self.writer);
        drop(self.reader);
        self.server.await.unwrap().unwrap()
    }
}

#[tokio::test]
async fn test_lifecycle_over_channel() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut supervisor = Supervisor::spawn(temp_dir.path(), &["fast", "slow"]);

    let early = supervisor.call(json!(["GET_DRIVE_NAMES"])).await;
    assert_eq!(early.error_kind(), Some(ErrorKind::NotStarted));

    supervisor.ok(json!(["STARTUP"])).await;
    let again = supervisor.call(json!(["INIT"])).await;
    assert_eq!(again.error_kind(), Some(ErrorKind::AlreadyStarted));

    assert_eq!(
        supervisor.ok(json!(["GET_DRIVE_NAMES"])).await,
        Payload::DriveNames(vec!["fast".to_string(), "slow".to_string()])
    );

    supervisor.ok(json!(["MAKE_NEW_FILE", "a.txt"])).await;
    let before = supervisor.dump().await;
    let shutdown = supervisor.ok(json!(["SHUTDOWN"])).await;
    assert_eq!(shutdown, Payload::Snapshot(before));

    for message in [json!(["SHUTDOWN"]), json!(["STARTUP"]), json!(["EXISTS", "a.txt"])] {
        let reply = supervisor.call(message).await;
        assert_eq!(reply.error_kind(), Some(ErrorKind::AlreadyShutDown));
    }

    assert_eq!(supervisor.close().await, 10);
}

#[tokio::test]
async fn test_file_operations_over_channel() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut supervisor = Supervisor::spawn(temp_dir.path(), &["a"]);
    supervisor.ok(json!(["START"])).await;

    let handle = match supervisor.ok(json!(["NEW_FILE", "/reports/q1.csv"])).await {
        Payload::Handle(handle) => handle,
        other => panic!("unexpected payload {:?}", other),
    };
    assert_eq!(handle.path, "reports/q1.csv");
    std::fs::write(&handle.physical_path, b"1,2,3\n").unwrap();

    match supervisor.ok(json!(["GET_FILE_INFO", "reports/q1.csv"])).await {
        Payload::FileInfo(info) => {
            assert_eq!(info.size, 6);
            assert_eq!(info.drive, "a");
        }
        other => panic!("unexpected payload {:?}", other),
    }

    match supervisor
        .ok(json!(["COPY_FILE", "reports/q1.csv", "backup/q1.csv"]))
        .await
    {
        Payload::FileInfo(info) => assert_eq!(info.size, 6),
        other => panic!("unexpected payload {:?}", other),
    }
    assert!(supervisor.exists("reports/q1.csv").await);
    assert!(supervisor.exists("backup/q1.csv").await);

    supervisor
        .ok(json!(["MOVE_FILE", "backup/q1.csv", "archive/q1.csv"]))
        .await;
    assert!(!supervisor.exists("backup/q1.csv").await);
    assert!(supervisor.exists("archive/q1.csv").await);

    let dump = supervisor.dump().await;
    let paths: Vec<&str> = dump.entries.keys().map(String::as_str).collect();
    assert_eq!(paths, vec!["archive/q1.csv", "reports/q1.csv"]);

    supervisor.ok(json!(["DELETE", "reports/q1.csv"])).await;
    let missing = supervisor.call(json!(["GET_FILE_INFO", "reports/q1.csv"])).await;
    assert_eq!(missing.error_kind(), Some(ErrorKind::NotFound));

    let occupied = supervisor.call(json!(["MAKE_NEW_FILE", "archive/q1.csv"])).await;
    assert_eq!(occupied.error_kind(), Some(ErrorKind::AlreadyExists));

    supervisor.close().await;
}

#[tokio::test]
async fn test_index_round_trip_between_tiers() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut first = Supervisor::spawn(temp_dir.path(), &["a", "b"]);
    first.ok(json!(["STARTUP"])).await;
    for path in ["one.txt", "nested/two.txt", "nested/deeper/three.txt"] {
        first.ok(json!(["MAKE_NEW_FILE", path])).await;
    }
    let saved = first.dump().await;
    let saved_json = serde_json::to_value(&saved).unwrap();

    let mut second = Supervisor::spawn(temp_dir.path(), &["a", "b"]);
    second.ok(json!(["STARTUP"])).await;
    second.ok(json!(["REFRESH_INDEX", saved_json])).await;

    for path in saved.entries.keys() {
        assert_eq!(
            first.ok(json!(["GET_FILE_INFO", path])).await,
            second.ok(json!(["GET_FILE_INFO", path])).await
        );
    }

    first.close().await;
    second.close().await;
}

#[tokio::test]
async fn test_apply_saved_index_reports_overlap() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut source = Supervisor::spawn(temp_dir.path(), &["a"]);
    source.ok(json!(["STARTUP"])).await;
    for path in ["x.txt", "y.txt", "z.txt"] {
        source.ok(json!(["MAKE_NEW_FILE", path])).await;
    }
    let saved = serde_json::to_value(source.dump().await).unwrap();
    source.ok(json!(["DELETE_FILE", "z.txt"])).await;
    source.ok(json!(["MAKE_NEW_FILE", "z.txt"])).await;

    match source.ok(json!(["APPLY_SAVED_INDEX", saved])).await {
        Payload::Merged(report) => {
            assert_eq!(report.applied, 0);
            assert_eq!(report.skipped, vec!["x.txt", "y.txt", "z.txt"]);
        }
        other => panic!("unexpected payload {:?}", other),
    }
    assert_eq!(source.dump().await.len(), 3);

    source.close().await;
}

#[tokio::test]
async fn test_malformed_messages_keep_session_alive() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut supervisor = Supervisor::spawn(temp_dir.path(), &["a"]);

    let cases = [
        (json!([]), ErrorKind::MalformedCommand),
        (json!("STARTUP"), ErrorKind::MalformedCommand),
        (json!([42]), ErrorKind::MalformedCommand),
        (json!(["Startup"]), ErrorKind::UnknownCommand),
        (json!(["STARTUP", "extra"]), ErrorKind::MalformedCommand),
        (json!(["REFRESH_INDEX", "not a snapshot"]), ErrorKind::MalformedCommand),
    ];
    for (message, kind) in cases {
        assert_eq!(supervisor.call(message).await.error_kind(), Some(kind));
    }

    supervisor.ok(json!(["STARTUP"])).await;
    assert!(!supervisor.exists("anything").await);
    supervisor.close().await;
}
