use crate::protocol::{Command, Payload, Response, validate_alias_table};
use crate::{Result, Tier, TierError};
use serde_json::Value;

/// Routes decoded commands to the tier it owns and encodes every outcome as a
/// response.
pub struct Dispatcher {
    tier: Tier,
}

impl Dispatcher {
    pub fn new(tier: Tier) -> Result<Self> {
        validate_alias_table()?;
        Ok(Self { tier })
    }

    pub fn tier(&self) -> &Tier {
        &self.tier
    }

    pub fn into_tier(self) -> Tier {
        self.tier
    }

    pub async fn dispatch(&mut self, command: Command) -> Result<Payload> {
        let tier = &mut self.tier;
        match command {
            Command::Startup => {
                tier.startup().await?;
                Ok(Payload::None)
            }
            Command::Shutdown => Ok(Payload::Snapshot(tier.shutdown().await?)),
            Command::GetFileInfo { path } => Ok(Payload::FileInfo(tier.get_file_info(&path).await?)),
            Command::OpenFile { path } => Ok(Payload::Handle(tier.open_file(&path).await?)),
            Command::MakeNewFile { path } => Ok(Payload::Handle(tier.make_new_file(&path).await?)),
            Command::CopyFile { src, dest } => {
                Ok(Payload::FileInfo(tier.copy_file(&src, &dest).await?))
            }
            Command::MoveFile { src, dest } => {
                Ok(Payload::FileInfo(tier.move_file(&src, &dest).await?))
            }
            Command::DeleteFile { path } => {
                tier.delete_file(&path).await?;
                Ok(Payload::None)
            }
            Command::Exists { path } => Ok(Payload::Exists(tier.exists(&path).await?)),
            Command::DumpIndex => Ok(Payload::Snapshot(tier.dump_index()?)),
            Command::RefreshIndex { snapshot } => {
                tier.refresh_index(snapshot)?;
                Ok(Payload::None)
            }
            Command::ApplySavedIndex { snapshot } => {
                Ok(Payload::Merged(tier.apply_saved_index(snapshot)?))
            }
            Command::GetDriveNames => Ok(Payload::DriveNames(tier.drive_names()?)),
        }
    }

    /// Decode and run one `[name, arg...]` message.
    pub async fn handle_message(&mut self, message: Vec<Value>) -> Response {
        let command = match Command::decode(message) {
            Ok(command) => command,
            Err(e) => {
                tracing::debug!("Rejected message: {}", e);
                return Response::error(&e);
            }
        };

        let kind = command.kind();
        tracing::debug!("Dispatching {}", kind.canonical_name());

        let result = self.dispatch(command).await;
        if let Err(e) = &result {
            tracing::debug!("{} failed: {}", kind.canonical_name(), e);
        }
        Response::from(result)
    }

    /// Handle one raw frame body.
    pub async fn handle_frame(&mut self, body: &[u8]) -> Response {
        let message = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Array(items)) => items,
            Ok(other) => {
                return Response::error(&TierError::MalformedCommand(format!(
                    "message must be a JSON array, got {}",
                    json_type(&other)
                )));
            }
            Err(e) => {
                return Response::error(&TierError::MalformedCommand(format!(
                    "message is not valid JSON: {}",
                    e
                )));
            }
        };
        self.handle_message(message).await
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DriveConfig, ErrorKind, TierConfig};
    use serde_json::json;
    use std::path::Path;

    fn dispatcher(root: &Path) -> Dispatcher {
        let mount_point = root.join("a");
        std::fs::create_dir_all(&mount_point).unwrap();
        let tier = Tier::builder()
            .config(TierConfig::new("dispatch"))
            .drive(DriveConfig::new("a", mount_point))
            .build()
            .unwrap();
        Dispatcher::new(tier).unwrap()
    }

    async fn send(dispatcher: &mut Dispatcher, message: Value) -> Response {
        let body = serde_json::to_vec(&message).unwrap();
        dispatcher.handle_frame(&body).await
    }

    #[tokio::test]
    async fn test_aliases_reach_the_same_command() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut dispatcher = dispatcher(temp_dir.path());

        assert!(send(&mut dispatcher, json!(["INIT"])).await.is_ok());
        assert_eq!(
            send(&mut dispatcher, json!(["START"])).await.error_kind(),
            Some(ErrorKind::AlreadyStarted)
        );

        assert!(send(&mut dispatcher, json!(["NEW_FILE", "x.txt"])).await.is_ok());
        assert!(send(&mut dispatcher, json!(["REMOVE", "x.txt"])).await.is_ok());
        assert_eq!(
            send(&mut dispatcher, json!(["EXISTS", "x.txt"])).await,
            Response::ok(Payload::Exists(false))
        );
    }

    #[tokio::test]
    async fn test_bad_messages_are_reported() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut dispatcher = dispatcher(temp_dir.path());

        let not_json = dispatcher.handle_frame(b"{not json").await;
        assert_eq!(not_json.error_kind(), Some(ErrorKind::MalformedCommand));

        let object = send(&mut dispatcher, json!({"cmd": "STARTUP"})).await;
        assert_eq!(object.error_kind(), Some(ErrorKind::MalformedCommand));

        let unknown = send(&mut dispatcher, json!(["startup"])).await;
        assert_eq!(unknown.error_kind(), Some(ErrorKind::UnknownCommand));

        let arity = send(&mut dispatcher, json!(["COPY_FILE", "a.txt"])).await;
        assert_eq!(arity.error_kind(), Some(ErrorKind::MalformedCommand));

        let wrong_type = send(&mut dispatcher, json!(["EXISTS", 7])).await;
        assert_eq!(wrong_type.error_kind(), Some(ErrorKind::MalformedCommand));
    }

    #[tokio::test]
    async fn test_state_gate_runs_after_decoding() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut dispatcher = dispatcher(temp_dir.path());

        let early = send(&mut dispatcher, json!(["EXISTS", "x.txt"])).await;
        assert_eq!(early.error_kind(), Some(ErrorKind::NotStarted));

        send(&mut dispatcher, json!(["STARTUP"])).await;
        let empty = send(&mut dispatcher, json!(["EXISTS", ""])).await;
        assert_eq!(empty.error_kind(), Some(ErrorKind::MissingArgument));
    }

    #[tokio::test]
    async fn test_shutdown_payload_is_final_index() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut dispatcher = dispatcher(temp_dir.path());

        send(&mut dispatcher, json!(["STARTUP"])).await;
        send(&mut dispatcher, json!(["MAKE_NEW_FILE", "keep.txt"])).await;
        let dump = send(&mut dispatcher, json!(["DUMP_INDEX"])).await;
        let shutdown = send(&mut dispatcher, json!(["SHUTDOWN"])).await;
        assert_eq!(dump, shutdown);

        let after = send(&mut dispatcher, json!(["GET_DRIVE_NAMES"])).await;
        assert_eq!(after.error_kind(), Some(ErrorKind::AlreadyShutDown));
    }

    #[tokio::test]
    async fn test_snapshot_arguments() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut dispatcher = dispatcher(temp_dir.path());
        send(&mut dispatcher, json!(["STARTUP"])).await;

        let corrupt = json!({
            "revision": 3,
            "entries": {
                "x.txt": {"path": "x.txt", "drive": "ghost", "size": 0, "uid": 0, "gid": 0, "mode": 0}
            }
        });
        let refreshed = send(&mut dispatcher, json!(["REFRESH_INDEX", corrupt])).await;
        assert_eq!(refreshed.error_kind(), Some(ErrorKind::IndexCorruption));

        let empty = json!({"revision": 0, "entries": {}});
        let merged = send(&mut dispatcher, json!(["APPLY_SAVED_INDEX", empty])).await;
        assert!(matches!(
            merged,
            Response::Ok { payload: Payload::Merged(ref report) } if report.applied == 0
        ));
    }
}
