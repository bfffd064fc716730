//! Line-delimited JSON transport over stdin/stdout.
//!
//! Each input line is one transport message. Command responses and periodic
//! readings leave as one JSON document per output line.

use sensorhub_app::dispatcher::CommandDispatcher;
use sensorhub_app::ports::{DefinitionStore, ReadingPublisher};
use sensorhub_domain::error::BoxError;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Writes each payload as a single JSON line.
pub struct LinePublisher<W> {
    writer: Mutex<W>,
}

impl<W> LinePublisher<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl LinePublisher<tokio::io::Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Unpin + Send> ReadingPublisher for LinePublisher<W> {
    async fn publish(&self, payload: Value) -> Result<(), BoxError> {
        let mut line = serde_json::to_vec(&payload)?;
        line.push(b'\n');
        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Feed every line of `reader` to the dispatcher and publish the responses.
///
/// Lines that are not JSON, and messages without a `sensor_command`, are
/// skipped. Returns the number of commands answered once the input closes.
///
/// # Errors
///
/// Returns an error if reading the input fails.
pub async fn serve_lines<R, S, P>(
    reader: R,
    dispatcher: &CommandDispatcher<S>,
    publisher: &P,
) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    S: DefinitionStore + Send + Sync,
    P: ReadingPublisher + Sync,
{
    let mut lines = reader.lines();
    let mut answered = 0;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let message: Value = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(error = %err, "discarding undecodable message");
                continue;
            }
        };
        let Some(response) = dispatcher.handle_message(&message).await else {
            tracing::debug!("ignoring message without sensor_command");
            continue;
        };
        answered += 1;
        let payload = match serde_json::to_value(&response) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(error = %err, "failed to encode command response");
                continue;
            }
        };
        if let Err(err) = publisher.publish(payload).await {
            tracing::warn!(error = %err, action = %response.action, "failed to send command response");
        }
    }
    Ok(answered)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sensorhub_adapter_storage_json::JsonFileStore;
    use sensorhub_app::context::DeviceContext;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    async fn context(dir: &TempDir) -> DeviceContext<JsonFileStore> {
        DeviceContext::init(
            sensorhub_adapter_virtual::catalog(),
            JsonFileStore::new(dir.path().join("sensors.json")),
            Duration::from_secs(2),
        )
        .await
    }

    fn output_lines(publisher: LinePublisher<Vec<u8>>) -> Vec<Value> {
        let bytes = publisher.into_inner();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn should_write_one_json_document_per_line() {
        let publisher = LinePublisher::new(Vec::new());
        publisher.publish(json!({"count": 0})).await.unwrap();
        publisher.publish(json!({"count": 1})).await.unwrap();

        let lines = output_lines(publisher);
        assert_eq!(lines, vec![json!({"count": 0}), json!({"count": 1})]);
    }

    #[tokio::test]
    async fn should_answer_commands_and_skip_noise() {
        let dir = TempDir::new().unwrap();
        let context = context(&dir).await;
        let dispatcher = context.dispatcher();
        let publisher = LinePublisher::new(Vec::new());

        let input = concat!(
            "{\"sensor_command\": {\"action\": \"configure\", \"sensor_id\": \"relay_1\", ",
            "\"config\": {\"sensor_type\": \"dout\", \"inputs\": {\"pin_no\": 17}}}}\n",
            "not json\n",
            "\n",
            "{\"telemetry\": {}}\n",
            "{\"sensor_command\": {\"action\": \"list\"}}\n",
        );
        let answered = serve_lines(input.as_bytes(), &dispatcher, &publisher)
            .await
            .unwrap();

        assert_eq!(answered, 2);
        let lines = output_lines(publisher);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["action"], "configure");
        assert_eq!(lines[0]["status"], "success");
        assert_eq!(lines[1]["action"], "list");
        assert_eq!(lines[1]["result"][0]["sensor_id"], "relay_1");
    }

    #[tokio::test]
    async fn should_report_command_failures_as_responses() {
        let dir = TempDir::new().unwrap();
        let context = context(&dir).await;
        let dispatcher = context.dispatcher();
        let publisher = LinePublisher::new(Vec::new());

        let input = "{\"sensor_command\": {\"action\": \"read\", \"sensor_id\": \"ghost\"}}\n";
        serve_lines(input.as_bytes(), &dispatcher, &publisher)
            .await
            .unwrap();

        let lines = output_lines(publisher);
        assert_eq!(lines[0]["status"], "error");
        assert_eq!(lines[0]["sensor_id"], "ghost");
        assert_eq!(lines[0]["error"]["kind"], "SensorNotFound");
    }
}
