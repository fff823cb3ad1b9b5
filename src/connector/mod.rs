use crate::metering_sml::structs::{SmlMessage, SmlRecord};
use crate::metering_sml::ExtractError;
use crate::obis_utils;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Split};

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("Unable to read from sensor: {0}")]
    Io(#[from] std::io::Error),
    #[error("Connector used before connect()")]
    NotConnected,
    #[error("Record handler failed: {0}")]
    Handler(#[from] ExtractError),
}

pub type RecordHandler = Box<dyn FnMut(&SmlRecord) -> Result<(), ExtractError> + Send>;

/// Source of decoded SML records.
#[allow(async_fn_in_trait)]
pub trait RecordConnector {
    async fn connect(&mut self) -> Result<(), ConnectorError>;

    /// Registers the handler for records of type `msg_type`, replacing any previous one.
    fn on_record(&mut self, msg_type: &str, handler: RecordHandler);

    /// Delivers records until the source ends or the handler fails.
    async fn run(&mut self) -> Result<(), ConnectorError>;
}

/// Reads decoded SML messages, one JSON document per line, from a device or pipe.
pub struct JsonLinesConnector {
    address: PathBuf,
    lines: Option<Split<BufReader<File>>>,
    subscription: Option<(String, RecordHandler)>,
}

impl JsonLinesConnector {
    pub fn new(address: &str) -> Self {
        Self {
            address: PathBuf::from(address),
            lines: None,
            subscription: None,
        }
    }

    fn dispatch(&mut self, line: &str) -> Result<(), ConnectorError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        let mut record = match parse_record(line) {
            Some(record) => record,
            None => {
                warn!("Skipping undecodable line from {}: {}", self.address.display(), line);
                return Ok(());
            }
        };

        for entry in record.val_list.iter_mut() {
            entry.obj_name = obis_utils::normalize_obis_code(&entry.obj_name);
            if !obis_utils::validate_obis_code(&entry.obj_name) {
                debug!("Unexpected object name {:?} from {}", entry.obj_name, self.address.display());
            }
        }

        match self.subscription.as_mut() {
            Some((msg_type, handler)) if *msg_type == record.msg_type => {
                debug!("Received {} with {} entries", record.msg_type, record.val_list.len());
                handler(&record)?;
            }
            _ => debug!("Ignoring {} record", record.msg_type),
        }
        Ok(())
    }
}

/// Accepts both complete messages and bare message bodies.
fn parse_record(line: &str) -> Option<SmlRecord> {
    if let Ok(message) = serde_json::from_str::<SmlMessage>(line) {
        return Some(message.message_body);
    }
    serde_json::from_str::<SmlRecord>(line).ok()
}

impl RecordConnector for JsonLinesConnector {
    async fn connect(&mut self) -> Result<(), ConnectorError> {
        info!("Opening sensor at {}", self.address.display());
        let file = File::open(&self.address).await?;
        self.lines = Some(BufReader::new(file).split(b'\n'));
        Ok(())
    }

    fn on_record(&mut self, msg_type: &str, handler: RecordHandler) {
        self.subscription = Some((msg_type.to_string(), handler));
    }

    async fn run(&mut self) -> Result<(), ConnectorError> {
        loop {
            let lines = self.lines.as_mut().ok_or(ConnectorError::NotConnected)?;
            let raw = match lines.next_segment().await? {
                Some(raw) => raw,
                None => {
                    info!("Sensor stream {} ended", self.address.display());
                    return Ok(());
                }
            };

            let line = match String::from_utf8(raw) {
                Ok(line) => line,
                Err(e) => {
                    warn!("Skipping non UTF-8 line from {}: {}", self.address.display(), e);
                    continue;
                }
            };

            if let Err(e) = self.dispatch(&line) {
                error!("Stopping record processing: {}", e);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metering_sml::structs::SML_GET_LIST_RESPONSE;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    fn write_lines(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn collecting_handler() -> (Arc<Mutex<Vec<SmlRecord>>>, RecordHandler) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: RecordHandler = Box::new(move |record| {
            sink.lock().unwrap().push(record.clone());
            Ok(())
        });
        (seen, handler)
    }

    #[tokio::test]
    async fn test_reads_subscribed_records() {
        let file = write_lines(&[
            r#"{"messageBody": {"type": "SmlOpenResponse"}}"#,
            "",
            r#"{"messageBody": {"type": "SmlGetListResponse", "valList": [{"objName": " 1-0:16.7.0*255 ", "value": 3.0}]}}"#,
            "garbage",
            r#"{"type": "SmlGetListResponse", "valList": []}"#,
        ]);

        let mut connector = JsonLinesConnector::new(file.path().to_str().unwrap());
        let (seen, handler) = collecting_handler();
        connector.on_record(SML_GET_LIST_RESPONSE, handler);
        connector.connect().await.unwrap();
        connector.run().await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].val_list[0].obj_name, "1-0:16.7.0*255");
        assert!(seen[1].val_list.is_empty());
    }

    #[tokio::test]
    async fn test_skips_invalid_utf8_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\xff\xfe garbage \x80\n").unwrap();
        writeln!(file, r#"{{"type": "SmlGetListResponse", "valList": [{{"objName": "1-0:1.8.0*255", "value": 1.0}}]}}"#).unwrap();
        file.flush().unwrap();

        let mut connector = JsonLinesConnector::new(file.path().to_str().unwrap());
        let (seen, handler) = collecting_handler();
        connector.on_record(SML_GET_LIST_RESPONSE, handler);
        connector.connect().await.unwrap();
        connector.run().await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].val_list[0].obj_name, "1-0:1.8.0*255");
    }

    #[tokio::test]
    async fn test_unexpected_object_names_are_delivered() {
        let file = write_lines(&[
            r#"{"type": "SmlGetListResponse", "valList": [{"objName": "8181c78205ff", "value": "abc"}]}"#,
        ]);

        let mut connector = JsonLinesConnector::new(file.path().to_str().unwrap());
        let (seen, handler) = collecting_handler();
        connector.on_record(SML_GET_LIST_RESPONSE, handler);
        connector.connect().await.unwrap();
        connector.run().await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].val_list[0].obj_name, "8181c78205ff");
    }

    #[tokio::test]
    async fn test_handler_error_stops_run() {
        let file = write_lines(&[
            r#"{"type": "SmlGetListResponse", "valList": []}"#,
            r#"{"type": "SmlGetListResponse", "valList": []}"#,
        ]);

        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let mut connector = JsonLinesConnector::new(file.path().to_str().unwrap());
        connector.on_record(SML_GET_LIST_RESPONSE, Box::new(move |_| {
            *counter.lock().unwrap() += 1;
            Err(ExtractError::MalformedValue { obj_name: "1-0:1.8.0*255".to_string(), value: "x".to_string() })
        }));
        connector.connect().await.unwrap();

        let result = connector.run().await;
        assert!(matches!(result, Err(ConnectorError::Handler(_))));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_run_requires_connect() {
        let mut connector = JsonLinesConnector::new("/nonexistent/sensor");
        assert!(matches!(connector.run().await, Err(ConnectorError::NotConnected)));
        assert!(matches!(connector.connect().await, Err(ConnectorError::Io(_))));
    }
}
