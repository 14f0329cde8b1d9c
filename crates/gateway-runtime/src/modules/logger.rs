//! Message logger.
//!
//! Every received message is logged through `tracing`. With a `filename` the
//! logger also keeps a JSON array file: `[` when created, one object per
//! entry, `]` when destroyed. The first and last entries mark the start and
//! end of the log.

use std::borrow::Cow;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gateway_bus::ModuleContext;
use gateway_telemetry::{log_event, log_module_event};
use gateway_types::{Message, Module, ModuleError, ModuleHandle, Properties};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::parse_args;
use crate::registry::ModuleFactory;

/// `logger` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerArgs {
    /// JSON array file to append entries to.
    pub filename: Option<PathBuf>,
}

pub struct LoggerFactory;

impl ModuleFactory for LoggerFactory {
    fn kind(&self) -> &'static str {
        "logger"
    }

    fn create(&self, context: ModuleContext) -> Result<Arc<dyn Module>, ModuleError> {
        let args: LoggerArgs = parse_args(context.configuration())?;
        let handle = context.handle();

        let file = match &args.filename {
            Some(path) => {
                let mut file = LogFile::create(path)?;
                file.append(&Entry::marker("Log started"))?;
                log_module_event!(info, "logger", "Logging to file", handle, path = %path.display());
                Some(file)
            }
            None => {
                log_event!(debug, "logger", "No log file configured", handle = %handle);
                None
            }
        };

        Ok(Arc::new(LoggerModule {
            handle,
            file: Mutex::new(file),
        }))
    }
}

/// Logs messages and, optionally, records them in a JSON array file.
pub struct LoggerModule {
    handle: ModuleHandle,
    file: Mutex<Option<LogFile>>,
}

#[async_trait]
impl Module for LoggerModule {
    async fn receive(&self, message: Arc<Message>) {
        info!(
            handle = %self.handle,
            content = %message.content_str(),
            properties = ?message.properties(),
            "Message received"
        );

        let mut file = self.file.lock();
        if let Some(file) = file.as_mut() {
            if let Err(e) = file.append(&Entry::message(&message)) {
                warn!(handle = %self.handle, error = %e, "Failed to write log entry");
            }
        }
    }

    async fn destroy(&self) {
        let file = self.file.lock().take();
        if let Some(mut file) = file {
            let result = file
                .append(&Entry::marker("Log stopped"))
                .and_then(|()| file.close());
            if let Err(e) = result {
                warn!(handle = %self.handle, error = %e, "Failed to close log file");
            }
        }
    }
}

#[derive(Serialize)]
struct Entry<'a> {
    time: DateTime<Utc>,
    content: Cow<'a, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    properties: Option<&'a Properties>,
}

impl<'a> Entry<'a> {
    fn marker(text: &'static str) -> Self {
        Self {
            time: Utc::now(),
            content: Cow::Borrowed(text),
            properties: None,
        }
    }

    fn message(message: &'a Message) -> Self {
        Self {
            time: Utc::now(),
            content: message.content_str(),
            properties: Some(message.properties()),
        }
    }
}

struct LogFile {
    file: File,
    empty: bool,
}

impl LogFile {
    fn create(path: &Path) -> Result<Self, ModuleError> {
        let mut file = File::create(path)?;
        file.write_all(b"[")?;
        Ok(Self { file, empty: true })
    }

    fn append(&mut self, entry: &Entry<'_>) -> Result<(), ModuleError> {
        let json = serde_json::to_string(entry).map_err(|e| ModuleError::Io(e.to_string()))?;
        let separator = if self.empty { "\n" } else { ",\n" };
        self.file.write_all(separator.as_bytes())?;
        self.file.write_all(json.as_bytes())?;
        self.file.flush()?;
        self.empty = false;
        Ok(())
    }

    fn close(&mut self) -> Result<(), ModuleError> {
        self.file.write_all(b"\n]\n")?;
        self.file.sync_all()?;
        Ok(())
    }
}
