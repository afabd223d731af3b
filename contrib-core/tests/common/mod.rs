//! Test helpers shared by the integration tests
//!
//! Each test binary only uses part of this module.
#![allow(dead_code)]

use async_trait::async_trait;
use contrib_core::catalog::{
    CatalogError, ContributionListener, ContributionRecord, Downloader, ProgressMonitor,
};
use std::sync::{Arc, Mutex, Once};

/// Initialize logging for tests (only once per test run)
static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

pub const SAMPLE_CATALOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<contributions>
  <category name="Sound">
    <library name="Minim" url="http://code.compartmental.net/tools/minim">
      <author name="Damien Di Fede" url="http://code.compartmental.net"/>
      <description sentence="Audio playback" paragraph="Playback, synthesis and analysis."/>
      <version id="12" pretty="2.1.0"/>
      <location url="http://example.com/minim.zip"/>
    </library>
    <library name="beads">
      <author name="Ollie Bown"/>
      <version id="4"/>
    </library>
  </category>
  <category name="I/O">
    <library name="Serial">
      <description sentence="Talk to serial ports"/>
      <version id="2"/>
    </library>
  </category>
</contributions>"#;

/// Downloader returning canned bytes or a canned failure
pub struct MockDownloader {
    response: Result<Vec<u8>, String>,
}

impl MockDownloader {
    pub fn serving(body: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(body.as_bytes().to_vec()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Err(message.to_string()),
        })
    }
}

#[async_trait]
impl Downloader for MockDownloader {
    async fn download(
        &self,
        url: &str,
        progress: &dyn ProgressMonitor,
    ) -> Result<Vec<u8>, CatalogError> {
        match &self.response {
            Ok(bytes) => {
                progress.start_task("mock download", Some(bytes.len() as u64));
                progress.progress(bytes.len() as u64);
                Ok(bytes.clone())
            }
            Err(message) => Err(CatalogError::Download {
                url: url.to_string(),
                message: message.clone(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Progress monitor that remembers what it was told
#[derive(Default)]
pub struct RecordingMonitor {
    pub events: Mutex<Vec<String>>,
}

impl RecordingMonitor {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressMonitor for RecordingMonitor {
    fn start_task(&self, name: &str, _total: Option<u64>) {
        self.events.lock().unwrap().push(format!("start {name}"));
    }

    fn finished(&self) {
        self.events.lock().unwrap().push("finished".to_string());
    }

    fn error(&self, error: &CatalogError) {
        self.events
            .lock()
            .unwrap()
            .push(format!("error {}", error.kind()));
    }
}

/// Listener that remembers every change
#[derive(Default)]
pub struct RecordingListener {
    pub events: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl ContributionListener for RecordingListener {
    fn contribution_added(&self, record: &Arc<ContributionRecord>) {
        self.events
            .lock()
            .unwrap()
            .push(format!("added {}", record.name));
    }

    fn contribution_removed(&self, record: &Arc<ContributionRecord>) {
        self.events
            .lock()
            .unwrap()
            .push(format!("removed {}", record.name));
    }

    fn contribution_changed(&self, old: &Arc<ContributionRecord>, new: &Arc<ContributionRecord>) {
        self.events
            .lock()
            .unwrap()
            .push(format!("changed {} -> {}", old.name, new.name));
    }
}

pub fn names(records: &[Arc<ContributionRecord>]) -> Vec<String> {
    records.iter().map(|r| r.name.clone()).collect()
}
