use std::sync::Arc;

/**
 * Receives every human-readable status line the pipeline produces: one per
 * session transition plus the throttled orientation refresh. Observational
 * only, a sink must never influence control flow.
 */
pub trait StatusSink: Send + Sync {
    fn show(&self, text: &str);
}

pub type StatusHandle = Arc<dyn StatusSink>;

/**
 * Headless stand-in for a status label: prints each line to stdout.
 */
pub struct ConsoleStatusSink;

impl StatusSink for ConsoleStatusSink {
    fn show(&self, text: &str) {
        println!("{}", text);
    }
}

#[cfg(test)]
pub struct RecordingStatusSink {
    pub lines: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingStatusSink {
    pub fn new() -> Self {
        RecordingStatusSink { lines: std::sync::Mutex::new(Vec::new()) }
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.snapshot().iter().any(|line| line.contains(needle))
    }
}

#[cfg(test)]
impl StatusSink for RecordingStatusSink {
    fn show(&self, text: &str) {
        self.lines.lock().unwrap().push(text.to_string());
    }
}
