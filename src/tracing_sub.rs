use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;

/// While the terminal is in raw mode the alternate screen owns stdout and
/// stderr, so diagnostics go to a log file when one is configured and are
/// dropped otherwise.
pub struct SinkWriter {
    inner: Option<File>,
}

static LOG_FILE: Mutex<Option<File>> = Mutex::new(None);

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SubscriberMakeWriter;

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SubscriberMakeWriter {
    type Writer = SinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        let inner = LOG_FILE
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().and_then(|file| file.try_clone().ok()));
        SinkWriter { inner }
    }
}

/// Initialize the tracing subscriber, appending to `log_file` when given.
/// Safe to call multiple times; subsequent calls are no-ops for the global
/// subscriber.
pub fn init_default(log_file: Option<&Path>) -> io::Result<()> {
    if let Some(path) = log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        if let Ok(mut guard) = LOG_FILE.lock() {
            *guard = Some(file);
        }
    }
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_writer(SubscriberMakeWriter)
        .with_target(false)
        .with_thread_names(false)
        .with_ansi(false)
        .try_init();
    Ok(())
}
