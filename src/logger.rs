use core::fmt::{self, Write};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::{mutex::Mutex, vga_buffer::TextSink};

/// `log` backend printing to whatever text sink it was given.
///
/// Records logged before [`Logger::attach`] are dropped.
pub struct Logger<W> {
    level: LevelFilter,
    sink: Mutex<Option<W>>,
}

impl<W: TextSink + Send> Logger<W> {
    pub const fn new(level: LevelFilter) -> Self {
        Self {
            level,
            sink: Mutex::new(None),
        }
    }

    pub fn init(&'static self) -> Result<(), SetLoggerError> {
        log::set_max_level(self.level);
        log::set_logger(self)
    }

    /// Hands the sink over to the logger, returning the previous one.
    pub fn attach(&self, sink: W) -> Option<W> {
        self.sink.lock().replace(sink)
    }

    pub fn detach(&self) -> Option<W> {
        self.sink.lock().take()
    }
}

struct SinkWriter<'a, W>(&'a mut W);

impl<W: TextSink> Write for SinkWriter<'_, W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write(s.as_bytes());
        Ok(())
    }
}

impl<W: TextSink + Send> Log for Logger<W> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level().to_level_filter() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // a record logged while printing another one (say from a panic) is dropped
        let Some(mut sink) = self.sink.try_lock() else {
            return;
        };

        if let Some(sink) = sink.as_mut() {
            let _ = writeln!(
                SinkWriter(sink),
                "{:>5} | {}",
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}
