//! Purpose: Route timestamped batch/result-set diagnostics away from row data.
//! Exports: `Diagnostics`.
//! Role: The only path for informational and error messages; sinks are injected.
//! Invariants: Diagnostics never touch the row-data sink and never raise.
//! Invariants: Every message carries its emission instant in RFC 3339 form.

use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use time::format_description::well_known::Rfc3339;

use crate::core::error::Error;

pub struct Diagnostics {
    err: Box<dyn Write>,
    console: Box<dyn Write>,
    redirect: bool,
}

impl Diagnostics {
    pub fn new(err: Box<dyn Write>, console: Box<dyn Write>, redirect: bool) -> Self {
        Self {
            err,
            console,
            redirect,
        }
    }

    /// Informational boundary messages: error stream when redirecting,
    /// console otherwise.
    pub fn info(&mut self, text: &str) {
        let line = format!("{} [I] {text}\n", now_rfc3339());
        let sink = if self.redirect {
            &mut self.err
        } else {
            &mut self.console
        };
        let _ = sink.write_all(line.as_bytes());
        let _ = sink.flush();
    }

    /// Row-level failures (scan errors, substituted values): error stream only.
    pub fn report(&mut self, err: &Error) {
        let line = format!("{} [E] {err}\n", now_rfc3339());
        let _ = self.err.write_all(line.as_bytes());
        let _ = self.err.flush();
    }

    /// Upstream errors: error stream plus a console echo, independent of the
    /// redirect flag, so failures stay visible under redirection.
    pub fn error(&mut self, err: &Error) {
        self.report(err);
        let echo = format!("[E] {err}\n");
        let _ = self.console.write_all(echo.as_bytes());
        let _ = self.console.flush();
    }
}

fn now_rfc3339() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|duration| {
            time::OffsetDateTime::from_unix_timestamp_nanos(duration.as_nanos() as i128).ok()
        })
        .and_then(|instant| instant.format(&Rfc3339).ok())
        .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::Diagnostics;
    use crate::core::error::{Error, ErrorKind};
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl SharedSink {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().expect("lock").clone()).expect("utf8")
        }
    }

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn channel(redirect: bool) -> (Diagnostics, SharedSink, SharedSink) {
        let err = SharedSink::default();
        let console = SharedSink::default();
        let diag = Diagnostics::new(
            Box::new(err.clone()),
            Box::new(console.clone()),
            redirect,
        );
        (diag, err, console)
    }

    #[test]
    fn info_goes_to_console_by_default() {
        let (mut diag, err, console) = channel(false);
        diag.info("Begin Batch");
        assert!(err.contents().is_empty());
        let line = console.contents();
        assert!(line.contains("[I] Begin Batch"));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn info_redirects_to_error_stream() {
        let (mut diag, err, console) = channel(true);
        diag.info("Begin Batch");
        assert!(console.contents().is_empty());
        assert!(err.contents().contains("[I] Begin Batch"));
    }

    #[test]
    fn report_targets_only_the_error_stream() {
        let (mut diag, err, console) = channel(false);
        diag.report(&Error::new(ErrorKind::Scan).with_message("bad row"));
        assert!(err.contents().contains("[E] Scan: bad row"));
        assert!(console.contents().is_empty());
    }

    #[test]
    fn errors_echo_to_console_even_when_redirecting() {
        let (mut diag, err, console) = channel(true);
        diag.error(&Error::new(ErrorKind::Io).with_message("sink closed"));
        assert!(err.contents().contains("[E] Io: sink closed"));
        assert!(console.contents().contains("[E] Io: sink closed"));
    }

    #[test]
    fn messages_open_with_a_timestamp() {
        let (mut diag, _, console) = channel(false);
        diag.info("tick");
        let line = console.contents();
        // RFC 3339 opens with a four-digit year and includes a date separator.
        let year = &line[0..4];
        assert!(year.chars().all(|ch| ch.is_ascii_digit()), "{line}");
        assert_eq!(&line[4..5], "-");
        assert!(line.contains('T'));
    }
}
