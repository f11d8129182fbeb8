use log::{Level, log};


/// How a notification should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

/// Sink for user-visible notifications (message, severity, detail)
/// The UI hands in a toast/snackbar implementation; the crate never
/// renders anything itself
pub trait Notify {
    fn notify(&self, message: &str, severity: Severity, detail: Option<&str>);
}

/// Forwards notifications to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotify;

impl Notify for LogNotify {
    fn notify(&self, message: &str, severity: Severity, detail: Option<&str>) {
        let level = match severity {
            Severity::Success | Severity::Info => Level::Info,
            Severity::Warning => Level::Warn,
            Severity::Error => Level::Error,
        };
        match detail {
            Some(detail) => log!(level, "{message}: {detail}"),
            None => log!(level, "{message}"),
        }
    }
}

/// Discards every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotify;

impl Notify for SilentNotify {
    fn notify(&self, _message: &str, _severity: Severity, _detail: Option<&str>) {}
}
