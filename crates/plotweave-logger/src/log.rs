use crate::severity::LogSeverity;
use crate::systime::now;
use once_cell::sync::Lazy;

/// Lowest severity that gets printed, read once from `PLOTWEAVE_LOG`
static MIN_SEVERITY: Lazy<LogSeverity> = Lazy::new(|| {
    std::env::var("PLOTWEAVE_LOG")
        .ok()
        .and_then(|level| LogSeverity::from_name(&level))
        .unwrap_or(LogSeverity::Info)
});

pub fn enabled(log_severity: LogSeverity) -> bool {
    log_severity >= *MIN_SEVERITY
}

pub fn format_line(msg: &str, log_severity: LogSeverity, time: &str) -> String {
    format!("[{}] {} {}", log_severity, time, msg)
}

pub fn log(msg: String, log_severity: LogSeverity) {
    if !enabled(log_severity) {
        return;
    }
    let line = format_line(&msg, log_severity, &now());
    if log_severity >= LogSeverity::Error {
        eprintln!("{}", line);
    } else {
        println!("{}", line);
    }
}
