/// Stage-prefixed trace output on stderr, enabled by the `debug-logging`
/// feature of the crate that expands the macro. Arguments are always
/// type-checked; the print is compiled out when the feature is off.
#[macro_export]
macro_rules! debug_log {
    ($stage:expr, $($arg:tt)*) => {
        if cfg!(feature = "debug-logging") {
            eprintln!("[{}] {}", $stage, format_args!($($arg)*));
        }
    };
}
