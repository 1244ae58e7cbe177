//! Boilerplate shared by the bots in this workspace: logger and runtime
//! setup, retrying Telegram requests, and a few message helpers.

use std::future::Future;

pub mod useful_methods;

/// Initialize logging and start the `closure` in an async runtime.
/// Logging is enabled by default on level `info` unless overridden
/// by environment variable `RUST_LOG`. This uses the crate
/// [pretty_env_logger][] internally, see its documentation for more details.
///
/// [pretty_env_logger]: https://docs.rs/pretty_env_logger
///
/// # Panics
///
/// Panics if the tokio runtime can't be built.
pub fn start_everything(closure: impl Future<Output = ()>) {
    let log_level = std::env::var_os("RUST_LOG")
        .unwrap_or_else(|| std::ffi::OsString::from("info"))
        .into_string()
        .unwrap_or_else(|_| String::from("info"));

    // journald timestamps lines on its own.
    let running_as_systemd_service = std::env::var_os("JOURNAL_STREAM").is_some();

    let mut builder = match running_as_systemd_service {
        true => pretty_env_logger::formatted_builder(),
        false => pretty_env_logger::formatted_timed_builder(),
    };

    builder.parse_filters(&log_level);

    if builder.try_init().is_err() {
        log::error!("Tried to init logger twice!");
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build the tokio runtime!")
        .block_on(closure);
}

/// Evaluate a Telegram request expression up to 3 times, sleeping in between
/// if Telegram asks us to slow down or the network hiccups. Evaluates to the
/// last `Result`.
///
/// The expression is re-evaluated on every attempt, so it should build the
/// request from scratch, like `bot.send_message(chat, text).await`.
#[macro_export]
macro_rules! teloxide_retry {
    ($request:expr) => {{
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            match $request {
                Err(::teloxide::RequestError::RetryAfter(seconds)) if attempt < 3 => {
                    ::tokio::time::sleep(seconds.duration()).await;
                }
                Err(::teloxide::RequestError::Network(_)) if attempt < 3 => {
                    ::tokio::time::sleep(::std::time::Duration::from_secs(1)).await;
                }
                result => break result,
            }
        }
    }};
}
