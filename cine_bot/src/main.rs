use bot_commons::*;

fn main() {
    // Still single-threaded here, the runtime is started below.
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "WARN,cine_bot=debug");
    }
    start_everything(cine_bot::entry());
}
