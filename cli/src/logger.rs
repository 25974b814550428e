/// Print messages from the `log` crate to STDERR, at `info` unless `RUST_LOG` says otherwise.
pub fn setup() {
    use env_logger::{Builder, Env};
    Builder::from_env(Env::default().default_filter_or("info")).init();
}
