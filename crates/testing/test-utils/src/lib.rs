static INIT: std::sync::Once = std::sync::Once::new();

/// Install the test subscriber and panic hook once per test binary.
///
/// Filtering follows `RUST_LOG`, output is captured by the test harness.
pub fn set_up() {
    INIT.call_once(|| {
        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::util::SubscriberInitExt;

        std::panic::set_hook(Box::new(utils::tracing_panic_hook));

        let fmt_layer = tracing_subscriber::fmt::layer()
            .compact()
            .with_test_writer();

        tracing_subscriber::registry()
            .with(fmt_layer)
            .with(tracing_subscriber::EnvFilter::from_default_env())
            .init();
    });
}
