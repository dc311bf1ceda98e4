fn main() {
    // Only wire up the ESP-IDF build environment for device builds; host
    // builds (tests, clippy) have no toolchain to probe.
    if std::env::var_os("CARGO_FEATURE_ESPIDF").is_some() {
        embuild::espidf::sysenv::output();
    }
}
