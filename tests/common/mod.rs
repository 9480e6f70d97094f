//! Shared test plumbing.

use once_cell::sync::Lazy;

static LOG: Lazy<()> = Lazy::new(|| {
    let _ = env_logger::builder().is_test(true).try_init();
});

pub fn init() {
    Lazy::force(&LOG);
}
