use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::StaticConfig;

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Returns an Arc pointer to the configuration, which is cheap to clone
/// and doesn't hold any locks. Falls back to defaults when `init_config_from`
/// has not run yet.
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get_or_init(|| ArcSwap::from_pointee(StaticConfig::default()))
        .load_full()
}

/// Initialize the global configuration from an explicit TOML path.
///
/// Later calls replace the stored value (used by `-c/--config`).
pub fn init_config_from(path: &str) {
    let loaded = StaticConfig::load_from(path);
    match CONFIG.get() {
        Some(existing) => existing.store(Arc::new(loaded)),
        None => {
            if let Err(cell) = CONFIG.set(ArcSwap::from_pointee(loaded)) {
                // 并发初始化时另一方抢先，覆盖为本次加载结果
                if let Some(existing) = CONFIG.get() {
                    existing.store(cell.load_full());
                }
            }
        }
    }
}
