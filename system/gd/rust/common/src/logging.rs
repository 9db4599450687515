use crate::init_flags::{
    get_log_level_for_tag, LOG_TAG_DEBUG, LOG_TAG_ERROR, LOG_TAG_FATAL, LOG_TAG_INFO,
    LOG_TAG_NOTICE, LOG_TAG_VERBOSE, LOG_TAG_WARN,
};

/// Tag whose level applies to the Rust logger as a whole.
pub const CORE_LOG_TAG: &str = "bluetooth_core";

fn level_filter(level: i32) -> log::LevelFilter {
    match level {
        LOG_TAG_FATAL => log::LevelFilter::Error,
        LOG_TAG_ERROR => log::LevelFilter::Error,
        LOG_TAG_WARN => log::LevelFilter::Warn,
        LOG_TAG_NOTICE => log::LevelFilter::Info,
        LOG_TAG_INFO => log::LevelFilter::Info,
        LOG_TAG_DEBUG => log::LevelFilter::Debug,
        LOG_TAG_VERBOSE => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info, // default level
    }
}

/// Maps the init-flag log level of `tag` onto a `log` filter.
pub fn get_log_level(tag: &str) -> log::LevelFilter {
    level_filter(get_log_level_for_tag(tag))
}

/// Inits logging for host. Safe to call more than once; only the first call
/// installs the logger.
pub fn init_logging() {
    let level = get_log_level(CORE_LOG_TAG);
    env_logger::Builder::new().filter(None, level).parse_default_env().try_init().ok();
    log::set_max_level(level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_and_error_share_a_filter() {
        assert_eq!(level_filter(LOG_TAG_FATAL), log::LevelFilter::Error);
        assert_eq!(level_filter(LOG_TAG_ERROR), log::LevelFilter::Error);
    }

    #[test]
    fn verbose_maps_to_trace() {
        assert_eq!(level_filter(LOG_TAG_VERBOSE), log::LevelFilter::Trace);
        assert_eq!(level_filter(LOG_TAG_DEBUG), log::LevelFilter::Debug);
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        assert_eq!(level_filter(42), log::LevelFilter::Info);
        assert_eq!(level_filter(LOG_TAG_NOTICE), log::LevelFilter::Info);
    }
}
