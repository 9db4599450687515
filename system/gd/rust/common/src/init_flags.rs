use lazy_static::lazy_static;
use log::{error, warn};
use std::collections::HashMap;
use std::sync::Mutex;

// Log levels, matching the values used by the native logging shim.
pub const LOG_TAG_FATAL: i32 = 0;
pub const LOG_TAG_ERROR: i32 = 1;
pub const LOG_TAG_WARN: i32 = 2;
pub const LOG_TAG_NOTICE: i32 = 3;
pub const LOG_TAG_INFO: i32 = 4;
pub const LOG_TAG_DEBUG: i32 = 5;
pub const LOG_TAG_VERBOSE: i32 = 6;

/// Environment variable holding whitespace separated init flags.
pub const INIT_FLAGS_ENV: &str = "BT_INIT_FLAGS";

const DEFAULT_LOG_LEVEL_FLAG: &str = "INIT_default_log_level_str";
const LOG_LEVEL_FOR_TAGS_FLAG: &str = "INIT_log_level_for_tags";

#[derive(Debug)]
struct InitFlags {
    default_log_level: i32,
    log_level_for_tags: HashMap<String, i32>,
}

impl Default for InitFlags {
    fn default() -> Self {
        InitFlags { default_log_level: LOG_TAG_INFO, log_level_for_tags: HashMap::new() }
    }
}

fn parse_log_level(level: &str) -> Option<i32> {
    match level {
        "LOG_FATAL" => Some(LOG_TAG_FATAL),
        "LOG_ERROR" => Some(LOG_TAG_ERROR),
        "LOG_WARN" => Some(LOG_TAG_WARN),
        "LOG_NOTICE" => Some(LOG_TAG_NOTICE),
        "LOG_INFO" => Some(LOG_TAG_INFO),
        "LOG_DEBUG" => Some(LOG_TAG_DEBUG),
        "LOG_VERBOSE" => Some(LOG_TAG_VERBOSE),
        _ => None,
    }
}

fn parse_tag_level(entry: &str) -> Option<(&str, i32)> {
    let (tag, level) = entry.split_once(':')?;
    Some((tag, parse_log_level(level)?))
}

impl InitFlags {
    fn parse<S: AsRef<str>>(flags: &[S]) -> Self {
        let mut init_flags = InitFlags::default();

        for flag in flags {
            let flag = flag.as_ref();
            let (name, value) = match flag.split_once('=') {
                Some(pair) => pair,
                None => {
                    error!("Bad flag {}, must be in <FLAG>=<VALUE> format", flag);
                    continue;
                }
            };

            match name {
                DEFAULT_LOG_LEVEL_FLAG => match parse_log_level(value) {
                    Some(level) => init_flags.default_log_level = level,
                    None => warn!("Unknown log level {} for {}", value, name),
                },
                LOG_LEVEL_FOR_TAGS_FLAG => {
                    // Format is tag1:LOG_DEBUG,tag2:LOG_WARN
                    for entry in value.split(',').filter(|e| !e.is_empty()) {
                        match parse_tag_level(entry) {
                            Some((tag, level)) => {
                                init_flags.log_level_for_tags.insert(tag.to_string(), level);
                            }
                            None => warn!("Ignoring bad tag level entry {}", entry),
                        }
                    }
                }
                _ => warn!("Unknown init flag {}", name),
            }
        }

        init_flags
    }

    fn from_env() -> Self {
        match std::env::var(INIT_FLAGS_ENV) {
            Ok(flags) => Self::parse(&flags.split_whitespace().collect::<Vec<_>>()),
            Err(_) => Self::default(),
        }
    }
}

lazy_static! {
    static ref FLAGS: Mutex<InitFlags> = Mutex::new(InitFlags::from_env());
}

/// Replaces the current init flags with the given ones.
pub fn load<S: AsRef<str>>(flags: &[S]) {
    *FLAGS.lock().unwrap() = InitFlags::parse(flags);
}

/// Returns the configured log level for the given tag, or the default level
/// if the tag has no override.
pub fn get_log_level_for_tag(tag: &str) -> i32 {
    let flags = FLAGS.lock().unwrap();
    flags.log_level_for_tags.get(tag).cloned().unwrap_or(flags.default_log_level)
}
