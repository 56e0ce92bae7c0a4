pub fn default_version() -> u32 {
    1
}

pub fn default_concurrency() -> usize {
    8
}

pub fn default_timeout_sec() -> u64 {
    30
}

pub fn default_retention_sec() -> u64 {
    3600
}

pub fn default_janitor_interval_sec() -> u64 {
    60
}

pub fn default_max_retries() -> u32 {
    3
}

pub fn default_base_delay_ms() -> u64 {
    1000
}

pub fn default_max_delay_ms() -> u64 {
    10_000
}

pub fn default_backoff_multiplier() -> f64 {
    2.0
}

pub fn default_success_weight() -> f64 {
    70.0
}

pub fn default_max_speed_bonus() -> f64 {
    30.0
}

pub fn default_max_insights() -> usize {
    10
}

pub fn default_max_recommendations() -> usize {
    10
}

pub fn default_midpoint() -> u8 {
    50
}

pub fn default_true() -> bool {
    true
}
