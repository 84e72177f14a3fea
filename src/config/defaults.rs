//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

pub fn r#true() -> bool {
    true
}

// ============================================================================
// [templates] Section Defaults
// ============================================================================

pub mod templates {
    use std::path::PathBuf;

    pub fn master() -> String {
        "Master.html".into()
    }

    pub fn dir() -> PathBuf {
        "templates".into()
    }

    pub fn output() -> PathBuf {
        "generated".into()
    }

    pub fn settle_ms() -> u64 {
        500
    }
}

// ============================================================================
// [serve] Section Defaults
// ============================================================================

pub mod serve {
    use std::path::PathBuf;

    pub fn interface() -> String {
        "127.0.0.1".into()
    }

    pub fn port() -> u16 {
        80
    }

    pub fn static_dir() -> PathBuf {
        "static".into()
    }

    pub fn not_found() -> PathBuf {
        "static/404.html".into()
    }
}
