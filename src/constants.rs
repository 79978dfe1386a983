pub mod api {
    pub const DEFAULT_BASE_URL: &str = "https://api.appstoreconnect.apple.com/v1";
}

pub mod auth {
    pub const AUDIENCE: &str = "appstoreconnect-v1";
    pub const TOKEN_TTL_SECS: i64 = 20 * 60;
    pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;
}

pub mod env {
    pub const KEY_ID: &str = "APP_STORE_CONNECT_KEY_ID";
    pub const ISSUER_ID: &str = "APP_STORE_CONNECT_ISSUER_ID";
    pub const P8_PATH: &str = "APP_STORE_CONNECT_P8_PATH";
    pub const VENDOR_NUMBER: &str = "APP_STORE_CONNECT_VENDOR_NUMBER";
    pub const API_BASE_URL: &str = "APP_STORE_CONNECT_API_BASE_URL";
}

pub mod limits {
    pub const DEFAULT_LIMIT: u32 = 100;
    pub const MAX_LIMIT: u32 = 200;
    pub const FEEDBACK_DEFAULT_LIMIT: u32 = 50;
}

pub mod network {
    pub const TIMEOUT_API_REQUEST_MS: u64 = 30_000;
    pub const TIMEOUT_CONNECTION_MS: u64 = 5_000;
}

pub mod screenshots {
    pub const TIMEOUT_MS: u64 = 10_000;
    pub const MAX_BYTES: usize = 5 * 1024 * 1024;
    pub const FALLBACK_MIME: &str = "image/jpeg";
}

pub mod protocols {
    pub const ALLOWED_HTTP: &[&str] = &["http:", "https:"];
}
