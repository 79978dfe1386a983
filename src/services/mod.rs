pub mod appstore_client;
pub mod credentials;
pub mod logger;
pub mod screenshot;
pub mod tool_executor;
pub mod validation;
