pub mod tls;
pub mod types;
