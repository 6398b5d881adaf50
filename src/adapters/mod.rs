pub mod connector;
pub mod tls;
