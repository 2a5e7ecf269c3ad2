mod endpoints;
pub mod http_remote_gateway;

pub use http_remote_gateway::HttpRemoteGateway;
