use crate::config::ResolveOverride;
use std::net::{SocketAddr, ToSocketAddrs};
use ureq::Resolver;

/// Resolves the directory service's address, preferring the `RESOLVE` pins from the config.
pub struct NssDnsResolver {
    pub(crate) overrides: Vec<ResolveOverride>,
}

impl Resolver for NssDnsResolver {
    fn resolve(&self, netloc: &str) -> std::io::Result<Vec<SocketAddr>> {
        let addresses: Vec<SocketAddr> = self
            .overrides
            .iter()
            .filter(|item| item.from == netloc)
            .map(|item| item.to)
            .collect();

        if !addresses.is_empty() {
            log::debug!("resolved {netloc} to {addresses:?} from config");
            return Ok(addresses);
        }
        Ok(netloc.to_socket_addrs()?.collect())
    }
}
