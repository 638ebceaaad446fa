//! Deployment hooks
//!
//! Callbacks the engine consults for NAT rewriting, UPnP port forwarding and
//! client filtering. Every method has a permissive default so embedders only
//! override what they need.

use log::{debug, info};
use std::net::Ipv4Addr;

pub trait ServerHooks {
    /// External address to advertise in PASV replies to `client`, if the
    /// server sits behind NAT from that client's point of view.
    fn external_ip(&self, _client: Ipv4Addr) -> Option<Ipv4Addr> {
        None
    }

    fn add_port_forward(&mut self, _internal: u16, _external: u16) {}

    fn remove_port_forward(&mut self, _external: u16) {}

    /// Allow-list predicate applied to control and passive data connections.
    fn is_valid_client(&self, _client: Ipv4Addr) -> bool {
        true
    }

    /// Final say on whether `account` may download the server path `path`.
    fn may_retrieve(&self, _client: Ipv4Addr, _account: &str, _path: &str) -> bool {
        true
    }
}

/// Hooks driven by the server configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredHooks {
    allowed_clients: Vec<Ipv4Addr>,
    external_address: Option<Ipv4Addr>,
}

impl ConfiguredHooks {
    pub fn new(allowed_clients: Vec<Ipv4Addr>, external_address: Option<Ipv4Addr>) -> Self {
        Self {
            allowed_clients,
            external_address,
        }
    }
}

impl ServerHooks for ConfiguredHooks {
    fn external_ip(&self, client: Ipv4Addr) -> Option<Ipv4Addr> {
        if client.is_private() || client.is_loopback() || client.is_link_local() {
            return None;
        }
        self.external_address
    }

    fn add_port_forward(&mut self, internal: u16, external: u16) {
        info!("Passive port {internal} advertised externally as {external}; forward it on the gateway");
    }

    fn remove_port_forward(&mut self, external: u16) {
        debug!("Passive port {external} no longer in use");
    }

    fn is_valid_client(&self, client: Ipv4Addr) -> bool {
        self.allowed_clients.is_empty() || self.allowed_clients.contains(&client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_allow_list_accepts_everyone() {
        let hooks = ConfiguredHooks::default();
        assert!(hooks.is_valid_client(Ipv4Addr::new(203, 0, 113, 7)));
    }

    #[test]
    fn test_allow_list_filters() {
        let hooks = ConfiguredHooks::new(vec![Ipv4Addr::LOCALHOST], None);
        assert!(hooks.is_valid_client(Ipv4Addr::LOCALHOST));
        assert!(!hooks.is_valid_client(Ipv4Addr::new(10, 0, 0, 2)));
    }

    #[test]
    fn test_external_address_only_for_public_clients() {
        let external = Ipv4Addr::new(198, 51, 100, 1);
        let hooks = ConfiguredHooks::new(Vec::new(), Some(external));
        assert_eq!(hooks.external_ip(Ipv4Addr::new(192, 168, 1, 20)), None);
        assert_eq!(hooks.external_ip(Ipv4Addr::new(203, 0, 113, 7)), Some(external));
    }
}
