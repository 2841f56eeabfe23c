use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardedPort {
    pub port: u16,
    pub url: Option<String>,
    pub label: Option<String>,
}

impl ForwardedPort {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            url: None,
            label: None,
        }
    }

    /// What the "Copy Address" action puts on the clipboard.
    pub fn address(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| format!("localhost:{}", self.port))
    }

    /// What "Open in Browser" navigates to.
    pub fn browser_url(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PortList {
    ports: Vec<ForwardedPort>,
}

impl PortList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a forward; an existing entry for the same port is replaced in place.
    pub fn forward(&mut self, port: ForwardedPort) {
        match self.ports.iter_mut().find(|p| p.port == port.port) {
            Some(existing) => *existing = port,
            None => self.ports.push(port),
        }
    }

    pub fn close(&mut self, port: u16) -> bool {
        let before = self.ports.len();
        self.ports.retain(|p| p.port != port);
        self.ports.len() != before
    }

    pub fn ports(&self) -> &[ForwardedPort] {
        &self.ports
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_replaces_same_port() {
        let mut ports = PortList::new();
        ports.forward(ForwardedPort::new(3000));
        ports.forward(ForwardedPort {
            port: 3000,
            url: Some("https://dev.example.com".to_string()),
            label: Some("web".to_string()),
        });
        assert_eq!(ports.len(), 1);
        assert_eq!(ports.ports()[0].browser_url(), "https://dev.example.com");
    }

    #[test]
    fn test_default_addresses() {
        let port = ForwardedPort::new(8080);
        assert_eq!(port.address(), "localhost:8080");
        assert_eq!(port.browser_url(), "http://localhost:8080");
    }

    #[test]
    fn test_close() {
        let mut ports = PortList::new();
        ports.forward(ForwardedPort::new(1));
        assert!(ports.close(1));
        assert!(!ports.close(1));
        assert!(ports.is_empty());
    }
}
