//! Registry of open pages (clients) and which of them the engine controls.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An open page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClientInfo {
    pub id: String,
    pub url: String,
    /// Whether the engine answers this page's requests.
    pub controlled: bool,
    pub focused: bool,
}

#[derive(Debug, Default)]
pub struct Clients {
    next_id: u64,
    clients: BTreeMap<String, ClientInfo>,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly opened page.
    pub fn open(&mut self, url: &str, controlled: bool) -> ClientInfo {
        self.next_id += 1;
        let client =
            ClientInfo { id: format!("client-{}", self.next_id), url: url.to_string(), controlled, focused: false };
        self.clients.insert(client.id.clone(), client.clone());
        client
    }

    pub fn close(&mut self, id: &str) -> bool {
        self.clients.remove(id).is_some()
    }

    /// Take control of every open page. Returns the ids that were not
    /// controlled before.
    pub fn claim(&mut self) -> Vec<String> {
        let mut claimed = Vec::new();
        for client in self.clients.values_mut().filter(|c| !c.controlled) {
            client.controlled = true;
            claimed.push(client.id.clone());
        }
        claimed
    }

    pub fn find_by_url(&self, url: &str) -> Option<&ClientInfo> {
        self.clients.values().find(|c| c.url == url)
    }

    /// Focus one page; every other page loses focus.
    pub fn focus(&mut self, id: &str) -> bool {
        if !self.clients.contains_key(id) {
            return false;
        }
        for client in self.clients.values_mut() {
            client.focused = client.id == id;
        }
        true
    }

    pub fn list(&self) -> Vec<ClientInfo> {
        self.clients.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_marks_only_uncontrolled() {
        let mut clients = Clients::new();
        let a = clients.open("http://localhost:5000/", false);
        let b = clients.open("http://localhost:5000/orders", true);

        assert_eq!(clients.claim(), vec![a.id.clone()]);
        assert!(clients.list().iter().all(|c| c.controlled));
        assert!(clients.claim().is_empty());
        assert!(clients.close(&b.id));
        assert!(!clients.close(&b.id));
    }

    #[test]
    fn test_focus_is_exclusive() {
        let mut clients = Clients::new();
        let a = clients.open("http://localhost:5000/", true);
        let b = clients.open("http://localhost:5000/orders", true);

        assert!(clients.focus(&a.id));
        assert!(clients.focus(&b.id));
        let focused: Vec<_> = clients.list().into_iter().filter(|c| c.focused).map(|c| c.id).collect();
        assert_eq!(focused, vec![b.id]);
        assert!(!clients.focus("client-99"));
    }

    #[test]
    fn test_find_by_url() {
        let mut clients = Clients::new();
        let a = clients.open("http://localhost:5000/", true);
        assert_eq!(clients.find_by_url("http://localhost:5000/").map(|c| c.id.as_str()), Some(a.id.as_str()));
        assert!(clients.find_by_url("http://localhost:5000/orders").is_none());
    }
}
