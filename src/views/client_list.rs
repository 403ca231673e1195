//! Saved client list operations used by the add, edit and remove flows.

use deluge_core::ClientConfig;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ListError {
    #[error("a client with the same connection settings already exists ({0})")]
    Duplicate(String),
    #[error("no saved client named {0:?}")]
    NotFound(String),
}

/// Ordered list of saved clients.
#[derive(Clone, Debug, Default)]
pub struct ClientList {
    clients: Vec<ClientConfig>,
}

impl ClientList {
    pub fn new(clients: Vec<ClientConfig>) -> Self {
        Self { clients }
    }

    pub fn clients(&self) -> &[ClientConfig] {
        &self.clients
    }

    pub fn into_inner(self) -> Vec<ClientConfig> {
        self.clients
    }

    pub fn find(&self, nickname: &str) -> Option<&ClientConfig> {
        self.clients.iter().find(|c| c.nickname() == nickname)
    }

    /// Whether an equal connection (ignoring custom headers) is saved.
    pub fn contains(&self, config: &ClientConfig) -> bool {
        self.clients.iter().any(|c| c == config)
    }

    /// Append a new client unless the same connection is already saved.
    pub fn add(&mut self, config: ClientConfig) -> Result<(), ListError> {
        if let Some(existing) = self.clients.iter().find(|c| *c == &config) {
            return Err(ListError::Duplicate(existing.nickname().to_string()));
        }
        self.clients.push(config);
        Ok(())
    }

    /// Swap `original` for `edited`, keeping its position.
    ///
    /// The edited config may only collide with the entry it replaces.
    pub fn replace(&mut self, original: &ClientConfig, edited: ClientConfig) -> Result<(), ListError> {
        let index = self
            .clients
            .iter()
            .position(|c| c == original)
            .ok_or_else(|| ListError::NotFound(original.nickname().to_string()))?;

        if let Some((_, other)) = self
            .clients
            .iter()
            .enumerate()
            .find(|(i, c)| *i != index && *c == &edited)
        {
            return Err(ListError::Duplicate(other.nickname().to_string()));
        }

        self.clients[index] = edited;
        Ok(())
    }

    /// Remove every client with this nickname, returning the removed entries.
    pub fn remove(&mut self, nickname: &str) -> Result<Vec<ClientConfig>, ListError> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.clients)
            .into_iter()
            .partition(|c| c.nickname() == nickname);
        self.clients = kept;
        if removed.is_empty() {
            return Err(ListError::NotFound(nickname.to_string()));
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deluge_core::CustomHeaders;

    fn client(nickname: &str, host: &str) -> ClientConfig {
        ClientConfig::without_headers(nickname, host, "", 8112, "pw", true).unwrap()
    }

    #[test]
    fn add_rejects_same_connection() {
        let mut list = ClientList::default();
        list.add(client("Home", "10.0.0.1")).unwrap();

        let mut headers = CustomHeaders::new();
        headers.insert("X-Extra".to_string(), "1".to_string());
        let same = ClientConfig::new("Home", "10.0.0.1", "", 8112, "pw", true, headers).unwrap();
        assert_eq!(list.add(same), Err(ListError::Duplicate("Home".to_string())));

        list.add(client("Home", "10.0.0.2")).unwrap();
        assert_eq!(list.clients().len(), 2);
    }

    #[test]
    fn replace_keeps_position() {
        let mut list = ClientList::new(vec![client("A", "a.lan"), client("B", "b.lan")]);
        let original = client("A", "a.lan");
        list.replace(&original, client("A2", "a.lan")).unwrap();
        assert_eq!(list.clients()[0].nickname(), "A2");
        assert_eq!(list.clients()[1].nickname(), "B");
    }

    #[test]
    fn replace_with_unchanged_config_is_allowed() {
        let original = client("A", "a.lan");
        let mut list = ClientList::new(vec![original.clone()]);
        assert!(list.replace(&original, original.clone()).is_ok());
    }

    #[test]
    fn replace_rejects_collision_with_other_entry() {
        let mut list = ClientList::new(vec![client("A", "a.lan"), client("B", "b.lan")]);
        let err = list.replace(&client("A", "a.lan"), client("B", "b.lan")).unwrap_err();
        assert_eq!(err, ListError::Duplicate("B".to_string()));
    }

    #[test]
    fn replace_missing_original() {
        let mut list = ClientList::new(vec![client("A", "a.lan")]);
        let err = list.replace(&client("Z", "z.lan"), client("Z", "z.lan")).unwrap_err();
        assert_eq!(err, ListError::NotFound("Z".to_string()));
    }

    #[test]
    fn remove_by_nickname() {
        let mut list = ClientList::new(vec![client("A", "a.lan"), client("B", "b.lan")]);
        let removed = list.remove("A").unwrap();
        assert_eq!(removed.len(), 1);
        assert!(list.find("A").is_none());
        assert!(list.find("B").is_some());
        assert_eq!(list.remove("A"), Err(ListError::NotFound("A".to_string())));
        assert_eq!(list.into_inner().len(), 1);
    }

    #[test]
    fn contains_ignores_headers() {
        let list = ClientList::new(vec![client("A", "a.lan")]);
        let mut headers = CustomHeaders::new();
        headers.insert("X".to_string(), "y".to_string());
        let with_headers = ClientConfig::new("A", "a.lan", "", 8112, "pw", true, headers).unwrap();
        assert!(list.contains(&with_headers));
    }
}
