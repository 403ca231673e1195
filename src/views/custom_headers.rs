//! Editable list of custom HTTP headers for the add/edit client form.

use deluge_core::{headers_from_pairs, pairs_from_headers, CustomHeaders};

/// Ordered `(name, value)` pairs as the user entered them.
///
/// Duplicate names are allowed while editing; they collapse (last one wins)
/// when converted with [`HeaderList::to_headers`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderList {
    entries: Vec<(String, String)>,
}

impl HeaderList {
    pub fn from_headers(headers: &CustomHeaders) -> Self {
        Self {
            entries: pairs_from_headers(headers),
        }
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a header. Returns `false` (and changes nothing) for an empty name.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if name.is_empty() {
            return false;
        }
        self.entries.push((name, value.into()));
        true
    }

    /// Replace the header at `index`. Returns `false` for an empty name or an
    /// index past the end.
    pub fn edit(&mut self, index: usize, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if name.is_empty() {
            return false;
        }
        match self.entries.get_mut(index) {
            Some(entry) => {
                *entry = (name, value.into());
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, index: usize) -> Option<(String, String)> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    /// Remove every header with this name. Returns how many were removed.
    pub fn remove_named(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| n != name);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn to_headers(&self) -> CustomHeaders {
        headers_from_pairs(&self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_rejects_empty_name() {
        let mut list = HeaderList::default();
        assert!(!list.add("", "value"));
        assert!(list.add("X-Token", ""));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn edit_replaces_in_place() {
        let mut list = HeaderList::default();
        list.add("A", "1");
        list.add("B", "2");
        assert!(list.edit(0, "A", "changed"));
        assert!(!list.edit(5, "C", "3"));
        assert!(!list.edit(1, "", "3"));
        assert_eq!(
            list.entries(),
            &[
                ("A".to_string(), "changed".to_string()),
                ("B".to_string(), "2".to_string())
            ]
        );
    }

    #[test]
    fn remove_out_of_range_is_none() {
        let mut list = HeaderList::default();
        list.add("A", "1");
        assert_eq!(list.remove(3), None);
        assert_eq!(list.remove(0), Some(("A".to_string(), "1".to_string())));
        assert!(list.is_empty());
    }

    #[test]
    fn remove_named_drops_duplicates() {
        let mut list = HeaderList::default();
        list.add("A", "1");
        list.add("B", "2");
        list.add("A", "3");
        assert_eq!(list.remove_named("A"), 2);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn duplicates_collapse_to_last_value() {
        let mut list = HeaderList::default();
        list.add("A", "1");
        list.add("B", "2");
        list.add("A", "3");
        let headers = list.to_headers();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers["A"], "3");
        assert_eq!(headers["B"], "2");
    }

    #[test]
    fn loads_existing_headers() {
        let mut headers = CustomHeaders::new();
        headers.insert("X-Proxy".to_string(), "yes".to_string());
        let list = HeaderList::from_headers(&headers);
        assert_eq!(list.entries(), &[("X-Proxy".to_string(), "yes".to_string())]);
    }
}
