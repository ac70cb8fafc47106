// 🖼️ Image Sequence - ordered product image URIs
//
// Order is storefront display order and is persisted verbatim.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageSequence(Vec<String>);

impl ImageSequence {
    pub fn new() -> Self {
        ImageSequence::default()
    }

    /// Append a batch at the end, keeping the batch's own order
    pub fn append<I, S>(&mut self, new_uris: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.extend(new_uris.into_iter().map(Into::into));
    }

    /// Replace the sequence wholesale with a caller supplied permutation.
    ///
    /// Drag and drop hands back the full list; it is trusted. Debug builds
    /// assert that it is a permutation of the current sequence.
    pub fn reorder(&mut self, new_order: Vec<String>) {
        debug_assert!(
            self.is_permutation(&new_order),
            "reorder expects a permutation of {:?}, got {:?}",
            self.0,
            new_order
        );
        self.0 = new_order;
    }

    /// Move one image from `from` to `to` (single drag step)
    pub fn move_image(&mut self, from: usize, to: usize) {
        if from >= self.0.len() || to >= self.0.len() || from == to {
            return;
        }
        let uri = self.0.remove(from);
        self.0.insert(to, uri);
    }

    pub fn is_permutation(&self, candidate: &[String]) -> bool {
        if candidate.len() != self.0.len() {
            return false;
        }
        let mut current: Vec<&String> = self.0.iter().collect();
        let mut other: Vec<&String> = candidate.iter().collect();
        current.sort();
        other.sort();
        current == other
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Owned copy for the persisted record
    pub fn snapshot(&self) -> Vec<String> {
        self.0.clone()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for ImageSequence {
    fn from(uris: Vec<String>) -> Self {
        ImageSequence(uris)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(uris: &[&str]) -> ImageSequence {
        uris.iter().map(|u| u.to_string()).collect::<Vec<_>>().into()
    }

    #[test]
    fn test_append_keeps_existing_then_batch_order() {
        let mut images = seq(&["u1", "u2"]);
        images.append(["u3"]);
        assert_eq!(images.as_slice(), &["u1", "u2", "u3"]);

        images.append(vec!["u5".to_string(), "u4".to_string()]);
        assert_eq!(images.as_slice(), &["u1", "u2", "u3", "u5", "u4"]);
    }

    #[test]
    fn test_append_empty_batch_is_noop() {
        let mut images = seq(&["u1"]);
        images.append(Vec::<String>::new());
        assert_eq!(images.len(), 1);
    }

    #[test]
    fn test_reorder_replaces_exactly() {
        let mut images = seq(&["u1", "u2"]);
        images.reorder(vec!["u2".to_string(), "u1".to_string()]);
        assert_eq!(images.snapshot(), vec!["u2", "u1"]);
    }

    #[test]
    fn test_move_image() {
        let mut images = seq(&["a", "b", "c", "d"]);
        images.move_image(3, 0);
        assert_eq!(images.as_slice(), &["d", "a", "b", "c"]);

        images.move_image(0, 9);
        assert_eq!(images.as_slice(), &["d", "a", "b", "c"]);
    }

    #[test]
    fn test_is_permutation() {
        let images = seq(&["a", "b", "b"]);
        assert!(images.is_permutation(&["b".to_string(), "a".to_string(), "b".to_string()]));
        assert!(!images.is_permutation(&["a".to_string(), "a".to_string(), "b".to_string()]));
        assert!(!images.is_permutation(&["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let images = seq(&["u1", "u2"]);
        assert_eq!(serde_json::to_string(&images).unwrap(), r#"["u1","u2"]"#);
    }
}
