use serde::Serialize;

/// One unit of conversation held in the ordered response list.
///
/// `index` is the turn's position and never changes once assigned.
/// `complete` means no further in-place updates are expected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub index: usize,
    pub content: String,
    pub complete: bool,
}

impl Turn {
    pub(crate) fn open(index: usize, content: &str) -> Self {
        Self {
            index,
            content: content.to_string(),
            complete: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}
