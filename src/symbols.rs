/// Labels indexed by instruction-word address.
///
/// One slot per emitted word; a slot holds the label bound to that address or
/// an empty string. The second word of a branch-with-link pair gets a blank
/// slot inserted while encoding so later addresses stay aligned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    slots: Vec<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the next address to `label` (empty for none).
    pub fn push(&mut self, label: impl Into<String>) {
        self.slots.push(label.into());
    }

    /// Insert an unnamed slot at `addr`, shifting later labels up by one.
    pub fn insert_blank(&mut self, addr: usize) {
        let at = addr.min(self.slots.len());
        self.slots.insert(at, String::new());
    }

    /// Address of the first slot named `label`.
    pub fn find(&self, label: &str) -> Option<usize> {
        if label.is_empty() {
            return None;
        }
        self.slots.iter().position(|s| s == label)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
