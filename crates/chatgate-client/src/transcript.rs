use chatgate_models::{Role, Turn};

/// Content of the bot turn inserted on submit, before any byte has arrived.
pub const PLACEHOLDER: &str = "...";

/// Ordered chat transcript owned by one session.
///
/// Append-only, except for the trailing placeholder turn: it is rewritten in
/// place while an answer streams and removed entirely when the ask fails.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub(crate) fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::user(content));
    }

    pub(crate) fn push_bot(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::bot(content));
    }

    pub(crate) fn push_placeholder(&mut self) {
        self.turns.push(Turn::bot(PLACEHOLDER));
    }

    pub(crate) fn rewrite_last(&mut self, content: &str) {
        if let Some(turn) = self.turns.last_mut() {
            if turn.role == Role::Bot {
                turn.content.clear();
                turn.content.push_str(content);
            }
        }
    }

    pub(crate) fn drop_trailing_bot(&mut self) {
        if self.turns.last().is_some_and(|turn| turn.role == Role::Bot) {
            self.turns.pop();
        }
    }
}
