/// Command history for the input line.
///
/// Entries are stored most-recent-first. `cursor` is `None` while the user
/// is not browsing and otherwise always indexes a valid entry.
#[derive(Debug, Default)]
pub struct CommandHistory {
    entries: Vec<String>,
    cursor: Option<usize>,
}

/// What the input line should show after a recall key.
#[derive(Debug, PartialEq, Eq)]
pub enum Recall<'a> {
    /// Replace the input with this entry (empty string = back to a blank line)
    Show(&'a str),
    /// Nothing to move to; leave the input alone
    Unchanged,
}

impl CommandHistory {
    /// Record a submitted command. Blank input is ignored.
    pub fn record(&mut self, cmd: &str) -> bool {
        if cmd.trim().is_empty() {
            return false;
        }
        self.entries.insert(0, cmd.to_string());
        self.cursor = None;
        true
    }

    /// ArrowUp: step to the next older entry; sticks at the oldest.
    pub fn recall_older(&mut self) -> Recall<'_> {
        let next = match self.cursor {
            None if !self.entries.is_empty() => 0,
            Some(i) if i + 1 < self.entries.len() => i + 1,
            _ => return Recall::Unchanged,
        };
        self.cursor = Some(next);
        Recall::Show(&self.entries[next])
    }

    /// ArrowDown: step to the next newer entry; past the newest clears the line.
    pub fn recall_newer(&mut self) -> Recall<'_> {
        match self.cursor {
            None => Recall::Unchanged,
            Some(0) => {
                self.cursor = None;
                Recall::Show("")
            }
            Some(i) => {
                self.cursor = Some(i - 1);
                Recall::Show(&self.entries[i - 1])
            }
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The cursor as a signed index, `-1` meaning "not browsing".
    #[cfg(test)]
    pub fn cursor(&self) -> isize {
        self.cursor.map_or(-1, |i| i as isize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(cmds: &[&str]) -> CommandHistory {
        let mut h = CommandHistory::default();
        for c in cmds {
            h.record(c);
        }
        h
    }

    #[test]
    fn test_record_prepends_and_resets_cursor() {
        let mut h = filled(&["list", "view 3"]);
        assert_eq!(h.len(), 2);
        h.recall_older();
        assert_eq!(h.cursor(), 0);

        assert!(h.record("delete 3"));
        assert_eq!(h.len(), 3);
        assert_eq!(h.cursor(), -1);
        assert_eq!(h.recall_older(), Recall::Show("delete 3"));
    }

    #[test]
    fn test_blank_input_is_not_recorded() {
        let mut h = filled(&["list"]);
        assert!(!h.record(""));
        assert!(!h.record("   \t"));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn test_recall_older_sticks_at_oldest() {
        let mut h = filled(&["first", "second"]);
        assert_eq!(h.recall_older(), Recall::Show("second"));
        assert_eq!(h.recall_older(), Recall::Show("first"));
        assert_eq!(h.recall_older(), Recall::Unchanged);
        assert_eq!(h.recall_older(), Recall::Unchanged);
        assert_eq!(h.cursor(), 1);
    }

    #[test]
    fn test_recall_newer_walks_back_to_blank() {
        let mut h = filled(&["first", "second"]);
        h.recall_older();
        h.recall_older();
        assert_eq!(h.recall_newer(), Recall::Show("second"));
        assert_eq!(h.recall_newer(), Recall::Show(""));
        assert_eq!(h.cursor(), -1);
        assert_eq!(h.recall_newer(), Recall::Unchanged);
    }

    #[test]
    fn test_empty_history_never_moves() {
        let mut h = CommandHistory::default();
        assert_eq!(h.recall_older(), Recall::Unchanged);
        assert_eq!(h.recall_newer(), Recall::Unchanged);
        assert_eq!(h.cursor(), -1);
    }

    #[test]
    fn test_cursor_stays_in_range() {
        let mut h = filled(&["a", "b", "c"]);
        for _ in 0..10 {
            h.recall_older();
            assert!(h.cursor() >= -1 && h.cursor() < h.len() as isize);
        }
        for _ in 0..10 {
            h.recall_newer();
            assert!(h.cursor() >= -1 && h.cursor() < h.len() as isize);
        }
    }
}
