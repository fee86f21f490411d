/// Single-line command editor. `cursor` is a byte offset that always sits
/// on a char boundary of `text`.
#[derive(Debug, Default, Clone)]
pub struct InputLine {
    text: String,
    cursor: usize,
}

impl InputLine {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Text left of the cursor, for placing the terminal cursor.
    pub fn before_cursor(&self) -> &str {
        &self.text[..self.cursor]
    }

    /// Replace the line (history recall) and park the cursor at the end.
    pub fn set(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.text.len();
    }

    /// Hand the line over for submission and start a fresh one.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    pub fn insert(&mut self, c: char) {
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn backspace(&mut self) {
        let start = self.prev_boundary();
        self.text.drain(start..self.cursor);
        self.cursor = start;
    }

    pub fn delete_forward(&mut self) {
        let end = self.next_boundary();
        self.text.drain(self.cursor..end);
    }

    /// Ctrl+W: drop the word (and any spaces after it) left of the cursor.
    pub fn delete_word_back(&mut self) {
        let start = self.word_start();
        self.text.drain(start..self.cursor);
        self.cursor = start;
    }

    pub fn move_left(&mut self) {
        self.cursor = self.prev_boundary();
    }

    pub fn move_right(&mut self) {
        self.cursor = self.next_boundary();
    }

    pub fn move_word_left(&mut self) {
        self.cursor = self.word_start();
    }

    pub fn move_word_right(&mut self) {
        let after = &self.text[self.cursor..];
        let rest = after.trim_start();
        let word = rest.find(char::is_whitespace).unwrap_or(rest.len());
        self.cursor += after.len() - rest.len() + word;
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.text.len();
    }

    fn prev_boundary(&self) -> usize {
        self.before_cursor().char_indices().next_back().map_or(0, |(i, _)| i)
    }

    fn next_boundary(&self) -> usize {
        self.text[self.cursor..]
            .chars()
            .next()
            .map_or(self.cursor, |c| self.cursor + c.len_utf8())
    }

    fn word_start(&self) -> usize {
        let trimmed = self.before_cursor().trim_end();
        trimmed
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map_or(0, |(i, c)| i + c.len_utf8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> InputLine {
        let mut l = InputLine::default();
        l.set(text);
        l
    }

    #[test]
    fn test_multibyte_editing_stays_on_boundaries() {
        let mut l = line("añb");
        l.move_left();
        l.backspace();
        assert_eq!(l.as_str(), "ab");
        assert_eq!(l.cursor(), 1);
        l.insert('é');
        assert_eq!(l.as_str(), "aéb");
        l.home();
        l.delete_forward();
        assert_eq!(l.as_str(), "éb");
        l.end();
        l.delete_forward();
        assert_eq!(l.as_str(), "éb");
    }

    #[test]
    fn test_word_motion() {
        let mut l = line("edit  42 now");
        l.move_word_left();
        assert_eq!(l.before_cursor(), "edit  42 ");
        l.move_word_left();
        assert_eq!(l.before_cursor(), "edit  ");
        l.move_word_right();
        assert_eq!(l.before_cursor(), "edit  42");
        l.home();
        l.move_word_right();
        assert_eq!(l.before_cursor(), "edit");
    }

    #[test]
    fn test_delete_word_back_and_take() {
        let mut l = line("view 12  ");
        l.delete_word_back();
        assert_eq!(l.as_str(), "view ");
        l.delete_word_back();
        assert_eq!(l.as_str(), "");
        l.backspace();
        assert!(l.is_empty());

        let mut l = line("list");
        assert_eq!(l.take(), "list");
        assert!(l.is_empty());
        assert_eq!(l.cursor(), 0);
    }
}
