//! Prefix trie used to recognise keywords one character at a time.
//!
//! Nodes live in a flat arena; a search is a small `Cursor` value so the
//! trie itself can be a shared, immutable static.
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Node<T> {
    children: HashMap<char, usize>,
    value: Option<T>,
}

impl<T> Node<T> {
    fn new() -> Self {
        Self {
            children: HashMap::new(),
            value: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Trie<T> {
    nodes: Vec<Node<T>>,
}

/// Outcome of feeding one more character to a `Cursor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<T> {
    /// No word continues with this character.
    Dead,
    /// Inside a word, but not at the end of one.
    Prefix,
    /// The characters so far spell a complete word.
    Match(T),
}

#[derive(Debug, Clone, Copy)]
pub struct Cursor<'t, T> {
    trie: &'t Trie<T>,
    node: usize,
}

impl<T: Copy> Trie<T> {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new()],
        }
    }

    pub fn insert(&mut self, word: &str, value: T) {
        let mut node = 0;
        for ch in word.chars() {
            node = match self.nodes[node].children.get(&ch) {
                Some(&next) => next,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(Node::new());
                    self.nodes[node].children.insert(ch, next);
                    next
                }
            };
        }
        self.nodes[node].value = Some(value);
    }

    pub fn cursor(&self) -> Cursor<'_, T> {
        Cursor { trie: self, node: 0 }
    }

    /// Exact lookup of a whole word.
    pub fn get(&self, word: &str) -> Option<T> {
        let mut cursor = self.cursor();
        let mut last = Step::Prefix;
        for ch in word.chars() {
            last = cursor.step(ch);
            if matches!(last, Step::Dead) {
                return None;
            }
        }
        match last {
            Step::Match(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: Copy> Default for Trie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> Cursor<'_, T> {
    /// Advance by `ch`. After `Dead` the cursor stays where it was.
    pub fn step(&mut self, ch: char) -> Step<T> {
        let Some(&next) = self.trie.nodes[self.node].children.get(&ch) else {
            return Step::Dead;
        };
        self.node = next;
        match self.trie.nodes[next].value {
            Some(value) => Step::Match(value),
            None => Step::Prefix,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_walk() {
        let mut trie = Trie::new();
        trie.insert("bar", 0);
        trie.insert("bare", 1);
        trie.insert("bake", 2);
        trie.insert("cake", 3);
        trie.insert("barabbas", 4);

        assert_eq!(trie.cursor().step('m'), Step::Dead);

        let test_cases = vec![
            ("bare", vec![Step::Prefix, Step::Prefix, Step::Match(0), Step::Match(1)]),
            ("bake", vec![Step::Prefix, Step::Prefix, Step::Prefix, Step::Match(2)]),
            (
                "barabbas",
                vec![
                    Step::Prefix,
                    Step::Prefix,
                    Step::Match(0),
                    Step::Prefix,
                    Step::Prefix,
                    Step::Prefix,
                    Step::Prefix,
                    Step::Match(4),
                ],
            ),
            ("barem", vec![Step::Prefix, Step::Prefix, Step::Match(0), Step::Match(1), Step::Dead]),
        ];

        for (word, expected) in test_cases {
            let mut cursor = trie.cursor();
            let steps: Vec<_> = word.chars().map(|c| cursor.step(c)).collect();
            assert_eq!(steps, expected, "{word}");
        }
    }

    #[test]
    fn test_get() {
        let mut trie = Trie::new();
        trie.insert("rx", 'x');
        trie.insert("r", 'r');
        assert_eq!(trie.get("r"), Some('r'));
        assert_eq!(trie.get("rx"), Some('x'));
        assert_eq!(trie.get("ry"), None);
        assert_eq!(trie.get("rxx"), None);
        assert_eq!(trie.get(""), None);
    }
}
