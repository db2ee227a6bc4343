use std::collections::BTreeSet;

use bitflags::bitflags;

/// Value carried by every string field of the root node.
pub const ROOT: &str = "@#r$%";

bitflags! {
    /// Orthographic properties of a word form
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Orthographic: u16 {
        /// Every letter is uppercase
        const ALL_UPPER = 0x001;
        /// First character is uppercase, the rest is not all uppercase
        const INIT_UPPER = 0x002;
        /// Every letter is lowercase
        const ALL_LOWER = 0x004;
        /// Both lowercase and uppercase letters after the first character
        const MIXED_CASE = 0x008;
        /// Every character is a digit
        const ALL_DIGIT = 0x010;
        /// At least one digit
        const HAS_DIGIT = 0x020;
        /// At least one hyphen
        const HAS_HYPHEN = 0x040;
        /// At least one period
        const HAS_PERIOD = 0x080;
        /// At least one other punctuation character
        const HAS_PUNCT = 0x100;
        /// No alphabetic character at all
        const NO_LETTER = 0x200;
    }
}

impl Orthographic {
    /// Compute the flags of a word form.
    pub fn of(form: &str) -> Self {
        let mut flags = Orthographic::empty();
        let mut letters = 0;
        let mut upper = 0;
        let mut digits = 0;
        let mut inner_upper = false;
        let mut inner_lower = false;

        for (i, c) in form.chars().enumerate() {
            if c.is_alphabetic() {
                letters += 1;
                if c.is_uppercase() {
                    upper += 1;
                    inner_upper |= i > 0;
                } else {
                    inner_lower |= i > 0;
                }
            } else if c.is_ascii_digit() {
                digits += 1;
            } else if c == '-' {
                flags |= Orthographic::HAS_HYPHEN;
            } else if c == '.' {
                flags |= Orthographic::HAS_PERIOD;
            } else if c.is_ascii_punctuation() {
                flags |= Orthographic::HAS_PUNCT;
            }
        }

        let len = form.chars().count();
        if digits > 0 {
            flags |= Orthographic::HAS_DIGIT;
            if digits == len {
                flags |= Orthographic::ALL_DIGIT;
            }
        }
        if letters == 0 {
            flags |= Orthographic::NO_LETTER;
        } else if upper == letters {
            flags |= Orthographic::ALL_UPPER;
        } else if upper == 0 {
            flags |= Orthographic::ALL_LOWER;
        } else if form.chars().next().map_or(false, char::is_uppercase) && !inner_upper {
            flags |= Orthographic::INIT_UPPER;
        } else if inner_upper && inner_lower {
            flags |= Orthographic::MIXED_CASE;
        }
        flags
    }

    /// Names of the flags that are set, in declaration order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        self.iter_names().map(|(name, _)| name)
    }
}

/// One token of a sentence
///
/// Label slots (`part_of_speech_tag`, `named_entity_tag`) are mutated in
/// place while a sentence is decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Position inside the sentence, 0 is the root
    pub id: usize,
    pub word_form: String,
    /// Word form with digit runs collapsed
    pub simplified_word_form: String,
    pub uncapitalized_simplified_word_form: String,
    pub lemma: Option<String>,
    pub part_of_speech_tag: Option<String>,
    pub named_entity_tag: Option<String>,
    pub orthographic: Orthographic,
    pub word_clusters: BTreeSet<String>,
    pub named_entity_gazetteers: BTreeSet<String>,
    /// Tags a word form was seen with, e.g. `NN_VB`
    pub ambiguity_class: Option<String>,
}

impl Node {
    /// Create a node for a word form at position `id`
    pub fn new<T: Into<String>>(id: usize, word_form: T) -> Self {
        let word_form = word_form.into();
        let simplified_word_form = simplify(&word_form);
        let uncapitalized_simplified_word_form = simplified_word_form.to_lowercase();
        let orthographic = Orthographic::of(&word_form);
        Self {
            id,
            word_form,
            simplified_word_form,
            uncapitalized_simplified_word_form,
            lemma: None,
            part_of_speech_tag: None,
            named_entity_tag: None,
            orthographic,
            word_clusters: BTreeSet::new(),
            named_entity_gazetteers: BTreeSet::new(),
            ambiguity_class: None,
        }
    }

    /// The sentinel node stored at index 0 of every sentence
    pub fn root() -> Self {
        Self {
            id: 0,
            word_form: ROOT.to_string(),
            simplified_word_form: ROOT.to_string(),
            uncapitalized_simplified_word_form: ROOT.to_string(),
            lemma: Some(ROOT.to_string()),
            part_of_speech_tag: Some(ROOT.to_string()),
            named_entity_tag: Some(ROOT.to_string()),
            orthographic: Orthographic::empty(),
            word_clusters: BTreeSet::new(),
            named_entity_gazetteers: BTreeSet::new(),
            ambiguity_class: Some(ROOT.to_string()),
        }
    }

    pub fn is_root(&self) -> bool {
        self.id == 0
    }

    pub fn with_lemma<T: Into<String>>(mut self, lemma: T) -> Self {
        self.lemma = Some(lemma.into());
        self
    }

    pub fn with_part_of_speech_tag<T: Into<String>>(mut self, tag: T) -> Self {
        self.part_of_speech_tag = Some(tag.into());
        self
    }

    pub fn with_named_entity_tag<T: Into<String>>(mut self, tag: T) -> Self {
        self.named_entity_tag = Some(tag.into());
        self
    }

    /// Shape signature of the word form.
    ///
    /// Uppercase letters map to `A`, lowercase to `a`, digits to `1`; any
    /// run of the same symbol longer than `max_repeat` is cut down to
    /// `max_repeat` characters.
    pub fn word_shape(&self, max_repeat: usize) -> String {
        let mut shape = String::with_capacity(self.word_form.len());
        let mut prev = None;
        let mut repeat = 0;

        for c in self.word_form.chars() {
            let s = if c.is_uppercase() {
                'A'
            } else if c.is_alphabetic() {
                'a'
            } else if c.is_ascii_digit() {
                '1'
            } else {
                c
            };

            if prev == Some(s) {
                repeat += 1;
            } else {
                prev = Some(s);
                repeat = 1;
            }
            if max_repeat == 0 || repeat <= max_repeat {
                shape.push(s);
            }
        }
        shape
    }

    /// First `n` characters of the uncapitalized simplified form, when the
    /// form is longer than `n`.
    pub fn prefix(&self, n: usize) -> Option<String> {
        let form = &self.uncapitalized_simplified_word_form;
        if n < form.chars().count() {
            Some(form.chars().take(n).collect())
        } else {
            None
        }
    }

    /// Last `n` characters of the uncapitalized simplified form, when the
    /// form is longer than `n`.
    pub fn suffix(&self, n: usize) -> Option<String> {
        let form = &self.uncapitalized_simplified_word_form;
        let len = form.chars().count();
        if n < len {
            Some(form.chars().skip(len - n).collect())
        } else {
            None
        }
    }
}

/// Build a node sequence from word forms, with the root at index 0.
pub fn from_forms<I, S>(forms: I) -> Vec<Node>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut nodes = vec![Node::root()];
    for (i, form) in forms.into_iter().enumerate() {
        nodes.push(Node::new(i + 1, form));
    }
    nodes
}

/// Prepend the root unless the sequence already starts with it.
pub fn ensure_root(nodes: &mut Vec<Node>) {
    if !nodes.first().map_or(false, Node::is_root) {
        nodes.insert(0, Node::root());
    }
}

/// Collapse every run of digits (with inner `,` or `.`) into a single `0`.
fn simplify(form: &str) -> String {
    let chars: Vec<char> = form.chars().collect();
    let mut out = String::with_capacity(form.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_ascii_digit() {
            while i < chars.len()
                && (chars[i].is_ascii_digit()
                    || ((chars[i] == ',' || chars[i] == '.')
                        && chars.get(i + 1).map_or(false, char::is_ascii_digit)))
            {
                i += 1;
            }
            out.push('0');
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simplified_forms() {
        let node = Node::new(1, "Rates-3.5%");
        assert_eq!(node.simplified_word_form, "Rates-0%");
        assert_eq!(node.uncapitalized_simplified_word_form, "rates-0%");

        assert_eq!(simplify("1,000,000"), "0");
        assert_eq!(simplify("A1B22"), "A0B0");
        assert_eq!(simplify("end."), "end.");
    }

    #[test]
    fn test_word_shape() {
        let node = Node::new(1, "McDonald's2000");
        assert_eq!(node.word_shape(2), "AaAaa'11");
        assert_eq!(node.word_shape(0), "AaAaaaaa'1111");
    }

    #[test]
    fn test_affixes() {
        let node = Node::new(1, "Running");
        assert_eq!(node.prefix(2).as_deref(), Some("ru"));
        assert_eq!(node.suffix(3).as_deref(), Some("ing"));
        assert_eq!(node.suffix(7), None);
    }

    #[test]
    fn test_orthographic() {
        assert_eq!(Orthographic::of("NASA"), Orthographic::ALL_UPPER);
        assert_eq!(Orthographic::of("Boston"), Orthographic::INIT_UPPER);
        assert_eq!(Orthographic::of("iPhone"), Orthographic::MIXED_CASE);
        assert_eq!(
            Orthographic::of("1990"),
            Orthographic::ALL_DIGIT | Orthographic::HAS_DIGIT | Orthographic::NO_LETTER
        );
        assert_eq!(
            Orthographic::of("well-known"),
            Orthographic::ALL_LOWER | Orthographic::HAS_HYPHEN
        );

        let names: Vec<_> = Orthographic::of("U.S.").names().collect();
        assert_eq!(names, ["ALL_UPPER", "HAS_PERIOD"]);
    }

    #[test]
    fn test_ensure_root() {
        let mut nodes = vec![Node::new(1, "hi")];
        ensure_root(&mut nodes);
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].is_root());

        ensure_root(&mut nodes);
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_from_forms() {
        let nodes = from_forms(["John", "runs"]);
        assert_eq!(nodes.len(), 3);
        assert!(nodes[0].is_root());
        assert_eq!(nodes[2].id, 2);
        assert_eq!(nodes[2].word_form, "runs");
    }
}
