use xylem_name::Name;
use xylem_schema_type::Xs;

/// How many items a sequence may contain.
///
/// `Empty` and the four occurrence indicators form the five-point lattice
/// used by static type checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occurrence {
    /// `empty-sequence()`
    Empty,
    /// Exactly one item.
    One,
    /// `?`: zero or one.
    Option,
    /// `+`: one or more.
    NonEmpty,
    /// `*`: zero or more.
    Many,
}

impl Occurrence {
    /// Whether every count allowed by `other` is allowed by `self`.
    pub fn subsumes(&self, other: Occurrence) -> bool {
        use Occurrence::*;
        match (*self, other) {
            (Many, _) => true,
            (Empty | Option, Empty) => true,
            (Option, One) | (Option, Option) => true,
            (NonEmpty, One) | (NonEmpty, NonEmpty) => true,
            (One, One) => true,
            _ => false,
        }
    }

    /// The greatest lower bound of two occurrences, `None` when the
    /// intersection of allowed counts is empty.
    pub fn intersect(&self, other: Occurrence) -> Option<Occurrence> {
        use Occurrence::*;
        let result = match (*self, other) {
            (a, b) if a == b => a,
            (Many, x) | (x, Many) => x,
            (Option, NonEmpty) | (NonEmpty, Option) => One,
            (Option, One) | (One, Option) => One,
            (Option, Empty) | (Empty, Option) => Empty,
            (NonEmpty, One) | (One, NonEmpty) => One,
            _ => return None,
        };
        Some(result)
    }

    /// Whether zero items are allowed.
    pub fn allows_empty(&self) -> bool {
        matches!(self, Occurrence::Empty | Occurrence::Option | Occurrence::Many)
    }

    /// Whether more than one item is allowed.
    pub fn allows_many(&self) -> bool {
        matches!(self, Occurrence::NonEmpty | Occurrence::Many)
    }

    /// The occurrence indicator as written in a sequence type.
    pub fn indicator(&self) -> &'static str {
        match self {
            Occurrence::Empty => "",
            Occurrence::One => "",
            Occurrence::Option => "?",
            Occurrence::NonEmpty => "+",
            Occurrence::Many => "*",
        }
    }
}

/// The kinds of node the data model defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
    Namespace,
}

/// A name constraint inside a kind test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameTest {
    /// Any name.
    Wildcard,
    /// A specific expanded name.
    Name(Name),
    /// `*:local`: any namespace, fixed local name.
    LocalName(String),
    /// `uri:*`: fixed namespace, any local name.
    Namespace(String),
}

impl NameTest {
    /// Whether the test admits the given expanded name.
    pub fn matches(&self, name: &Name) -> bool {
        match self {
            NameTest::Wildcard => true,
            NameTest::Name(n) => n == name,
            NameTest::LocalName(local) => name.local_name() == local,
            NameTest::Namespace(uri) => name.namespace() == Some(uri.as_str()),
        }
    }
}

/// A node kind test, e.g. `element(foo)` or `comment()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindTest {
    /// `node()`
    Any,
    /// A kind with an optional name constraint. The name constraint is only
    /// meaningful for documents, elements, attributes and processing
    /// instructions.
    Kind(NodeKind, NameTest),
}

impl KindTest {
    /// Whether every node matched by `other` is matched by `self`.
    pub fn subsumes(&self, other: &KindTest) -> bool {
        match (self, other) {
            (KindTest::Any, _) => true,
            (KindTest::Kind(_, _), KindTest::Any) => false,
            (KindTest::Kind(kind, name), KindTest::Kind(other_kind, other_name)) => {
                kind == other_kind
                    && match (name, other_name) {
                        (NameTest::Wildcard, _) => true,
                        (a, b) => a == b,
                    }
            }
        }
    }
}

/// The type of a single item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemType {
    /// `item()`
    Item,
    /// An atomic (or union) type: `xs:integer`, `xs:anyAtomicType`, ...
    Atomic(Xs),
    /// A node kind test.
    Node(KindTest),
}

impl ItemType {
    /// Whether every item of type `other` is also of type `self`.
    pub fn subsumes(&self, other: &ItemType) -> bool {
        match (self, other) {
            (ItemType::Item, _) => true,
            (ItemType::Atomic(a), ItemType::Atomic(b)) => b.matches(*a),
            (ItemType::Node(a), ItemType::Node(b)) => a.subsumes(b),
            _ => false,
        }
    }

    /// The least common supertype of two item types.
    pub fn union(&self, other: &ItemType) -> ItemType {
        if self.subsumes(other) {
            return self.clone();
        }
        if other.subsumes(self) {
            return other.clone();
        }
        match (self, other) {
            (ItemType::Atomic(a), ItemType::Atomic(b)) => {
                // walk a's ancestry until it covers b
                let mut candidate = *a;
                loop {
                    if b.derives_from(candidate) {
                        return ItemType::Atomic(candidate);
                    }
                    match candidate.parent() {
                        Some(parent) => candidate = parent,
                        None => return ItemType::Item,
                    }
                }
            }
            (ItemType::Node(_), ItemType::Node(_)) => ItemType::Node(KindTest::Any),
            _ => ItemType::Item,
        }
    }

    /// Display form, e.g. `xs:integer` or `element()`.
    pub fn display(&self) -> String {
        match self {
            ItemType::Item => "item()".to_string(),
            ItemType::Atomic(xs) => xs.display_name(),
            ItemType::Node(KindTest::Any) => "node()".to_string(),
            ItemType::Node(KindTest::Kind(kind, _)) => {
                let name = match kind {
                    NodeKind::Document => "document-node",
                    NodeKind::Element => "element",
                    NodeKind::Attribute => "attribute",
                    NodeKind::Text => "text",
                    NodeKind::Comment => "comment",
                    NodeKind::ProcessingInstruction => "processing-instruction",
                    NodeKind::Namespace => "namespace-node",
                };
                format!("{}()", name)
            }
        }
    }
}

/// An item type with an occurrence indicator; `empty-sequence()` stands
/// alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceType {
    /// `empty-sequence()`
    Empty,
    /// An item type with an occurrence indicator.
    Item(ItemType, Occurrence),
}

impl SequenceType {
    /// `item()*`, the type every sequence matches.
    pub fn any() -> SequenceType {
        SequenceType::Item(ItemType::Item, Occurrence::Many)
    }

    /// The occurrence component.
    pub fn occurrence(&self) -> Occurrence {
        match self {
            SequenceType::Empty => Occurrence::Empty,
            SequenceType::Item(_, occurrence) => *occurrence,
        }
    }

    /// The item type component; `None` for `empty-sequence()`.
    pub fn item_type(&self) -> Option<&ItemType> {
        match self {
            SequenceType::Empty => None,
            SequenceType::Item(item_type, _) => Some(item_type),
        }
    }

    /// Whether every sequence matching `other` also matches `self`.
    pub fn subsumes(&self, other: &SequenceType) -> bool {
        match (self, other) {
            (SequenceType::Empty, SequenceType::Empty) => true,
            (SequenceType::Empty, SequenceType::Item(_, occurrence)) => {
                *occurrence == Occurrence::Empty
            }
            (SequenceType::Item(_, occurrence), SequenceType::Empty) => occurrence.allows_empty(),
            (SequenceType::Item(item, occurrence), SequenceType::Item(other_item, other_occ)) => {
                item.subsumes(other_item) && occurrence.subsumes(*other_occ)
            }
        }
    }

    /// Display form, e.g. `xs:integer+`.
    pub fn display(&self) -> String {
        match self {
            SequenceType::Empty => "empty-sequence()".to_string(),
            SequenceType::Item(item, occurrence) => {
                format!("{}{}", item.display(), occurrence.indicator())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Occurrence; 5] = [
        Occurrence::Empty,
        Occurrence::One,
        Occurrence::Option,
        Occurrence::NonEmpty,
        Occurrence::Many,
    ];

    fn allowed_counts(occurrence: Occurrence) -> Vec<usize> {
        match occurrence {
            Occurrence::Empty => vec![0],
            Occurrence::One => vec![1],
            Occurrence::Option => vec![0, 1],
            Occurrence::NonEmpty => vec![1, 2],
            Occurrence::Many => vec![0, 1, 2],
        }
    }

    #[test]
    fn test_subsumes_is_set_inclusion() {
        for a in ALL {
            for b in ALL {
                let inclusion = allowed_counts(b)
                    .iter()
                    .all(|count| allowed_counts(a).contains(count));
                assert_eq!(a.subsumes(b), inclusion, "{:?} vs {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_subsumes_reflexive_transitive_antisymmetric() {
        for a in ALL {
            assert!(a.subsumes(a));
            for b in ALL {
                if a.subsumes(b) && b.subsumes(a) {
                    assert_eq!(a, b);
                }
                for c in ALL {
                    if a.subsumes(b) && b.subsumes(c) {
                        assert!(a.subsumes(c));
                    }
                }
            }
        }
    }

    #[test]
    fn test_option_meet_non_empty_is_one() {
        assert_eq!(
            Occurrence::Option.intersect(Occurrence::NonEmpty),
            Some(Occurrence::One)
        );
    }

    #[test]
    fn test_item_type_subsumption() {
        let integer = ItemType::Atomic(Xs::Integer);
        let decimal = ItemType::Atomic(Xs::Decimal);
        assert!(decimal.subsumes(&integer));
        assert!(!integer.subsumes(&decimal));
        assert!(ItemType::Item.subsumes(&decimal));
        assert!(ItemType::Node(KindTest::Any).subsumes(&ItemType::Node(KindTest::Kind(
            NodeKind::Element,
            NameTest::Wildcard
        ))));
    }

    #[test]
    fn test_item_type_union() {
        let integer = ItemType::Atomic(Xs::Integer);
        let double = ItemType::Atomic(Xs::Double);
        assert_eq!(integer.union(&double), ItemType::Atomic(Xs::AnyAtomicType));
        let long = ItemType::Atomic(Xs::Long);
        assert_eq!(integer.union(&long), ItemType::Atomic(Xs::Integer));
    }

    #[test]
    fn test_sequence_type_subsumption() {
        let many_decimal = SequenceType::Item(ItemType::Atomic(Xs::Decimal), Occurrence::Many);
        let one_integer = SequenceType::Item(ItemType::Atomic(Xs::Integer), Occurrence::One);
        assert!(many_decimal.subsumes(&one_integer));
        assert!(!one_integer.subsumes(&many_decimal));
        assert!(many_decimal.subsumes(&SequenceType::Empty));
        assert!(!SequenceType::Empty.subsumes(&many_decimal));
    }
}
