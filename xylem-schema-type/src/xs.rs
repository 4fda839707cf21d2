use std::sync::LazyLock;

const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// A built-in schema type.
///
/// The hierarchy is rooted in `xs:anyType`; [`Xs::parent`] walks towards the
/// root. The discriminant doubles as the type's fingerprint and as its index
/// into the precomputed subtype matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Xs {
    AnyType,
    AnySimpleType,
    Untyped,
    AnyAtomicType,
    Numeric,
    String,
    UntypedAtomic,
    Boolean,
    Decimal,
    NonPositiveInteger,
    NegativeInteger,
    NonNegativeInteger,
    PositiveInteger,
    Integer,
    Long,
    Int,
    Short,
    Byte,
    UnsignedLong,
    UnsignedInt,
    UnsignedShort,
    UnsignedByte,
    Float,
    Double,
    QName,
    Notation,
    Duration,
    YearMonthDuration,
    DayTimeDuration,
    Time,
    GYearMonth,
    GYear,
    GMonthDay,
    GMonth,
    GDay,
    Base64Binary,
    HexBinary,
    AnyURI,
    DateTime,
    DateTimeStamp,
    Date,
    NormalizedString,
    Token,
    Language,
    NMTOKEN,
    Name,
    NCName,
    ID,
    IDREF,
    ENTITY,
}

const TYPE_COUNT: usize = 50;

const ALL_TYPES: [Xs; TYPE_COUNT] = {
    use Xs::*;
    [
        AnyType,
        AnySimpleType,
        Untyped,
        AnyAtomicType,
        Numeric,
        String,
        UntypedAtomic,
        Boolean,
        Decimal,
        NonPositiveInteger,
        NegativeInteger,
        NonNegativeInteger,
        PositiveInteger,
        Integer,
        Long,
        Int,
        Short,
        Byte,
        UnsignedLong,
        UnsignedInt,
        UnsignedShort,
        UnsignedByte,
        Float,
        Double,
        QName,
        Notation,
        Duration,
        YearMonthDuration,
        DayTimeDuration,
        Time,
        GYearMonth,
        GYear,
        GMonthDay,
        GMonth,
        GDay,
        Base64Binary,
        HexBinary,
        AnyURI,
        DateTime,
        DateTimeStamp,
        Date,
        NormalizedString,
        Token,
        Language,
        NMTOKEN,
        Name,
        NCName,
        ID,
        IDREF,
        ENTITY,
    ]
};

// The reflexive transitive closure of the parent relation, so that
// derives_from is a single indexed load.
static SUBTYPE_MATRIX: LazyLock<[[bool; TYPE_COUNT]; TYPE_COUNT]> = LazyLock::new(|| {
    let mut matrix = [[false; TYPE_COUNT]; TYPE_COUNT];
    for xs in ALL_TYPES {
        let mut ancestor = Some(xs);
        while let Some(a) = ancestor {
            matrix[xs.index()][a.index()] = true;
            ancestor = a.parent();
        }
    }
    matrix
});

impl Xs {
    #[inline]
    fn index(&self) -> usize {
        *self as usize
    }

    /// The fingerprint of this type.
    #[inline]
    pub fn fingerprint(&self) -> i32 {
        *self as i32
    }

    /// Look up a type by namespace and local name.
    pub fn by_name(namespace: Option<&str>, local_name: &str) -> Option<Self> {
        if namespace == Some(XS_NAMESPACE) {
            Xs::by_local_name(local_name)
        } else {
            None
        }
    }

    /// Look up a type by its local name in the `xs` namespace.
    pub fn by_local_name(local_name: &str) -> Option<Self> {
        use Xs::*;
        let xs = match local_name {
            "anyType" => AnyType,
            "anySimpleType" => AnySimpleType,
            "untyped" => Untyped,
            "anyAtomicType" => AnyAtomicType,
            "numeric" => Numeric,
            "string" => String,
            "untypedAtomic" => UntypedAtomic,
            "boolean" => Boolean,
            "decimal" => Decimal,
            "nonPositiveInteger" => NonPositiveInteger,
            "negativeInteger" => NegativeInteger,
            "nonNegativeInteger" => NonNegativeInteger,
            "positiveInteger" => PositiveInteger,
            "integer" => Integer,
            "long" => Long,
            "int" => Int,
            "short" => Short,
            "byte" => Byte,
            "unsignedLong" => UnsignedLong,
            "unsignedInt" => UnsignedInt,
            "unsignedShort" => UnsignedShort,
            "unsignedByte" => UnsignedByte,
            "float" => Float,
            "double" => Double,
            "QName" => QName,
            "NOTATION" => Notation,
            "duration" => Duration,
            "yearMonthDuration" => YearMonthDuration,
            "dayTimeDuration" => DayTimeDuration,
            "time" => Time,
            "gYearMonth" => GYearMonth,
            "gYear" => GYear,
            "gMonthDay" => GMonthDay,
            "gMonth" => GMonth,
            "gDay" => GDay,
            "base64Binary" => Base64Binary,
            "hexBinary" => HexBinary,
            "anyURI" => AnyURI,
            "dateTime" => DateTime,
            "dateTimeStamp" => DateTimeStamp,
            "date" => Date,
            "normalizedString" => NormalizedString,
            "token" => Token,
            "language" => Language,
            "NMTOKEN" => NMTOKEN,
            "Name" => Name,
            "NCName" => NCName,
            "ID" => ID,
            "IDREF" => IDREF,
            "ENTITY" => ENTITY,
            _ => return None,
        };
        Some(xs)
    }

    /// The `xs` namespace URI.
    pub fn namespace() -> &'static str {
        XS_NAMESPACE
    }

    /// The local name of this type.
    pub fn local_name(&self) -> &str {
        use Xs::*;
        match self {
            AnyType => "anyType",
            AnySimpleType => "anySimpleType",
            Untyped => "untyped",
            AnyAtomicType => "anyAtomicType",
            Numeric => "numeric",
            String => "string",
            UntypedAtomic => "untypedAtomic",
            Boolean => "boolean",
            Decimal => "decimal",
            NonPositiveInteger => "nonPositiveInteger",
            NegativeInteger => "negativeInteger",
            NonNegativeInteger => "nonNegativeInteger",
            PositiveInteger => "positiveInteger",
            Integer => "integer",
            Long => "long",
            Int => "int",
            Short => "short",
            Byte => "byte",
            UnsignedLong => "unsignedLong",
            UnsignedInt => "unsignedInt",
            UnsignedShort => "unsignedShort",
            UnsignedByte => "unsignedByte",
            Float => "float",
            Double => "double",
            QName => "QName",
            Notation => "NOTATION",
            Duration => "duration",
            YearMonthDuration => "yearMonthDuration",
            DayTimeDuration => "dayTimeDuration",
            Time => "time",
            GYearMonth => "gYearMonth",
            GYear => "gYear",
            GMonthDay => "gMonthDay",
            GMonth => "gMonth",
            GDay => "gDay",
            Base64Binary => "base64Binary",
            HexBinary => "hexBinary",
            AnyURI => "anyURI",
            DateTime => "dateTime",
            DateTimeStamp => "dateTimeStamp",
            Date => "date",
            NormalizedString => "normalizedString",
            Token => "token",
            Language => "language",
            NMTOKEN => "NMTOKEN",
            Name => "Name",
            NCName => "NCName",
            ID => "ID",
            IDREF => "IDREF",
            ENTITY => "ENTITY",
        }
    }

    /// The display name, `xs:local`.
    pub fn display_name(&self) -> String {
        format!("xs:{}", self.local_name())
    }

    /// The immediate supertype, `None` for `xs:anyType`.
    pub fn parent(&self) -> Option<Xs> {
        use Xs::*;
        match self {
            AnyType => None,
            AnySimpleType => Some(AnyType),
            Untyped => Some(AnyType),
            AnyAtomicType => Some(AnySimpleType),
            UntypedAtomic => Some(AnyAtomicType),
            Numeric => Some(AnySimpleType),
            String => Some(AnyAtomicType),
            Boolean => Some(AnyAtomicType),
            Float => Some(AnyAtomicType),
            Double => Some(AnyAtomicType),
            Decimal => Some(AnyAtomicType),
            Integer => Some(Decimal),
            NonPositiveInteger => Some(Integer),
            NegativeInteger => Some(NonPositiveInteger),
            Long => Some(Integer),
            Int => Some(Long),
            Short => Some(Int),
            Byte => Some(Short),
            NonNegativeInteger => Some(Integer),
            PositiveInteger => Some(NonNegativeInteger),
            UnsignedLong => Some(NonNegativeInteger),
            UnsignedInt => Some(UnsignedLong),
            UnsignedShort => Some(UnsignedInt),
            UnsignedByte => Some(UnsignedShort),
            QName => Some(AnyAtomicType),
            Notation => Some(AnyAtomicType),
            Duration => Some(AnyAtomicType),
            YearMonthDuration => Some(Duration),
            DayTimeDuration => Some(Duration),
            Time => Some(AnyAtomicType),
            GYearMonth => Some(AnyAtomicType),
            GYear => Some(AnyAtomicType),
            GMonthDay => Some(AnyAtomicType),
            GMonth => Some(AnyAtomicType),
            GDay => Some(AnyAtomicType),
            Base64Binary => Some(AnyAtomicType),
            HexBinary => Some(AnyAtomicType),
            AnyURI => Some(AnyAtomicType),
            DateTime => Some(AnyAtomicType),
            DateTimeStamp => Some(DateTime),
            Date => Some(AnyAtomicType),
            NormalizedString => Some(String),
            Token => Some(NormalizedString),
            Language => Some(Token),
            NMTOKEN => Some(Token),
            Name => Some(Token),
            NCName => Some(Name),
            ID => Some(NCName),
            IDREF => Some(NCName),
            ENTITY => Some(NCName),
        }
    }

    /// The primitive ancestor of an atomic type.
    ///
    /// Primitives answer themselves. The abstract roots and `xs:untyped`
    /// have no primitive and answer `None`.
    pub fn primitive(&self) -> Option<Xs> {
        use Xs::*;
        match self {
            AnyType | AnySimpleType | AnyAtomicType | Untyped | Numeric => None,
            UntypedAtomic => Some(UntypedAtomic),
            Decimal | Integer | NonPositiveInteger | NegativeInteger | NonNegativeInteger
            | PositiveInteger | Long | Int | Short | Byte | UnsignedLong | UnsignedInt
            | UnsignedShort | UnsignedByte => Some(Decimal),
            String | NormalizedString | Token | Language | NMTOKEN | Name | NCName | ID | IDREF
            | ENTITY => Some(String),
            YearMonthDuration | DayTimeDuration => Some(Duration),
            DateTimeStamp => Some(DateTime),
            other => Some(*other),
        }
    }

    /// Whether the type cannot be instantiated directly.
    pub fn is_abstract(&self) -> bool {
        matches!(
            self,
            Xs::AnyType | Xs::AnySimpleType | Xs::AnyAtomicType | Xs::Numeric | Xs::Notation
        )
    }

    /// Whether `self` is `other` or derived from it.
    ///
    /// Backed by a precomputed reflexive transitive matrix; O(1) per query.
    #[inline]
    pub fn derives_from(&self, other: Xs) -> bool {
        SUBTYPE_MATRIX[self.index()][other.index()]
    }

    /// Sequence-type matching, where `xs:numeric` stands for the union of
    /// the three numeric primitives.
    pub fn matches(&self, other: Xs) -> bool {
        if other != Xs::Numeric {
            return self.derives_from(other);
        }
        self.derives_from(Xs::Double)
            || self.derives_from(Xs::Float)
            || self.derives_from(Xs::Decimal)
    }
}

impl std::fmt::Display for Xs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "xs:{}", self.local_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derives_from() {
        assert!(Xs::Integer.derives_from(Xs::Integer));
        assert!(Xs::Integer.derives_from(Xs::Decimal));
        assert!(Xs::Integer.derives_from(Xs::AnyAtomicType));
        assert!(Xs::Integer.derives_from(Xs::AnySimpleType));
        assert!(Xs::Integer.derives_from(Xs::AnyType));
        assert!(Xs::Byte.derives_from(Xs::AnyAtomicType));
        assert!(!Xs::Decimal.derives_from(Xs::Integer));
        assert!(!Xs::String.derives_from(Xs::Decimal));
    }

    #[test]
    fn test_matrix_matches_parent_walk() {
        fn walk_derives(a: Xs, b: Xs) -> bool {
            if a == b {
                return true;
            }
            match a.parent() {
                Some(parent) => walk_derives(parent, b),
                None => false,
            }
        }
        for a in ALL_TYPES {
            for b in ALL_TYPES {
                assert_eq!(a.derives_from(b), walk_derives(a, b), "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_transitivity() {
        for a in ALL_TYPES {
            for b in ALL_TYPES {
                if !a.derives_from(b) {
                    continue;
                }
                for c in ALL_TYPES {
                    if b.derives_from(c) {
                        assert!(a.derives_from(c), "{} <= {} <= {}", a, b, c);
                    }
                }
            }
        }
    }

    #[test]
    fn test_primitive() {
        assert_eq!(Xs::UnsignedByte.primitive(), Some(Xs::Decimal));
        assert_eq!(Xs::ID.primitive(), Some(Xs::String));
        assert_eq!(Xs::DayTimeDuration.primitive(), Some(Xs::Duration));
        assert_eq!(Xs::DateTimeStamp.primitive(), Some(Xs::DateTime));
        assert_eq!(Xs::Double.primitive(), Some(Xs::Double));
        assert_eq!(Xs::AnyAtomicType.primitive(), None);
    }

    #[test]
    fn test_by_local_name_round_trip() {
        for xs in ALL_TYPES {
            assert_eq!(Xs::by_local_name(xs.local_name()), Some(xs));
        }
    }

    #[test]
    fn test_numeric_matching() {
        assert!(Xs::Integer.matches(Xs::Numeric));
        assert!(Xs::Float.matches(Xs::Numeric));
        assert!(Xs::Double.matches(Xs::Numeric));
        assert!(!Xs::String.matches(Xs::Numeric));
    }
}
