use xylem_name::{Name, FN_NAMESPACE};
use xylem_schema_type::Xs;
use xylem_xpath_type::{ItemType, KindTest, NameTest, NodeKind};

/// The built-in functions the engine evaluates directly.
///
/// Resolution happens at compile time; an unknown name or arity is the
/// static error `XPST0017`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinFunction {
    Position,
    Last,
    Count,
    Empty,
    Exists,
    Not,
    Boolean,
    String,
    StringLength,
    Number,
    Concat,
    True,
    False,
    Name,
    LocalName,
    Root,
    Doc,
    Data,
    CurrentDateTime,
    CurrentDate,
    CurrentTime,
    ImplicitTimezone,
    AdjustDateTimeToTimezone,
    AdjustDateToTimezone,
    AdjustTimeToTimezone,
    StringJoin,
    DistinctValues,
    Min,
    Max,
    Sum,
    Avg,
    Floor,
    Ceiling,
    Round,
    Abs,
    Compare,
    Contains,
    StartsWith,
    EndsWith,
    Substring,
    UpperCase,
    LowerCase,
    NormalizeSpace,
    Reverse,
    Subsequence,
    CurrentGroup,
    CurrentGroupingKey,
}

impl BuiltinFunction {
    /// Resolve a function name and arity against the library.
    pub fn resolve(name: &Name, arity: usize) -> Option<BuiltinFunction> {
        if name.namespace() != Some(FN_NAMESPACE) {
            return None;
        }
        use BuiltinFunction::*;
        let function = match (name.local_name(), arity) {
            ("position", 0) => Position,
            ("last", 0) => Last,
            ("count", 1) => Count,
            ("empty", 1) => Empty,
            ("exists", 1) => Exists,
            ("not", 1) => Not,
            ("boolean", 1) => Boolean,
            ("string", 0 | 1) => String,
            ("string-length", 0 | 1) => StringLength,
            ("number", 0 | 1) => Number,
            ("concat", n) if n >= 2 => Concat,
            ("true", 0) => True,
            ("false", 0) => False,
            ("name", 0 | 1) => Name,
            ("local-name", 0 | 1) => LocalName,
            ("root", 0 | 1) => Root,
            ("doc", 1) => Doc,
            ("data", 1) => Data,
            ("current-dateTime", 0) => CurrentDateTime,
            ("current-date", 0) => CurrentDate,
            ("current-time", 0) => CurrentTime,
            ("implicit-timezone", 0) => ImplicitTimezone,
            ("adjust-dateTime-to-timezone", 1 | 2) => AdjustDateTimeToTimezone,
            ("adjust-date-to-timezone", 1 | 2) => AdjustDateToTimezone,
            ("adjust-time-to-timezone", 1 | 2) => AdjustTimeToTimezone,
            ("string-join", 2) => StringJoin,
            ("distinct-values", 1 | 2) => DistinctValues,
            ("min", 1 | 2) => Min,
            ("max", 1 | 2) => Max,
            ("sum", 1 | 2) => Sum,
            ("avg", 1) => Avg,
            ("floor", 1) => Floor,
            ("ceiling", 1) => Ceiling,
            ("round", 1) => Round,
            ("abs", 1) => Abs,
            ("compare", 2 | 3) => Compare,
            ("contains", 2 | 3) => Contains,
            ("starts-with", 2 | 3) => StartsWith,
            ("ends-with", 2 | 3) => EndsWith,
            ("substring", 2 | 3) => Substring,
            ("upper-case", 1) => UpperCase,
            ("lower-case", 1) => LowerCase,
            ("normalize-space", 0 | 1) => NormalizeSpace,
            ("reverse", 1) => Reverse,
            ("subsequence", 2 | 3) => Subsequence,
            ("current-group", 0) => CurrentGroup,
            ("current-grouping-key", 0) => CurrentGroupingKey,
            _ => return None,
        };
        Some(function)
    }

    /// The display name used in diagnostics.
    pub fn display_name(&self) -> &'static str {
        use BuiltinFunction::*;
        match self {
            Position => "fn:position",
            Last => "fn:last",
            Count => "fn:count",
            Empty => "fn:empty",
            Exists => "fn:exists",
            Not => "fn:not",
            Boolean => "fn:boolean",
            String => "fn:string",
            StringLength => "fn:string-length",
            Number => "fn:number",
            Concat => "fn:concat",
            True => "fn:true",
            False => "fn:false",
            Name => "fn:name",
            LocalName => "fn:local-name",
            Root => "fn:root",
            Doc => "fn:doc",
            Data => "fn:data",
            CurrentDateTime => "fn:current-dateTime",
            CurrentDate => "fn:current-date",
            CurrentTime => "fn:current-time",
            ImplicitTimezone => "fn:implicit-timezone",
            AdjustDateTimeToTimezone => "fn:adjust-dateTime-to-timezone",
            AdjustDateToTimezone => "fn:adjust-date-to-timezone",
            AdjustTimeToTimezone => "fn:adjust-time-to-timezone",
            StringJoin => "fn:string-join",
            DistinctValues => "fn:distinct-values",
            Min => "fn:min",
            Max => "fn:max",
            Sum => "fn:sum",
            Avg => "fn:avg",
            Floor => "fn:floor",
            Ceiling => "fn:ceiling",
            Round => "fn:round",
            Abs => "fn:abs",
            Compare => "fn:compare",
            Contains => "fn:contains",
            StartsWith => "fn:starts-with",
            EndsWith => "fn:ends-with",
            Substring => "fn:substring",
            UpperCase => "fn:upper-case",
            LowerCase => "fn:lower-case",
            NormalizeSpace => "fn:normalize-space",
            Reverse => "fn:reverse",
            Subsequence => "fn:subsequence",
            CurrentGroup => "fn:current-group",
            CurrentGroupingKey => "fn:current-grouping-key",
        }
    }

    /// Whether evaluation reads the focus even without arguments.
    pub fn depends_on_focus(&self) -> bool {
        use BuiltinFunction::*;
        matches!(
            self,
            Position
                | Last
                | String
                | StringLength
                | Number
                | Name
                | LocalName
                | Root
                | NormalizeSpace
        )
    }

    /// The statically known item type of the result.
    pub fn result_item_type(&self) -> ItemType {
        use BuiltinFunction::*;
        match self {
            Position | Last | Count | StringLength | Floor | Ceiling | Round | Abs => {
                ItemType::Atomic(Xs::AnyAtomicType)
            }
            Empty | Exists | Not | Boolean | True | False | Contains | StartsWith | EndsWith => {
                ItemType::Atomic(Xs::Boolean)
            }
            String | Concat | Name | LocalName | StringJoin | Substring | UpperCase
            | LowerCase | NormalizeSpace => ItemType::Atomic(Xs::String),
            Number | Avg => ItemType::Atomic(Xs::Double),
            Compare => ItemType::Atomic(Xs::Integer),
            CurrentDateTime => ItemType::Atomic(Xs::DateTimeStamp),
            CurrentDate => ItemType::Atomic(Xs::Date),
            CurrentTime => ItemType::Atomic(Xs::Time),
            ImplicitTimezone => ItemType::Atomic(Xs::DayTimeDuration),
            AdjustDateTimeToTimezone => ItemType::Atomic(Xs::DateTime),
            AdjustDateToTimezone => ItemType::Atomic(Xs::Date),
            AdjustTimeToTimezone => ItemType::Atomic(Xs::Time),
            Root | Doc => ItemType::Node(KindTest::Kind(NodeKind::Document, NameTest::Wildcard)),
            Data | DistinctValues | Min | Max | Sum | CurrentGroupingKey => {
                ItemType::Atomic(Xs::AnyAtomicType)
            }
            Reverse | Subsequence | CurrentGroup => ItemType::Item,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fn_name(local: &str) -> Name {
        Name::uri_qualified(FN_NAMESPACE, local)
    }

    #[test]
    fn test_resolution_by_name_and_arity() {
        assert_eq!(
            BuiltinFunction::resolve(&fn_name("position"), 0),
            Some(BuiltinFunction::Position)
        );
        assert_eq!(BuiltinFunction::resolve(&fn_name("position"), 1), None);
        assert_eq!(
            BuiltinFunction::resolve(&fn_name("concat"), 5),
            Some(BuiltinFunction::Concat)
        );
        assert_eq!(BuiltinFunction::resolve(&fn_name("concat"), 1), None);
        assert_eq!(BuiltinFunction::resolve(&fn_name("no-such"), 1), None);
        assert_eq!(
            BuiltinFunction::resolve(&Name::unprefixed("position"), 0),
            None
        );
    }

    #[test]
    fn test_focus_dependence() {
        assert!(BuiltinFunction::Position.depends_on_focus());
        assert!(BuiltinFunction::String.depends_on_focus());
        assert!(!BuiltinFunction::Count.depends_on_focus());
        assert!(!BuiltinFunction::CurrentDateTime.depends_on_focus());
    }
}
