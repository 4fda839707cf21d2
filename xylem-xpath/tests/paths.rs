use xylem_xpath::{Atomic, Compiler, Sequence, StaticContextBuilder};

const DOC: &str = r#"<doc><a n="1">first</a><b>middle</b><a n="2">second</a></doc>"#;

fn eval(source: &str) -> Sequence {
    let compiler = Compiler::new(StaticContextBuilder::new().build());
    let executable = compiler.compile_xpath(source).unwrap();
    let mut selector = executable.load();
    selector.context_document("u:doc", DOC).unwrap();
    selector.evaluate().unwrap()
}

fn eval_strings(source: &str) -> Vec<String> {
    let compiler = Compiler::new(StaticContextBuilder::new().build());
    let executable = compiler.compile_xpath(source).unwrap();
    let mut selector = executable.load();
    selector.context_document("u:doc", DOC).unwrap();
    let documents = selector.documents().clone();
    selector
        .evaluate()
        .unwrap()
        .iter()
        .map(|item| item.string_value(documents.borrow().xot()))
        .collect()
}

fn eval_one_atomic(source: &str) -> Atomic {
    eval(source).one().unwrap().to_atomic().unwrap()
}

#[test]
fn test_child_steps() {
    assert_eq!(eval("/doc/a").len(), 2);
    assert_eq!(eval("/doc/*").len(), 3);
    assert_eq!(eval("/doc/b").len(), 1);
    assert_eq!(eval("/doc/nothing").len(), 0);
}

#[test]
fn test_descendant_and_predicates() {
    assert_eq!(eval("//a").len(), 2);
    assert_eq!(eval_strings("//a[1]"), ["first"]);
    assert_eq!(eval_strings("//a[2]"), ["second"]);
    assert_eq!(eval_strings("/doc/*[last()]"), ["second"]);
    assert_eq!(eval_strings("//a[@n = '2']"), ["second"]);
}

#[test]
fn test_attributes() {
    assert_eq!(eval("//@n").len(), 2);
    assert_eq!(eval_strings("/doc/a[1]/@n"), ["1"]);
    assert_eq!(eval("//a[@n]").len(), 2);
}

#[test]
fn test_path_results_are_in_document_order_without_duplicates() {
    // the operands arrive in reverse; the path machinery restores order
    assert_eq!(eval_strings("(//a[2] | //a[1] | //a[1])/string(.)"), [
        "first", "second"
    ]);
    assert_eq!(eval_strings("//a/.."), [DOC_STRING_VALUE]);
}

const DOC_STRING_VALUE: &str = "firstmiddlesecond";

#[test]
fn test_parent_and_reverse_axes() {
    assert_eq!(eval("//a/parent::doc").len(), 1);
    assert_eq!(eval("//b/preceding-sibling::a").len(), 1);
    assert_eq!(eval("//b/following-sibling::a").len(), 1);
    assert_eq!(eval("//a[2]/ancestor::*").len(), 1);
}

#[test]
fn test_untyped_node_comparison() {
    // attribute content coerces to the numeric operand
    assert_eq!(
        eval_one_atomic("//a[@n = 2]/@n = 2"),
        Atomic::Boolean(true)
    );
    assert_eq!(eval_one_atomic("count(//a[@n > 1])"), Atomic::from(1i64));
}

#[test]
fn test_node_identity_and_order_comparisons() {
    assert_eq!(eval_one_atomic("//a[1] is //a[1]"), Atomic::Boolean(true));
    assert_eq!(eval_one_atomic("//a[1] is //a[2]"), Atomic::Boolean(false));
    assert_eq!(eval_one_atomic("//a[1] << //a[2]"), Atomic::Boolean(true));
    assert_eq!(eval_one_atomic("//a[2] >> //b"), Atomic::Boolean(true));
}

#[test]
fn test_set_operations() {
    assert_eq!(eval("//a | //b").len(), 3);
    assert_eq!(eval("//* intersect //a").len(), 2);
    assert_eq!(eval("//* except //a").len(), 2);
    // union removes duplicates
    assert_eq!(eval("//a | //a").len(), 2);
}

#[test]
fn test_node_functions() {
    assert_eq!(eval_one_atomic("local-name(/doc/b)"), Atomic::from("b"));
    assert_eq!(eval_one_atomic("name(/doc/a[1])"), Atomic::from("a"));
    assert_eq!(
        eval_one_atomic("string(/doc)"),
        Atomic::from(DOC_STRING_VALUE)
    );
    assert_eq!(eval_one_atomic("count(root(//a[1])/doc)"), Atomic::from(1i64));
}

#[test]
fn test_kind_tests() {
    assert_eq!(eval("//text()").len(), 3);
    assert_eq!(eval("/doc/element(a)").len(), 2);
    assert_eq!(eval("//a/@attribute(n)").len(), 2);
    assert_eq!(eval("/self::document-node()").len(), 1);
}

#[test]
fn test_data_atomizes_nodes() {
    let values = eval("data(//a)");
    assert_eq!(values.len(), 2);
    let first = values.get(0).unwrap().to_atomic().unwrap();
    assert_eq!(first, Atomic::Untyped("first".into()));
}
