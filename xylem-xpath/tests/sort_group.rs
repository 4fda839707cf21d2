use xylem_xpath::{Atomic, Compiler, Sequence, StaticContextBuilder};

fn compiler() -> Compiler {
    Compiler::new(StaticContextBuilder::new().build())
}

fn eval_xquery(source: &str) -> Sequence {
    compiler()
        .compile_xquery(source)
        .unwrap()
        .load()
        .evaluate()
        .unwrap()
}

fn strings(sequence: &Sequence) -> Vec<String> {
    sequence
        .iter()
        .map(|item| item.to_atomic().unwrap().string_value())
        .collect()
}

#[test]
fn test_order_by_ascending() {
    let result = eval_xquery("for $x in (3, 1, 2) order by $x return $x");
    assert_eq!(strings(&result), ["1", "2", "3"]);
}

#[test]
fn test_order_by_descending() {
    let result = eval_xquery("for $x in (3, 1, 2) order by $x descending return $x");
    assert_eq!(strings(&result), ["3", "2", "1"]);
}

#[test]
fn test_order_by_is_stable() {
    // equal keys keep input order: pairs (key, payload)
    let result = eval_xquery(
        "for $x in (12, 11, 22, 21) order by $x idiv 10 return $x",
    );
    assert_eq!(strings(&result), ["12", "11", "22", "21"]);
}

#[test]
fn test_order_by_empty_greatest() {
    // the spec scenario: keys (3, (), 1, (), 2) ascending, empty greatest
    let result = eval_xquery(
        "for $i in (3, 0, 1, 0, 2) \
         order by (if ($i = 0) then () else $i) empty greatest \
         return $i",
    );
    assert_eq!(strings(&result), ["1", "2", "3", "0", "0"]);
}

#[test]
fn test_order_by_empty_least_is_the_default() {
    let result = eval_xquery(
        "for $i in (3, 0, 1) order by (if ($i = 0) then () else $i) return $i",
    );
    assert_eq!(strings(&result), ["0", "1", "3"]);
}

#[test]
fn test_order_by_with_alphanumeric_collation() {
    // the alphanumeric collator compares digit runs numerically
    let result = eval_xquery(
        "for $s in ('a10', 'a2', 'a1') \
         order by $s collation 'http://xylem-xml.org/collation?alphanumeric=yes' \
         return $s",
    );
    assert_eq!(strings(&result), ["a1", "a2", "a10"]);
}

#[test]
fn test_order_by_nan_sorts_first_and_groups() {
    let result = eval_xquery(
        "for $x in (1, number('nope'), 0, number('nope')) order by $x return $x",
    );
    let values = strings(&result);
    assert_eq!(&values[..2], ["NaN", "NaN"]);
    assert_eq!(&values[2..], ["0", "1"]);
}

#[test]
fn test_where_clause() {
    let result = eval_xquery(
        "for $x in 1 to 10 where $x mod 2 = 0 order by $x descending return $x",
    );
    assert_eq!(strings(&result), ["10", "8", "6", "4", "2"]);
}

#[test]
fn test_unknown_collation_is_reported_when_required() {
    let executable = compiler()
        .compile_xquery(
            "for $s in ('b', 'a') order by $s collation 'http://example.com/other' return $s",
        )
        .unwrap();
    let result = executable.load().evaluate();
    assert_eq!(result.unwrap_err().error, xylem_xpath::Error::XTDE1035);
}

// ---- the stylesheet subset ----

fn eval_xslt(stylesheet: &str, document: &str) -> (Sequence, Vec<String>) {
    let compiler = compiler();
    let executable = compiler.compile_xslt(stylesheet).unwrap();
    let mut selector = executable.load();
    selector.context_document("u:input", document).unwrap();
    let documents = selector.documents().clone();
    let result = selector.evaluate().unwrap();
    let rendered = result
        .iter()
        .map(|item| item.string_value(documents.borrow().xot()))
        .collect();
    (result, rendered)
}

#[test]
fn test_xslt_for_each_with_sort() {
    let stylesheet = r#"
        <xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="2.0">
          <xsl:template match="/">
            <xsl:for-each select="/doc/item">
              <xsl:sort select="@key" data-type="number"/>
              <xsl:value-of select="."/>
            </xsl:for-each>
          </xsl:template>
        </xsl:stylesheet>"#;
    let document = r#"<doc><item key="10">c</item><item key="2">b</item><item key="1">a</item></doc>"#;
    let (_, rendered) = eval_xslt(stylesheet, document);
    assert_eq!(rendered, ["a", "b", "c"]);
}

#[test]
fn test_xslt_sort_data_type_text_differs_from_number() {
    let stylesheet = r#"
        <xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="2.0">
          <xsl:template match="/">
            <xsl:for-each select="/doc/item">
              <xsl:sort select="@key" data-type="text"/>
              <xsl:value-of select="."/>
            </xsl:for-each>
          </xsl:template>
        </xsl:stylesheet>"#;
    let document = r#"<doc><item key="10">c</item><item key="2">b</item><item key="1">a</item></doc>"#;
    // "10" < "2" as strings
    let (_, rendered) = eval_xslt(stylesheet, document);
    assert_eq!(rendered, ["a", "c", "b"]);
}

#[test]
fn test_xslt_invalid_sort_data_type() {
    let stylesheet = r#"
        <xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="2.0">
          <xsl:template match="/">
            <xsl:for-each select="/doc/item">
              <xsl:sort select="." data-type="calendar"/>
              <xsl:value-of select="."/>
            </xsl:for-each>
          </xsl:template>
        </xsl:stylesheet>"#;
    let result = compiler().compile_xslt(stylesheet);
    assert_eq!(result.unwrap_err().error, xylem_xpath::Error::XTDE0030);
}

#[test]
fn test_xslt_group_by() {
    let stylesheet = r#"
        <xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="2.0">
          <xsl:template match="/">
            <xsl:for-each-group select="/doc/item" group-by="@dept">
              <xsl:value-of select="current-grouping-key()"/>
              <xsl:value-of select="count(current-group())"/>
            </xsl:for-each-group>
          </xsl:template>
        </xsl:stylesheet>"#;
    let document = r#"<doc>
        <item dept="a">1</item>
        <item dept="b">2</item>
        <item dept="a">3</item>
    </doc>"#;
    // groups in first-appearance order: a has two members, b has one
    let (_, rendered) = eval_xslt(stylesheet, document);
    assert_eq!(rendered, ["a", "2", "b", "1"]);
}

#[test]
fn test_xslt_group_by_multi_key() {
    // the spec scenario: population (1, 2, 3, 4), keys (. mod 2, . mod 3)
    let stylesheet = r#"
        <xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="2.0">
          <xsl:template match="/">
            <xsl:for-each-group select="1 to 4" group-by="(. mod 2, . mod 3)">
              <xsl:sequence select="current-grouping-key()"/>
              <xsl:sequence select="string-join(for $m in current-group() return string($m), ',')"/>
            </xsl:for-each-group>
          </xsl:template>
        </xsl:stylesheet>"#;
    let (result, _) = eval_xslt(stylesheet, "<doc/>");
    let values = strings(&result);
    // keys appear in first-appearance order 1, 0, 2; every item joins the
    // group of each distinct key it generates
    assert_eq!(values, ["1", "1,3,4", "0", "2,3,4", "2", "2"]);
}

#[test]
fn test_xslt_group_adjacent() {
    let stylesheet = r#"
        <xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="2.0">
          <xsl:template match="/">
            <xsl:for-each-group select="/doc/item" group-adjacent="@kind">
              <xsl:value-of select="string-join(current-group()/string(.), '+')"/>
            </xsl:for-each-group>
          </xsl:template>
        </xsl:stylesheet>"#;
    let document = r#"<doc>
        <item kind="x">1</item>
        <item kind="x">2</item>
        <item kind="y">3</item>
        <item kind="x">4</item>
    </doc>"#;
    let (_, rendered) = eval_xslt(stylesheet, document);
    assert_eq!(rendered, ["1+2", "3", "4"]);
}

#[test]
fn test_xslt_group_starting_with() {
    let stylesheet = r#"
        <xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="2.0">
          <xsl:template match="/">
            <xsl:for-each-group select="/doc/*" group-starting-with="h">
              <xsl:value-of select="string-join(current-group()/string(.), '+')"/>
            </xsl:for-each-group>
          </xsl:template>
        </xsl:stylesheet>"#;
    let document = "<doc><p>0</p><h>1</h><p>2</p><h>3</h></doc>";
    let (_, rendered) = eval_xslt(stylesheet, document);
    assert_eq!(rendered, ["0", "1+2", "3"]);
}

#[test]
fn test_xslt_group_ending_with() {
    let stylesheet = r#"
        <xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="2.0">
          <xsl:template match="/">
            <xsl:for-each-group select="/doc/*" group-ending-with="e">
              <xsl:value-of select="string-join(current-group()/string(.), '+')"/>
            </xsl:for-each-group>
          </xsl:template>
        </xsl:stylesheet>"#;
    let document = "<doc><p>0</p><e>1</e><p>2</p><p>3</p></doc>";
    let (_, rendered) = eval_xslt(stylesheet, document);
    assert_eq!(rendered, ["0+1", "2+3"]);
}

#[test]
fn test_xslt_current_group_outside_grouping() {
    let result = compiler()
        .compile_xpath("current-group()")
        .unwrap()
        .load()
        .evaluate();
    assert_eq!(result.unwrap_err().error, xylem_xpath::Error::XTDE1061);
}

#[test]
fn test_xslt_if_and_value_of() {
    let stylesheet = r#"
        <xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="2.0">
          <xsl:template match="/">
            <xsl:if test="count(/doc/item) > 1">
              <xsl:value-of select="/doc/item" separator=","/>
            </xsl:if>
          </xsl:template>
        </xsl:stylesheet>"#;
    let (_, rendered) = eval_xslt(stylesheet, "<doc><item>a</item><item>b</item></doc>");
    assert_eq!(rendered, ["a,b"]);
}

#[test]
fn test_xslt_rejects_unknown_instruction() {
    let stylesheet = r#"
        <xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="2.0">
          <xsl:template match="/">
            <xsl:message select="'nope'"/>
          </xsl:template>
        </xsl:stylesheet>"#;
    let result = compiler().compile_xslt(stylesheet);
    assert_eq!(result.unwrap_err().error, xylem_xpath::Error::XTSE0010);
}

#[test]
fn test_run_into_tree_builder() {
    let compiler = compiler();
    let executable = compiler.compile_xpath("for $x in 1 to 3 return $x").unwrap();
    let selector = executable.load();
    let mut builder = xylem_xpath::TreeBuilder::new(
        selector.documents().clone(),
        xylem_xpath::Uri::new("u:out"),
    );
    selector.run(&mut builder).unwrap();
    let root = builder.root().unwrap();
    let documents = selector.documents().borrow();
    assert_eq!(documents.xot().string_value(root), "123");
}
