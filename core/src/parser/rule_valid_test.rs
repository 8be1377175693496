// Tests with valid inputs for each rule in the grammar.

use crate::parser::{BriskParser, Rule};
use pest::Parser;
use pest::iterators::Pair;

fn contains_rule(pair: Pair<Rule>, target: Rule) -> bool {
    if pair.as_rule() == target {
        return true;
    }
    for inner in pair.into_inner() {
        if contains_rule(inner, target) {
            return true;
        }
    }
    false
}

macro_rules! rule_examples {
    ( $($rule:ident => [$($expr:expr),* $(,)?]),* $(,)? ) => {
        $(
            #[test]
            fn $rule() {
                let inputs = vec![$($expr),*];
                for input in inputs {
                    let result = BriskParser::parse(Rule::main, input)
                        .unwrap_or_else(|e| panic!("Failed to parse '{}': {}", input, e));
                    let root = result.into_iter().next().unwrap();
                    assert!(
                        contains_rule(root.clone(), Rule::$rule),
                        "Expected to find rule {:?} in parse tree for input '{}'",
                        Rule::$rule,
                        input
                    );
                }
            }
        )*
    };
}

rule_examples! {
    integer => ["42", "0", "x = 7"],
    long => ["42L", "9000000000l"],
    double => ["3.14", "6.022e23", "1.5d", "2f"],
    string => ["\"hello\"", "'world'", "'it\\'s'", "\"unicode: \\u0041\""],
    boolean => ["true", "false"],
    null => ["null", "x == null"],
    ident => ["foo", "$msg", "_x1", "newValue", "returned", "format"],
    field => ["a.b", "foo.bar.woof"],
    method_call => ["a.toString()", "list.add(5)", "s.substring(1, 2)"],
    index => ["map['KEY1']", "arr[0]", "a.b[1][2]"],
    call => ["convert(x, Integer)", "now()"],
    assignment => ["x = 1", "x += 2", "a.b = 'c'", "m['k'] = v", "(list = new ArrayList()).add(5)"],
    declaration => ["int x = 5", "int a = 1, b", "var a", "def x = 1", "List<String> xs", "int[] arr = {1, 2}"],
    if_stmt => ["if (a) b", "if (a) { b } else { c }", "if (x > 1) y = 2; else y = 3;"],
    while_stmt => ["while (i < 10) i++", "while (true) { }"],
    for_stmt => ["for (int i = 0; i < 10; i++) { s += i }", "for (;;) {}"],
    foreach_stmt => ["for (x : xs) { }", "for (String s : list) n++", "for (var i : arr) {}"],
    return_stmt => ["return c", "return"],
    import_stmt => ["import java.util.ArrayList", "import java.util.*"],
    block => ["{ a; b }", "{}"],
    cast => ["(int) x", "(String) a.b", "(java.util.List) x"],
    ternary_tail => ["a ? b : c"],
    new_object => ["new Foo()", "new java.util.ArrayList()", "new Cheese('x', 1)"],
    new_array => ["new int[] {x, y}", "new String[][] {{'a'}}"],
    new_sized_array => ["new int[5]"],
    inline_array => ["{1, 2, 3}", "int[] a = {}"],
    inline_list => ["[1, 2, 3]", "[]"],
    inline_map => ["['a': 1, 'b': 2]", "[:]"],
    incr => ["i++"],
    decr => ["i--"],
    neg => ["-x", "a * -b"],
    not => ["!x", "!a.isEmpty()"],
}
