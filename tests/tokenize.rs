// tests/tokenize.rs

use convcache::exec::{quote_arg, tokenize};
use proptest::prelude::*;

fn argv(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn whitespace_separates_arguments() {
    assert_eq!(tokenize("ls -l   /tmp"), argv(&["ls", "-l", "/tmp"]));
    assert_eq!(tokenize("  \t "), Vec::<String>::new());
    assert_eq!(tokenize(""), Vec::<String>::new());
}

#[test]
fn quoted_group_keeps_whitespace() {
    assert_eq!(
        tokenize("sh -c 'echo hi there'"),
        argv(&["sh", "-c", "echo hi there"])
    );
    assert_eq!(
        tokenize(r#"grep "a  b" file"#),
        argv(&["grep", "a  b", "file"])
    );
}

#[test]
fn other_quote_is_literal_inside_a_group() {
    assert_eq!(tokenize(r#"echo "it's""#), argv(&["echo", "it's"]));
    assert_eq!(
        tokenize(r#"sh -c 'trap "" TERM'"#),
        argv(&["sh", "-c", r#"trap "" TERM"#])
    );
}

#[test]
fn mid_token_quote_is_dropped() {
    assert_eq!(tokenize("ab'cd ef"), argv(&["abcd", "ef"]));
    assert_eq!(tokenize(r#"x"y z"#), argv(&["xy", "z"]));
}

#[test]
fn unbalanced_quote_closes_at_end() {
    assert_eq!(tokenize("echo 'abc def"), argv(&["echo", "abc def"]));
}

#[test]
fn empty_quotes_make_an_empty_argument() {
    assert_eq!(tokenize("a '' b"), argv(&["a", "", "b"]));
}

#[test]
fn quote_arg_picks_a_usable_quote() {
    assert_eq!(quote_arg("plain").as_deref(), Some("'plain'"));
    assert_eq!(quote_arg("it's").as_deref(), Some("\"it's\""));
    assert_eq!(quote_arg(r#"both ' and ""#), None);
}

proptest! {
    #[test]
    fn quoted_argument_round_trips(s in "[a-zA-Z0-9 _./'-]{0,24}") {
        let quoted = quote_arg(&s).expect("no double quote, must be quotable");
        prop_assert_eq!(tokenize(&quoted), vec![s]);
    }

    #[test]
    fn plain_words_round_trip(words in proptest::collection::vec("[a-z0-9._/-]{1,8}", 0..6)) {
        let line = words.join("  ");
        prop_assert_eq!(tokenize(&line), words);
    }
}
