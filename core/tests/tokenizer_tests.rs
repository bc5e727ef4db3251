use searchcore::tokenizer::Tokenizer;

#[test]
fn it_keeps_punctuation_and_plurals() {
    let words: Vec<String> = Tokenizer::default().tokenize("1/2 cup sugar, 15 cups of vinegar.").collect();
    assert!(words.contains(&"1/2".to_string()));
    assert!(words.contains(&"sugar,".to_string()));
    assert!(words.contains(&"cup".to_string()));
    assert!(words.contains(&"cups".to_string()));
    assert!(words.contains(&"vinegar.".to_string()));
}

#[test]
fn it_folds_case_only_when_asked() {
    let folded: Vec<String> = Tokenizer::new(true).tokenize("Wild Turkey").collect();
    assert_eq!(folded, vec!["wild", "turkey"]);
    let kept: Vec<String> = Tokenizer::new(false).tokenize("Wild Turkey").collect();
    assert_eq!(kept, vec!["Wild", "Turkey"]);
}

#[test]
fn it_never_yields_empty_terms() {
    let tok = Tokenizer::default();
    assert_eq!(tok.tokenize("").count(), 0);
    assert_eq!(tok.tokenize(" \t\r\n ").count(), 0);
    assert_eq!(tok.tokenize("\u{7} \u{0}").count(), 0);
}
