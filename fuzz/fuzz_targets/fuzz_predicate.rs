#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use loglens::query::{SearchPredicate, SearchTerm, TermFlags};

#[derive(Arbitrary, Debug)]
struct Term {
    exclude: bool,
    whole_word: bool,
    case_sensitive: bool,
    text: String,
}

#[derive(Arbitrary, Debug)]
struct Input {
    terms: Vec<Term>,
    line: String,
}

fuzz_target!(|input: Input| {
    // Term text is matched literally; highlights must land on char
    // boundaries inside the line
    let terms = input
        .terms
        .into_iter()
        .map(|t| {
            let flags = TermFlags {
                whole_word: t.whole_word,
                case_sensitive: t.case_sensitive,
            };
            if t.exclude {
                SearchTerm::exclude(t.text, flags)
            } else {
                SearchTerm::include(t.text, flags)
            }
        })
        .collect();

    let Ok(predicate) = SearchPredicate::advanced(terms) else {
        return;
    };
    let Ok(compiled) = predicate.compile() else {
        return;
    };
    let _ = compiled.is_match(&input.line);
    for (start, end) in compiled.highlight_ranges(&input.line) {
        assert!(start <= end && end <= input.line.len());
        assert!(input.line.is_char_boundary(start) && input.line.is_char_boundary(end));
    }
});
