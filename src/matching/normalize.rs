//! Text canonicalization for fuzzy matching.
//!
//! Both engines compare normalized text, so that strings which differ
//! only in case, punctuation, leading articles or release annotations
//! ("(Remastered)", "- Club Mix") compare equal. Normalization is a pure
//! function: identical input always yields identical output.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ARTICLES: Regex = Regex::new(r"\b(?:the|a|an)\b").unwrap();
    static ref BRACKETED: Regex = Regex::new(r"\(.*?\)|\[.*?\]").unwrap();
    static ref VERSION_SUFFIX: Regex =
        Regex::new(r"\s*-[\w\s]*\b(?:remastered|remaster|version|remix|edit|mix)\b.*$").unwrap();
    static ref NON_ALNUM: Regex = Regex::new(r"[^\w\s]").unwrap();
}

/// Canonicalize a text field for comparison.
///
/// Lowercases, strips the articles "the"/"a"/"an" as whole words, drops
/// bracketed content, drops a trailing "- ... remix/edit/mix/version/
/// remaster(ed)" suffix, maps remaining punctuation to spaces and
/// collapses whitespace. Empty or whitespace-only input yields an empty
/// string.
pub fn normalize(text: &str) -> String {
    let text = text.to_lowercase();
    let text = ARTICLES.replace_all(&text, "");
    let text = BRACKETED.replace_all(&text, "");
    let text = VERSION_SUFFIX.replace_all(&text, "");
    let text = NON_ALNUM.replace_all(&text, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonicalize a file path for filename-based comparison: take the
/// basename, drop the extension, then normalize like any text field.
pub fn normalize_filename(path: &str) -> String {
    let basename = path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(path);
    let stem = match basename.rsplit_once('.') {
        Some((stem, _ext)) => stem,
        None => basename,
    };
    normalize(stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_articles_brackets_and_case() {
        assert_eq!(
            normalize("The Beatles - Hey Jude (Remastered)"),
            "beatles hey jude"
        );
    }

    #[test]
    fn strips_articles_as_whole_words_only() {
        assert_eq!(normalize("Theater of Anarchy"), "theater of anarchy");
        assert_eq!(normalize("A Guy Called Gerald"), "guy called gerald");
        assert_eq!(normalize("An Ending"), "ending");
    }

    #[test]
    fn strips_bracketed_content() {
        assert_eq!(normalize("Voodoo Ray (12\" Mix)"), "voodoo ray");
        assert_eq!(normalize("Pacific State [Origin]"), "pacific state");
    }

    #[test]
    fn strips_trailing_version_suffix() {
        assert_eq!(normalize("Blue Monday - Remix"), "blue monday");
        assert_eq!(normalize("Blue Monday - Club Mix"), "blue monday");
        assert_eq!(normalize("Strings of Life - Original Mix"), "strings of life");
        assert_eq!(normalize("Energy Flash - Remastered 2017"), "energy flash");
        // "mix" without a preceding hyphen is just a word
        assert_eq!(normalize("In the Mix"), "in mix");
    }

    #[test]
    fn collapses_punctuation_and_whitespace() {
        assert_eq!(normalize("Work   It!!  Harder,better"), "work it harder better");
        assert_eq!(normalize("AC/DC"), "ac dc");
    }

    #[test]
    fn empty_and_whitespace_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \t "), "");
        assert_eq!(normalize("()[]-!"), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        for input in [
            "The Beatles - Hey Jude (Remastered)",
            "A Guy Called Gerald",
            "Voodoo Ray (12\" Mix)",
            "Blue Monday - Club Mix",
            "AC/DC",
            "",
            "plain words already",
        ] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn filename_normalization() {
        assert_eq!(
            normalize_filename("/music/House/A Guy Called Gerald - Voodoo Ray.mp3"),
            "guy called gerald voodoo ray"
        );
        assert_eq!(
            normalize_filename(r"C:\Music\New Order - Blue Monday.flac"),
            "new order blue monday"
        );
        assert_eq!(normalize_filename("loose-file"), "loose file");
        assert_eq!(normalize_filename(""), "");
    }
}
