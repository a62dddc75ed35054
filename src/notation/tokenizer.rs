//! Turn-line tokenizer. Tokenization never fails; malformed content
//! surfaces as a classification error downstream.

/// Strip a leading reward-offer prefix: one to three space-separated
/// integers followed by a double space (e.g. `"2 3  upgrade …"`).
#[must_use]
pub(crate) fn strip_leech_prefix(line: &str) -> &str {
    let line = line.trim();
    let Some((head, tail)) = line.split_once("  ") else {
        return line;
    };
    let fields: Vec<&str> = head.split_whitespace().collect();
    let numeric = !fields.is_empty()
        && fields.len() <= 3
        && fields.iter().all(|f| f.parse::<u32>().is_ok());
    if numeric { tail.trim_start() } else { line }
}

/// Split one raw turn line into ordered, trimmed, non-empty tokens.
#[must_use]
pub fn tokenize(line: &str) -> Vec<String> {
    strip_leech_prefix(line)
        .split('.')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_on_periods_and_trims() {
        let tokens = tokenize("burn 1. convert 1PW to 1C.  advance ship ");
        assert_eq!(tokens, vec!["burn 1", "convert 1PW to 1C", "advance ship"]);
    }

    #[test]
    fn test_drops_empty_tokens() {
        let tokens = tokenize("pass BON7..");
        assert_eq!(tokens, vec!["pass BON7"]);
    }

    #[test]
    fn test_strips_two_number_leech_prefix() {
        let tokens = tokenize("2 3  upgrade F5 to TE. +FAV11");
        assert_eq!(tokens, vec!["upgrade F5 to TE", "+FAV11"]);
    }

    #[test]
    fn test_strips_three_number_leech_prefix() {
        let tokens = tokenize("3 5 3  upgrade F5 to TE");
        assert_eq!(tokens, vec!["upgrade F5 to TE"]);
    }

    #[test]
    fn test_keeps_non_numeric_double_space() {
        let tokens = tokenize("send p to  WATER");
        assert_eq!(tokens, vec!["send p to  WATER"]);
    }

    #[test]
    fn test_never_fails_on_garbage() {
        assert_eq!(tokenize(""), Vec::<String>::new());
        assert_eq!(tokenize("..."), Vec::<String>::new());
        let tokens = tokenize("complete nonsense here");
        assert_eq!(tokens, vec!["complete nonsense here"]);
    }
}
