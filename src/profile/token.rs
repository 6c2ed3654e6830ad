use clap::ValueEnum;
use regex::Regex;

/// Token character class of the restricted tokenizer.
const RESTRICTED_TOKEN_RE: &str = r"[A-Za-z0-9_.+\-]+";

/// How a log line is split into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Tokenizer {
    /// Split on runs of whitespace.
    #[default]
    Whitespace,
    /// Keep only runs of `[A-Za-z0-9_.+-]`; every other character separates
    /// tokens and is dropped, so `a$b` yields two tokens.
    Restricted,
}

/// Compiled form of a [`Tokenizer`].
#[derive(Debug, Clone)]
pub struct Splitter {
    restricted: Option<Regex>,
}

impl Splitter {
    pub fn new(tokenizer: Tokenizer) -> Result<Self, regex::Error> {
        let restricted = match tokenizer {
            Tokenizer::Whitespace => None,
            Tokenizer::Restricted => Some(Regex::new(RESTRICTED_TOKEN_RE)?),
        };
        Ok(Self { restricted })
    }

    pub fn split(&self, line: &str) -> Vec<String> {
        match &self.restricted {
            None => line.split_whitespace().map(str::to_string).collect(),
            Some(re) => re.find_iter(line).map(|m| m.as_str().to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn whitespace_drops_empty_tokens() {
        let splitter = Splitter::new(Tokenizer::Whitespace).unwrap();
        assert_eq!(
            splitter.split("  12   sip_barrier\t 0.5e-3  "),
            vec!["12", "sip_barrier", "0.5e-3"]
        );
    }

    #[test]
    fn restricted_splits_on_foreign_characters() {
        let restricted = Splitter::new(Tokenizer::Restricted).unwrap();
        assert_eq!(
            restricted.split("get_block[a,b]  1.5e+2 -3"),
            vec!["get_block", "a", "b", "1.5e+2", "-3"]
        );

        let whitespace = Splitter::new(Tokenizer::Whitespace).unwrap();
        assert_eq!(whitespace.split("get_block[a,b]").len(), 1);
    }
}
