use lazy_static::lazy_static;
use regex::Regex;
use std::fmt::Display;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

// Token set for one "#define" body. This lexer exists only so that macro
// records can isolate their parameter list and body structure; the rest of
// the pipeline works on plain text.
#[derive(Clone, Debug, PartialEq, EnumIter)]
pub enum MacroToken {
    Identifier(String),

    Number(String),

    // literals keep their quotes and escapes, they are re-emitted verbatim
    CharacterConstant(String),
    StringLiteral(String),

    // "#param" in a function-like body
    Stringify(String),
    // "##" between body tokens
    Paste,
    // "..." in a parameter list
    Ellipsis,

    Punctuator(String),
    WhiteSpace(String),
}

lazy_static! {
    // format is (Token, Regex). Longer matches are taken over shorter ones,
    // so "##" beats "#" and "..." beats ".".
    static ref ALL_TOKENS: Vec<(MacroToken, Regex)> = {
        let mut v = Vec::new();
        for token in MacroToken::iter() {
            let entry: &str = match token {
                MacroToken::Identifier(_) => r"[a-zA-Z_]\w*",
                MacroToken::Number(_) => r"\.?[0-9][0-9a-zA-Z_\.]*",
                MacroToken::CharacterConstant(_) => r"'(?:[^'\\\n]|\\.)*'",
                MacroToken::StringLiteral(_) => r#""(?:[^"\\\n]|\\.)*""#,
                MacroToken::Stringify(_) => r"#[a-zA-Z_]\w*",
                MacroToken::Paste => r"##",
                MacroToken::Ellipsis => r"\.\.\.",

                // every punctuation character in ASCII except `, \, $, @ and _
                MacroToken::Punctuator(_) => r#"[!"%#&'\(\)\*\+,\-\./:;<=>\[\]\?\^\{\|\}~]"#,
                MacroToken::WhiteSpace(_) => r"[^\S\n]+",
            };
            let entry = "^".to_string() + entry;
            v.push((token, Regex::new(&entry).unwrap()))
        }
        v
    };
}

impl MacroToken {
    fn instantiate(&self, text: &str) -> MacroToken {
        // fill in the matched text for tokens that carry it
        match self {
            MacroToken::Identifier(_) => MacroToken::Identifier(text.to_string()),
            MacroToken::Number(_) => MacroToken::Number(text.to_string()),
            MacroToken::CharacterConstant(_) => MacroToken::CharacterConstant(text.to_string()),
            MacroToken::StringLiteral(_) => MacroToken::StringLiteral(text.to_string()),
            // the parameter name without its leading '#'
            MacroToken::Stringify(_) => MacroToken::Stringify(text[1..].to_string()),
            MacroToken::Punctuator(_) => MacroToken::Punctuator(text.to_string()),
            MacroToken::WhiteSpace(_) => MacroToken::WhiteSpace(text.to_string()),
            _ => self.clone(),
        }
    }

    fn find_next(text: &str) -> (MacroToken, usize) {
        ALL_TOKENS
            .iter()
            .filter_map(|(possible_token, regex)| {
                regex
                    .find(text)
                    .map(|matched| (possible_token.clone(), matched.end()))
            })
            .max_by(|(token_a, end_a), (token_b, end_b)| {
                end_a.cmp(end_b).then_with(|| {
                    let token_a_precedence: usize =
                        (!matches!(token_a, MacroToken::Identifier(_))).into();
                    let token_b_precedence: usize =
                        (!matches!(token_b, MacroToken::Identifier(_))).into();
                    token_a_precedence.cmp(&token_b_precedence)
                })
            })
            // anything unexpected (`, \, $, @, stray bytes) passes through as
            // a one-character punctuator so macro parsing never gives up
            .unwrap_or_else(|| {
                let end = text.chars().next().map(|c| c.len_utf8()).unwrap_or(1);
                (MacroToken::Punctuator(String::new()), end)
            })
    }

    pub fn is_name(&self) -> bool {
        matches!(self, MacroToken::Identifier(_))
    }
}

pub fn lex(text: &str) -> Vec<MacroToken> {
    let mut tokens = Vec::new();
    let mut contents = text;

    while !contents.is_empty() {
        let (possible_token, end) = MacroToken::find_next(contents);
        tokens.push(possible_token.instantiate(&contents[..end]));
        contents = &contents[end..];
    }

    tokens
}

impl Display for MacroToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            MacroToken::Identifier(ref s)
            | MacroToken::Number(ref s)
            | MacroToken::CharacterConstant(ref s)
            | MacroToken::StringLiteral(ref s)
            | MacroToken::Punctuator(ref s)
            | MacroToken::WhiteSpace(ref s) => s.to_string(),
            MacroToken::Stringify(ref s) => format!("#{}", s),
            MacroToken::Paste => "##".to_string(),
            MacroToken::Ellipsis => "...".to_string(),
        };
        write!(f, "{}", str)
    }
}
