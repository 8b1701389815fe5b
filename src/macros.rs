use log::debug;

use crate::{
    error::{ErrorMessage, ErrorSink, FileLocation, Severity},
    lexer::{lex, MacroToken},
};

/// One `#define` record: the name, the ordered parameter list, the variadic
/// flag and the replacement body.
pub struct Macro {
    tokens: Vec<MacroToken>,
    params: Vec<String>,
    name: String,
    text: String,
    variadic: bool,
}

impl Macro {
    pub fn new(text: &str) -> Macro {
        // tokenize the macro to make it easier to handle
        let tokens: Vec<MacroToken> = lex(text)
            .into_iter()
            .filter(|t| !matches!(t, MacroToken::WhiteSpace(_)))
            .collect();

        let mut name = String::new();
        if let Some(MacroToken::Identifier(first)) = tokens.first() {
            name = first.clone();
        }

        let mut params = Vec::new();
        let mut variadic = false;

        // function-like only when the '(' hugs the macro name, and only when
        // at least one parameter name follows it
        let function_like = matches!(text.find([' ', '(']), Some(pos) if text.as_bytes()[pos] == b'(')
            && matches!(tokens.get(1), Some(MacroToken::Punctuator(p)) if p == "(")
            && matches!(tokens.get(2), Some(MacroToken::Identifier(_)));

        if function_like {
            let mut prev_was_name = false;
            let mut index = 2;
            while let Some(tok) = tokens.get(index) {
                match tok {
                    MacroToken::Punctuator(p) if p == ")" => break,
                    MacroToken::Ellipsis
                        if matches!(tokens.get(index + 1), Some(MacroToken::Punctuator(p)) if p == ")") =>
                    {
                        variadic = true;
                        // the anonymous form binds the tail to __VA_ARGS__;
                        // the GNU form "name..." binds the preceding name
                        if !prev_was_name {
                            params.push("__VA_ARGS__".to_string());
                        }
                        break;
                    }
                    MacroToken::Identifier(p) => {
                        params.push(p.clone());
                        prev_was_name = true;
                    }
                    _ => prev_was_name = false,
                }
                index += 1;
            }
        }

        Macro {
            tokens,
            params,
            name,
            text: text.to_string(),
            variadic,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn variadic(&self) -> bool {
        self.variadic
    }

    /// The replacement text for one invocation with the given arguments.
    pub fn code(&self, given: &[String]) -> String {
        if self.params.is_empty() {
            // object-like: everything after the space that follows the name
            return match self.text.find(' ') {
                Some(space) => {
                    let mut body = self.text[space + 1..].to_string();
                    if let Some(nl) = body.find(['\r', '\n']) {
                        body.truncate(nl);
                    }
                    body
                }
                None => String::new(),
            };
        }

        // function-like: emit the token stream that follows the close paren
        // of the parameter list
        let start = self
            .tokens
            .iter()
            .position(|t| matches!(t, MacroToken::Punctuator(p) if p == ")"))
            .map(|close| close + 1)
            .unwrap_or(self.tokens.len());

        let mut macrocode = String::new();
        let mut optcomma = false;
        let mut index = start;
        while let Some(tok) = self.tokens.get(index) {
            index += 1;

            if matches!(tok, MacroToken::Paste) {
                // "##" concatenates by simply dropping out of the text
                continue;
            }

            let mut str = tok.to_string();
            let name_and_stringify = match tok {
                MacroToken::Identifier(s) => Some((s, false)),
                MacroToken::Stringify(s) => Some((s, true)),
                _ => None,
            };
            if let Some((word, stringify)) = name_and_stringify {
                str = word.clone();
                for (position, param) in self.params.iter().enumerate() {
                    if word != param {
                        continue;
                    }
                    if self.variadic && position == self.params.len() - 1 {
                        // the tail parameter expands to the remaining
                        // arguments, comma-joined
                        str = String::new();
                        for (arg_index, arg) in
                            given.iter().enumerate().skip(self.params.len() - 1)
                        {
                            if optcomma || arg_index > self.params.len() - 1 {
                                str += ",";
                            }
                            optcomma = false;
                            str += arg;
                        }
                    } else if stringify {
                        str = format!("\"{}\"", given.get(position).cloned().unwrap_or_default());
                    } else {
                        str = given.get(position).cloned().unwrap_or_default();
                    }
                    break;
                }
            }

            // ", ## tail" suppresses the comma when the tail turns out empty
            if self.variadic
                && matches!(tok, MacroToken::Punctuator(p) if p == ",")
                && matches!(self.tokens.get(index), Some(MacroToken::Paste))
            {
                optcomma = true;
                continue;
            }
            optcomma = false;
            macrocode += &str;

            // keep adjacent names from gluing into one identifier
            if tok.is_name() && self.tokens.get(index).is_some_and(|t| t.is_name()) {
                macrocode += " ";
            }
        }

        macrocode
    }
}

fn find_first_of(code: &str, pattern: &[u8; 4], from: usize) -> Option<usize> {
    code.as_bytes()
        .iter()
        .skip(from)
        .position(|b| pattern.contains(b))
        .map(|found| found + from)
}

/// Search for `#define`s and expand them in everything that follows. Each
/// macro's scan stops at a later redefinition or `#undef` of its own name,
/// and never revisits its own replacement text. Afterwards every `#undef`
/// line is blanked.
pub fn expand_macros(
    mut code: String,
    filename: &str,
    error_logger: &mut dyn ErrorSink,
) -> String {
    let mut defpos = 0usize;
    while let Some(found) = code[defpos..].find("#define ") {
        defpos += found;

        // accept only defines that are at the start of a line
        if defpos > 0 && code.as_bytes()[defpos - 1] != b'\n' {
            defpos += 6;
            continue;
        }

        let endpos = match code[defpos + 6..].find('\n') {
            Some(nl) => defpos + 6 + nl,
            None => {
                code.truncate(defpos);
                break;
            }
        };

        // pull the whole macro out into its own record, then blank the line
        let mac = Macro::new(&code[defpos + 8..endpos]);
        code.replace_range(defpos..endpos, "");

        if mac.name().is_empty() {
            continue;
        }
        debug!("expanding macro {}", mac.name());

        // candidate positions are literal openers, '#' and the first
        // character of the macro name
        let pattern: [u8; 4] = [b'"', b'\'', b'#', mac.name().as_bytes()[0]];
        let mut pos1 = defpos;
        while let Some(candidate) = find_first_of(&code, &pattern, pos1 + 1) {
            pos1 = candidate;
            let ch = code.as_bytes()[pos1];

            if ch == b'#' {
                // a #undef or #define of the same name ends this scan
                if code[pos1..].starts_with("#undef ") {
                    pos1 += 7;
                } else if code[pos1..].starts_with("#define ") {
                    pos1 += 8;
                } else {
                    continue;
                }

                let after = pos1 + mac.name().len();
                if after < code.len()
                    && code[pos1..].starts_with(mac.name())
                    && !code.as_bytes()[after].is_ascii_alphanumeric()
                    && code.as_bytes()[after] != b'_'
                {
                    break;
                }
                continue;
            }

            if ch == b'"' || ch == b'\'' {
                // skip the literal
                pos1 += 1;
                loop {
                    if pos1 >= code.len() {
                        // end of file was reached without finding the pair
                        error_logger.report(ErrorMessage {
                            locations: vec![FileLocation {
                                file: filename.to_string(),
                                line: 0,
                            }],
                            severity: Severity::Error,
                            id: "noQuoteCharPair".to_string(),
                            message: format!(
                                "No pair for character ({}). Can't process file. \
                                 File is either invalid or unicode, which is currently not supported.",
                                ch as char
                            ),
                        });
                        return String::new();
                    }
                    let b = code.as_bytes()[pos1];
                    if b == ch {
                        break;
                    }
                    if b == b'\\' {
                        pos1 += 1;
                    }
                    pos1 += 1;
                }
                continue;
            }

            // matching the macro name?
            if !code[pos1..].starts_with(mac.name()) {
                continue;
            }

            // the characters on both sides must not extend the identifier
            if pos1 != 0 {
                let prev = code.as_bytes()[pos1 - 1];
                if prev.is_ascii_alphanumeric() || prev == b'_' {
                    continue;
                }
            }
            let mut pos2 = pos1 + mac.name().len();
            if pos2 < code.len() {
                let next = code.as_bytes()[pos2];
                if next.is_ascii_alphanumeric() || next == b'_' {
                    continue;
                }
            }

            if !mac.params().is_empty() && pos2 >= code.len() {
                continue;
            }

            let mut given: Vec<String> = Vec::new();
            let mut newline_count = 0usize;

            if !mac.params().is_empty() {
                if code.as_bytes()[pos2] != b'(' {
                    continue;
                }

                // paren-balanced split on top-level commas; spaces and
                // newlines are dropped, literals are copied verbatim
                let bytes = code.as_bytes();
                let mut parlevel = 0i32;
                let mut par = String::new();
                while pos2 < bytes.len() {
                    let c = bytes[pos2];
                    match c {
                        b'(' => {
                            parlevel += 1;
                            if parlevel == 1 {
                                pos2 += 1;
                                continue;
                            }
                        }
                        b')' => {
                            parlevel -= 1;
                            if parlevel <= 0 {
                                given.push(std::mem::take(&mut par));
                                break;
                            }
                        }
                        b'"' | b'\'' => {
                            par.push(c as char);
                            pos2 += 1;
                            while pos2 < bytes.len() && bytes[pos2] != c {
                                par.push(bytes[pos2] as char);
                                if bytes[pos2] == b'\\' && pos2 + 1 < bytes.len() {
                                    pos2 += 1;
                                    par.push(bytes[pos2] as char);
                                }
                                pos2 += 1;
                            }
                            if pos2 >= bytes.len() {
                                break;
                            }
                            par.push(bytes[pos2] as char);
                            pos2 += 1;
                            continue;
                        }
                        b'\n' => newline_count += 1,
                        _ => {}
                    }

                    if parlevel == 1 && c == b',' {
                        given.push(std::mem::take(&mut par));
                    } else if c == b' ' || c == b'\n' {
                        // dropped; the newlines are re-emitted in front of
                        // the expansion instead
                    } else if parlevel >= 1 {
                        par.push(c as char);
                    }
                    pos2 += 1;
                }
            }

            // same number of arguments, unless the macro is variadic
            if !mac.variadic() && given.len() != mac.params().len() {
                continue;
            }

            let macrocode = "\n".repeat(newline_count) + &mac.code(&given);

            let site_end = if mac.params().is_empty() {
                pos2
            } else {
                (pos2 + 1).min(code.len())
            };
            code.replace_range(pos1..site_end, &macrocode);

            // rescanning resumes at the end of the inserted text, so a macro
            // never expands inside its own replacement
            pos1 = (pos1 + macrocode.len()).saturating_sub(1);
        }
    }

    // blank out the #undef lines; their newlines stay so line counts hold
    let mut defpos = 0usize;
    while let Some(found) = code[defpos..].find("\n#undef ") {
        defpos += found + 1;
        let end = code[defpos..]
            .find('\n')
            .map(|nl| defpos + nl)
            .unwrap_or(code.len());
        code.replace_range(defpos..end, "");
    }

    code
}
