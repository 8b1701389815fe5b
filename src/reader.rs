use std::{error::Error, io::Read};

struct ByteStream<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl ByteStream<'_> {
    fn get(&mut self) -> Option<u8> {
        let ch = self.bytes.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    // newline handling: CRLF and lone CR both come out as LF
    fn read_char(&mut self) -> Option<u8> {
        let mut ch = self.get()?;
        if ch == b'\r' {
            ch = b'\n';
            if self.peek() == Some(b'\n') {
                self.get();
            }
        }
        Some(ch)
    }
}

/// Read the code into a string, performing simple cleanup: newline
/// canonicalization, comment stripping, whitespace collapse and
/// backslash-newline splicing. Line counts are preserved throughout.
pub fn read(input: &mut dyn Read) -> Result<String, Box<dyn Error>> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    Ok(read_bytes(&bytes))
}

fn read_bytes(bytes: &[u8]) -> String {
    let mut stream = ByteStream { bytes, pos: 0 };
    let mut code = String::new();

    // drop leading whitespace, spaces after ' ', '#' and '/'
    let mut ignore_space = true;

    // need space.. #if( => #if (
    let mut need_space = false;

    // backslash-newline handling: the <backslash><newline> itself is skipped,
    // and the suppressed newlines are re-added after the next real newline
    let mut newlines = 0usize;

    while let Some(mut ch) = stream.read_char() {
        // bytes outside ASCII are dropped here; they only survive inside
        // string and character literals, which are read below
        if ch >= 0x80 {
            continue;
        }

        // replace assorted special chars with spaces
        if ch != b'\n' && (ch.is_ascii_whitespace() || ch.is_ascii_control()) {
            ch = b' ';
        }

        if ch == b' ' && ignore_space {
            continue;
        }
        ignore_space = matches!(ch, b' ' | b'#' | b'/');

        if need_space {
            if ch == b'(' {
                code.push(' ');
            } else if !ch.is_ascii_alphabetic() {
                need_space = false;
            }
        }
        if ch == b'#' {
            need_space = true;
        }

        if ch == b'/' {
            match stream.read_char() {
                Some(b'/') => {
                    // the comment and its newline become a single newline
                    while let Some(next) = stream.read_char() {
                        if next == b'\n' {
                            break;
                        }
                    }
                    code.push('\n');
                }
                Some(b'*') => {
                    let mut ch_prev = 0u8;
                    let mut ch = b'/';
                    while !(ch_prev == b'*' && ch == b'/') {
                        ch_prev = ch;
                        match stream.read_char() {
                            Some(next) => {
                                ch = next;
                                if ch == b'\n' {
                                    code.push('\n');
                                }
                            }
                            None => break,
                        }
                    }
                    // the space rule applies to emitted slashes, not to the
                    // one that closed this comment
                    ignore_space = false;
                }
                Some(ch_next) => {
                    code.push('/');
                    code.push(ch_next as char);
                }
                None => code.push('/'),
            }
        } else if ch == b'"' || ch == b'\'' {
            // string or char constant, passed through verbatim
            code.push(ch as char);
            while let Some(ch_next) = stream.get() {
                if ch_next == b'\\' {
                    match stream.read_char() {
                        Some(b'\n') => newlines += 1,
                        Some(ch_seq) => {
                            code.push('\\');
                            code.push(ch_seq as char);
                        }
                        None => code.push('\\'),
                    }
                } else {
                    code.push(ch_next as char);
                    if ch_next == ch {
                        break;
                    }
                }
            }
        } else if ch == b'\\' {
            match stream.peek() {
                Some(b'\n') | Some(b'\r') => {
                    newlines += 1;
                    stream.read_char();
                }
                _ => code.push('\\'),
            }
        } else {
            code.push(ch as char);

            // flush newlines suppressed by <backslash><newline> sequences
            if ch == b'\n' && newlines > 0 {
                for _ in 0..newlines {
                    code.push('\n');
                }
                newlines = 0;
            }
        }
    }

    code
}

/// Remove every space that has a newline on either side of it.
pub fn remove_space_near_nl(str: &str) -> String {
    let chars: Vec<char> = str.chars().collect();
    let mut tmp = String::new();
    for (i, ch) in chars.iter().enumerate() {
        if *ch == ' ' && (tmp.ends_with('\n') || chars.get(i + 1) == Some(&'\n')) {
            continue;
        }
        tmp.push(*ch);
    }
    tmp
}

/// Rewrite `#if defined(X)` as `#ifdef X` so the configuration walk only
/// sees the simple directive forms. Lines where anything follows the close
/// paren are left alone and fall through as unknown directives.
pub fn replace_if_defined(str: &str) -> String {
    let mut ret = str.to_string();
    let mut pos = 0usize;
    while let Some(found) = ret[pos..].find("#if defined(") {
        let start = pos + found;
        let Some(close) = ret[start + 9..].find(')').map(|p| start + 9 + p) else {
            break;
        };
        if ret.as_bytes().get(close + 1) == Some(&b'\n') {
            ret.remove(close);
            ret.replace_range(start + 3..start + 12, "def ");
        }
        pos = start + 1;
    }
    ret
}

/// Tabs to spaces, leading indentation dropped, spaces next to newlines
/// dropped. Applied to the top-level file and to every included file.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = text.replace('\t', " ");
    if out.starts_with(' ') {
        let indent = out.find(|c| c != ' ').unwrap_or(out.len());
        out.replace_range(..indent, "");
    }
    remove_space_near_nl(&out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_str(text: &str) -> String {
        read(&mut text.as_bytes()).unwrap()
    }

    #[test]
    fn backslash_newline_splicing() {
        assert_eq!(read_str("A \\\nB\n"), "A B\n\n");
    }

    #[test]
    fn multiline_define_keeps_line_count() {
        let code = read_str("#define F(a) \\\n (a)\\\n+1\nx\n");
        assert_eq!(code, "#define F(a) (a)+1\n\n\nx\n");
        assert_eq!(code.matches('\n').count(), 4);
    }

    #[test]
    fn crlf_and_lone_cr_become_lf() {
        assert_eq!(read_str("a\r\nb\rc\n"), "a\nb\nc\n");
    }

    #[test]
    fn line_comment_replaced_with_newline() {
        assert_eq!(read_str("x // hi\ny\n"), "x \ny\n");
    }

    #[test]
    fn block_comment_preserves_interior_newlines() {
        assert_eq!(read_str("/* a \n b */ X\n"), "\n X\n");
    }

    #[test]
    fn block_comment_glues_adjacent_tokens() {
        assert_eq!(read_str("a/*x*/b\n"), "ab\n");
    }

    #[test]
    fn spaces_collapse_and_directives_get_separated() {
        assert_eq!(read_str("a   b\n"), "a b\n");
        assert_eq!(read_str("#  if(x)\n"), "#if (x)\n");
        assert_eq!(read_str("# ifdef A\n"), "#ifdef A\n");
    }

    #[test]
    fn leading_indentation_is_dropped() {
        assert_eq!(read_str("   x\n"), "x\n");
    }

    #[test]
    fn string_literals_pass_through_verbatim() {
        assert_eq!(read_str("\"a  b\\t\"\n"), "\"a  b\\t\"\n");
        assert_eq!(read_str("'\\n'\n"), "'\\n'\n");
    }

    #[test]
    fn backslash_newline_inside_literal_is_spliced() {
        assert_eq!(read_str("\"ab\\\ncd\"\nX\n"), "\"abcd\"\n\nX\n");
    }

    #[test]
    fn line_count_is_preserved() {
        let input = "int a;\\\nint b;\n/* c\nd */\ne // f\n";
        let output = read_str(input);
        assert_eq!(
            output.matches('\n').count(),
            input.matches('\n').count()
        );
    }

    #[test]
    fn remove_space_near_nl_drops_both_sides() {
        assert_eq!(remove_space_near_nl("a \nb\n c\n"), "a\nb\nc\n");
    }

    #[test]
    fn replace_if_defined_rewrites_simple_form() {
        assert_eq!(replace_if_defined("#if defined(X)\n"), "#ifdef X\n");
        assert_eq!(
            replace_if_defined("a\n#if defined(ABC)\nb\n"),
            "a\n#ifdef ABC\nb\n"
        );
    }

    #[test]
    fn replace_if_defined_leaves_compound_conditions() {
        let line = "#if defined(X) && defined(Y)\n";
        assert_eq!(replace_if_defined(line), line);
    }

    #[test]
    fn normalize_whitespace_cleans_tabs_and_indent() {
        assert_eq!(normalize_whitespace("\tx\n y \nz\n"), "x\ny\nz\n");
    }
}
