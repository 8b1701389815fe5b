use std::{collections::HashSet, fs};

use log::debug;

use crate::reader;

// The text between the first pair of double quotes, empty if there is none.
// Angle-bracket includes therefore resolve to nothing and are skipped.
fn header_file_name(str: &str) -> String {
    let Some(open) = str.find('"') else {
        return String::new();
    };
    str[open + 1..]
        .chars()
        .take_while(|c| *c != '"')
        .collect()
}

/// Splice every top-of-line `#include "NAME"` directive in place, framing
/// the inserted text with `#file "PATH"` / `#endfile` sentinels. Headers are
/// looked up through each include path prefix in order, then next to the
/// including file. Headers that cannot be opened are skipped silently; the
/// directive line is blanked either way.
pub fn handle_includes(code: &mut String, filename: &str, include_paths: &[String]) {
    // directory of the top-level file, used as the fallback lookup
    let path = match filename.rfind(['/', '\\']) {
        Some(sep) => &filename[..sep + 1],
        None => "",
    };

    let mut pos = 0usize;
    // filenames are case-folded so a header including itself is spliced only
    // once; this over-approximates the include-guard idiom
    let mut handled_files: HashSet<String> = HashSet::new();

    while let Some(found) = code[pos..].find("#include") {
        pos += found;

        // accept only includes that are at the start of a line
        if pos > 0 && code.as_bytes()[pos - 1] != b'\n' {
            pos += 8;
            continue;
        }

        let end = code[pos..]
            .find('\n')
            .map(|nl| pos + nl)
            .unwrap_or(code.len());
        let directive = code[pos..end].to_string();

        // remove the #include clause, keeping its newline
        code.replace_range(pos..end, "");

        let header = header_file_name(&directive);
        if header.is_empty() {
            continue;
        }

        if !handled_files.insert(header.to_lowercase()) {
            // already spliced once, skip to avoid looping forever
            continue;
        }

        let mut resolved = String::new();
        let mut processed = String::new();
        for prefix in include_paths {
            let candidate = format!("{}{}", prefix, header);
            if let Ok(mut file) = fs::File::open(&candidate) {
                if let Ok(text) = reader::read(&mut file) {
                    resolved = candidate;
                    processed = text;
                }
                break;
            }
        }
        if processed.is_empty() {
            let candidate = format!("{}{}", path, header);
            if let Ok(mut file) = fs::File::open(&candidate) {
                if let Ok(text) = reader::read(&mut file) {
                    resolved = candidate;
                    processed = text;
                }
            }
        }

        if processed.is_empty() {
            debug!("header {} not found, skipping", header);
            continue;
        }

        debug!("splicing {} at offset {}", resolved, pos);
        let framed = format!(
            "#file \"{}\"\n{}\n#endfile",
            resolved,
            reader::normalize_whitespace(&processed)
        );
        // scanning resumes at the insertion point, so includes inside the
        // inserted text are walked as well
        code.insert_str(pos, &framed);
    }
}
