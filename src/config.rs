use itertools::Itertools;
use log::trace;

// Get the DEF in this line: "#ifdef DEF". With def set, the line must be an
// "#ifdef", "#if" or "#elif"; without it, an "#ifndef". The result is the
// rest of the line with every space squeezed out.
pub(crate) fn get_def(line: &str, def: bool) -> String {
    if def
        && !line.starts_with("#ifdef ")
        && !line.starts_with("#if ")
        && !line.starts_with("#elif ")
    {
        return String::new();
    }
    if !def && !line.starts_with("#ifndef ") {
        return String::new();
    }

    let rest = match line.find(' ') {
        Some(space) => &line[space..],
        None => "",
    };
    rest.chars().filter(|c| *c != ' ').collect()
}

/// Walk the conditional directives and collect every distinct configuration
/// the code admits. The base configuration "" always comes first. Directives
/// inside `#file` / `#endfile` frames are ignored, so included headers never
/// widen the configuration set.
pub fn enumerate_configs(filedata: &str) -> Vec<String> {
    let mut ret = vec![String::new()];

    let mut deflist: Vec<String> = Vec::new();

    // how deep into included files the walk currently is. 0 is the source
    // file itself, 1 a header included by it, and so on
    let mut file_level = 0u32;

    for line in filedata.lines() {
        if line.starts_with("#file ") {
            file_level += 1;
            continue;
        }
        if line == "#endfile" {
            if file_level > 0 {
                file_level -= 1;
            }
            continue;
        }
        if file_level > 0 {
            continue;
        }

        let def = get_def(line, true) + &get_def(line, false);
        if !def.is_empty() {
            if !deflist.is_empty() && line.starts_with("#elif ") {
                deflist.pop();
            }
            deflist.push(def);

            // "1" entries hold in every configuration and drop out of the
            // name; a "0" entry means the whole branch is dead
            if !deflist.iter().any(|d| d.as_str() == "0") {
                let cfg = deflist.iter().filter(|d| d.as_str() != "1").join(";");
                if !ret.contains(&cfg) {
                    trace!("discovered configuration {:?}", cfg);
                    ret.push(cfg);
                }
            }
        }

        if line.starts_with("#else") && !deflist.is_empty() {
            // record the complement of the branch we just left
            let flipped = if deflist.last().map(|d| d.as_str()) == Some("1") {
                "0"
            } else {
                "1"
            };
            *deflist.last_mut().unwrap() = flipped.to_string();
        }

        if line.starts_with("#endif") && !deflist.is_empty() {
            deflist.pop();
        }
    }

    ret
}

/// Does configuration `cfg` satisfy the directive name `def`? The names "0"
/// and "1" are the always-false and always-true constants.
pub fn match_cfg_def(cfg: &str, def: &str) -> bool {
    if def == "0" {
        return false;
    }
    if def == "1" {
        return true;
    }
    if cfg.is_empty() {
        return false;
    }
    cfg.split(';').any(|part| part == def)
}

/// Produce the text that belongs to one configuration. Lines outside the
/// configuration are blanked, never deleted, and all directives except
/// `#define`, `#file` and `#endfile` are stripped, so every line keeps its
/// original number.
pub fn materialize(filedata: &str, cfg: &str) -> String {
    let mut ret = String::new();

    let mut matches = true;
    let mut matching_ifdef: Vec<bool> = Vec::new();
    let mut matched_ifdef: Vec<bool> = Vec::new();

    for line in filedata.lines() {
        let def = get_def(line, true);
        let ndef = get_def(line, false);

        if line.starts_with("#elif ") {
            if let (Some(matching), Some(matched)) =
                (matching_ifdef.last_mut(), matched_ifdef.last_mut())
            {
                if *matched {
                    *matching = false;
                } else if match_cfg_def(cfg, &def) {
                    *matching = true;
                    *matched = true;
                }
            }
        } else if !def.is_empty() {
            matching_ifdef.push(match_cfg_def(cfg, &def));
            matched_ifdef.push(*matching_ifdef.last().unwrap());
        } else if !ndef.is_empty() {
            matching_ifdef.push(!match_cfg_def(cfg, &ndef));
            matched_ifdef.push(*matching_ifdef.last().unwrap());
        } else if line == "#else" {
            if let (Some(matching), Some(matched)) =
                (matching_ifdef.last_mut(), matched_ifdef.last())
            {
                *matching = !*matched;
            }
        } else if line.starts_with("#endif") {
            matched_ifdef.pop();
            matching_ifdef.pop();
        }

        if line.starts_with('#') {
            matches = matching_ifdef.iter().all(|m| *m);
        }

        let line = if line.starts_with("#file \"")
            || line.starts_with("#endfile")
            || line.starts_with("#define")
        {
            // #file tags and #define lines must stay or line numbers are
            // corrupted; the sentinels are removed by the tokenizer later
            line
        } else if !matches || line.starts_with('#') {
            ""
        } else {
            line
        };

        ret.push_str(line);
        ret.push('\n');
    }

    ret
}
