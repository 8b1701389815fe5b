//! End-to-end tests over the whole pipeline: normalization, include
//! splicing, configuration discovery, materialization and macro expansion
//! working against each other the way a tool driver uses them.

use std::{env, fs, path::PathBuf};

use cfgpp::{
    enumerate_configs, expand_macros, materialize, preprocess, scan_configurations,
    CollectedErrors,
};

fn fixture_dir(name: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("cfgpp_pipeline_{}", name));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn run(source: &str) -> std::collections::HashMap<String, String> {
    let mut errors = CollectedErrors::default();
    let result = preprocess(&mut source.as_bytes(), "test.c", &[], &mut errors).unwrap();
    assert!(errors.0.is_empty(), "unexpected diagnostics: {:?}", errors.0);
    result
}

#[test]
fn base_configuration_is_always_present() {
    let result = run("int a;\n");
    assert_eq!(result.len(), 1);
    assert_eq!(result[""], "int a;\n");
}

#[test]
fn one_output_per_configuration() {
    let source = "#ifdef A\nint a;\n#else\nint b;\n#endif\n";
    let result = run(source);

    let mut configs: Vec<&String> = result.keys().collect();
    configs.sort();
    assert_eq!(configs, ["", "A"]);

    assert_eq!(result[""], "\n\n\nint b;\n\n");
    assert_eq!(result["A"], "\nint a;\n\n\n\n");
}

#[test]
fn macros_expand_in_every_configuration() {
    let source = "\
#define SIZE 10
#ifdef A
int a[SIZE];
#else
int b[SIZE];
#endif
";
    let result = run(source);

    assert_eq!(result[""], "\n\n\n\nint b[10];\n\n");
    assert_eq!(result["A"], "\n\nint a[10];\n\n\n\n");
}

#[test]
fn defines_survive_inactive_branches_and_shadow_in_order() {
    // #define lines are kept in every configuration; the last one before a
    // use wins, whichever branch it sat under
    let source = "\
#ifdef UNICODE
#define CHARTYPE wchar_t
#else
#define CHARTYPE char
#endif
CHARTYPE *p;
";
    let result = run(source);

    assert_eq!(result[""].lines().last(), Some("char *p;"));
    assert_eq!(result["UNICODE"].lines().last(), Some("char *p;"));
}

#[test]
fn defines_guarded_by_the_other_branch_still_win_in_order() {
    // both #define lines survive materialization; the later one shadows the
    // earlier for the code that follows it
    let source = "#define T int\n#define T long\nT x;\n";
    let result = run(source);
    assert_eq!(result[""], "\n\nlong x;\n");
}

#[test]
fn includes_are_spliced_and_framed() {
    let dir = fixture_dir("includes");
    fs::write(dir.join("types.h"), "#define BYTE unsigned char\n").unwrap();
    let source_path = dir.join("main.c");
    fs::write(&source_path, "#include \"types.h\"\nBYTE b;\n").unwrap();

    let mut file = fs::File::open(&source_path).unwrap();
    let filename = source_path.display().to_string();
    let (text, configs) = scan_configurations(&mut file, &filename, &[]).unwrap();

    assert_eq!(configs, [""]);
    assert!(text.starts_with("#file \""));
    assert!(text.contains("#endfile"));

    let mut errors = CollectedErrors::default();
    let expanded = expand_macros(materialize(&text, ""), &filename, &mut errors);
    assert!(expanded.contains("unsigned char b;"));
}

#[test]
fn header_conditionals_do_not_widen_the_configuration_set() {
    let dir = fixture_dir("header_cfg");
    fs::write(
        dir.join("guard.h"),
        "#ifndef GUARD_H\n#define GUARD_H\nint g;\n#endif\n",
    )
    .unwrap();
    let source_path = dir.join("main.c");
    fs::write(
        &source_path,
        "#include \"guard.h\"\n#ifdef A\nint a;\n#endif\n",
    )
    .unwrap();

    let mut file = fs::File::open(&source_path).unwrap();
    let filename = source_path.display().to_string();
    let (_, configs) = scan_configurations(&mut file, &filename, &[]).unwrap();

    assert_eq!(configs, ["", "A"]);
}

#[test]
fn if_defined_is_discovered_like_ifdef() {
    let source = "#if defined(FOO)\nint a;\n#endif\n";
    let result = run(source);

    let mut configs: Vec<&String> = result.keys().collect();
    configs.sort();
    assert_eq!(configs, ["", "FOO"]);
    assert_eq!(result["FOO"], "\nint a;\n\n");
}

#[test]
fn multiline_macro_keeps_following_lines_in_place() {
    let source = "#define MAX(a,b) \\\n ((a) > (b) ? (a) : (b))\nint m = MAX(x, y);\nint z;\n";
    let result = run(source);

    let output = &result[""];
    assert_eq!(
        output.matches('\n').count(),
        4,
        "line count must survive splicing and expansion: {:?}",
        output
    );
    assert!(output.contains("int m = ((x)>(y)?(x):(y));"));
    assert_eq!(output.lines().last(), Some("int z;"));
}

#[test]
fn materialization_preserves_line_count_for_every_configuration() {
    let source = "\
#ifdef A
int a;
#elif B
int b;
#else
int c;
#endif
#ifndef A
int d;
#endif
";
    let mut errors = CollectedErrors::default();
    let (text, configs) =
        scan_configurations(&mut source.as_bytes(), "test.c", &[]).unwrap();
    let lf_count = text.matches('\n').count();
    for cfg in &configs {
        let materialized = materialize(&text, cfg);
        assert_eq!(materialized.matches('\n').count(), lf_count, "cfg {:?}", cfg);
        let expanded = expand_macros(materialized, "test.c", &mut errors);
        assert_eq!(expanded.matches('\n').count(), lf_count, "cfg {:?}", cfg);
    }
    assert!(errors.0.is_empty());
}

#[test]
fn enumerate_configs_always_starts_with_the_base() {
    for source in [
        "",
        "int a;\n",
        "#ifdef A\n#endif\n",
        "#if 0\nx\n#endif\n",
    ] {
        assert_eq!(enumerate_configs(source).first().map(String::as_str), Some(""));
    }
}

#[test]
fn comments_and_continuations_wash_out_before_discovery() {
    let source = "// header\n#ifdef A /* arm A */\nint a;\n#endif\n";
    let result = run(source);

    let mut configs: Vec<&String> = result.keys().collect();
    configs.sort();
    assert_eq!(configs, ["", "A"]);
}

#[test]
fn unterminated_literal_surfaces_one_diagnostic() {
    let mut errors = CollectedErrors::default();
    let source = "#define A 1\nchar c = 'x;\n";
    let result = preprocess(&mut source.as_bytes(), "bad.c", &[], &mut errors).unwrap();

    assert_eq!(result[""], "");
    assert_eq!(errors.0.len(), 1);
    assert_eq!(errors.0[0].id, "noQuoteCharPair");
}
