use std::{env, fs};

use cfgpp::{preprocess, CollectedErrors};

fn main() {
    let env = env_logger::Env::default().filter_or("CFGPP_LOG", "warn");
    env_logger::init_from_env(env);

    let args: Vec<String> = env::args().collect();
    let mut filenames = Vec::new();
    let mut include_paths = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            t if t.len() > 2 && &t[..2] == "-I" => {
                let mut path = t[2..].to_string();
                if !path.ends_with('/') {
                    path.push('/');
                }
                include_paths.push(path);
            }
            t if t.starts_with('-') => panic!("unrecognised flag: {}", t),
            _ => filenames.push(arg.clone()),
        }
    }
    if filenames.is_empty() {
        panic!("must specify a file name")
    }

    for filename in &filenames {
        let mut file = fs::File::open(filename)
            .unwrap_or_else(|err| panic!("could not open {}: {}", filename, err));

        let mut errors = CollectedErrors::default();
        let result = preprocess(&mut file, filename, &include_paths, &mut errors);
        match result {
            Ok(expanded) => {
                let mut configs: Vec<&String> = expanded.keys().collect();
                configs.sort();
                for cfg in configs {
                    println!("### configuration \"{}\"", cfg);
                    println!("{}", expanded[cfg]);
                }
            }
            Err(err) => panic!("preprocessing {} failed: {}", filename, err),
        }

        for message in &errors.0 {
            eprintln!("{}", message);
        }
    }
}
