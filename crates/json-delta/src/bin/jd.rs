//! `jd` — structural diff of two JSON files.
//!
//! Usage:
//!   jd [-f ascii|delta] left.json right.json
//!
//! `ascii` (the default) prints an indented +/- listing; `delta` prints
//! the diff in the jsondiffpatch JSON format. No output means the two
//! documents are structurally equal.

use std::process;

use json_delta::{codec, AsciiFormatter, Differ};
use serde_json::Value;

fn usage() -> ! {
    eprintln!("Usage: jd [-f ascii|delta] left.json right.json");
    process::exit(1);
}

fn read_json(path: &str) -> Value {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Failed to load file '{path}': {e}");
            process::exit(2);
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Failed to parse file '{path}': {e}");
            process::exit(3);
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let mut format = "ascii".to_string();
    let mut files: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-f" | "--format" => {
                i += 1;
                match args.get(i) {
                    Some(f) => format = f.clone(),
                    None => usage(),
                }
            }
            other => files.push(other.to_string()),
        }
        i += 1;
    }
    if files.len() != 2 {
        usage();
    }

    let left = read_json(&files[0]);
    let right = read_json(&files[1]);

    let delta = match Differ::new().compare(&left, &right) {
        Some(delta) => delta,
        None => return, // no differences
    };

    match format.as_str() {
        "ascii" => match AsciiFormatter::new().format(&left, &delta) {
            Ok(text) => print!("{text}"),
            Err(e) => {
                eprintln!("Failed to format diff: {e}");
                process::exit(4);
            }
        },
        "delta" => match codec::to_value(&delta) {
            Ok(wire) => match serde_json::to_string_pretty(&wire) {
                Ok(text) => println!("{text}"),
                Err(e) => {
                    eprintln!("Failed to serialize diff: {e}");
                    process::exit(4);
                }
            },
            Err(e) => {
                eprintln!("Failed to serialize diff: {e}");
                process::exit(4);
            }
        },
        _ => usage(),
    }
}
