//! `jp` — apply a jsondiffpatch-format delta to a JSON document.
//!
//! Usage:
//!   jp delta.json document.json
//!
//! Prints the patched document.

use std::process;

use json_delta::{apply_delta, codec};
use serde_json::Value;

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
    if args.len() != 3 {
        eprintln!("Usage: jp delta.json document.json");
        process::exit(1);
    }

    let wire = read_json(&args[1]);
    let delta = match codec::from_value(&wire) {
        Ok(delta) => delta,
        Err(e) => {
            eprintln!("Failed to load diff file '{}': {e}", args[1]);
            process::exit(2);
        }
    };

    let document = read_json(&args[2]);
    match apply_delta(document, &delta) {
        Ok(patched) => match serde_json::to_string_pretty(&patched) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Failed to serialize result: {e}");
                process::exit(4);
            }
        },
        Err(e) => {
            eprintln!("Failed to apply patch: {e}");
            process::exit(4);
        }
    }
}
