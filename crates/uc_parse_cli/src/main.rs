// Copyright 2025 Diivanand Ramalingam
// Licensed under the Apache License, Version 2.0

use std::{env, fs, process};

use uc_frontend::{lex, parse_program};

fn usage_and_exit() -> ! {
    eprintln!("Usage: uc_parse_cli <file1.uc> <file2.uc> ...");
    eprintln!("Example: uc_parse_cli tests/default.uc");
    process::exit(2);
}

fn main() {
    let mut args = env::args();
    let _bin = args.next();

    let paths: Vec<String> = args.collect();
    if paths.is_empty() {
        usage_and_exit();
    }

    // Each file is an independent uC program; dump the untyped AST of
    // every one in turn.
    for path in &paths {
        let src = fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("Failed to read {path}: {e}");
            process::exit(2);
        });

        let toks = lex(&src).unwrap_or_else(|e| {
            eprintln!("{path}:{e}");
            process::exit(1);
        });

        let prog = parse_program(&toks).unwrap_or_else(|errs| {
            eprintln!("Parse errors:");
            for e in errs {
                eprintln!("  {path}:{e}");
            }
            process::exit(1);
        });

        println!("{prog:#?}");
    }
}
