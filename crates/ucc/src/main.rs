// Copyright 2025 Diivanand Ramalingam
// Licensed under the Apache License, Version 2.0

use std::{env, fs, path::PathBuf, process};

use uc_codegen::{Codegen, Phase};
use uc_frontend::{analyze_program, lex, parse_program, Diagnostic};

struct Options {
    input: PathBuf,
    compile: bool,
    phase: Option<Phase>,
}

fn usage_and_exit() -> ! {
    eprintln!("Usage: ucc [-C] [--backend-phase=N] <file.uc>");
    eprintln!("  -C                  compile to C++ (frontend only without it)");
    eprintln!("  --backend-phase=N   stop the backend at phase N (1, 2, or 3)");
    process::exit(2);
}

fn parse_args() -> Options {
    let mut input = None;
    let mut compile = false;
    let mut phase = None;

    for arg in env::args().skip(1) {
        if arg == "-C" {
            compile = true;
        } else if let Some(n) = arg.strip_prefix("--backend-phase=") {
            let parsed = n.parse::<u32>().ok().and_then(Phase::from_number);
            match parsed {
                Some(p) => phase = Some(p),
                None => {
                    eprintln!("invalid backend phase: {n}");
                    usage_and_exit();
                }
            }
        } else if arg.starts_with('-') {
            eprintln!("unknown option: {arg}");
            usage_and_exit();
        } else if input.is_none() {
            input = Some(PathBuf::from(arg));
        } else {
            usage_and_exit();
        }
    }

    match input {
        Some(input) => Options { input, compile, phase },
        None => usage_and_exit(),
    }
}

fn print_diags(file: &str, diags: &[Diagnostic]) {
    for d in diags {
        eprintln!("{file}:{d}");
    }
}

/// The output lands next to the input: `.cpp` for the full backend, or
/// `_phase<N>.cpp` when a sub-phase was selected explicitly.
fn output_path(input: &PathBuf, phase: Option<Phase>) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
    let file_name = match phase {
        Some(p) => format!("{stem}_phase{}.cpp", p.number()),
        None => format!("{stem}.cpp"),
    };
    input.with_file_name(file_name)
}

fn run(opts: &Options) -> i32 {
    let file = opts.input.display().to_string();
    let source = match fs::read_to_string(&opts.input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("failed to read {file}: {e}");
            return 1;
        }
    };

    let toks = match lex(&source) {
        Ok(toks) => toks,
        Err(diag) => {
            print_diags(&file, &[diag]);
            return 1;
        }
    };

    let mut program = match parse_program(&toks) {
        Ok(program) => program,
        Err(diags) => {
            print_diags(&file, &diags);
            return 1;
        }
    };

    let analysis = match analyze_program(&mut program) {
        Ok(analysis) => analysis,
        Err(diags) => {
            print_diags(&file, &diags);
            return 1;
        }
    };

    if opts.compile {
        let phase = opts.phase.unwrap_or(Phase::Full);
        let cg = Codegen::new(&analysis.table, phase);
        let text = cg.generate(&program);
        let out = output_path(&opts.input, opts.phase);
        if let Err(e) = fs::write(&out, text) {
            eprintln!("failed to write {}: {e}", out.display());
            return 1;
        }
    }

    0
}

fn main() {
    let opts = parse_args();
    process::exit(run(&opts));
}
