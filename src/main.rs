// ccall: call one C function out of a source file without compiling it

use std::fs;
use std::path::Path;

use ccall::translator::{HostArg, Translator};
use ccall::Value;

fn main() {
    // Parse command-line arguments
    let args: Vec<String> = std::env::args().collect();
    let program_name = args.first().map(|s| s.as_str()).unwrap_or("ccall");

    if args.len() < 3 {
        eprintln!("Usage: {} <file.c> <function> [int-args...]", program_name);
        eprintln!();
        eprintln!("Options:");
        eprintln!("  --dump    print the function's translated listing instead of calling it");
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  {} math.c add 3 4", program_name);
        eprintln!("  {} math.c add --dump", program_name);
        std::process::exit(1);
    }

    let source_file = &args[1];
    let function = &args[2];
    let dump = args.iter().any(|a| a == "--dump");

    if !Path::new(source_file).exists() {
        eprintln!("Error: File '{}' not found", source_file);
        std::process::exit(1);
    }

    let source = match fs::read_to_string(source_file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: cannot read '{}': {}", source_file, e);
            std::process::exit(1);
        }
    };

    let mut session = match Translator::from_source(&source) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if dump {
        match session.dump_source(function) {
            Ok(listing) => print!("{}", listing),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let mut call_args = Vec::new();
    for raw in &args[3..] {
        if raw == "--dump" {
            continue;
        }
        match raw.parse::<i128>() {
            Ok(v) => call_args.push(HostArg::Int(v)),
            Err(_) => {
                call_args.push(HostArg::Str(raw.clone()));
            }
        }
    }

    match session.invoke(function, &call_args) {
        Ok(value) => match &value {
            Value::Struct(_) => println!("{:?}", value),
            Value::Unit => {}
            scalar => match scalar.raw() {
                Ok(raw) => println!("{}", raw),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            },
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
