//! Jack compiler CLI.
//!
//! Takes one path. A `.jack` file compiles to a sibling `.vm` file; a
//! directory compiles every `.jack` file directly inside it.

#![warn(clippy::all, clippy::pedantic)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use jack_compiler::compile_source;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <input.jack | directory>", args[0]);
        process::exit(1);
    }

    if let Err(e) = run(Path::new(&args[1])) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(path: &Path) -> Result<()> {
    for input in collect_inputs(path)? {
        let source = fs::read_to_string(&input)?;
        let vm = compile_source(&source)
            .map_err(|e| format!("{}: {e}", input.display()))?;
        let output = input.with_extension("vm");
        fs::write(&output, vm)?;
        println!("Compiled {} -> {}", input.display(), output.display());
    }
    Ok(())
}

fn collect_inputs(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut inputs: Vec<PathBuf> = fs::read_dir(path)?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "jack"))
        .collect();
    inputs.sort();

    if inputs.is_empty() {
        return Err(format!("no .jack files in {}", path.display()).into());
    }
    Ok(inputs)
}
