//! VM translator CLI.
//!
//! Takes one path. A `.vm` file translates to a sibling `.asm` file,
//! with bootstrap only when the file defines `Sys.init`. A directory
//! translates every `.vm` file inside into a single `<dir>/<dir>.asm`
//! led by the bootstrap prelude.

#![warn(clippy::all, clippy::pedantic)]

use std::env;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process;

use vm_translator::{defines_sys_init, translate_program};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <input.vm | directory>", args[0]);
        process::exit(1);
    }

    if let Err(e) = run(Path::new(&args[1])) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(path: &Path) -> Result<()> {
    let (inputs, output, bootstrap) = plan(path)?;

    let mut files = Vec::with_capacity(inputs.len());
    for input in &inputs {
        files.push((file_stem(input)?, fs::read_to_string(input)?));
    }
    let files: Vec<(&str, &str)> = files
        .iter()
        .map(|(stem, source)| (stem.as_str(), source.as_str()))
        .collect();

    let writer = BufWriter::with_capacity(8192, File::create(&output)?);
    translate_program(&files, bootstrap, writer)?;

    println!("Translated {} -> {}", path.display(), output.display());
    Ok(())
}

/// Decides what to translate, where to put it, and whether the result
/// needs the bootstrap prelude.
fn plan(path: &Path) -> Result<(Vec<PathBuf>, PathBuf, bool)> {
    if path.is_dir() {
        let mut inputs: Vec<PathBuf> = fs::read_dir(path)?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "vm"))
            .collect();
        inputs.sort();

        if inputs.is_empty() {
            return Err(format!("no .vm files in {}", path.display()).into());
        }
        let dir_name = path
            .file_name()
            .ok_or("cannot name output after directory")?
            .to_string_lossy();
        let output = path.join(format!("{dir_name}.asm"));
        Ok((inputs, output, true))
    } else {
        let source = fs::read_to_string(path)?;
        let bootstrap = defines_sys_init(&source);
        let output = path.with_extension("asm");
        Ok((vec![path.to_path_buf()], output, bootstrap))
    }
}

fn file_stem(path: &Path) -> Result<String> {
    Ok(path
        .file_stem()
        .ok_or_else(|| format!("input has no file stem: {}", path.display()))?
        .to_string_lossy()
        .into_owned())
}
