use std::fs;
use std::process;

use anyhow::Context;
use clap::{App, Arg};
use log::info;

use zasm::{parse, LeniencyLevel, ParseOptions};

const EXIT_DIAGNOSTICS: i32 = 1;
const EXIT_FAILURE: i32 = 2;

fn main() {
    env_logger::init();

    let matches = App::new("zasm")
        .version(clap::crate_version!())
        .about("Parses Z80 assembly and reports problems")
        .arg(Arg::with_name("INPUT")
            .help("Source file to parse")
            .required(true)
            .index(1))
        .arg(Arg::with_name("lenient")
            .long("lenient")
            .help("Let a repeated label definition replace the earlier one"))
        .arg(Arg::with_name("format")
            .long("format")
            .takes_value(true)
            .possible_values(&["plain", "snippet"])
            .default_value("plain")
            .help("How to print diagnostics"))
        .arg(Arg::with_name("dump-ir")
            .long("dump-ir")
            .help("Print the parsed labels and instructions"))
        .get_matches();

    let config = Config {
        input: matches.value_of("INPUT").unwrap_or_default().to_string(),
        options: ParseOptions {
            leniency: if matches.is_present("lenient") { LeniencyLevel::Lenient } else { LeniencyLevel::Strict },
        },
        snippets: matches.value_of("format") == Some("snippet"),
        dump_ir: matches.is_present("dump-ir"),
    };

    match run(&config) {
        Ok(true) => {}
        Ok(false) => process::exit(EXIT_DIAGNOSTICS),
        Err(error) => {
            eprintln!("error: {:#}", error);
            process::exit(EXIT_FAILURE);
        }
    }
}

struct Config {
    input: String,
    options: ParseOptions,
    snippets: bool,
    dump_ir: bool,
}

/// Returns whether the input parsed without diagnostics.
fn run(config: &Config) -> anyhow::Result<bool> {
    let source = fs::read_to_string(&config.input)
        .with_context(|| format!("could not read {}", config.input))?;
    let parsed = parse(&source, config.options);
    info!("{}: {} nodes, {} diagnostics", config.input, parsed.nodes.len(), parsed.diagnostics.len());

    if config.dump_ir {
        for node in &parsed.nodes {
            println!("{}", node);
        }
    }

    for diagnostic in &parsed.diagnostics {
        if config.snippets {
            eprintln!("{}", diagnostic.render_snippet(Some(config.input.as_str()), true));
        } else {
            eprintln!("{}", diagnostic);
        }
    }

    Ok(!parsed.has_errors())
}
