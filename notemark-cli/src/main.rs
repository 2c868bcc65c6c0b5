// Command-line interface for notemark
//
// This binary converts note documents between Markdown and the JSON document
// tree, normalizes Markdown, and exposes the converter's internal stages for
// inspection. All file I/O lives here; the notemark library never touches
// the filesystem.
//
// Usage:
//  notemark <input> --to <format> [--from <format>] [--output <file>]  - Convert (default)
//  notemark convert <input> --to <format> [--from <format>] [--output <file>]
//  notemark format <input>                  - Re-serialize Markdown canonically
//  notemark inspect <path> [<transform>]    - Show a pipeline stage (defaults to "tree-outline")
//  notemark --list-transforms               - List transforms and formats
//
// Extra Parameters:
//
// Configuration knobs can be overridden per run with --extra-<key> <value>,
// e.g. `notemark format notes.md --extra-bullet-marker '*'`.

mod transforms;

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use flexi_logger::{Logger, LoggerHandle};
use log::{debug, warn};
use notemark::{FormatRegistry, MarkdownFormat};
use notemark_config::{Loader, NotemarkConfig};
use std::collections::HashMap;
use std::fs;

/// Parse extra-* arguments from command line args
/// Returns (cleaned_args_without_extras, extra_params_map)
///
/// Supports both:
/// - `--extra-<key> <value>` (explicit value)
/// - `--extra-<key>` (boolean flag, defaults to "true")
fn parse_extra_args(args: &[String]) -> (Vec<String>, HashMap<String, String>) {
    let mut cleaned_args = Vec::new();
    let mut extra_params = HashMap::new();
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];

        if let Some(key) = arg.strip_prefix("--extra-") {
            // a bare `-` is a bullet value, not a flag
            let has_value = args
                .get(i + 1)
                .is_some_and(|next| next == "-" || !next.starts_with('-'));

            if has_value {
                extra_params.insert(key.to_string(), args[i + 1].clone());
                i += 2;
            } else {
                extra_params.insert(key.to_string(), "true".to_string());
                i += 1;
            }
            continue;
        }

        cleaned_args.push(arg.clone());
        i += 1;
    }

    (cleaned_args, extra_params)
}

fn build_cli() -> Command {
    Command::new("notemark")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert notes between Markdown and the JSON document tree")
        .long_about(
            "notemark converts note documents between Markdown (with task keywords,\n\
            [HH:MM] timestamps and [[note links]]) and a JSON document tree.\n\n\
            Commands:\n  \
            - convert: Transform between formats (markdown, json)\n  \
            - format:  Re-serialize Markdown in canonical form\n  \
            - inspect: View pipeline stages (tokens, tree)\n\n\
            Extra Parameters:\n  \
            Use --extra-<name> [value] to override configuration knobs.\n\n\
            Examples:\n  \
            notemark notes.md --to json                 # Markdown to JSON (stdout)\n  \
            notemark tree.json --to markdown -o out.md  # JSON to Markdown file\n  \
            notemark format notes.md                    # Canonical Markdown\n  \
            notemark inspect notes.md token-simple      # Token stream",
        )
        .arg_required_else_help(true)
        .subcommand_required(false)
        .arg(
            Arg::new("list-transforms")
                .long("list-transforms")
                .help("List available transforms")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to a notemark.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .subcommand(
            Command::new("inspect")
                .about("Inspect the converter's internal stages")
                .long_about(
                    "View a Markdown file at different processing stages.\n\n\
                    Transforms (stage-format):\n  \
                    - token-simple:  Token stream, one token per line\n  \
                    - token-count:   Token totals per kind\n  \
                    - tree-outline:  Document tree outline (default)\n  \
                    - tree-json:     Document tree as JSON\n  \
                    - markdown:      Canonical re-serialization",
                )
                .arg(
                    Arg::new("path")
                        .help("Path to the Markdown file")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("transform")
                        .help("Transform to apply (stage-format). Defaults to 'tree-outline'")
                        .required(false)
                        .value_parser(clap::builder::PossibleValuesParser::new(
                            transforms::AVAILABLE_TRANSFORMS,
                        ))
                        .index(2)
                        .value_hint(ValueHint::Other),
                ),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert between document formats (default command)")
                .long_about(
                    "Convert documents between formats.\n\n\
                    Supported formats:\n  \
                    - markdown: Markdown with note extensions (.md, .markdown)\n  \
                    - json:     JSON document tree (.json)\n\n\
                    The source format is auto-detected from the file extension.\n\
                    Output goes to stdout by default, or use -o to specify a file.",
                )
                .arg(
                    Arg::new("input")
                        .help("Input file path")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("from")
                        .long("from")
                        .help("Source format (auto-detected from file extension if not specified)")
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .help("Target format (required)")
                        .required(true)
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Output file path (defaults to stdout)")
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("format")
                .about("Format a Markdown file")
                .long_about(
                    "Parse a Markdown file and re-serialize it in canonical form:\n\
                    configured bullets and fences, uppercase task keywords,\n\
                    zero-padded timestamps.\n\n\
                    Output is always written to stdout.",
                )
                .arg(
                    Arg::new("input")
                        .help("Input file path")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                ),
        )
}

/// RUST_LOG wins over the default level; output goes to stderr.
fn init_logging() -> Option<LoggerHandle> {
    Logger::try_with_env_or_str("warn")
        .and_then(|logger| logger.log_to_stderr().start())
        .map_err(|err| eprintln!("Warning: logging disabled: {err}"))
        .ok()
}

fn main() {
    let _logger = init_logging();

    let args: Vec<String> = std::env::args().collect();
    let (cleaned_args, extra_params) = parse_extra_args(&args);

    let cli = build_cli();
    let matches = match cli.clone().try_get_matches_from(&cleaned_args) {
        Ok(m) => m,
        Err(e) => {
            // `notemark notes.md --to json`: a file where a subcommand was expected
            if cleaned_args.len() > 1
                && !cleaned_args[1].starts_with('-')
                && !["inspect", "convert", "format", "help"].contains(&cleaned_args[1].as_str())
            {
                let mut new_args = vec![cleaned_args[0].clone(), "convert".to_string()];
                new_args.extend_from_slice(&cleaned_args[1..]);
                match cli.try_get_matches_from(&new_args) {
                    Ok(m) => m,
                    Err(e2) => e2.exit(),
                }
            } else {
                e.exit();
            }
        }
    };

    if matches.get_flag("list-transforms") {
        handle_list_transforms_command();
        return;
    }

    let config = load_cli_config(
        matches.get_one::<String>("config").map(|s| s.as_str()),
        &extra_params,
    );

    match matches.subcommand() {
        Some(("inspect", sub_matches)) => {
            let path = required(sub_matches, "path");
            let transform = sub_matches
                .get_one::<String>("transform")
                .map(|s| s.as_str())
                .unwrap_or(transforms::DEFAULT_TRANSFORM);
            handle_inspect_command(path, transform, &config);
        }
        Some(("convert", sub_matches)) => {
            let input = required(sub_matches, "input");
            let to = required(sub_matches, "to");
            let registry = FormatRegistry::with_defaults();

            let from = match sub_matches.get_one::<String>("from") {
                Some(from) => from.to_string(),
                None => match registry.detect_format_from_filename(input) {
                    Some(detected) => detected,
                    None => {
                        eprintln!("Error: Could not detect format from filename '{input}'");
                        eprintln!("Please specify --from explicitly");
                        std::process::exit(1);
                    }
                },
            };

            let output = sub_matches.get_one::<String>("output").map(|s| s.as_str());
            handle_convert_command(input, &from, to, output, &config);
        }
        Some(("format", sub_matches)) => {
            let input = required(sub_matches, "input");
            handle_convert_command(input, "markdown", "markdown", None, &config);
        }
        _ => {
            eprintln!("Unknown subcommand. Use --help for usage information.");
            std::process::exit(1);
        }
    }
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    match matches.get_one::<String>(name) {
        Some(value) => value,
        None => {
            eprintln!("Error: missing required argument '{name}'");
            std::process::exit(1);
        }
    }
}

fn read_input(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{path}': {e}");
        std::process::exit(1);
    })
}

/// Handle the inspect command
fn handle_inspect_command(path: &str, transform: &str, config: &NotemarkConfig) {
    let source = read_input(path);
    let output = transforms::execute_transform(
        &source,
        transform,
        &config.parse_options(),
        &config.serialize_rules(),
    )
    .unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });
    print!("{output}");
}

/// Handle the convert and format commands
fn handle_convert_command(
    input: &str,
    from: &str,
    to: &str,
    output: Option<&str>,
    config: &NotemarkConfig,
) {
    let registry = registry_from_config(config);

    for name in [from, to] {
        if let Err(e) = registry.get(name) {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }

    let source = read_input(input);
    debug!("converting {input} from {from} to {to}");

    let doc = registry.parse(&source, from).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    let result = registry.serialize(&doc, to).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    match output {
        Some(path) => fs::write(path, result).unwrap_or_else(|e| {
            eprintln!("Error writing file '{path}': {e}");
            std::process::exit(1);
        }),
        None => print!("{result}"),
    }
}

/// Default registry with the Markdown format carrying the configured knobs.
fn registry_from_config(config: &NotemarkConfig) -> FormatRegistry {
    let mut registry = FormatRegistry::with_defaults();
    registry.register(MarkdownFormat::new(
        config.parse_options(),
        config.serialize_rules(),
    ));
    registry
}

/// Handle the list-transforms command
fn handle_list_transforms_command() {
    println!("Available transforms:\n");
    println!("Stages:");
    println!("  token  - Markdown tokenized into a flat open/close stream");
    println!("  tree   - Document tree built from the token stream\n");

    println!("Available transform combinations:");
    for transform_name in transforms::AVAILABLE_TRANSFORMS {
        println!("  {transform_name}");
    }

    println!("\nConversion formats:");
    let registry = FormatRegistry::with_defaults();
    for format_name in registry.list_formats() {
        println!("  {format_name}");
    }
}

/// Keys accepted as `--extra-<key>`, mapped to configuration paths.
const EXTRA_KEYS: &[(&str, &str)] = &[
    ("hard-breaks", "parse.hard_breaks"),
    ("case-insensitive-keywords", "parse.case_insensitive_keywords"),
    ("bullet-marker", "serialize.bullet_marker"),
    ("alternate-bullet-marker", "serialize.alternate_bullet_marker"),
    ("fence-char", "serialize.fence_char"),
    ("hard-break", "serialize.hard_break"),
    ("rewrite-asset-paths", "serialize.rewrite_asset_paths"),
];

/// Defaults, then `notemark.toml` in the working directory, then `--config`,
/// then `--extra-*` overrides.
fn load_cli_config(
    explicit_path: Option<&str>,
    extra_params: &HashMap<String, String>,
) -> NotemarkConfig {
    let loader = Loader::new().with_optional_file("notemark.toml");
    let loader = match explicit_path {
        Some(path) => loader.with_file(path),
        None => loader,
    };
    let loader = apply_config_overrides(loader, extra_params);

    loader.build().unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        std::process::exit(1);
    })
}

fn apply_config_overrides(mut loader: Loader, extra_params: &HashMap<String, String>) -> Loader {
    for (key, raw) in extra_params {
        let Some((_, path)) = EXTRA_KEYS.iter().find(|(name, _)| name == key) else {
            warn!("ignoring unknown parameter --extra-{key}");
            continue;
        };
        let result = match parse_bool_arg(raw) {
            Some(flag) if path.starts_with("parse.") || path.ends_with("asset_paths") => {
                loader.set_override(path, flag)
            }
            _ => loader.set_override(path, raw.as_str()),
        };
        loader = result.unwrap_or_else(|err| {
            eprintln!("Invalid value '{raw}' for --extra-{key}: {err}");
            std::process::exit(1);
        });
    }
    loader
}

fn parse_bool_arg(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}
