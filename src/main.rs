use anyhow::Context;
use clap::Parser;
use srcpatch::{Config, FileFilterConfig, Pipeline};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "srcpatch",
    version,
    author,
    about = "Prepend a header include and normalize encodings across a source tree",
    long_about = "Walks a directory tree, selects files by extension and name, and edits \
    them in place: converts their text to UTF-8 and/or inserts an #include line at the top.\n\n\
    USAGE EXAMPLES:\n  \
      # Add a precompiled header to every C++ source\n  \
      srcpatch --path ./src --extension \"cpp\" --prepend_pch stdafx.h\n\n  \
      # Convert headers and sources to UTF-8, skipping third-party code\n  \
      srcpatch --path . --extension \"cpp h\" --dir_exclude \"third_party build\" --conv_to_utf8\n\n  \
      # Preview both transformations\n  \
      srcpatch --path ./src --conv_to_utf8 --prepend_pch pch.h --dry_run"
)]
struct Cli {
    /// Root directory to scan
    #[arg(long, value_name = "DIR")]
    path: PathBuf,

    /// Extensions to select, without leading dot (empty selects all files)
    #[arg(long, alias = "ext", value_name = "EXT", value_delimiter = ' ', num_args = 1..)]
    extension: Vec<String>,

    /// Directory names to skip anywhere in the tree
    #[arg(long = "dir_exclude", alias = "exdirs", value_name = "NAME", value_delimiter = ' ', num_args = 1..)]
    dir_exclude: Vec<String>,

    /// File names to skip
    #[arg(long = "file_exclude", alias = "exfiles", value_name = "NAME", value_delimiter = ' ', num_args = 1..)]
    file_exclude: Vec<String>,

    /// Header to include at the top of every selected file
    #[arg(long = "prepend_pch", value_name = "HEADER")]
    prepend_pch: Option<String>,

    /// Convert selected files to UTF-8
    ///
    /// Files without a BOM are detected statistically. Short non-Latin text
    /// (e.g. a few words of windows-1251) can be misdetected as another
    /// single-byte encoding; pass --source_encoding to convert such trees.
    #[arg(long = "conv_to_utf8")]
    conv_to_utf8: bool,

    /// Source encoding to assume instead of detecting it (e.g. windows-1251)
    #[arg(long = "source_encoding", value_name = "LABEL", requires = "conv_to_utf8")]
    source_encoding: Option<String>,

    /// Prepend the header even if the file already starts with it
    #[arg(long, requires = "prepend_pch")]
    force: bool,

    /// Report what would change without writing
    #[arg(long = "dry_run")]
    dry_run: bool,

    /// Keep a timestamped copy of every modified file
    #[arg(long)]
    backup: bool,

    /// Print statistics as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Returns true if at least one worker flag was given.
fn has_workers(cli: &Cli) -> bool {
    cli.prepend_pch.is_some() || cli.conv_to_utf8
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    if !has_workers(&cli) {
        println!("Nothing to do: neither --prepend_pch nor --conv_to_utf8 was given");
        return Ok(ExitCode::SUCCESS);
    }

    let mut builder = Config::builder()
        .root_dir(cli.path)
        .file_filter_config(
            FileFilterConfig::new()
                .extensions(cli.extension)
                .exclude_directories(cli.dir_exclude)
                .exclude_files(cli.file_exclude),
        )
        .normalize_encoding(cli.conv_to_utf8)
        .force_prepend(cli.force)
        .dry_run(cli.dry_run)
        .backup_existing(cli.backup);

    if let Some(header) = cli.prepend_pch {
        builder = builder.prepend_header(header);
    }

    if let Some(label) = cli.source_encoding {
        builder = builder.source_encoding(label);
    }

    let config = builder.build().context("Failed to build configuration")?;

    let stats = Pipeline::new(config)
        .context("Failed to create pipeline")?
        .run()
        .context("Pipeline execution failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("Failed to serialize statistics")?
        );
    } else {
        stats.print_summary();
    }

    Ok(if stats.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn setup_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::new("srcpatch=info"),
        1 => EnvFilter::new("srcpatch=debug"),
        _ => EnvFilter::new("srcpatch=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .init();
}
