mod hits;

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::sync::Arc;

use clap::Parser;
use field_formats::{
    BindableFields, ContentType, FieldFormat, FormatError, FormatRegistry, FormatterConfig,
    HighlightTags, StringFormat, Transform,
};
use serde_json::Value;

use crate::hits::{HitFormatter, parse_hit_line};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to open input {path}: {source}")]
    OpenInput { path: String, source: io::Error },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid hit on line {line}: {source}")]
    InvalidHit { line: usize, source: serde_json::Error },
    #[error("hit on line {line}: {source}")]
    Format { line: usize, source: FormatError },
    #[error(transparent)]
    Config(#[from] FormatError),
    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "fieldfmt", about = "Format search hit fields as display-ready HTML or text")]
struct Cli {
    #[arg(long, default_value = "-", help = "Input file path, or - for stdin")]
    input: String,

    #[arg(long, env = "FIELDFMT_CONTENT_TYPE", default_value = "html")]
    content_type: ContentType,

    #[arg(long, help = "Field format id (default from FIELDFMT_FORMAT)")]
    format: Option<String>,

    #[arg(long, help = "String transform: none, lower, upper, title, short, base64")]
    transform: Option<Transform>,

    #[arg(long, help = "Comma-separated fields whose markup may be bound")]
    bindable_fields: Option<String>,

    #[arg(long)]
    pre_tag: Option<String>,

    #[arg(long)]
    post_tag: Option<String>,

    #[arg(long, default_value_t = false, help = "Skip hits that fail to parse or format")]
    keep_going: bool,
}

fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    let mut registry = FormatRegistry::default();
    if let Some(transform) = cli.transform {
        registry.register(Arc::new(StringFormat::new(transform)));
    }

    let formatter = match cli.content_type {
        ContentType::Html => HitFormatter::Html(config.html_content_type(&registry)?),
        ContentType::Text => HitFormatter::Text(config.text_content_type(&registry)?),
    };
    tracing::debug!(
        content_type = %cli.content_type,
        format = %config.format_id,
        bindable = ?config.bindable_fields.names(),
        "formatter ready"
    );

    let reader = open_input(&cli.input)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let stats = run(reader, &mut out, &formatter, cli.keep_going)?;
    out.flush()?;

    tracing::info!(formatted = stats.formatted, skipped = stats.skipped, "fieldfmt complete");
    Ok(())
}

/// Environment config with command-line overrides applied on top.
fn resolve_config(cli: &Cli) -> Result<FormatterConfig, CliError> {
    let mut config = FormatterConfig::from_env()?;
    if let Some(format) = &cli.format {
        config.format_id.clone_from(format);
    }
    if cli.transform.is_some() {
        let string_id = StringFormat::default().id();
        if cli.format.is_none() {
            config.format_id = string_id.to_owned();
        } else if config.format_id != string_id {
            tracing::warn!(
                format = %config.format_id,
                "--transform only applies to the string format; pass --format {string_id} to use it"
            );
        }
    }
    if let Some(fields) = &cli.bindable_fields {
        config.bindable_fields = BindableFields::parse(fields);
    }
    if cli.pre_tag.is_some() || cli.post_tag.is_some() {
        let pre = cli.pre_tag.as_deref().unwrap_or(config.highlight_tags.pre());
        let post = cli.post_tag.as_deref().unwrap_or(config.highlight_tags.post());
        config.highlight_tags = HighlightTags::new(pre, post)?;
    }
    Ok(config)
}

fn open_input(path: &str) -> Result<Box<dyn BufRead>, CliError> {
    if path == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path).map_err(|source| CliError::OpenInput {
        path: path.to_owned(),
        source,
    })?;
    Ok(Box::new(BufReader::new(file)))
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct RunStats {
    formatted: usize,
    skipped: usize,
}

fn run(
    reader: impl BufRead,
    out: &mut impl Write,
    formatter: &HitFormatter,
    keep_going: bool,
) -> Result<RunStats, CliError> {
    let mut stats = RunStats::default();

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line?;

        let result = parse_hit_line(&line)
            .map_err(|source| CliError::InvalidHit { line: line_no, source })
            .and_then(|hit| {
                hit.map(|hit| {
                    formatter
                        .format_hit(&hit)
                        .map_err(|source| CliError::Format { line: line_no, source })
                })
                .transpose()
            });

        match result {
            Ok(Some(fields)) => {
                serde_json::to_writer(&mut *out, &Value::Object(fields))?;
                out.write_all(b"\n")?;
                stats.formatted += 1;
            }
            Ok(None) => {}
            Err(e) if keep_going => {
                tracing::warn!(line = line_no, error = %e, "skipping hit");
                stats.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(stats)
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
