//! CLI entry point for `mobikit`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand};

use mobikit::config::Config;
use mobikit::document::metadata::string_record;
use mobikit::exth::view::{BinaryView, StringView};
use mobikit::exth::{ExthRecord, ExthTag};
use mobikit::index::{IndexRecord, IndexType};
use mobikit::Document;

#[derive(Parser)]
#[command(
    name = "mobikit",
    version,
    about = "Inspect and edit MOBI e-books",
    long_about = "Inspect and edit MOBI e-books: title, EXTH metadata, cover, thumbnail and PalmDOC text."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a summary of the book
    Info {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// List the EXTH metadata records
    Meta {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// List the PDB records and their classification
    Records {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print or change the title
    Title {
        path: PathBuf,
        /// New title
        #[arg(long, value_name = "TITLE")]
        set: Option<String>,
        #[command(flatten)]
        output: OutputArg,
    },
    /// Extract or replace the cover image
    Cover {
        path: PathBuf,
        #[command(flatten)]
        image: ImageArgs,
        #[command(flatten)]
        output: OutputArg,
    },
    /// Extract or replace the thumbnail image
    Thumbnail {
        path: PathBuf,
        #[command(flatten)]
        image: ImageArgs,
        #[command(flatten)]
        output: OutputArg,
    },
    /// Print or replace the book text
    Text {
        path: PathBuf,
        /// Write the text to this file instead of stdout
        #[arg(long, value_name = "PATH", conflicts_with = "set")]
        extract: Option<PathBuf>,
        /// Replace the text with the contents of this UTF-8 file
        #[arg(long, value_name = "PATH")]
        set: Option<PathBuf>,
        #[command(flatten)]
        output: OutputArg,
    },
    /// Create a new book with no text
    New {
        output: PathBuf,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Vec<String>,
    },
    /// Show the config file path and the effective settings
    Config {
        /// Write the effective settings to the config file
        #[arg(long)]
        init: bool,
        /// Replace an existing config file with --init
        #[arg(long, requires = "init")]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ImageArgs {
    /// Write the image to this file
    #[arg(long, value_name = "PATH")]
    extract: Option<PathBuf>,
    /// Replace the image with the contents of this file
    #[arg(long, value_name = "IMAGE")]
    set: Option<PathBuf>,
}

#[derive(Args)]
struct OutputArg {
    /// Write the modified book here instead of rewriting the input
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy)]
enum ImageSlot {
    Cover,
    Thumbnail,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = mobikit::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    let json_default = config.output.json;

    match cli.command {
        Commands::Info { path, json } => cmd_info(&path, json || json_default),
        Commands::Meta { path, json } => cmd_meta(&path, json || json_default),
        Commands::Records { path, json } => cmd_records(&path, json || json_default),
        Commands::Title { path, set, output } => {
            cmd_title(&path, set.as_deref(), output.output.as_deref(), &config)
        }
        Commands::Cover {
            path,
            image,
            output,
        } => cmd_image(&path, ImageSlot::Cover, &image, output.output.as_deref(), &config),
        Commands::Thumbnail {
            path,
            image,
            output,
        } => cmd_image(
            &path,
            ImageSlot::Thumbnail,
            &image,
            output.output.as_deref(),
            &config,
        ),
        Commands::Text {
            path,
            extract,
            set,
            output,
        } => cmd_text(
            &path,
            extract.as_deref(),
            set.as_deref(),
            output.output.as_deref(),
            &config,
        ),
        Commands::New {
            output,
            title,
            author,
        } => cmd_new(&output, title.as_deref(), &author),
        Commands::Config { init, force } => cmd_config(&config, init, force),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = mobikit::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mobikit.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Print the effective config as TOML, or write it with `--init`.
fn cmd_config(config: &Config, init: bool, force: bool) -> anyhow::Result<()> {
    if init {
        let path = mobikit::config::save_config(config, force)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }
    match mobikit::config::config_file_path() {
        Some(path) if path.exists() => println!("# {}", path.display()),
        Some(path) => println!("# {} (not present, defaults)", path.display()),
        None => println!("# no config directory, defaults"),
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mobikit", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

fn open_book(path: &Path) -> anyhow::Result<Document> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    Ok(Document::open(path)?)
}

/// Write `doc` to `output`, or back over `input` after an optional backup.
fn save_book(doc: &Document, input: &Path, output: Option<&Path>, config: &Config) -> anyhow::Result<()> {
    let target = match output {
        Some(out) => out,
        None => {
            if config.write.backup {
                let mut backup = input.as_os_str().to_owned();
                backup.push(".bak");
                std::fs::copy(input, &backup)?;
                tracing::info!(backup = %Path::new(&backup).display(), "Wrote backup");
            }
            input
        }
    };
    doc.save(target)?;
    eprintln!("Saved {}", target.display());
    Ok(())
}

/// Show a summary of the book.
fn cmd_info(path: &Path, json: bool) -> anyhow::Result<()> {
    let doc = open_book(path)?;
    let file_size = std::fs::metadata(path)?.len();
    if json {
        print_info_json(path, file_size, &doc)
    } else {
        print_info_table(path, file_size, &doc);
        Ok(())
    }
}

/// List the EXTH records.
fn cmd_meta(path: &Path, json: bool) -> anyhow::Result<()> {
    let doc = open_book(path)?;
    let charset = doc.character_encoding();
    let records = doc.metadata().records();

    if json {
        let list: Vec<serde_json::Value> = records
            .iter()
            .map(|record| {
                serde_json::json!({
                    "code": record.code(),
                    "tag": record.tag().map(ExthTag::label),
                    "value": describe_record(record, charset),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    println!();
    for record in records {
        let label = record
            .tag()
            .map(|t| t.label().to_string())
            .unwrap_or_else(|| format!("code {}", record.code()));
        println!("  {:<28} {}", label, describe_record(record, charset));
    }
    println!();
    Ok(())
}

/// List every PDB record with its kind and size.
fn cmd_records(path: &Path, json: bool) -> anyhow::Result<()> {
    use humansize::{format_size, BINARY};

    let doc = open_book(path)?;
    let indices: HashMap<usize, IndexRecord> = doc.indices().into_iter().collect();

    if json {
        let list: Vec<serde_json::Value> = doc
            .records()
            .iter()
            .enumerate()
            .map(|(i, record)| {
                serde_json::json!({
                    "index": i + 1,
                    "kind": record.kind,
                    "size": record.len(),
                    "indx": indices.get(&(i + 1)),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    println!();
    println!("  {:>6}  {:<20} {}", 0, "header", format_size(doc.header().size() as u64, BINARY));
    for (i, record) in doc.records().iter().enumerate() {
        let detail = indices
            .get(&(i + 1))
            .map(|index| {
                let kind = match index.index_type() {
                    Some(IndexType::Inflection) => "inflection",
                    Some(IndexType::Normal) => "normal",
                    None => "unknown",
                };
                format!("  {kind} index, {} entries", index.entry_count())
            })
            .unwrap_or_default();
        println!(
            "  {:>6}  {:<20} {}{detail}",
            i + 1,
            record.kind.to_string(),
            format_size(record.len() as u64, BINARY)
        );
    }
    println!();
    Ok(())
}

/// Print the title, or set it and save.
fn cmd_title(path: &Path, set: Option<&str>, output: Option<&Path>, config: &Config) -> anyhow::Result<()> {
    let mut doc = open_book(path)?;
    match set {
        None => {
            println!("{}", doc.title());
            Ok(())
        }
        Some(title) => {
            doc.set_title(title);
            save_book(&doc, path, output, config)
        }
    }
}

/// Extract or replace the cover or thumbnail.
fn cmd_image(
    path: &Path,
    slot: ImageSlot,
    args: &ImageArgs,
    output: Option<&Path>,
    config: &Config,
) -> anyhow::Result<()> {
    let mut doc = open_book(path)?;
    let name = match slot {
        ImageSlot::Cover => "cover",
        ImageSlot::Thumbnail => "thumbnail",
    };

    if let Some(target) = &args.extract {
        let image = match slot {
            ImageSlot::Cover => doc.cover(),
            ImageSlot::Thumbnail => doc.thumbnail(),
        };
        let Some(image) = image else {
            anyhow::bail!("{} has no {name}", path.display());
        };
        std::fs::write(target, image)?;
        eprintln!("Wrote {name} to {}", target.display());
        return Ok(());
    }

    if let Some(source) = &args.set {
        let image = std::fs::read(source)?;
        match slot {
            ImageSlot::Cover => doc.set_cover(&image)?,
            ImageSlot::Thumbnail => doc.set_thumbnail(&image)?,
        }
        return save_book(&doc, path, output, config);
    }

    Ok(())
}

/// Print the text, write it to a file, or replace it.
fn cmd_text(
    path: &Path,
    extract: Option<&Path>,
    set: Option<&Path>,
    output: Option<&Path>,
    config: &Config,
) -> anyhow::Result<()> {
    let mut doc = open_book(path)?;

    if let Some(source) = set {
        let text = std::fs::read_to_string(source)?;
        doc.set_text_content_with_record_size(&text, config.write.text_record_size)?;
        return save_book(&doc, path, output, config);
    }

    let text = doc.text_content()?;
    match extract {
        Some(target) => {
            std::fs::write(target, text)?;
            eprintln!("Wrote text to {}", target.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

/// Create a new book with the given title and authors.
fn cmd_new(output: &Path, title: Option<&str>, authors: &[String]) -> anyhow::Result<()> {
    let mut doc = Document::empty();
    if let Some(title) = title {
        doc.set_title(title);
    }
    let charset = doc.character_encoding();
    for author in authors {
        let record = string_record(ExthTag::Author, author, charset)?;
        doc.metadata_mut().add(record.into_record());
    }
    doc.save(output)?;
    eprintln!("Created {}", output.display());
    Ok(())
}

const STRING_TAGS: &[ExthTag] = &[
    ExthTag::Author,
    ExthTag::Publisher,
    ExthTag::Imprint,
    ExthTag::Description,
    ExthTag::Isbn,
    ExthTag::Subject,
    ExthTag::PublishingDate,
    ExthTag::Review,
    ExthTag::Contributor,
    ExthTag::Rights,
    ExthTag::SubjectCode,
    ExthTag::Type,
    ExthTag::Source,
    ExthTag::Asin,
    ExthTag::VersionNumber,
    ExthTag::Adult,
    ExthTag::RetailPrice,
    ExthTag::RetailPriceCurrency,
    ExthTag::DictionaryShortName,
    ExthTag::Watermark,
    ExthTag::CdeType,
    ExthTag::UpdatedTitle,
    ExthTag::AsinCopy,
    ExthTag::Language,
];

const NUMBER_TAGS: &[ExthTag] = &[
    ExthTag::CoverOffset,
    ExthTag::ThumbnailOffset,
    ExthTag::HasFakeCover,
    ExthTag::CreatorSoftware,
    ExthTag::CreatorMajor,
    ExthTag::CreatorMinor,
    ExthTag::CreatorBuild,
    ExthTag::StartReading,
    ExthTag::Kf8BoundaryOffset,
    ExthTag::CountOfResources,
    ExthTag::ClippingLimit,
    ExthTag::PublisherLimit,
    ExthTag::TtsOff,
];

/// Render an EXTH record value for display.
fn describe_record(record: &ExthRecord, charset: mobikit::codec::charset::Charset) -> String {
    match record.tag() {
        Some(tag) if STRING_TAGS.contains(&tag) => StringView::new(record, charset).value(),
        Some(tag) if NUMBER_TAGS.contains(&tag) => match record.as_u32() {
            Some(n) => n.to_string(),
            None => BinaryView::new(record).hex(),
        },
        _ => BinaryView::new(record).hex(),
    }
}

/// Print the book summary in a human-readable table.
fn print_info_table(path: &Path, file_size: u64, doc: &Document) {
    use humansize::{format_size, BINARY};

    let header = doc.header();
    let meta = doc.metadata();

    println!();
    println!("  {:<20} {}", "File:", path.display());
    println!("  {:<20} {}", "File size:", format_size(file_size, BINARY));
    println!("  {:<20} {}", "Title:", doc.title());
    let authors: Vec<String> = meta.authors().iter().map(|a| a.value()).collect();
    if !authors.is_empty() {
        println!("  {:<20} {}", "Authors:", authors.join(", "));
    }
    if let Some(language) = meta.language() {
        println!("  {:<20} {}", "Language:", language.language_code());
    }
    println!("  {:<20} {}", "Encoding:", charset_label(doc.character_encoding()));
    println!("  {:<20} {}", "Compression:", compression_label(header.compression_code));
    println!("  {:<20} {}", "Records:", doc.record_count());
    println!("  {:<20} {}", "Text records:", header.record_count);
    println!("  {:<20} {}", "Images:", doc.images().len());
    if let Some(cover) = doc.cover() {
        println!("  {:<20} {}", "Cover:", format_size(cover.len() as u64, BINARY));
    }
    if let Some(thumbnail) = doc.thumbnail() {
        println!("  {:<20} {}", "Thumbnail:", format_size(thumbnail.len() as u64, BINARY));
    }
    println!("  {:<20} {}", "EXTH records:", meta.records().len());
    println!();
}

/// Print the book summary as JSON.
fn print_info_json(path: &Path, file_size: u64, doc: &Document) -> anyhow::Result<()> {
    let header = doc.header();
    let meta = doc.metadata();
    let authors: Vec<String> = meta.authors().iter().map(|a| a.value()).collect();

    let info = serde_json::json!({
        "file": path.to_string_lossy(),
        "file_size": file_size,
        "title": doc.title(),
        "authors": authors,
        "language": meta.language().map(|l| l.language_code()),
        "encoding": charset_label(doc.character_encoding()),
        "compression": compression_label(header.compression_code),
        "record_count": doc.record_count(),
        "text_record_count": header.record_count,
        "image_count": doc.images().len(),
        "cover_size": doc.cover().map(<[u8]>::len),
        "thumbnail_size": doc.thumbnail().map(<[u8]>::len),
        "exth_record_count": meta.records().len(),
    });

    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn charset_label(charset: mobikit::codec::charset::Charset) -> String {
    match charset.label() {
        Some(label) => label.to_string(),
        None => format!("code page {}", charset.text_encoding()),
    }
}

fn compression_label(code: u16) -> String {
    match mobikit::mobi::Compression::from_code(code) {
        Some(compression) => compression.to_string(),
        None => format!("unknown ({code})"),
    }
}
