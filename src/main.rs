// src/main.rs
//
// retag — delete, unwrap or modify matching tags in (X)HTML documents
//
// - INPUT may be a single file or a directory. A directory is processed as a
//   batch over every .xhtml/.html/.htm file below it, rewritten in place.
// - For a single file, OUTPUT defaults to overwriting INPUT.
// - The rule comes either from flags (--tag, --attr, --value, ...) or from a
//   TOML rule file (--rules). It is validated before any document is touched.
// - The tag profile (built-in, or --profile) lists the tags, attributes and
//   renames normally used; rules outside it warn, or fail under --strict.
//
// CLI flags:
//   --dry-run       : report what would change, write nothing
//   -v / -vv / -vvv : info / debug / trace logging on stderr

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use log::{LevelFilter, Log, Metadata, Record};
use std::fs;
use std::path::PathBuf;

use retag::{
    load_rule, run_batch, Action, BatchOptions, Criteria, DirectoryStore, MatchMode, Profile,
};

/// CLI flags
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Tag name to match (e.g. span)
    #[arg(long, required_unless_present_any = ["rules", "list_profile"])]
    tag: Option<String>,

    /// Attribute the tag must carry; omit to match only tags with no attributes
    #[arg(long, requires = "value")]
    attr: Option<String>,

    /// Value the attribute must have
    #[arg(long)]
    value: Option<String>,

    /// Treat --value as a regex anchored at the start of the attribute value
    #[arg(long, action = ArgAction::SetTrue)]
    regex: bool,

    /// What to do with matching tags
    #[arg(long, value_enum, default_value_t = Action::Delete)]
    action: Action,

    /// New tag name for --action modify
    #[arg(long = "new-tag")]
    new_tag: Option<String>,

    /// Attribute string replacing the existing attributes for --action modify
    #[arg(long = "new-attrs", default_value = "")]
    new_attrs: String,

    /// Keep the existing attributes for --action modify
    #[arg(long = "copy-attrs", action = ArgAction::SetTrue)]
    copy_attrs: bool,

    /// Read the rule from a TOML file instead of flags
    #[arg(long, conflicts_with_all = ["tag", "attr", "value", "regex", "new_tag", "copy_attrs"])]
    rules: Option<PathBuf>,

    /// Profile overriding the built-in tag/attribute lists
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Refuse rules that fall outside the profile
    #[arg(long, action = ArgAction::SetTrue)]
    strict: bool,

    /// Report changes without writing them
    #[arg(long = "dry-run", action = ArgAction::SetTrue)]
    dry_run: bool,

    /// More logging (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Print the active profile and exit
    #[arg(long = "list-profile", action = ArgAction::SetTrue)]
    list_profile: bool,

    /// Input file or directory
    #[arg(required_unless_present = "list_profile")]
    input: Option<PathBuf>,

    /// Output file (default: overwrite input; not allowed with a directory)
    output: Option<PathBuf>,
}

impl Cli {
    fn criteria(&self) -> Result<Criteria> {
        if let Some(path) = &self.rules {
            return load_rule(path).with_context(|| format!("loading rule file {}", path.display()));
        }
        let Some(tag) = &self.tag else {
            bail!("either --tag or --rules is required");
        };
        Ok(Criteria {
            tag_name: tag.clone(),
            attribute_name: self.attr.clone(),
            match_value: self.value.clone(),
            match_mode: if self.regex { MatchMode::Regex } else { MatchMode::Literal },
            action: self.action,
            new_tag_name: self.new_tag.clone(),
            new_attribute_string: self.new_attrs.clone(),
            copy_existing_attributes: self.copy_attrs,
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let profile = match &cli.profile {
        Some(path) => Profile::load(path)?,
        None => Profile::builtin()?,
    };
    if cli.list_profile {
        print_profile(&profile);
        return Ok(());
    }

    let criteria = cli.criteria()?;
    criteria.validate().context("invalid rule")?;

    let violations = profile.check(&criteria);
    for v in &violations {
        log::warn!("{v}");
    }
    if cli.strict && !violations.is_empty() {
        bail!("rule is outside the profile ({} problem(s)); drop --strict to run it anyway", violations.len());
    }

    let rule = criteria.compile()?;
    let Some(input) = &cli.input else {
        bail!("no input given");
    };

    if input.is_dir() {
        if cli.output.is_some() {
            bail!("OUTPUT cannot be used when INPUT is a directory");
        }
        let mut store = DirectoryStore::new(input);
        let options = BatchOptions {
            dry_run: cli.dry_run,
            cancel: None,
        };
        let report = run_batch(&mut store, &rule, &options);

        for (id, err) in &report.failed {
            eprintln!("{id}: {err}");
        }
        if report.is_clean() {
            println!("Nothing changed: nothing matching your criteria was found.");
        } else {
            let verb = if cli.dry_run { "would change" } else { "changed" };
            println!("{} document(s) {verb}:", report.changed.len());
            for id in &report.changed {
                println!("  {id}");
            }
        }
        if !report.failed.is_empty() {
            bail!("{} document(s) could not be processed", report.failed.len());
        }
        return Ok(());
    }

    let src = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let src = String::from_utf8(src).with_context(|| format!("{} is not valid UTF-8", input.display()))?;
    let rewrite = rule.rewrite(&src);

    if !rewrite.changed(&src) {
        println!("Nothing changed: nothing matching your criteria was found.");
    } else {
        log::info!(
            "{} tag(s) matched, {} nesting mismatch(es)",
            rewrite.stats.matched,
            rewrite.stats.nesting_mismatches
        );
        println!("{} {}", if cli.dry_run { "would change" } else { "changed" }, input.display());
    }
    if cli.dry_run {
        return Ok(());
    }

    let out_path = cli.output.as_ref().unwrap_or(input);
    if rewrite.changed(&src) || out_path != input {
        fs::write(out_path, rewrite.output).with_context(|| format!("writing {}", out_path.display()))?;
    }
    Ok(())
}

fn print_profile(profile: &Profile) {
    println!("tags: {}", profile.tags.join(", "));
    println!("attributes: {}", profile.attributes.join(", "));
    for (tag, targets) in &profile.change_to {
        println!("{tag} -> {}", targets.join(", "));
    }
}

/* =============================== Logging ================================ */

/// Plain stderr sink for the `log` facade.
struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("[{} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
