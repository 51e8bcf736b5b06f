//! MG-016: CLI subcommands — init, validate, generate, state.

use crate::core::directives::Directives;
use crate::core::generate::Generator;
use crate::core::parser;
use crate::core::state::State;
use crate::core::types::{GenEvent, PackageKind, ProjectConfig};
use crate::packages::manifest::ManifestPackageSet;
use crate::packages::PackageSet;
use crate::provenance::eventlog;
use crate::tools::goimports::GoimportsCommand;
use crate::tools::msgp::MsgpCommand;
use clap::Subcommand;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new msgpgen project
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate msgpgen.yaml, the package manifest and every directive
    Validate {
        /// Path to msgpgen.yaml
        #[arg(short, long, default_value = "msgpgen.yaml")]
        file: PathBuf,
    },

    /// Generate MessagePack codecs for the configured root types
    Generate {
        /// Path to msgpgen.yaml
        #[arg(short, long, default_value = "msgpgen.yaml")]
        file: PathBuf,

        /// Tag state file (overrides config)
        #[arg(long)]
        state: Option<PathBuf>,

        /// Also generate every struct implementing these interfaces (comma separated)
        #[arg(long, value_delimiter = ',')]
        ifaces: Vec<String>,

        /// Import these packages before searching for types (comma separated)
        #[arg(long, value_delimiter = ',')]
        import: Vec<String>,

        /// Read root types from a whitespace-separated file ('-' for stdin)
        #[arg(long)]
        tsv: Option<String>,

        /// 1-indexed column of the TSV file holding the type name
        #[arg(long, default_value_t = 1)]
        col: usize,

        /// Keep temp files used by the codec generator
        #[arg(long)]
        keep: bool,

        /// Print every generation event
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show the tag table of a state file, ordered by tag
    State {
        /// Path to the state file
        #[arg(default_value = "msgpgen-state.json")]
        file: PathBuf,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Generate {
            file,
            state,
            ifaces,
            import,
            tsv,
            col,
            keep,
            verbose,
        } => {
            let overrides = Overrides {
                state,
                ifaces,
                imports: import,
                tsv,
                col,
                keep,
            };
            cmd_generate(&file, overrides, verbose)
        }
        Commands::State { file } => cmd_state(&file),
    }
}

/// Command-line values that take precedence over msgpgen.yaml.
#[derive(Debug, Default)]
struct Overrides {
    state: Option<PathBuf>,
    ifaces: Vec<String>,
    imports: Vec<String>,
    tsv: Option<String>,
    col: usize,
    keep: bool,
}

impl Overrides {
    fn apply(&self, config: &mut ProjectConfig) {
        if let Some(state) = &self.state {
            config.state = Some(state.clone());
        }
        if !self.ifaces.is_empty() {
            config.ifaces = self.ifaces.clone();
        }
        config.imports.extend(self.imports.iter().cloned());
        if self.keep {
            config.generate.keep_temp = true;
        }
    }
}

// Relative paths in msgpgen.yaml are relative to the file itself.
fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn config_base(file: &Path) -> &Path {
    file.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn load_valid_config(file: &Path) -> Result<ProjectConfig, String> {
    let config = parser::parse_config_file(file)?;
    check_config(&config)?;
    Ok(config)
}

fn check_config(config: &ProjectConfig) -> Result<(), String> {
    let errors = parser::validate_config(config);
    if errors.is_empty() {
        return Ok(());
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Err(format!("{} validation error(s)", errors.len()))
}

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join("msgpgen.yaml");
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }
    std::fs::create_dir_all(path)
        .map_err(|e| format!("cannot create dir {}: {}", path.display(), e))?;

    std::fs::write(&config_path, parser::starter_config())
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;

    let manifest_path = path.join("packages.yaml");
    let created_manifest = !manifest_path.exists();
    if created_manifest {
        std::fs::write(&manifest_path, "packages: {}\n")
            .map_err(|e| format!("cannot write {}: {}", manifest_path.display(), e))?;
    }

    println!("Initialized msgpgen project at {}", path.display());
    println!("  Created: {}", config_path.display());
    if created_manifest {
        println!("  Created: {}", manifest_path.display());
    }
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let config = load_valid_config(file)?;
    let base = config_base(file);
    let tpset = ManifestPackageSet::load(&resolve(base, &config.manifest))?;

    let mut directive_count = 0;
    for pkg in tpset.packages() {
        if tpset.kind(&pkg) != PackageKind::User {
            continue;
        }
        directive_count += Directives::load(&tpset, &pkg)?.directives().len();
    }

    let types = parser::parse_type_names(&config.types)?;
    for tn in &types {
        if tpset.find_object(tn).is_none() {
            return Err(format!("could not find type {}", tn));
        }
    }
    let ifaces = parser::parse_type_names(&config.ifaces)?;
    let roots = parser::collect_root_types(&tpset, &types, &ifaces)?;

    println!(
        "OK: {} ({} packages, {} directives, {} root types)",
        file.display(),
        tpset.packages().len(),
        directive_count,
        roots.len()
    );
    Ok(())
}

fn cmd_generate(file: &Path, overrides: Overrides, verbose: bool) -> Result<(), String> {
    let mut config = parser::parse_config_file(file)?;
    overrides.apply(&mut config);
    check_config(&config)?;

    let base = config_base(file);
    let tpset = ManifestPackageSet::load(&resolve(base, &config.manifest))?;

    let mut events = Vec::new();
    for pkg in &config.imports {
        if let Err(e) = tpset.import(pkg) {
            events.push(GenEvent::ImportFailed {
                pkg: pkg.clone(),
                error: e,
            });
        }
    }

    let mut types = parser::parse_type_names(&config.types)?;
    if let Some(tsv) = &overrides.tsv {
        types.extend(parser::read_tsv_file(tsv, overrides.col)?);
    }
    let ifaces = parser::parse_type_names(&config.ifaces)?;
    let roots = parser::collect_root_types(&tpset, &types, &ifaces)?;
    if roots.is_empty() {
        return Err("no types to generate: set types, ifaces or --tsv".to_string());
    }

    let state_path = config.state.as_ref().map(|p| resolve(base, p));
    let state = state_path.as_deref().map(State::load).transpose()?;

    let codec = MsgpCommand::new(&config.tools.msgp);
    let tidier = GoimportsCommand::new(&config.tools.goimports);
    let generator = Generator::new(&tpset, config.generate.clone(), &codec, &tidier);
    let report = generator.run(&roots, state)?;
    events.extend(report.events);

    if let (Some(path), Some(state)) = (&state_path, &report.state) {
        state.save(path)?;
        events.push(GenEvent::StateSaved {
            path: path.display().to_string(),
            types: state.len(),
        });
    }

    if let Some(log) = &config.event_log {
        eventlog::append_events(&resolve(base, log), &events)?;
    }
    if verbose {
        for event in &events {
            println!("{}", event);
        }
    }

    println!(
        "Generated {} package(s) from {} root type(s): {} installed, {} unmodified",
        report.packages.len(),
        roots.len(),
        report.installed.len(),
        report.unmodified.len()
    );
    for path in &report.installed {
        println!("  wrote: {}", path.display());
    }
    Ok(())
}

fn cmd_state(file: &Path) -> Result<(), String> {
    let state = State::load(file)?;
    if state.is_new() {
        println!("No state at {}. Run `msgpgen generate` first.", file.display());
        return Ok(());
    }
    println!("State: {} ({} types, next tag {})", file.display(), state.len(), state.next_id());
    for (tn, id) in state.entries_by_id() {
        println!("  {:>5}  {}", id, tn);
    }
    Ok(())
}
