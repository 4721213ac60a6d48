use std::path::{Path, PathBuf};
use std::process::exit;

use clap::{Args, Parser, Subcommand};
use gitops_gen::{
    generate, load_options, load_settings, sanitize_error_message, CmdExecutor, ConfigError,
    DiskFs, Filesystem, GenError, GeneratedResources, GeneratorOptions, GitopsGen,
    GitopsGenError, OverlayTarget, SyncOutcome, SyncSettings,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type Result<T> = std::result::Result<T, GitopsGenError>;

#[derive(Debug, Parser)]
#[command(about, version)]
struct Cli {
    /// Sync settings file (YAML).
    #[arg(short, long, global = true, value_name = "path")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(flatten)]
    settings: SettingsArgs,

    #[command(subcommand)]
    command: Command,
}

/// Flags that override values from `--config`.
#[derive(Debug, Args)]
struct SettingsArgs {
    /// GitOps repository remote, `https://<token>@host/org/repo`.
    #[arg(long, global = true, env = "GITOPS_GEN_REMOTE", value_name = "url", hide_env_values = true)]
    remote: Option<String>,

    #[arg(long, global = true, value_name = "name")]
    branch: Option<String>,

    /// Directory inside the repository holding the GitOps tree.
    #[arg(long, global = true, value_name = "path")]
    context: Option<String>,

    /// Directory repositories are cloned into.
    #[arg(long, global = true, value_name = "path")]
    work_dir: Option<PathBuf>,

    /// Generate and stage, but do not commit or push.
    #[arg(long, global = true)]
    no_push: bool,

    #[arg(long, global = true, value_name = "name")]
    created_by: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate the base manifests of a component.
    Generate {
        /// Component options file (YAML, or JSON with a .json extension).
        #[arg(short, long, value_name = "path")]
        options: PathBuf,

        /// Write into this directory instead of syncing a repository.
        #[arg(long, value_name = "path")]
        output: Option<PathBuf>,
    },

    /// Generate the overlay of a component for one environment.
    Overlay {
        #[arg(short, long, value_name = "path")]
        options: PathBuf,

        #[arg(long, value_name = "name")]
        application: String,

        #[arg(long, value_name = "name")]
        environment: String,

        #[arg(long, value_name = "image")]
        image: String,

        #[arg(long, value_name = "namespace")]
        namespace: String,

        /// Use an existing clone under the work directory.
        #[arg(long)]
        no_clone: bool,

        /// JSON map of component name to previously generated patch files.
        #[arg(long, value_name = "path")]
        generated: Option<PathBuf>,
    },

    /// Remove a component and rebuild the parent kustomization.
    Remove {
        #[arg(value_name = "component")]
        component: String,
    },

    /// Print the commit a local clone points at.
    CommitId {
        #[arg(value_name = "path")]
        repo: PathBuf,
    },
}

impl Cli {
    fn settings(&self) -> Result<SyncSettings> {
        let mut settings = match &self.config {
            Some(path) => load_settings(path)?,
            None => SyncSettings::default(),
        };

        let args = &self.settings;
        if let Some(remote) = &args.remote {
            settings.remote = remote.clone();
        }
        if let Some(branch) = &args.branch {
            settings.branch = branch.clone();
        }
        if let Some(context) = &args.context {
            settings.context = context.clone();
        }
        if let Some(work_dir) = &args.work_dir {
            settings.work_dir = work_dir.clone();
        }
        if args.no_push {
            settings.do_push = false;
        }
        if args.created_by.is_some() {
            settings.created_by = args.created_by.clone();
        }

        settings.validate()?;
        Ok(settings)
    }

    fn run(self) -> Result<()> {
        let mut settings = self.settings()?;
        let driver = GitopsGen::new(CmdExecutor::new(), DiskFs::new());

        match self.command {
            Command::Generate { options, output } => {
                let options = read_options(&options, &settings)?;
                match output {
                    Some(output) => {
                        generate(&DiskFs::new(), None, &output, &options)?;
                        tracing::info!(output = %output.display(), "Generated manifests");
                    }
                    None => {
                        let owned = prepare_work_dir(&mut settings, true)?;
                        let outcome = driver.clone_generate_and_push(&settings, &options)?;
                        finish(&settings, outcome, owned);
                    }
                }
            }
            Command::Overlay {
                options,
                application,
                environment,
                image,
                namespace,
                no_clone,
                generated,
            } => {
                let options = read_options(&options, &settings)?;
                let generated = match generated {
                    Some(path) => read_generated(&path)?,
                    None => GeneratedResources::new(),
                };
                let target = OverlayTarget {
                    application,
                    environment,
                    image,
                    namespace,
                };
                let owned = prepare_work_dir(&mut settings, !no_clone)?;
                let outcome = driver.generate_overlays_and_push(
                    &settings,
                    !no_clone,
                    &options,
                    &target,
                    &generated,
                )?;
                finish(&settings, outcome, owned);
            }
            Command::Remove { component } => {
                let owned = prepare_work_dir(&mut settings, true)?;
                let outcome = driver.remove_and_push(&settings, &component)?;
                finish(&settings, outcome, owned);
            }
            Command::CommitId { repo } => {
                println!("{}", driver.commit_id(&repo)?);
            }
        }

        Ok(())
    }
}

fn read_options(path: &Path, settings: &SyncSettings) -> Result<GeneratorOptions> {
    let mut options = load_options(path)?;
    if options.created_by.is_none() {
        options.created_by = settings.created_by.clone();
    }
    Ok(options)
}

fn read_generated(path: &Path) -> Result<GeneratedResources> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    let generated = serde_json::from_str(&content).map_err(|e| ConfigError::ParseJson {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(generated)
}

/// Creates the work directory. A run that clones and was not given a work
/// directory gets a fresh temporary one; returns true in that case.
fn prepare_work_dir(settings: &mut SyncSettings, clones: bool) -> Result<bool> {
    let fs = DiskFs::new();
    if clones && settings.has_default_work_dir() {
        settings.use_run_dir(&fs).map_err(GenError::from)?;
        return Ok(true);
    }
    fs.mkdir_all(&settings.work_dir).map_err(GenError::from)?;
    Ok(false)
}

/// Reports the outcome and removes an owned run directory once its changes
/// were pushed or turned out unchanged.
fn finish(settings: &SyncSettings, outcome: SyncOutcome, owned: bool) {
    report(outcome);

    if !owned {
        return;
    }
    if outcome == SyncOutcome::NotPushed {
        tracing::info!(dir = %settings.work_dir.display(), "Run directory kept");
        return;
    }
    if let Err(e) = std::fs::remove_dir_all(&settings.work_dir) {
        tracing::warn!(dir = %settings.work_dir.display(), "Failed to remove run directory: {e}");
    }
}

fn report(outcome: SyncOutcome) {
    match outcome {
        SyncOutcome::Pushed => tracing::info!("Changes pushed"),
        SyncOutcome::NoChanges => tracing::info!("Nothing changed, skipped commit"),
        SyncOutcome::NotPushed => tracing::info!("Push disabled, changes left in work directory"),
    }
}

fn init_logging(json: bool) {
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to bridge log records: {e}");
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    let result = if json {
        tracing::subscriber::set_global_default(registry.with(fmt::layer().json()))
    } else {
        tracing::subscriber::set_global_default(registry.with(fmt::layer().compact()))
    };
    if let Err(e) = result {
        eprintln!("Failed to install tracing subscriber: {e}");
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    if let Err(error) = cli.run() {
        tracing::error!("{}", sanitize_error_message(&error.to_string()));
        exit(1);
    }
}
