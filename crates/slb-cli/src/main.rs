use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use slb_azure::{AzureShareService, Credential};
use slb_core::ClassifiedSnapshot;
use slb_hitl::{confirm_fallback, confirm_on_terminal, prompt_until, read_secret};
use slb_runner::{
    format_validation_errors, init_console_only, init_logging, validate_account, validate_days, validate_inputs,
    validate_share, verify_share_access, AccessCheck, AuthMethod, Config, RawInputs, RunOptions, Runner,
    FILE_ONLY_TARGET,
};
use slb_storage::StorageError;

#[derive(Parser)]
#[command(name = "slb", version, about = "Break leases on Azure file share snapshots older than a retention cutoff")]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Command>,

    /// Authentication method: key (storage account key) or entra (Azure CLI login)
    #[arg(long, global = true)]
    auth: Option<AuthMethod>,

    #[arg(long, env = "AZURE_STORAGE_ACCOUNT", global = true)]
    account: Option<String>,

    /// Storage account key (base64)
    #[arg(long, env = "AZURE_STORAGE_KEY", hide_env_values = true)]
    key: Option<String>,

    #[arg(long, global = true)]
    share: Option<String>,

    /// Retention in days; older snapshots are released
    #[arg(long, allow_negative_numbers = true, global = true)]
    days: Option<i64>,

    /// Config file (default ~/.config/slb/slb.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Answer yes to the locked-snapshot fallback question
    #[arg(long)]
    yes: bool,

    /// Classify and select only; break nothing
    #[arg(long)]
    dry_run: bool,

    /// Concurrent lease breaks
    #[arg(long, global = true)]
    parallel: Option<usize>,

    /// Print the run report as JSON on stdout (progress goes to stderr)
    #[arg(long)]
    json: bool,

    #[arg(long, global = true)]
    log_dir: Option<String>,

    /// e.g. core.usgovcloudapi.net
    #[arg(long, global = true)]
    endpoint_suffix: Option<String>,

    /// Record snapshots whose lease cannot be read as unknown instead of aborting
    #[arg(long)]
    isolate_fetch_errors: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Write a config file from the given flags over the defaults
    InitConfig {
        /// Destination (defaults to --config, then ~/.config/slb/slb.toml)
        #[arg(long)]
        path: Option<PathBuf>,
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!(target: FILE_ONLY_TARGET, error = %format!("{e:#}"), "run aborted");
            eprintln!("\nERROR: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut cfg = Config::load(cli.config.as_deref())?;
    merge_flags(&cli, &mut cfg);

    if let Some(Command::InitConfig { path, force }) = &cli.cmd {
        let path = path.clone().or_else(|| cli.config.clone()).unwrap_or_else(Config::default_path);
        if path.exists() && !force {
            eprintln!("ERROR: {} already exists (use --force to overwrite).", path.display());
            return Ok(ExitCode::FAILURE);
        }
        cfg.save_to(&path)?;
        println!("Wrote {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let raw = RawInputs {
        account: cfg.azure.account.clone(),
        share: cfg.retention.share.clone(),
        days: cfg.retention.days,
        parallel: cfg.run.parallel,
    };
    let checked = match validate_inputs(&raw) {
        Ok(c) => c,
        Err(errors) => {
            eprint!("{}", format_validation_errors(&errors));
            return Ok(ExitCode::FAILURE);
        }
    };

    let log_path = match init_logging(&cfg.log) {
        Ok(p) => Some(p),
        Err(e) => {
            init_console_only();
            warn!(error = %format!("{e:#}"), "file logging unavailable");
            None
        }
    };

    // With --json, stdout carries only the report.
    let mut human: Box<dyn Write> = if cli.json { Box::new(io::stderr()) } else { Box::new(io::stdout()) };

    let auth = match cfg.azure.auth {
        Some(a) => a,
        None if cli.key.is_some() => AuthMethod::Key,
        None => prompt_until(
            &mut io::stdin().lock(),
            &mut human,
            "Select authentication method:\n  1) Account Key\n  2) Entra ID\nChoice (1/2): ",
            |s| s.parse::<AuthMethod>(),
        )
        .context("read authentication method")?,
    };
    let account = match checked.account {
        Some(a) => a,
        None => prompt_until(&mut io::stdin().lock(), &mut human, "Enter storage account name: ", |s| {
            validate_account(s).map_err(|e| e.to_string())
        })
        .context("read storage account name")?,
    };
    let share = match checked.share {
        Some(s) => s,
        None => ask_share(&mut human)?,
    };
    let days = match checked.days {
        Some(d) => d,
        None => prompt_until(&mut io::stdin().lock(), &mut human, "Enter cutoff days: ", |s| {
            let n = s.parse::<i64>().map_err(|_| format!("Invalid cutoff days '{s}': must be a positive integer."))?;
            validate_days(n).map_err(|e| e.to_string())
        })
        .context("read cutoff days")?,
    };
    info!(%account, %share, days, %auth, "inputs resolved");

    let credential = match auth {
        AuthMethod::Key => {
            let key = match cli.key.clone() {
                Some(k) => k,
                None => read_secret("Enter storage account key: ").context("read storage account key")?,
            };
            if key.trim().is_empty() {
                eprintln!("ERROR: Storage account key cannot be empty.");
                return Ok(ExitCode::FAILURE);
            }
            Credential::shared_key(&key)
        }
        AuthMethod::Entra => Credential::from_azure_cli(),
    };
    let credential = match credential {
        Ok(c) => c,
        Err(e) => {
            error!(target: FILE_ONLY_TARGET, error = %e, "credential unavailable");
            eprintln!("ERROR: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };
    let service = AzureShareService::new(&account, &cfg.azure.endpoint_suffix, credential)?;

    let share = match verify_share_access(&service, &account, share, &mut io::stdin().lock(), &mut human)? {
        AccessCheck::Ready(share) => share,
        AccessCheck::Denied(e @ (StorageError::Forbidden(_) | StorageError::InvalidCredential(_))) => {
            error!(target: FILE_ONLY_TARGET, error = %e, "access denied");
            eprintln!(
                "ERROR: Access denied to the file share. Check the account key, or that the signed-in \
                 identity holds a file data role on the account.\n{e}"
            );
            return Ok(ExitCode::FAILURE);
        }
        AccessCheck::Denied(e) => {
            error!(target: FILE_ONLY_TARGET, error = %e, "credential check failed");
            eprintln!("ERROR: Could not validate access to the file share: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let opts = RunOptions {
        days,
        parallel: checked.parallel,
        isolate_fetch_errors: cfg.run.isolate_fetch_errors,
        dry_run: cli.dry_run,
    };
    let json = cli.json;
    let auto_yes = cli.yes;
    let confirm = |candidates: &[ClassifiedSnapshot]| {
        if auto_yes {
            info!(candidates = candidates.len(), "fallback auto-confirmed");
            return true;
        }
        let answer = if json {
            confirm_fallback(&mut io::stdin().lock(), &mut io::stderr(), candidates)
        } else {
            confirm_on_terminal(candidates)
        };
        answer.unwrap_or_else(|e| {
            warn!(error = %e, "could not read confirmation, treating as no");
            false
        })
    };

    let report = Runner::new(&service, share, opts).run(Utc::now(), confirm, &mut human)?;

    if json {
        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &report).context("write json report")?;
        writeln!(stdout)?;
    }
    if let Some(p) = log_path {
        writeln!(human, "\nDetailed log: {}", p.display())?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Flags (and their env fallbacks) win over the config file.
fn merge_flags(cli: &Cli, cfg: &mut Config) {
    if let Some(a) = cli.auth {
        cfg.azure.auth = Some(a);
    }
    if let Some(a) = &cli.account {
        cfg.azure.account = Some(a.clone());
    }
    if let Some(s) = &cli.endpoint_suffix {
        cfg.azure.endpoint_suffix = s.clone();
    }
    if let Some(s) = &cli.share {
        cfg.retention.share = Some(s.clone());
    }
    if let Some(d) = cli.days {
        cfg.retention.days = Some(d);
    }
    if let Some(p) = cli.parallel {
        cfg.run.parallel = p;
    }
    if cli.isolate_fetch_errors {
        cfg.run.isolate_fetch_errors = true;
    }
    if let Some(d) = &cli.log_dir {
        cfg.log.dir = d.clone();
    }
}

fn ask_share<W: Write>(out: &mut W) -> Result<String> {
    prompt_until(&mut io::stdin().lock(), out, "Enter file share name: ", |s| {
        validate_share(s).map_err(|e| e.to_string())
    })
    .context("read file share name")
}
