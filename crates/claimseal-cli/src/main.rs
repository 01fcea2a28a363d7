//! claimseal - sealed, re-verifiable render claims
//!
//! The `claimseal` command seals a claim bundle against a deterministic
//! renderer and later proves the sealed output still reproduces.
//!
//! ## Commands
//!
//! - `validate`, `mode`, `fingerprint`: offline inspection
//! - `migrate`, `tamper`: offline rewrites
//! - `seal`, `check`, `save`: renderer and claim store round-trips
//! - `claims`: browse sealed claims

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn, Level};

use claim_store::{ClaimId, ClaimRecord, ClaimStore};
use claimseal_core::bundle_file::{read_bundle_text, write_bundle};
use claimseal_core::verify::VerificationReport;
use claimseal_core::{
    fingerprint_snapshot, normalize_hash, parse_bundle, tamper_bundle, validate, Bundle,
    CheckVerdict, ClaimsealConfig, ConfigOverrides, Outcome, Tamper, VerificationSession,
    VerificationState, VerifyError,
};
use render_client::Renderer;

#[derive(Parser)]
#[command(name = "claimseal")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Seal and re-verify deterministic render claims", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON log lines and JSON command output
    #[arg(long, global = true)]
    json: bool,

    /// Renderer base URL (overrides CLAIMSEAL_RENDERER_URL)
    #[arg(long, global = true)]
    renderer_url: Option<String>,

    /// Renderer request timeout in seconds
    #[arg(long, global = true)]
    renderer_timeout: Option<u64>,

    /// Claim store base URL (overrides CLAIMSEAL_STORE_URL)
    #[arg(long, global = true)]
    store_url: Option<String>,

    /// Claim store bearer token (overrides CLAIMSEAL_STORE_TOKEN)
    #[arg(long, global = true)]
    store_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            renderer_url: self.renderer_url.clone(),
            renderer_timeout: self.renderer_timeout.map(Duration::from_secs),
            store_url: self.store_url.clone(),
            store_token: self.store_token.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check a bundle's structure without contacting the renderer
    Validate {
        /// Bundle file (`-` for stdin)
        path: PathBuf,

        /// Accept an unsealed draft whose only gaps are baseline hashes
        #[arg(long)]
        draft: bool,
    },

    /// Print the execution mode a bundle resolves to
    Mode {
        /// Bundle file (`-` for stdin)
        path: PathBuf,
    },

    /// Print the payload fingerprint of a bundle's snapshot
    Fingerprint {
        /// Bundle file (`-` for stdin)
        path: PathBuf,
    },

    /// Rewrite a bundle in the current format, upgrading legacy versions
    Migrate {
        /// Bundle file (`-` for stdin)
        path: PathBuf,

        /// Output path (default: stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Write a deliberately altered copy of a bundle
    Tamper {
        /// Bundle file (`-` for stdin)
        path: PathBuf,

        /// Which part of the bundle to alter
        #[arg(short, long, value_enum)]
        kind: TamperKind,

        /// Output path (default: stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Render a draft and record its baseline hashes
    Seal {
        /// Draft bundle file
        path: PathBuf,

        /// Output path (default: overwrite the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Submit the sealed bundle to the claim store
        #[arg(long)]
        save: bool,
    },

    /// Re-render a sealed bundle and compare against its baseline
    Check {
        /// Sealed bundle file
        path: PathBuf,

        /// Record the verdict in the bundle file
        #[arg(long)]
        write: bool,
    },

    /// Submit an already sealed bundle to the claim store
    Save {
        /// Sealed bundle file
        path: PathBuf,
    },

    /// Browse sealed claims in the store
    Claims {
        #[command(subcommand)]
        action: ClaimsAction,
    },
}

#[derive(Subcommand)]
enum ClaimsAction {
    /// List claims, newest first
    List,
    /// Show one claim by id
    Get {
        /// Claim id
        id: String,
    },
    /// Find the claim sealed with a poster hash
    Find {
        /// Poster hash, with or without `sha256:`
        hash: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TamperKind {
    Seed,
    FirstVar,
    Code,
    PosterHash,
    AnimationHash,
}

impl From<TamperKind> for Tamper {
    fn from(kind: TamperKind) -> Self {
        match kind {
            TamperKind::Seed => Tamper::Seed,
            TamperKind::FirstVar => Tamper::FirstVar,
            TamperKind::Code => Tamper::Code,
            TamperKind::PosterHash => Tamper::PosterHash,
            TamperKind::AnimationHash => Tamper::AnimationHash,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    claimseal_core::init_tracing(cli.json, level);

    let config = ClaimsealConfig::resolve(&cli.overrides());
    let json = cli.json;

    match cli.command {
        Commands::Validate { path, draft } => cmd_validate(&path, draft, json).await,
        Commands::Mode { path } => cmd_mode(&path, json).await,
        Commands::Fingerprint { path } => cmd_fingerprint(&path, json).await,
        Commands::Migrate { path, output } => cmd_migrate(&path, &output).await,
        Commands::Tamper { path, kind, output } => {
            cmd_tamper(&path, kind.into(), &output).await
        }
        Commands::Seal { path, output, save } => {
            let mut session = connect(&config)?;
            cmd_seal(&mut session, &path, output.as_deref(), save, json).await
        }
        Commands::Check { path, write } => {
            let mut session = connect(&config)?;
            cmd_check(&mut session, &path, write, json).await
        }
        Commands::Save { path } => {
            let mut session = connect(&config)?;
            cmd_save(&mut session, &path, json).await
        }
        Commands::Claims { action } => {
            let store = config
                .store_client()
                .context("Failed to build claim store client")?;
            match action {
                ClaimsAction::List => cmd_claims_list(&store, json).await,
                ClaimsAction::Get { id } => cmd_claims_get(&store, &id).await,
                ClaimsAction::Find { hash } => cmd_claims_find(&store, &hash).await,
            }
        }
    }
}

fn connect(
    config: &ClaimsealConfig,
) -> Result<VerificationSession<render_client::HttpRenderer, claim_store::HttpClaimStore>> {
    let renderer = config
        .renderer_client()
        .context("Failed to build renderer client")?;
    let store = config
        .store_client()
        .context("Failed to build claim store client")?;
    info!(renderer = %config.renderer.base_url, store = %config.store.base_url, "connected");
    Ok(VerificationSession::new(renderer, store))
}

async fn load_bundle(path: &Path) -> Result<Bundle> {
    let text = read_bundle_text(path)
        .await
        .with_context(|| format!("Failed to read bundle {}", path.display()))?;
    parse_bundle(&text).with_context(|| format!("Failed to parse bundle {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Error carrying the remediation hint, if the failure has one.
fn verify_failure(err: &VerifyError) -> anyhow::Error {
    match err.remediation() {
        Some(hint) => anyhow!("{}\n  hint: {}", err, hint),
        None => anyhow!("{}", err),
    }
}

// ---------------------------------------------------------------------------
// Offline commands
// ---------------------------------------------------------------------------

async fn cmd_validate(path: &Path, draft: bool, json: bool) -> Result<()> {
    let text = read_bundle_text(path)
        .await
        .with_context(|| format!("Failed to read bundle {}", path.display()))?;
    let result = validate(&text);

    if json {
        print_json(&result)?;
    } else {
        println!("{}", result.summary());
        if let Some(version) = &result.source_version {
            println!("Version: {}", version);
        }
        println!("Mode:    {}", result.mode);
        for field in &result.missing_fields {
            println!("  missing {}", field);
        }
        for warning in &result.warnings {
            println!("  warning: {}", warning);
        }
    }

    let accepted = result.is_valid || (draft && result.is_structurally_valid());
    if !accepted {
        bail!("bundle is not valid: {}", result.summary());
    }
    Ok(())
}

async fn cmd_mode(path: &Path, json: bool) -> Result<()> {
    let text = read_bundle_text(path)
        .await
        .with_context(|| format!("Failed to read bundle {}", path.display()))?;
    let mode = validate(&text).mode;
    if json {
        print_json(&serde_json::json!({ "mode": mode }))
    } else {
        println!("{}", mode);
        Ok(())
    }
}

async fn cmd_fingerprint(path: &Path, json: bool) -> Result<()> {
    let bundle = load_bundle(path).await?;
    let fingerprint =
        fingerprint_snapshot(&bundle.snapshot).context("Failed to fingerprint snapshot")?;
    if json {
        print_json(&serde_json::json!({
            "fingerprint": fingerprint,
            "mode": bundle.resolved_mode(),
        }))
    } else {
        println!("{}", fingerprint);
        Ok(())
    }
}

async fn cmd_migrate(path: &Path, output: &Path) -> Result<()> {
    let text = read_bundle_text(path)
        .await
        .with_context(|| format!("Failed to read bundle {}", path.display()))?;
    let from = validate(&text).source_version;
    let bundle =
        parse_bundle(&text).with_context(|| format!("Failed to parse bundle {}", path.display()))?;
    write_bundle(output, &bundle)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    if let Some(from) = from {
        info!(from = %from, to = %bundle.bundle_version, "migrated bundle");
    }
    Ok(())
}

async fn cmd_tamper(path: &Path, tamper: Tamper, output: &Path) -> Result<()> {
    let bundle = load_bundle(path).await?;
    let altered = tamper_bundle(&bundle, tamper);
    write_bundle(output, &altered)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!(?tamper, "wrote tampered bundle");
    Ok(())
}

// ---------------------------------------------------------------------------
// Renderer and store commands
// ---------------------------------------------------------------------------

/// Render a draft, write the sealed bundle, and optionally save it.
async fn cmd_seal<R: Renderer, S: ClaimStore>(
    session: &mut VerificationSession<R, S>,
    path: &Path,
    output: Option<&Path>,
    save: bool,
    json: bool,
) -> Result<()> {
    let mut bundle = load_bundle(path).await?;

    let seal = match session.seal(&bundle).await {
        VerificationState::Verified(Outcome::Sealed(seal)) => seal.clone(),
        VerificationState::Error(err) => return Err(verify_failure(err)),
        other => bail!("seal ended in state {}", other.name()),
    };
    for warning in &seal.warnings {
        warn!("{}", warning);
    }

    seal.apply_to(&mut bundle, Utc::now())
        .context("Failed to apply seal")?;
    let out = output.unwrap_or(path);
    write_bundle(out, &bundle)
        .await
        .with_context(|| format!("Failed to write {}", out.display()))?;
    info!(
        mode = %seal.mode,
        fingerprint = %seal.fingerprint,
        poster_hash = %seal.baseline.poster_hash,
        "sealed {}",
        out.display()
    );

    if save {
        session.save(&bundle).await;
        report_save(session.state(), json)?;
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckOutput<'a> {
    state: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a VerificationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Re-render and compare. Fails unless every required hash matched.
async fn cmd_check<R: Renderer, S: ClaimStore>(
    session: &mut VerificationSession<R, S>,
    path: &Path,
    write: bool,
    json: bool,
) -> Result<()> {
    let mut bundle = load_bundle(path).await?;
    let state = session.check(&bundle).await.clone();

    let verdict = match &state {
        VerificationState::Verified(_) => CheckVerdict::Verified,
        VerificationState::Failed(_) => CheckVerdict::Failed,
        _ => CheckVerdict::Error,
    };
    if write {
        bundle.record_check(verdict, Utc::now());
        write_bundle(path, &bundle)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    if json {
        print_json(&CheckOutput {
            state: state.name(),
            report: state.report(),
            error: match &state {
                VerificationState::Error(err) => Some(err.to_string()),
                _ => None,
            },
        })?;
    } else if let Some(report) = state.report() {
        println!("{}", report.summary());
        for check in std::iter::once(&report.poster).chain(report.animation.as_ref()) {
            println!(
                "  {:<14} expected {}  computed {}  {}",
                check.kind.field(),
                check.expected,
                check.computed.as_deref().unwrap_or("-"),
                if check.matched { "ok" } else { "MISMATCH" }
            );
        }
        for warning in &report.warnings {
            println!("  warning: {}", warning);
        }
    }

    match &state {
        VerificationState::Verified(_) => Ok(()),
        VerificationState::Failed(report) => bail!("{}", report.summary()),
        VerificationState::Error(err) => Err(verify_failure(err)),
        other => bail!("check ended in state {}", other.name()),
    }
}

/// Save a bundle sealed by an earlier `seal` run. Never re-renders.
async fn cmd_save<R: Renderer, S: ClaimStore>(
    session: &mut VerificationSession<R, S>,
    path: &Path,
    json: bool,
) -> Result<()> {
    let bundle = load_bundle(path).await?;
    session
        .adopt_sealed(&bundle)
        .map_err(|e| verify_failure(&e))?;
    session.save(&bundle).await;
    report_save(session.state(), json)
}

fn report_save(state: &VerificationState, json: bool) -> Result<()> {
    match state {
        VerificationState::Saved { seal, claim_id } => {
            if json {
                print_json(&serde_json::json!({
                    "state": state.name(),
                    "claimId": claim_id,
                    "posterHash": normalize_hash(&seal.baseline.poster_hash),
                }))?;
            } else {
                println!("Saved claim {}", claim_id);
            }
            Ok(())
        }
        VerificationState::AuthRequired { message, .. } => bail!(
            "claim store requires authentication: {}\n  hint: pass --store-token or set CLAIMSEAL_STORE_TOKEN, then run `claimseal save`",
            message
        ),
        VerificationState::ValidationError { message, .. } => {
            bail!("claim was not accepted: {}", message)
        }
        VerificationState::SaveFailed { message, .. } => bail!(
            "save failed: {}\n  hint: the bundle is still sealed; retry with `claimseal save`",
            message
        ),
        VerificationState::Error(err) => Err(verify_failure(err)),
        other => bail!("save did not start from state {}", other.name()),
    }
}

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

fn print_record(record: &ClaimRecord) {
    println!(
        "{}  {}  {:<8} {}  {}",
        record.id,
        record.poster_hash,
        record.claim_type,
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        record.title
    );
}

async fn cmd_claims_list<S: ClaimStore>(store: &S, json: bool) -> Result<()> {
    let claims = store.list().await.context("Failed to list claims")?;
    if json {
        return print_json(&claims);
    }
    if claims.is_empty() {
        println!("No sealed claims");
        return Ok(());
    }
    for record in &claims {
        print_record(record);
    }
    Ok(())
}

async fn cmd_claims_get<S: ClaimStore>(store: &S, id: &str) -> Result<()> {
    let record = store
        .get(&ClaimId(id.to_string()))
        .await
        .with_context(|| format!("Failed to fetch claim {}", id))?;
    print_json(&record)
}

async fn cmd_claims_find<S: ClaimStore>(store: &S, hash: &str) -> Result<()> {
    let record = store
        .get_by_hash(&normalize_hash(hash))
        .await
        .with_context(|| format!("No claim sealed with poster hash {}", hash))?;
    print_json(&record)
}
