//! SafeBox CLI - Command line interface for vault operations.
//!
//! This tool manages encryption methods and sources, moves files in and
//! out of a vault, and exports or imports portable archives. State lives
//! in a directory-backed key-value store under `SAFEBOX_HOME`.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use zeroize::Zeroizing;

use safebox_archive::{deliver, ArchiveCodec, FileSave};
use safebox_common::{EntryId, SourceIndex, SourcePath};
use safebox_crypto::{MethodConfig, Salt};
use safebox_storage::{FileKv, ReqwestTransport, SourceConfig, SourceContext};
use safebox_vault::{BulkOptions, EntryKind, Vault};

#[derive(Parser)]
#[command(name = "safebox")]
#[command(about = "SafeBox - Encrypted file vault")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// State directory.
    #[arg(long, env = "SAFEBOX_HOME", default_value = ".safebox")]
    home: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage encryption methods.
    Method {
        #[command(subcommand)]
        action: MethodCommand,
    },

    /// Manage storage sources.
    Source {
        #[command(subcommand)]
        action: SourceCommand,
    },

    /// Encrypt a local file into a source.
    Add {
        /// Source name.
        #[arg(short, long)]
        source: String,

        /// File to encrypt.
        #[arg(short, long)]
        file: PathBuf,

        /// Entry name (default: the file name).
        #[arg(short, long)]
        name: Option<String>,

        /// Folder to place the entry in (default: root).
        #[arg(long)]
        folder: Option<String>,
    },

    /// Create a folder.
    Mkdir {
        #[arg(short, long)]
        source: String,

        /// Folder name.
        #[arg(short, long)]
        name: String,

        /// Parent folder (default: root).
        #[arg(long)]
        parent: Option<String>,
    },

    /// List entries of a folder.
    Ls {
        #[arg(short, long)]
        source: String,

        /// Folder to list (default: root).
        #[arg(long)]
        folder: Option<String>,

        /// Only entries whose name contains this text.
        #[arg(long)]
        search: Option<String>,
    },

    /// Decrypt an entry to stdout or a file.
    Cat {
        #[arg(short, long)]
        source: String,

        #[arg(short, long)]
        name: String,

        #[arg(long)]
        folder: Option<String>,

        /// Output file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove entries.
    Rm {
        #[arg(short, long)]
        source: String,

        /// Entry names.
        #[arg(required = true)]
        names: Vec<String>,

        #[arg(long)]
        folder: Option<String>,
    },

    /// Move entries into a folder.
    Mv {
        #[arg(short, long)]
        source: String,

        /// Entry names.
        #[arg(required = true)]
        names: Vec<String>,

        /// Folder the entries are in now (default: root).
        #[arg(long)]
        from: Option<String>,

        /// Target folder (default: root).
        #[arg(long)]
        to: Option<String>,
    },

    /// Copy an entry's ciphertext into its source's storage.
    Push {
        #[arg(short, long)]
        source: String,

        #[arg(short, long)]
        name: String,

        #[arg(long)]
        folder: Option<String>,

        /// Storage folder to write into.
        #[arg(long, default_value = "/")]
        to: String,
    },

    /// Add a ciphertext file from a source's storage as a new entry.
    Pull {
        #[arg(short, long)]
        source: String,

        /// Storage path of the ciphertext file.
        #[arg(short, long)]
        path: String,

        #[arg(long)]
        folder: Option<String>,
    },

    /// Export every source into an archive.
    Export {
        /// Archive file or directory.
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, env = "SAFEBOX_PASSPHRASE", hide_env_values = true)]
        passphrase: Option<String>,
    },

    /// Import an archive, replacing the sources it contains.
    Import {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long, env = "SAFEBOX_PASSPHRASE", hide_env_values = true)]
        passphrase: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodKind {
    Symmetric,
    AsymmetricKey,
    Alternative,
}

#[derive(Subcommand)]
enum MethodCommand {
    /// Add an encryption method. The passphrase is prompted for.
    Add {
        #[arg(short, long)]
        name: String,

        #[arg(short, long, value_enum, default_value = "symmetric")]
        kind: MethodKind,

        /// Use the fixed legacy salt, for data from the web client.
        #[arg(long)]
        legacy_salt: bool,

        /// Private key file for asymmetric-key methods.
        #[arg(long)]
        private_key: Option<PathBuf>,
    },

    /// List encryption methods.
    List,

    /// Remove an encryption method.
    Remove {
        #[arg(short, long)]
        name: String,
    },
}

#[derive(Subcommand)]
enum SourceCommand {
    /// Add a source. Remote sources are probed before they are saved.
    Add {
        #[arg(short, long)]
        name: String,

        /// Encryption method name.
        #[arg(short, long)]
        method: String,

        /// Remote API username; makes this a remote source.
        #[arg(long)]
        username: Option<String>,

        /// Remote root folder.
        #[arg(long, default_value = "/")]
        root_folder: String,

        /// Remote API base URL.
        #[arg(long)]
        base_url: Option<String>,
    },

    /// List sources.
    List,

    /// Remove a source and its entries.
    Remove {
        #[arg(short, long)]
        name: String,
    },

    /// Check a source's configuration.
    Validate {
        #[arg(short, long)]
        name: String,
    },

    /// List a folder of the source's storage.
    Browse {
        #[arg(short, long)]
        name: String,

        #[arg(short, long, default_value = "/")]
        path: String,
    },
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

    let builder = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();
    match EnvFilter::try_from_default_env() {
        Ok(filter) => tracing::subscriber::set_global_default(builder.with_env_filter(filter).finish())?,
        Err(_) => tracing::subscriber::set_global_default(builder.with_max_level(level).finish())?,
    }

    let vault = open_vault(&cli.home)?;

    match cli.command {
        Commands::Method { action } => match action {
            MethodCommand::Add {
                name,
                kind,
                legacy_salt,
                private_key,
            } => cmd_method_add(&vault, name, kind, legacy_salt, private_key).await,
            MethodCommand::List => cmd_method_list(&vault),
            MethodCommand::Remove { name } => cmd_method_remove(&vault, &name),
        },

        Commands::Source { action } => match action {
            SourceCommand::Add {
                name,
                method,
                username,
                root_folder,
                base_url,
            } => cmd_source_add(&vault, name, method, username, root_folder, base_url).await,
            SourceCommand::List => cmd_source_list(&vault),
            SourceCommand::Remove { name } => cmd_source_remove(&vault, &name).await,
            SourceCommand::Validate { name } => cmd_source_validate(&vault, &name).await,
            SourceCommand::Browse { name, path } => cmd_source_browse(&vault, &name, &path).await,
        },

        Commands::Add {
            source,
            file,
            name,
            folder,
        } => cmd_add(&vault, &source, &file, name, folder.as_deref()).await,

        Commands::Mkdir {
            source,
            name,
            parent,
        } => cmd_mkdir(&vault, &source, &name, parent.as_deref()),

        Commands::Ls {
            source,
            folder,
            search,
        } => cmd_ls(&vault, &source, folder.as_deref(), search.as_deref()),

        Commands::Cat {
            source,
            name,
            folder,
            output,
        } => cmd_cat(&vault, &source, &name, folder.as_deref(), output.as_deref()).await,

        Commands::Rm {
            source,
            names,
            folder,
        } => cmd_rm(&vault, &source, &names, folder.as_deref()).await,

        Commands::Mv {
            source,
            names,
            from,
            to,
        } => cmd_mv(&vault, &source, &names, from.as_deref(), to.as_deref()),

        Commands::Push {
            source,
            name,
            folder,
            to,
        } => cmd_push(&vault, &source, &name, folder.as_deref(), &to).await,

        Commands::Pull {
            source,
            path,
            folder,
        } => cmd_pull(&vault, &source, &path, folder.as_deref()).await,

        Commands::Export { output, passphrase } => cmd_export(&vault, &output, passphrase).await,

        Commands::Import { input, passphrase } => cmd_import(&vault, &input, passphrase).await,
    }
}

/// Open the vault state under `home`, creating the directory if needed.
fn open_vault(home: &Path) -> Result<Vault> {
    let kv = FileKv::open(home)
        .with_context(|| format!("Failed to open state directory {}", home.display()))?;
    let http = ReqwestTransport::new().context("Failed to create HTTP client")?;
    let ctx = SourceContext::new(Arc::new(kv), Arc::new(http));
    Vault::open(ctx).context("Failed to load vault state")
}

/// Prompt for a secret without echo.
fn prompt_secret(prompt: &str) -> Result<Zeroizing<String>> {
    let secret = rpassword::prompt_password(prompt).context("Failed to read passphrase")?;
    Ok(Zeroizing::new(secret))
}

fn archive_passphrase(passphrase: Option<String>) -> Result<Zeroizing<String>> {
    match passphrase {
        Some(p) => Ok(Zeroizing::new(p)),
        None => prompt_secret("Archive passphrase: "),
    }
}

fn source_index(vault: &Vault, name: &str) -> Result<SourceIndex> {
    vault
        .config()
        .snapshot()
        .source_index(name)
        .with_context(|| format!("Source \"{}\" not found", name))
}

/// Resolve an entry by name inside a folder.
fn find_entry(vault: &Vault, index: SourceIndex, folder: Option<&str>, name: &str) -> Result<EntryId> {
    vault
        .children_of(index, folder)?
        .into_iter()
        .find(|e| e.name == name)
        .map(|e| e.id)
        .with_context(|| format!("No entry named \"{}\"", name))
}

fn folder_id(vault: &Vault, index: SourceIndex, folder: Option<&str>) -> Result<Option<EntryId>> {
    Ok(vault.entries(index)?.resolve_folder(folder)?)
}

/// Cancel on Ctrl-C.
fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            token.cancel();
        }
    });
    cancel
}

async fn cmd_method_add(
    vault: &Vault,
    name: String,
    kind: MethodKind,
    legacy_salt: bool,
    private_key: Option<PathBuf>,
) -> Result<()> {
    let passphrase = prompt_secret("Method passphrase: ")?;
    let confirm = prompt_secret("Confirm passphrase: ")?;
    if passphrase != confirm {
        anyhow::bail!("Passphrases do not match");
    }

    let config = match kind {
        MethodKind::Symmetric => MethodConfig::Symmetric {
            name,
            passphrase: passphrase.to_string(),
            salt: (!legacy_salt).then(|| Salt::generate().to_base64()),
        },
        MethodKind::AsymmetricKey => {
            let path = private_key.context("--private-key is required for asymmetric-key methods")?;
            let private_key = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            MethodConfig::AsymmetricKey {
                name,
                private_key,
                passphrase: passphrase.to_string(),
            }
        }
        MethodKind::Alternative => MethodConfig::Alternative {
            name,
            passphrase: passphrase.to_string(),
        },
    };

    let label = format!("{} ({})", config.name(), config.kind());
    vault.config().add_method(config).context("Failed to add method")?;
    vault.save()?;
    println!("Method added: {}", label);
    Ok(())
}

fn cmd_method_list(vault: &Vault) -> Result<()> {
    let snapshot = vault.config().snapshot();
    if snapshot.methods.is_empty() {
        println!("No encryption methods.");
    }
    for method in &snapshot.methods {
        let users: Vec<&str> = snapshot
            .sources
            .iter()
            .filter(|s| s.encryption() == method.name())
            .map(|s| s.name())
            .collect();
        println!("  {} [{}] used by: {}", method.name(), method.kind(), users.join(", "));
    }
    Ok(())
}

fn cmd_method_remove(vault: &Vault, name: &str) -> Result<()> {
    vault.config().remove_method(name).context("Failed to remove method")?;
    vault.save()?;
    println!("Method removed: {}", name);
    Ok(())
}

async fn cmd_source_add(
    vault: &Vault,
    name: String,
    method: String,
    username: Option<String>,
    root_folder: String,
    base_url: Option<String>,
) -> Result<()> {
    let config = match username {
        None => SourceConfig::Local {
            name,
            encryption: method,
        },
        Some(username) => {
            let password = prompt_secret("Remote password: ")?;
            SourceConfig::RemoteApi {
                name,
                encryption: method,
                username,
                password: password.to_string(),
                root_folder,
                base_url,
            }
        }
    };

    info!(kind = config.kind(), "Adding source");
    let index = vault
        .config()
        .add_source(config)
        .await
        .context("Failed to add source")?;
    vault.save()?;
    println!("Source added at index {}", index);
    Ok(())
}

fn cmd_source_list(vault: &Vault) -> Result<()> {
    let snapshot = vault.config().snapshot();
    if snapshot.sources.is_empty() {
        println!("No sources.");
    }
    for (idx, source) in snapshot.sources.iter().enumerate() {
        let entries = vault.entries(SourceIndex(idx))?.len();
        println!(
            "  {}: {} [{}] method={} entries={}",
            idx,
            source.name(),
            source.kind(),
            source.encryption(),
            entries
        );
    }
    Ok(())
}

async fn cmd_source_remove(vault: &Vault, name: &str) -> Result<()> {
    let index = source_index(vault, name)?;
    vault.remove_source(index).await.context("Failed to remove source")?;
    vault.save()?;
    println!("Source removed: {}", name);
    Ok(())
}

async fn cmd_source_validate(vault: &Vault, name: &str) -> Result<()> {
    let index = source_index(vault, name)?;
    let snapshot = vault.config().snapshot();
    let config = snapshot
        .source(index)
        .with_context(|| format!("Source \"{}\" not found", name))?;
    vault
        .source_registry()
        .validate(config, vault.context())
        .await
        .with_context(|| format!("Source \"{}\" is not usable", name))?;
    println!("Source \"{}\" is valid.", name);
    Ok(())
}

/// Modification time in the local timezone.
fn format_modified(modified: DateTime<Utc>) -> String {
    modified
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

async fn cmd_source_browse(vault: &Vault, name: &str, path: &str) -> Result<()> {
    let index = source_index(vault, name)?;
    let path = SourcePath::parse(path).context("Invalid path")?;
    let source = vault.source(index)?;
    let entries = source.list(&path).await.context("Failed to list source")?;

    if entries.is_empty() {
        println!("Folder is empty.");
    }
    for entry in entries {
        if entry.is_folder() {
            println!("  [DIR]  {}/", entry.name);
        } else {
            let size = entry.size.map(|s| format!("{} bytes", s)).unwrap_or_default();
            let modified = entry.modified.map(format_modified).unwrap_or_default();
            println!("  [FILE] {} ({}) {}", entry.name, size, modified);
        }
    }
    Ok(())
}

async fn cmd_add(
    vault: &Vault,
    source: &str,
    file: &Path,
    name: Option<String>,
    folder: Option<&str>,
) -> Result<()> {
    let index = source_index(vault, source)?;
    let name = match name {
        Some(name) => name,
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("File has no name")?,
    };
    let parent = folder_id(vault, index, folder)?;

    let content = Zeroizing::new(
        tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?,
    );
    let kind = EntryKind::from_file_name(&name);
    let id = vault
        .add_file(index, &name, kind, &content, parent)
        .await
        .context("Failed to add file")?;
    vault.save()?;

    println!("Added {} as {} ({} bytes, {})", name, id, content.len(), kind);
    Ok(())
}

fn cmd_mkdir(vault: &Vault, source: &str, name: &str, parent: Option<&str>) -> Result<()> {
    let index = source_index(vault, source)?;
    let parent = folder_id(vault, index, parent)?;
    vault
        .add_folder(index, name, parent)
        .context("Failed to create folder")?;
    vault.save()?;
    println!("Folder created: {}", name);
    Ok(())
}

fn cmd_ls(vault: &Vault, source: &str, folder: Option<&str>, search: Option<&str>) -> Result<()> {
    let index = source_index(vault, source)?;
    let entries = match search {
        Some(term) => vault.entries(index)?.search(term).into_iter().cloned().collect(),
        None => vault.children_of(index, folder)?,
    };

    if entries.is_empty() {
        println!("Folder is empty.");
    }
    for entry in entries {
        if entry.is_folder() {
            println!("  [DIR]  {}/", entry.name);
        } else {
            let tags = if entry.tags.is_empty() {
                String::new()
            } else {
                format!(" #{}", entry.tags.join(" #"))
            };
            println!("  [{}] {}{}", entry.kind, entry.name, tags);
        }
    }
    Ok(())
}

async fn cmd_cat(
    vault: &Vault,
    source: &str,
    name: &str,
    folder: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let index = source_index(vault, source)?;
    let id = find_entry(vault, index, folder, name)?;
    let content = vault.decrypt(index, id).await.context("Failed to decrypt entry")?;
    vault.lock(index, id)?;

    match output {
        Some(path) => {
            tokio::fs::write(path, content.as_bytes())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Decrypted {} to {} ({} bytes)", name, path.display(), content.len());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

async fn cmd_rm(vault: &Vault, source: &str, names: &[String], folder: Option<&str>) -> Result<()> {
    let index = source_index(vault, source)?;
    let ids = names
        .iter()
        .map(|name| find_entry(vault, index, folder, name))
        .collect::<Result<Vec<_>>>()?;

    let report = vault
        .bulk_delete(index, &ids, &BulkOptions::sequential())
        .await?;
    vault.save()?;

    for (name, outcome) in names.iter().zip(&report.outcomes) {
        match &outcome.result {
            Ok(()) => println!("Removed: {}", name),
            Err(e) => println!("Failed to remove {}: {}", name, e),
        }
    }
    if !report.is_success() {
        anyhow::bail!("{} of {} entries were not removed", report.failures, ids.len());
    }
    Ok(())
}

fn cmd_mv(
    vault: &Vault,
    source: &str,
    names: &[String],
    from: Option<&str>,
    to: Option<&str>,
) -> Result<()> {
    let index = source_index(vault, source)?;
    let ids = names
        .iter()
        .map(|name| find_entry(vault, index, from, name))
        .collect::<Result<Vec<_>>>()?;

    let moved = vault
        .move_entries(index, &ids, to)
        .context("Failed to move entries")?;
    vault.save()?;
    println!("Moved {} entries to {}", moved, to.unwrap_or("/"));
    if moved < ids.len() {
        println!("Folders are not moved.");
    }
    Ok(())
}

async fn cmd_push(vault: &Vault, source: &str, name: &str, folder: Option<&str>, to: &str) -> Result<()> {
    let index = source_index(vault, source)?;
    let id = find_entry(vault, index, folder, name)?;
    let target = SourcePath::parse(to).context("Invalid storage path")?;
    let path = vault
        .push(index, id, &target)
        .await
        .context("Failed to store ciphertext")?;
    println!("Stored {} at {}", name, path);
    Ok(())
}

async fn cmd_pull(vault: &Vault, source: &str, path: &str, folder: Option<&str>) -> Result<()> {
    let index = source_index(vault, source)?;
    let path = SourcePath::parse(path).context("Invalid storage path")?;
    let parent = folder_id(vault, index, folder)?;
    let id = vault
        .pull(index, &path, parent)
        .await
        .context("Failed to load ciphertext")?;
    vault.save()?;
    println!("Added {} as {}", path, id);
    Ok(())
}

async fn cmd_export(vault: &Vault, output: &Path, passphrase: Option<String>) -> Result<()> {
    let passphrase = archive_passphrase(passphrase)?;
    let codec = ArchiveCodec::new(passphrase.as_str())?;
    let cancel = cancel_on_interrupt();

    let sources = vault.config().snapshot().sources.len();
    let bytes = codec
        .export_store(vault.store(), (0..sources).map(SourceIndex), &cancel)
        .await
        .context("Failed to export vault")?;
    deliver(&bytes, None, &FileSave::new(output))
        .await
        .context("Failed to save archive")?;

    println!("Exported {} sources ({} bytes)", sources, bytes.len());
    Ok(())
}

async fn cmd_import(vault: &Vault, input: &Path, passphrase: Option<String>) -> Result<()> {
    let passphrase = archive_passphrase(passphrase)?;
    let codec = ArchiveCodec::new(passphrase.as_str())?;
    let cancel = cancel_on_interrupt();

    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let indices = codec
        .import_into(vault.store(), &bytes, &cancel)
        .await
        .context("Failed to import archive")?;
    vault.save()?;

    let configured = vault.config().snapshot().sources.len();
    for index in &indices {
        if index.get() >= configured {
            warn!(source = %index, "Archive holds a source that is not configured");
        }
    }
    println!("Imported {} sources", indices.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_modified_uses_local_time() {
        let utc = Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 0).unwrap();
        let expected = utc.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string();
        assert_eq!(format_modified(utc), expected);
        assert_eq!(format_modified(utc).len(), "2024-03-09 12:30".len());
    }
}
