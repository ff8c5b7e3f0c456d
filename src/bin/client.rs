//! FileVault CLI Client
//!
//! Command-line interface for the FileVault backup protocol.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use filevault::config::{read_backup_list, read_server_info};
use filevault::{network, Client, ClientId, Config, Result, StatusCode, VaultError};
use tracing_subscriber::{fmt, EnvFilter};

/// FileVault CLI
#[derive(Parser, Debug)]
#[command(name = "filevault-client")]
#[command(about = "CLI for the FileVault backup server")]
#[command(version)]
struct Args {
    /// Server address (host:port); read from --server-info when omitted
    #[arg(short, long)]
    server: Option<String>,

    /// File holding the server address on its first line
    #[arg(long, default_value = "server.info")]
    server_info: PathBuf,

    /// Client id (random when omitted)
    #[arg(long)]
    client_id: Option<u32>,

    /// Payload chunk size in bytes
    #[arg(short, long, default_value = "1024")]
    chunk_size: usize,

    /// Directory the file list is downloaded into
    #[arg(short, long, default_value = ".")]
    download_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Back up a file
    Backup {
        /// The file to upload
        file: PathBuf,
    },

    /// Restore a file
    Restore {
        /// The file to download
        file: PathBuf,
    },

    /// Delete a backed-up file
    Delete {
        /// The file to delete on the server
        file: PathBuf,
    },

    /// List backed-up files
    List,

    /// Run the standard sequence against the first two files of a backup list
    Script {
        /// File listing the files to back up, one per line
        #[arg(long, default_value = "backup.info")]
        backup_info: PathBuf,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,filevault=info"));

    fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let server_addr = match args.server {
        Some(addr) => addr,
        None => read_server_info(&args.server_info)?,
    };

    let config = Config::builder()
        .server_addr(server_addr)
        .chunk_size(args.chunk_size)
        .download_dir(args.download_dir)
        .build();

    let client_id = args.client_id.map(ClientId::new).unwrap_or_else(ClientId::random);
    let client = Client::new(client_id, &config)?;

    println!("[Client] client_id = {}", client.client_id());
    println!("[Client] Server info: {}", config.server_addr);

    match args.command {
        Commands::Backup { file } => backup(&client, &config, &file),
        Commands::Restore { file } => restore(&client, &config, &file),
        Commands::Delete { file } => delete(&client, &config, &file),
        Commands::List => list(&client, &config),
        Commands::Script { backup_info } => script(&client, &config, &backup_info),
    }
}

// =============================================================================
// Operations (one connection each)
// =============================================================================

fn backup(client: &Client, config: &Config, file: &Path) -> Result<()> {
    println!("[Client] Requesting server to backup file: {}", file.display());
    let mut conn = network::connect(config)?;
    let status = client.backup_file(file, &mut conn)?;
    report(status, StatusCode::SuccessBackupFile);
    Ok(())
}

fn restore(client: &Client, config: &Config, file: &Path) -> Result<()> {
    println!("[Client] Requesting server to restore file: {}", file.display());
    let mut conn = network::connect(config)?;
    let restored = client.restore_file(file, &mut conn)?;
    report(restored.status, StatusCode::SuccessRestoreFile);
    if let Some(path) = restored.path {
        println!("[Client] Restored into {}", path.display());
    }
    Ok(())
}

fn delete(client: &Client, config: &Config, file: &Path) -> Result<()> {
    println!("[Client] Requesting server to delete file: {}", file.display());
    let mut conn = network::connect(config)?;
    let status = client.delete_file(file, &mut conn)?;
    report(status, StatusCode::SuccessDeleteFile);
    Ok(())
}

fn list(client: &Client, config: &Config) -> Result<()> {
    println!("[Client] Requesting server to generate files list...");
    let mut conn = network::connect(config)?;
    let list = client.generate_files_list(&mut conn)?;
    report(list.status, StatusCode::SuccessGenerateFileList);

    if list.status == StatusCode::SuccessGenerateFileList {
        println!("[Client] Files on server:");
        for entry in list.entries()? {
            println!("         {}", entry);
        }
    }
    Ok(())
}

fn script(client: &Client, config: &Config, backup_info: &Path) -> Result<()> {
    let files = read_backup_list(backup_info)?;
    println!("[Client] Backup info:");
    for file in &files {
        println!("         {}", file);
    }

    let [first, second, ..] = files.as_slice() else {
        return Err(VaultError::Config(format!(
            "{} must list at least two files",
            backup_info.display()
        )));
    };
    let first = Path::new(first);
    let second = Path::new(second);

    list(client, config)?;
    backup(client, config, first)?;
    backup(client, config, second)?;
    list(client, config)?;
    restore(client, config, first)?;
    delete(client, config, first)?;
    restore(client, config, first)?;

    println!("[Client] Exiting program...");
    Ok(())
}

fn report(status: StatusCode, expected: StatusCode) {
    if status == expected {
        println!("[Client] Request succeeded, status = {}", status);
    } else {
        println!("[Client] Request failed, status = {}", status);
    }
}
