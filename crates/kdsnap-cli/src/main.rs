//! kdsnap: escrowed brigade storage snapshots
//!
//! Commands:
//!   snapshot  - seal the brigade storage, print the envelope JSON
//!   restore   - recover the storage from an envelope
//!   enc / dec - OpenSSL-compatible `aes-256-cbc -pbkdf2 -md sha256` filter
//!   keys      - list RSA fingerprints of an authorized_keys file
//!
//! The PSK is read base64-encoded from stdin; stdout only ever carries the
//! envelope or the recovered data, logs go to stderr.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use clap::{Parser, Subcommand, ValueEnum};
use rsa::traits::PublicKeyParts;
use secrecy::{ExposeSecret, SecretSlice, SecretString};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::io::AsyncWriteExt;
use tracing::info;
use zeroize::Zeroizing;

use kdsnap_core::config::{KdsnapConfig, KeysConfig, SecretLayout, SnapshotConfig};
use kdsnap_core::{EncryptedBrigade, PSK_SIZE};
use kdsnap_crypto::{
    decrypt_aes256_cbc, encrypt_aes256_cbc, find_realm_key, keyring::rsa_public_keys,
    load_authority_keys, load_private_key, Fingerprint,
};
use kdsnap_snap::{
    compress_encrypt, decrypt_decompress, make_snapshot, recover_snapshot, RecoveryKeys, SnapOpts,
};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "kdsnap",
    version,
    about = "Escrowed brigade storage snapshots",
    long_about = "kdsnap: seal a keydesk brigade storage for a realm and its authorities, and recover it"
)]
struct Cli {
    /// Path to kdsnap.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "KDSNAP_CONFIG",
        default_value = "/etc/vg-keydesk-snap/kdsnap.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); KDSNAP_LOG or RUST_LOG take precedence
    #[arg(long)]
    log: Option<String>,

    /// Log format (json, text)
    #[arg(long, env = "KDSNAP_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Seal the brigade storage and print the envelope JSON
    ///
    /// The base64 PSK (32 bytes decoded) is read from stdin.
    Snapshot(SnapshotArgs),

    /// Recover the brigade storage from an envelope
    ///
    /// The base64 PSK used for sealing is read from stdin.
    Restore {
        /// Envelope JSON file
        #[arg(long)]
        envelope: PathBuf,
        /// Realm private key (OpenSSH, PKCS#1 or PKCS#8 PEM)
        #[arg(long)]
        realm_key: PathBuf,
        /// Private key of any one authority the envelope was sealed for
        #[arg(long)]
        authority_key: PathBuf,
        /// Final secret layout used when sealing (overrides config)
        #[arg(long)]
        layout: Option<LayoutArg>,
    },

    /// Encrypt stdin to stdout, OpenSSL salted AES-256-CBC
    Enc {
        /// Passphrase
        #[arg(long, env = "SECRET", hide_env_values = true)]
        secret: String,
        /// gzip before encrypting, like a snapshot payload
        #[arg(long)]
        gzip: bool,
    },

    /// Decrypt stdin to stdout, OpenSSL salted AES-256-CBC
    Dec {
        /// Passphrase
        #[arg(long, env = "SECRET", hide_env_values = true)]
        secret: String,
        /// gunzip after decrypting, like a snapshot payload
        #[arg(long)]
        gunzip: bool,
    },

    /// List RSA key fingerprints of an authorized_keys file
    Keys {
        /// authorized_keys file
        file: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct SnapshotArgs {
    /// Tag of the snapshot run
    #[arg(long)]
    tag: String,
    /// Global snapshot time (unix seconds)
    #[arg(long)]
    stime: i64,
    /// Realm key fingerprint (SHA256:...)
    #[arg(long)]
    rfp: String,
    /// Maintenance time (unix seconds) written to the maintenance file, 0 for none
    #[arg(long, default_value_t = 0)]
    mnt: i64,
    /// Brigade id (default: current user)
    #[arg(long)]
    id: Option<String>,
    /// Brigade db directory (default: <home root>/<brigade id>)
    #[arg(long, short = 'd')]
    db_dir: Option<PathBuf>,
    /// Directory with realms_keys and authorities_keys (overrides config)
    #[arg(long)]
    keys_dir: Option<PathBuf>,
    /// Final secret layout (overrides config)
    #[arg(long)]
    layout: Option<LayoutArg>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LayoutArg {
    Legacy,
    Binary,
}

impl From<LayoutArg> for SecretLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Legacy => SecretLayout::Legacy,
            LayoutArg::Binary => SecretLayout::Binary,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = KdsnapConfig::load(&cli.config)
        .with_context(|| format!("loading config: {}", cli.config.display()))?;

    let level = cli.log.as_deref().unwrap_or(&config.log.level);
    let format = cli.log_format.unwrap_or(match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(level, format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "kdsnap starting"
    );

    match cli.command {
        Commands::Snapshot(args) => cmd_snapshot(&config, args).await,
        Commands::Restore {
            envelope,
            realm_key,
            authority_key,
            layout,
        } => {
            let layout = layout.map_or(config.snapshot.secret_layout, Into::into);
            cmd_restore(&config.keys, &envelope, &realm_key, &authority_key, layout)
        }
        Commands::Enc { secret, gzip } => cmd_enc(&SecretString::from(secret), gzip),
        Commands::Dec { secret, gunzip } => cmd_dec(&SecretString::from(secret), gunzip),
        Commands::Keys { file } => cmd_keys(&config.keys, &file),
    }
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_env("KDSNAP_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── snapshot ──────────────────────────────────────────────────────────────────

async fn cmd_snapshot(config: &KdsnapConfig, args: SnapshotArgs) -> Result<()> {
    if args.tag.is_empty() {
        anyhow::bail!("empty tag");
    }
    let realm_fp = Fingerprint::parse(&args.rfp).context("invalid realm fingerprint")?;
    let global_snap_at =
        OffsetDateTime::from_unix_timestamp(args.stime).context("invalid snapshot time")?;

    let user = std::env::var("USER").context("cannot determine current user")?;
    let cwd = std::env::current_dir().context("current dir")?;
    let (brigade_id, db_dir) = resolve_brigade(
        &config.snapshot,
        args.id.as_deref(),
        args.db_dir.as_deref(),
        &user,
        &cwd,
    );

    let psk = read_psk(std::io::stdin().lock()).context("read PSK")?;

    if args.mnt != 0 {
        let path = db_dir.join(&config.snapshot.maintenance_file);
        write_maintenance_file(&path, args.mnt)
            .with_context(|| format!("write maintenance file: {}", path.display()))?;
    }

    let mut keys = config.keys.clone();
    if let Some(dir) = args.keys_dir {
        keys.dir = dir;
    }
    let realm_key = find_realm_key(&keys.realms_keys_path(), &realm_fp, keys.max_file_size)
        .context("find realm key")?;
    let authorities = load_authority_keys(&keys.authorities_keys_path(), keys.max_file_size)
        .context("read authorities keys")?;

    let storage_path = db_dir.join(&config.snapshot.storage_file);
    let source = tokio::fs::File::open(&storage_path)
        .await
        .with_context(|| format!("open: {}", storage_path.display()))?;

    info!(
        brigade_id = %brigade_id,
        storage = %storage_path.display(),
        authorities = authorities.len(),
        "sealing snapshot"
    );

    let opts = SnapOpts {
        tag: args.tag,
        brigade_id,
        global_snap_at,
        psk,
        realm_fp,
        realm_key,
        authorities,
        layout: args.layout.map_or(config.snapshot.secret_layout, Into::into),
    };
    let envelope = make_snapshot(source, &opts).await.context("snapshot")?;

    let json = envelope.to_json_pretty().context("encode envelope")?;
    let mut stdout = tokio::io::stdout();
    stdout.write_all(&json).await.context("write snapshot")?;
    stdout.flush().await.context("write snapshot")?;
    Ok(())
}

/// Brigade id and db directory for a snapshot run.
///
/// Without an explicit id, or with the current user's own, the brigade is
/// the current user and lives under the home root. Any other id is taken to
/// be a test run in the current directory.
fn resolve_brigade(
    snapshot: &SnapshotConfig,
    id: Option<&str>,
    db_dir: Option<&Path>,
    user: &str,
    cwd: &Path,
) -> (String, PathBuf) {
    let (id, default_dir) = match id {
        None | Some("") => (user.to_string(), snapshot.home_root.join(user)),
        Some(id) if id == user => (user.to_string(), snapshot.home_root.join(user)),
        Some(id) => (id.to_string(), cwd.to_path_buf()),
    };

    let dir = match db_dir.or(snapshot.db_dir.as_deref()) {
        Some(dir) => cwd.join(dir),
        None => default_dir,
    };
    (id, dir)
}

/// Read a base64 PSK and require exactly [`PSK_SIZE`] decoded bytes.
fn read_psk<R: Read>(mut r: R) -> Result<SecretSlice<u8>> {
    let mut encoded = Zeroizing::new(String::new());
    r.read_to_string(&mut encoded)?;

    let psk = Zeroizing::new(STANDARD.decode(encoded.trim()).context("decode base64")?);
    if psk.len() != PSK_SIZE {
        anyhow::bail!("PSK must be {PSK_SIZE} bytes, got {}", psk.len());
    }
    Ok(SecretSlice::from(psk.to_vec()))
}

fn write_maintenance_file(path: &Path, until: i64) -> Result<()> {
    std::fs::write(path, until.to_string())?;
    Ok(())
}

// ── restore ───────────────────────────────────────────────────────────────────

fn cmd_restore(
    keys: &KeysConfig,
    envelope_path: &Path,
    realm_key: &Path,
    authority_key: &Path,
    layout: SecretLayout,
) -> Result<()> {
    let psk = read_psk(std::io::stdin().lock()).context("read PSK")?;

    let data = std::fs::read(envelope_path)
        .with_context(|| format!("reading envelope: {}", envelope_path.display()))?;
    let envelope = EncryptedBrigade::from_json(&data)
        .with_context(|| format!("parsing envelope: {}", envelope_path.display()))?;

    let realm = load_private_key(realm_key, keys.max_file_size)
        .with_context(|| format!("realm key: {}", realm_key.display()))?;
    let authority = load_private_key(authority_key, keys.max_file_size)
        .with_context(|| format!("authority key: {}", authority_key.display()))?;
    let recovery = RecoveryKeys::new(realm, authority).context("fingerprint authority key")?;

    info!(
        brigade_id = %envelope.brigade_id,
        tag = %envelope.tag,
        authority = %recovery.authority.0,
        ?layout,
        "recovering snapshot"
    );
    let storage = recover_snapshot(&envelope, &recovery, psk.expose_secret(), layout)
        .context("recover snapshot")?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&storage).context("write storage")?;
    stdout.flush().context("write storage")?;
    Ok(())
}

// ── enc / dec ─────────────────────────────────────────────────────────────────

fn cmd_enc(secret: &SecretString, gzip: bool) -> Result<()> {
    let secret = secret.expose_secret().as_bytes();
    let stdin = std::io::stdin().lock();
    let mut stdout = std::io::stdout().lock();

    if gzip {
        compress_encrypt(stdin, &mut stdout, secret).context("encrypt")?;
    } else {
        encrypt_aes256_cbc(stdin, &mut stdout, secret).context("encrypt")?;
    }
    Ok(())
}

fn cmd_dec(secret: &SecretString, gunzip: bool) -> Result<()> {
    let secret = secret.expose_secret().as_bytes();
    let stdin = std::io::stdin().lock();
    let mut stdout = std::io::stdout().lock();

    if gunzip {
        decrypt_decompress(stdin, &mut stdout, secret).context("decrypt")?;
    } else {
        decrypt_aes256_cbc(stdin, &mut stdout, secret).context("decrypt")?;
    }
    stdout.flush().context("decrypt")?;
    Ok(())
}

// ── keys ──────────────────────────────────────────────────────────────────────

fn cmd_keys(keys: &KeysConfig, file: &Path) -> Result<()> {
    let data = kdsnap_core::fs::read_file_capped(file, keys.max_file_size)?;
    let text = std::str::from_utf8(&data)
        .with_context(|| format!("{} is not valid UTF-8", file.display()))?;

    for key in rsa_public_keys(text).with_context(|| format!("parsing {}", file.display()))? {
        println!("{}  RSA {}", key.fingerprint, key.key.rsa().size() * 8);
    }
    Ok(())
}
