use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use rsa_sign::ops;
use rsa_sign::rsa::{
    generate_keypair, parse_exponent, parse_signature, KeyPair, PrimePair, RsaBigInt,
};
use rsa_sign::util::{default_signed_path, save_signed_message};
use rsa_sign::config::parse_log_level;
use rsa_sign::Config;

/// Sign files with textbook RSA over a keyed block hash
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct Primes {
    /// First prime
    #[arg(short, long)]
    p: String,

    /// Second prime
    #[arg(short, long)]
    q: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive (e, d, n) from two primes
    Keygen {
        #[command(flatten)]
        primes: Primes,

        /// Use this public exponent instead of sampling one
        #[arg(short, long)]
        e: Option<String>,
    },
    /// Generate a key pair and hash a file under its modulus
    Hash {
        file: PathBuf,

        #[command(flatten)]
        primes: Primes,

        /// Also print the hash as hex
        #[arg(long)]
        hex: bool,
    },
    /// Hash and sign a file, writing content + delimiter + signature
    Sign {
        file: PathBuf,

        #[command(flatten)]
        primes: Primes,

        /// Destination of the signed copy (default: <stem>.signed.txt)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Append an existing signature to a file
    Attach {
        file: PathBuf,

        /// Decimal signature to append
        #[arg(short, long)]
        signature: String,

        /// Destination of the signed copy (default: <stem>.signed.txt)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check the signature embedded in a signed file
    Verify {
        file: PathBuf,

        #[command(flatten)]
        primes: Primes,

        /// Public exponent
        #[arg(short, long)]
        e: String,
    },
}

fn init_tracing(log_level: tracing::Level) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_layer).init();
}

fn to_hex(value: &RsaBigInt) -> String {
    hex::encode(value.to_bytes_be())
}

/// Returns the exit code: 0 on success, 2 when a signature does not verify
fn run(args: Args, config: &Config) -> Result<i32> {
    let rounds = config.miller_rabin_rounds;

    match args.command {
        Command::Keygen { primes, e } => {
            let pair = PrimePair::parse(&primes.p, &primes.q, rounds)?;
            let keypair = match e {
                Some(e) => KeyPair::with_public_exponent(&pair, parse_exponent(&e)?)?,
                None => generate_keypair(&pair)?,
            };
            println!("{}", keypair);
        }
        Command::Hash { file, primes, hex } => {
            let pair = PrimePair::parse(&primes.p, &primes.q, rounds)?;
            let report = ops::hash_file(&file, &pair)
                .with_context(|| format!("failed to hash {}", file.display()))?;
            println!("{}", report.keypair);
            println!("hash: {}", report.hash);
            if hex {
                println!("hash (hex): {}", to_hex(&report.hash));
            }
        }
        Command::Sign {
            file,
            primes,
            output,
        } => {
            let pair = PrimePair::parse(&primes.p, &primes.q, rounds)?;
            let output = output.unwrap_or_else(|| default_signed_path(&file));
            let report = ops::sign_file(&file, &pair, &output)
                .with_context(|| format!("failed to sign {}", file.display()))?;
            println!("{}", report.keypair);
            println!("hash: {}", report.hash);
            println!("signature: {}", report.signature);
            println!("written: {}", report.output.display());
        }
        Command::Attach {
            file,
            signature,
            output,
        } => {
            let signature = parse_signature(&signature)?;
            let output = output.unwrap_or_else(|| default_signed_path(&file));
            save_signed_message(&file, &output, &signature)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("written: {}", output.display());
        }
        Command::Verify { file, primes, e } => {
            let pair = PrimePair::parse(&primes.p, &primes.q, rounds)?;
            let e = parse_exponent(&e)?;
            let report = ops::verify_file(&file, &pair, &e, config.tail_window)
                .with_context(|| format!("failed to verify {}", file.display()))?;

            if report.verification.is_valid {
                println!(
                    "Signature is valid (h = {})",
                    report.verification.recovered_hash
                );
            } else {
                println!(
                    "Signature is NOT valid (recovered {}, expected {})",
                    report.verification.recovered_hash, report.content_hash
                );
                return Ok(2);
            }
        }
    }

    Ok(0)
}

/// [`run`] with errors reported on stderr and mapped to exit code 1
fn execute(args: Args, config: &Config) -> i32 {
    match run(args, config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn main() {
    let args = Args::parse();

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let level = args.log_level.as_deref().unwrap_or(&config.log_level);
    let log_level = match parse_log_level(level) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    init_tracing(log_level);

    process::exit(execute(args, &config));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("rsa-sign").chain(args.iter().copied())).unwrap()
    }

    fn path_str(path: &Path) -> &str {
        path.to_str().unwrap()
    }

    #[test]
    fn test_verify_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.signed.txt");
        let tampered = dir.path().join("tampered.signed.txt");
        fs::write(&good, b"A--SIGNATURE--1388").unwrap();
        fs::write(&tampered, b"B--SIGNATURE--1388").unwrap();
        let config = Config::default();

        let args = parse(&["verify", path_str(&good), "-p", "61", "-q", "53", "-e", "17"]);
        assert_eq!(execute(args, &config), 0);

        let args = parse(&["verify", path_str(&tampered), "-p", "61", "-q", "53", "-e", "17"]);
        assert_eq!(execute(args, &config), 2);

        let missing = dir.path().join("missing.txt");
        let args = parse(&["verify", path_str(&missing), "-p", "61", "-q", "53", "-e", "17"]);
        assert_eq!(execute(args, &config), 1);
    }

    #[test]
    fn test_attach_rejects_small_signature() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("a.txt");
        let output = dir.path().join("a.signed.txt");
        fs::write(&original, b"A").unwrap();
        let config = Config::default();

        let out = path_str(&output);

        let args = parse(&["attach", path_str(&original), "--signature", "1", "-o", out]);
        assert!(run(args, &config).is_err());
        assert!(!output.exists());

        let args = parse(&["attach", path_str(&original), "--signature", "1388", "-o", out]);
        assert_eq!(run(args, &config).unwrap(), 0);
        assert_eq!(fs::read(&output).unwrap(), b"A--SIGNATURE--1388".to_vec());
    }

    #[test]
    fn test_keygen_input_errors() {
        let config = Config::default();

        let args = parse(&["keygen", "-p", "61", "-q", "53", "-e", "17"]);
        assert_eq!(run(args, &config).unwrap(), 0);

        // 15 shares a factor with phi = 3120
        let args = parse(&["keygen", "-p", "61", "-q", "53", "-e", "15"]);
        assert!(run(args, &config).is_err());

        let args = parse(&["keygen", "-p", "6_1", "-q", "53"]);
        assert!(run(args, &config).is_err());
    }

    #[test]
    fn test_sign_writes_default_output() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("note.txt");
        fs::write(&original, b"Hello, RSA!").unwrap();
        let config = Config::default();

        let args = parse(&["sign", path_str(&original), "-p", "61", "-q", "53"]);
        assert_eq!(run(args, &config).unwrap(), 0);
        assert!(dir.path().join("note.signed.txt").exists());
    }

    #[test]
    fn test_cli_shape() {
        let missing_e = ["rsa-sign", "verify", "f.txt", "-p", "61", "-q", "53"];
        assert!(Args::try_parse_from(missing_e).is_err());
        let args = parse(&["--log-level", "debug", "keygen", "-p", "61", "-q", "53"]);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }
}
