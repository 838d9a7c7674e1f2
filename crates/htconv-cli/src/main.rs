use clap::Parser;
use htconv::{Credentials, HashAlgorithm, Htpasswd};
use snafu::{ResultExt, Whatever};
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

type Result<T, E = Whatever> = std::result::Result<T, E>;

/// Convert plaintext `username password` files into htpasswd files.
#[derive(Parser)]
#[command(name = "htconv")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Hash every password of a plaintext credentials file
    Convert {
        /// File with one `username password` pair per line
        file: PathBuf,
        /// Where to write the htpasswd file (defaults to FILE itself)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Hash algorithm to use (md5, sha1, bcrypt)
        #[arg(long, env = "HTCONV_ALGORITHM", default_value = "md5")]
        algorithm: String,
    },

    /// Verify a user's password against an htpasswd file
    Verify {
        /// Path to the htpasswd file
        file: PathBuf,
        /// Username to verify
        username: String,
        /// Read password from stdin instead of prompting
        #[arg(long)]
        password: bool,
    },

    /// List all users in an htpasswd file
    List {
        /// Path to the htpasswd file
        file: PathBuf,
    },
}

fn init_tracing(verbose: u8) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn".to_string(),
            1 => "info".to_string(),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        },
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn read_password_from_stdin() -> Result<Zeroizing<String>> {
    let mut password = Zeroizing::new(String::new());
    io::stdin()
        .read_to_string(&mut password)
        .whatever_context("Can't read password from stdin")?;
    Ok(Zeroizing::new(password.trim_end().to_string()))
}

fn prompt_password() -> Result<Zeroizing<String>> {
    rpassword::prompt_password("Enter password: ")
        .whatever_context("Can't prompt for password")
        .map(Zeroizing::new)
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Convert {
            file,
            output,
            algorithm,
        } => {
            let algo: HashAlgorithm = algorithm
                .parse()
                .whatever_context("Can't parse algorithm name")?;
            let credentials =
                Credentials::open(&file).whatever_context("Can't read credentials file")?;

            let htpasswd = Htpasswd::from_credentials(&credentials, algo)
                .whatever_context("Can't hash passwords")?;
            let output = output.unwrap_or(file);
            htpasswd
                .save(&output)
                .whatever_context("Can't save password file")?;

            tracing::info!(path = %output.display(), users = htpasswd.user_count(), "converted");
            println!("File has been converted to a htpasswd file");
            Ok(())
        }

        Commands::Verify {
            file,
            username,
            password: from_stdin,
        } => {
            let password = if from_stdin {
                read_password_from_stdin()?
            } else {
                prompt_password()?
            };

            let htpasswd = Htpasswd::open(&file).whatever_context("Can't open password file")?;

            match htpasswd.verify_user(&username, &password) {
                Ok(true) => {
                    println!("user {}: password correct", username);
                    Ok(())
                }
                Ok(false) => {
                    snafu::whatever!("user {}: password incorrect", username)
                }
                Err(e) => {
                    snafu::whatever!("user {}: {}", username, e)
                }
            }
        }

        Commands::List { file } => {
            let htpasswd = Htpasswd::open(&file).whatever_context("Can't open password file")?;

            for user in htpasswd.list_users() {
                println!("{}", user);
            }

            Ok(())
        }
    }
}

#[snafu::report]
fn main() -> Result<()> {
    run()
}
