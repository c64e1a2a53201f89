//! Command-line surface and composition root.

use crate::constants;
use crate::core::encryption::KeyringEncryption;
use crate::core::file_lock::NamedFileLock;
use crate::core::paths;
use crate::core::records_manager::CredentialRecordsManager;
use crate::models::record::RecordOptions;
use crate::util::logging::{self, ShowLogger};
use anyhow::Result;
use clap::Parser;
use std::io;
use std::time::Duration;
use tracing::debug;

pub mod protocol;

use protocol::{Listen, Operation, Request};

fn parse_operation(s: &str) -> Result<Operation, String> {
    if s.trim().is_empty() {
        return Err("operation cannot be empty".into());
    }
    Ok(Operation::parse(s.trim()))
}

#[derive(Parser, Debug)]
#[command(
    name = "git-credential-vault",
    version,
    about = "git credential helper storing credentials encrypted for the current user",
    after_help = "See git-credential(1) for the helper protocol."
)]
pub struct Cli {
    /// get, store, or erase (git's helper operations), or list to show stored credentials
    #[arg(value_parser = parse_operation)]
    pub operation: Operation,

    /// Protocol over which the credential will be used (e.g. https)
    #[arg(long, alias = "Protocol")]
    pub protocol: Option<String>,

    /// Remote host[:port] for a network credential
    #[arg(short = 'H', long, alias = "Host")]
    pub host: Option<String>,

    /// Path with which the credential will be used (e.g. the repository path on the server)
    #[arg(long, alias = "Path")]
    pub path: Option<String>,

    /// Credential's username
    #[arg(short = 'U', long, alias = "Username")]
    pub username: Option<String>,

    /// Credential's password, when storing
    #[arg(short = 'P', long, alias = "Password")]
    pub password: Option<String>,

    /// URL to decompose into the other attributes; applied before them
    #[arg(long, alias = "Url")]
    pub url: Option<String>,

    /// Store location (file or directory); defaults to $GIT_CREDENTIAL_VAULT_LOCATION or ~/.git-credential-vault
    #[arg(short = 'r', long, alias = "ReportLocation", value_name = "PATH")]
    pub report_location: Option<String>,

    /// Read attributes from stdin: default|yes|no
    #[arg(short = 'L', long, alias = "Listen", value_enum, ignore_case = true, default_value = "default")]
    pub listen: Listen,

    /// Logger output on stderr, comma separated: none,info,warn,error,all
    #[arg(
        short = 's',
        long,
        alias = "ShowLogger",
        value_enum,
        ignore_case = true,
        value_delimiter = ',',
        default_value = "error"
    )]
    pub show_logger: Vec<ShowLogger>,

    /// Seconds to wait for the store lock
    #[arg(
        long,
        env = "GIT_CREDENTIAL_VAULT_LOCK_TIMEOUT",
        default_value_t = constants::DEFAULT_LOCK_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub lock_timeout: u64,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        logging::init(&self.show_logger);

        let store_file = paths::resolve_store_file(self.report_location.as_deref())?;
        debug!(store = %store_file.display(), "resolved store");
        let lock = NamedFileLock::for_store(&store_file, constants::APP_NAMESPACE);
        let encryption = KeyringEncryption::for_current_user()?;
        let manager = CredentialRecordsManager::new(
            store_file,
            lock,
            encryption,
            Duration::from_secs(self.lock_timeout),
        );

        let request = self.request();
        protocol::handle(&request, &manager, io::stdin().lock(), io::stdout().lock())
    }

    pub fn request(&self) -> Request {
        Request {
            operation: self.operation.clone(),
            listen: self.listen,
            options: RecordOptions {
                protocol: self.protocol.clone(),
                host: self.host.clone(),
                path: self.path.clone(),
                username: self.username.clone(),
                password: self.password.clone(),
                url: self.url.clone(),
            },
        }
    }
}

/// Process exit code for a failed run: the OS error code carried by the
/// error chain, or -1 when there is none.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<io::Error>())
        .find_map(io::Error::raw_os_error)
        .filter(|code| *code != 0)
        .unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_parse_operation_and_flags() {
        let cli = Cli::try_parse_from([
            "git-credential-vault",
            "Store",
            "--url",
            "https://example.com/repo",
            "-U",
            "user",
            "--listen",
            "NO",
            "-s",
            "warn,info",
        ])
        .unwrap();
        assert_eq!(cli.operation, Operation::Store);
        assert_eq!(cli.listen, Listen::No);
        assert_eq!(cli.show_logger, vec![ShowLogger::Warn, ShowLogger::Info]);
        assert_eq!(cli.lock_timeout, constants::DEFAULT_LOCK_TIMEOUT_SECS);

        let request = cli.request();
        assert_eq!(request.options.url.as_deref(), Some("https://example.com/repo"));
        assert_eq!(request.options.username.as_deref(), Some("user"));
    }

    #[test]
    fn test_pascal_case_aliases() {
        let cli = Cli::try_parse_from([
            "git-credential-vault",
            "get",
            "--Host",
            "h",
            "--Protocol",
            "https",
        ])
        .unwrap();
        assert_eq!(cli.host.as_deref(), Some("h"));
        assert_eq!(cli.protocol.as_deref(), Some("https"));
    }

    #[test]
    fn test_unknown_operation_parses() {
        let cli = Cli::try_parse_from(["git-credential-vault", "capability"]).unwrap();
        assert_eq!(cli.operation, Operation::Unknown("capability".into()));
    }

    #[test]
    fn test_missing_operation_is_an_error() {
        assert!(Cli::try_parse_from(["git-credential-vault"]).is_err());
    }

    #[test]
    fn test_zero_lock_timeout_rejected() {
        assert!(Cli::try_parse_from(["git-credential-vault", "get", "--lock-timeout", "0"]).is_err());
    }

    #[test]
    fn test_exit_code_from_os_error() {
        let err = Err::<(), _>(io::Error::from_raw_os_error(13))
            .context("open store")
            .unwrap_err();
        assert_eq!(exit_code(&err), 13);
        assert_eq!(exit_code(&anyhow::anyhow!("plain failure")), -1);
    }
}
