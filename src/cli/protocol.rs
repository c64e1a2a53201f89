//! The credential-helper exchange for one invocation: gather attributes,
//! dispatch the operation, write the answer.

use crate::core::encryption::LocalEncryption;
use crate::core::file_lock::RecordsLock;
use crate::core::records_manager::CredentialRecordsManager;
use crate::models::record::{CredentialRecord, RecordOptions};
use anyhow::{Context, Result};
use clap::ValueEnum;
use std::fmt;
use std::io::{BufRead, Write};
use tracing::{debug, info, warn};

/// Helper operation named by git (or `list`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Get,
    Store,
    Erase,
    List,
    /// Anything else; warned about and otherwise ignored.
    Unknown(String),
}

impl Operation {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "get" => Operation::Get,
            "store" => Operation::Store,
            "erase" => Operation::Erase,
            "list" => Operation::List,
            _ => Operation::Unknown(value.to_string()),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Get => write!(f, "get"),
            Operation::Store => write!(f, "store"),
            Operation::Erase => write!(f, "erase"),
            Operation::List => write!(f, "list"),
            Operation::Unknown(name) => write!(f, "{}", name),
        }
    }
}

/// Whether to read attributes from stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Listen {
    /// Listen only when no attributes were given and the operation is not `list`
    Default,
    Yes,
    No,
}

#[derive(Debug, Clone)]
pub struct Request {
    pub operation: Operation,
    pub listen: Listen,
    pub options: RecordOptions,
}

pub fn should_listen(listen: Listen, operation: &Operation, record: &CredentialRecord) -> bool {
    match listen {
        Listen::Yes => true,
        Listen::No => false,
        Listen::Default => record.is_empty() && *operation != Operation::List,
    }
}

/// Read `name=value` lines into `record` until a blank line or end of input.
///
/// Lines that are not UTF-8 or have no name before the first `=` are warned
/// about and skipped. An empty value clears the attribute.
pub fn read_attributes<R: BufRead>(mut input: R, record: &mut CredentialRecord) -> Result<()> {
    info!("listening on stdin, terminated by a blank line");
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = input
            .read_until(b'\n', &mut buf)
            .context("read attribute from stdin")?;
        if read == 0 {
            break;
        }
        let Ok(line) = std::str::from_utf8(&buf) else {
            warn!("input line is not valid UTF-8, skipping");
            continue;
        };
        let line = line
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(line);
        if line.trim().is_empty() {
            break;
        }
        match line.find('=') {
            None => warn!("input line must contain '=', see git-credential(1) INPUT/OUTPUT FORMAT"),
            Some(0) => warn!("input line must name an attribute before '='"),
            Some(idx) => {
                let (name, value) = (&line[..idx], &line[idx + 1..]);
                if value.is_empty() {
                    warn!(attribute = name, "empty value, the attribute will be cleared");
                }
                record.add_or_update_property_value(name, value);
            }
        }
    }
    Ok(())
}

/// Run one request against `manager`, writing any answer to `output`.
pub fn handle<L, E, R, W>(
    request: &Request,
    manager: &CredentialRecordsManager<L, E>,
    input: R,
    mut output: W,
) -> Result<()>
where
    L: RecordsLock,
    E: LocalEncryption,
    R: BufRead,
    W: Write,
{
    let mut record = manager.record_from_options(&request.options);
    if should_listen(request.listen, &request.operation, &record) {
        read_attributes(input, &mut record)?;
    }
    debug!(operation = %request.operation, matcher = %record.redacted(), "dispatching");

    match &request.operation {
        Operation::Get => {
            let answer = manager.get_record(&record)?;
            output
                .write_all(answer.as_bytes())
                .context("write credential to stdout")?;
        }
        Operation::List => {
            for line in manager.list_records(&record)? {
                writeln!(output, "{}", line).context("write listing to stdout")?;
            }
        }
        Operation::Store => manager.store_record(record)?,
        Operation::Erase => manager.erase_records(&record)?,
        Operation::Unknown(name) => warn!(operation = %name, "unknown operation, ignoring"),
    }
    output.flush().context("flush stdout")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(input: &str) -> CredentialRecord {
        let mut record = CredentialRecord::new();
        read_attributes(input.as_bytes(), &mut record).unwrap();
        record
    }

    #[test]
    fn test_operation_parse_is_case_insensitive() {
        assert_eq!(Operation::parse("GET"), Operation::Get);
        assert_eq!(Operation::parse("Store"), Operation::Store);
        assert_eq!(Operation::parse("erase"), Operation::Erase);
        assert_eq!(Operation::parse("list"), Operation::List);
        assert_eq!(
            Operation::parse("capability"),
            Operation::Unknown("capability".into())
        );
    }

    #[test]
    fn test_reads_until_blank_line() {
        let record = read("host=h\nprotocol=https\n\nusername=ignored\n");
        assert_eq!(record.host(), "h");
        assert_eq!(record.protocol(), "https");
        assert_eq!(record.username(), "");
    }

    #[test]
    fn test_reads_until_end_of_input() {
        let record = read("host=h\r\nusername=u");
        assert_eq!(record.host(), "h");
        assert_eq!(record.username(), "u");
    }

    #[test]
    fn test_non_utf8_line_is_skipped() {
        let mut record = CredentialRecord::new();
        read_attributes(&b"password=\xff\xfe\nhost=h\n\n"[..], &mut record).unwrap();
        assert_eq!(record.host(), "h");
        assert_eq!(record.password(), "");
    }

    #[test]
    fn test_value_keeps_further_equals() {
        let record = read("password=a=b=c\n\n");
        assert_eq!(record.password(), "a=b=c");
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let record = read("no equals here\n=value\nhost=h\nbogus=1\n\n");
        assert_eq!(record.host(), "h");
        assert_eq!(record.output_string(), "host=h\n");
    }

    #[test]
    fn test_empty_value_clears() {
        let record = read("host=h\nhost=\n\n");
        assert_eq!(record.host(), "");
    }

    #[test]
    fn test_should_listen_rules() {
        let empty = CredentialRecord::new();
        let mut filled = CredentialRecord::new();
        filled.set_host("h");

        assert!(should_listen(Listen::Default, &Operation::Get, &empty));
        assert!(!should_listen(Listen::Default, &Operation::List, &empty));
        assert!(!should_listen(Listen::Default, &Operation::Store, &filled));
        assert!(should_listen(Listen::Yes, &Operation::List, &filled));
        assert!(!should_listen(Listen::No, &Operation::Get, &empty));
    }
}
