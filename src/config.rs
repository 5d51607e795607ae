use std::path::PathBuf;

use regex::Regex;
use thiserror::Error;

/// Errors that can occur during command-line argument parsing.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum CliError {
    #[error("Invalid command line flag")]
    InvalidCommandLineFlag,
    #[error("Invalid port flag value")]
    InvalidPortFlagValue,
    #[error("Invalid master address")]
    InvalidMasterAddress,
    #[error("Invalid master port")]
    InvalidMasterPort,
}

/// The server's replication role. Presence of `--replicaof` selects
/// `Replica` with the master's host and port.
#[derive(Debug, PartialEq, Clone)]
pub enum Role {
    Master,
    Replica(String, u16),
}

impl Role {
    /// INFO reports the replica role under the legacy name.
    pub fn name(&self) -> &'static str {
        match self {
            Role::Master => "master",
            Role::Replica(_, _) => "slave",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub role: Role,
    pub dir: String,
    pub dbfilename: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 6379,
            role: Role::Master,
            dir: ".".to_string(),
            dbfilename: "dump.rdb".to_string(),
        }
    }
}

impl ServerConfig {
    /// Parses the CLI surface: `--port`, `--replicaof "<host> <port>"`,
    /// `--dir`, `--dbfilename`. The first argument (program name) is
    /// skipped.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Self, CliError> {
        let mut config = Self::default();
        let mut iter = args.into_iter().skip(1);

        while let Some(flag) = iter.next() {
            let Some(value) = iter.next() else {
                return Err(CliError::InvalidCommandLineFlag);
            };

            match flag.as_str() {
                "--port" => config.port = validate_port(&value, CliError::InvalidPortFlagValue)?,
                "--replicaof" => {
                    let (host, port) = validate_master_address(&value)?;
                    config.role = Role::Replica(host, port);
                }
                "--dir" => config.dir = value,
                "--dbfilename" => config.dbfilename = value,
                _ => return Err(CliError::InvalidCommandLineFlag),
            }
        }

        Ok(config)
    }

    /// Where the boot-time RDB snapshot lives, per `--dir`/`--dbfilename`.
    pub fn rdb_path(&self) -> PathBuf {
        PathBuf::from(&self.dir).join(&self.dbfilename)
    }
}

fn validate_port(port: &str, error: CliError) -> Result<u16, CliError> {
    let port_number = port.parse::<u16>().map_err(|_| error.clone())?;

    if port_number == 0 {
        return Err(error);
    }

    Ok(port_number)
}

/// The `--replicaof` value is a single space-separated "host port" string.
/// The host may be an IPv4 address or a hostname.
fn validate_master_address(master_address: &str) -> Result<(String, u16), CliError> {
    let ipv4_regex = Regex::new(r"^(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})$").unwrap();
    let hostname_regex = Regex::new(r"^[a-zA-Z0-9\-\.]+$").unwrap();

    let parts: Vec<&str> = master_address.split_whitespace().collect();
    let [host, port] = parts.as_slice() else {
        return Err(CliError::InvalidMasterAddress);
    };

    let valid_host = if let Some(captures) = ipv4_regex.captures(host) {
        captures.iter().skip(1).all(|octet| {
            octet
                .map(|m| m.as_str().parse::<u16>().map(|v| v <= 255).unwrap_or(false))
                .unwrap_or(false)
        })
    } else {
        hostname_regex.is_match(host)
    };

    if !valid_host {
        return Err(CliError::InvalidMasterAddress);
    }

    let port = validate_port(port, CliError::InvalidMasterPort)?;

    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        let mut full = vec!["rudis".to_string()];
        full.extend(parts.iter().map(|s| s.to_string()));
        full
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_args(args(&[])).unwrap();

        assert_eq!(config.port, 6379);
        assert_eq!(config.role, Role::Master);
        assert_eq!(config.dir, ".");
        assert_eq!(config.dbfilename, "dump.rdb");
    }

    #[test]
    fn test_flag_parsing_success_cases() {
        let test_cases = vec![
            (args(&["--port", "6677"]), 6677, Role::Master),
            (
                args(&["--replicaof", "127.0.0.1 6380"]),
                6379,
                Role::Replica("127.0.0.1".to_string(), 6380),
            ),
            (
                args(&["--port", "7000", "--replicaof", "localhost 6381"]),
                7000,
                Role::Replica("localhost".to_string(), 6381),
            ),
            (
                args(&["--replicaof", "redis-master 6500"]),
                6379,
                Role::Replica("redis-master".to_string(), 6500),
            ),
        ];

        for (arguments, expected_port, expected_role) in test_cases {
            let config = ServerConfig::from_args(arguments.clone()).unwrap();
            assert_eq!(config.port, expected_port, "args {:?}", arguments);
            assert_eq!(config.role, expected_role, "args {:?}", arguments);
        }
    }

    #[test]
    fn test_dir_and_dbfilename_flags() {
        let config = ServerConfig::from_args(args(&[
            "--dir",
            "/tmp/redis-files",
            "--dbfilename",
            "snapshot.rdb",
        ]))
        .unwrap();

        assert_eq!(config.dir, "/tmp/redis-files");
        assert_eq!(config.dbfilename, "snapshot.rdb");
        assert_eq!(
            config.rdb_path(),
            PathBuf::from("/tmp/redis-files/snapshot.rdb")
        );
    }

    #[test]
    fn test_flag_parsing_error_cases() {
        let test_cases = vec![
            (args(&["--port"]), CliError::InvalidCommandLineFlag, "missing port value"),
            (args(&["--port", "invalid"]), CliError::InvalidPortFlagValue, "bad port"),
            (args(&["--port", "0"]), CliError::InvalidPortFlagValue, "zero port"),
            (args(&["--port", "70000"]), CliError::InvalidPortFlagValue, "port too high"),
            (args(&["--unknown", "x"]), CliError::InvalidCommandLineFlag, "unknown flag"),
            (args(&["--replicaof"]), CliError::InvalidCommandLineFlag, "missing replicaof value"),
            (args(&["--replicaof", "localhost"]), CliError::InvalidMasterAddress, "missing master port"),
            (
                args(&["--replicaof", "localhost 6379 extra"]),
                CliError::InvalidMasterAddress,
                "too many address parts",
            ),
            (
                args(&["--replicaof", "256.0.0.1 6379"]),
                CliError::InvalidMasterAddress,
                "octet out of range",
            ),
            (
                args(&["--replicaof", "my_host! 6379"]),
                CliError::InvalidMasterAddress,
                "invalid hostname characters",
            ),
            (
                args(&["--replicaof", "127.0.0.1 70000"]),
                CliError::InvalidMasterPort,
                "master port too high",
            ),
            (
                args(&["--replicaof", "127.0.0.1 not-a-port"]),
                CliError::InvalidMasterPort,
                "master port not numeric",
            ),
        ];

        for (arguments, expected, description) in test_cases {
            assert_eq!(
                ServerConfig::from_args(arguments),
                Err(expected),
                "case: {}",
                description
            );
        }
    }
}
