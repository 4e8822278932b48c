//! Node configuration: the YAML file layout, its validation and the settings the
//! node is started with.
use std::fs;
use std::io;
use std::net::IpAddr;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;
use crate::logging::LogLevel;
use crate::prelude::chord_core::consts::MAX_SUCCESSORS;
use crate::prelude::chord_core::consts::MIN_SUCCESSORS;
use crate::prelude::chord_core::swarm::DEFAULT_DATA_DIR;
use crate::prelude::Did;
use crate::prelude::StabilizeIntervals;
use crate::util::ensure_parent_dir;
use crate::util::expand_home;

pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 1000;
pub const MIN_PORT: u32 = 1024;
pub const MAX_PORT: u32 = 65535;
pub const MIN_INTERVAL_MS: u64 = 1;
pub const MAX_INTERVAL_MS: u64 = 60000;

/// Multi letter flags a user may spell with a single dash.
const LONG_FLAGS: [&str; 5] = ["ja", "jp", "ts", "tff", "tcp"];

/// Options of a node as written in the config file. Every field may be overridden
/// on the command line; nothing is checked until [Config::validate].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Bind IP (`-a`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addr: Option<String>,
    /// Bind port (`-p`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u32>,
    /// IP of a ring member to join (`-ja`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_addr: Option<String>,
    /// Port of a ring member to join (`-jp`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_port: Option<u32>,
    /// Stabilize period in ms (`-ts`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stabilize_ms: Option<u64>,
    /// Fix fingers period in ms (`-tff`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_fingers_ms: Option<u64>,
    /// Check predecessor period in ms (`-tcp`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_predecessor_ms: Option<u64>,
    /// Successor list length (`-r`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successors: Option<u32>,
    /// Identifier override, 40 hex characters (`-i`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Directory holding the node scoped file directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Per attempt timeout of outbound calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
}

/// Validated settings a node runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind: SocketAddr,
    pub join: Option<SocketAddr>,
    pub intervals: StabilizeIntervals,
    pub successors: u8,
    pub id: Option<Did>,
    pub data_dir: PathBuf,
    pub rpc_timeout: Duration,
    pub log_level: LogLevel,
}

impl Config {
    /// Fill every unset field of `self` from `other`.
    pub fn or(self, other: Config) -> Config {
        Config {
            addr: self.addr.or(other.addr),
            port: self.port.or(other.port),
            join_addr: self.join_addr.or(other.join_addr),
            join_port: self.join_port.or(other.join_port),
            stabilize_ms: self.stabilize_ms.or(other.stabilize_ms),
            fix_fingers_ms: self.fix_fingers_ms.or(other.fix_fingers_ms),
            check_predecessor_ms: self.check_predecessor_ms.or(other.check_predecessor_ms),
            successors: self.successors.or(other.successors),
            id: self.id.or(other.id),
            data_dir: self.data_dir.or(other.data_dir),
            rpc_timeout_ms: self.rpc_timeout_ms.or(other.rpc_timeout_ms),
            log_level: self.log_level.or(other.log_level),
        }
    }

    /// Check every option and build the [Settings]. The first violation is returned.
    pub fn validate(&self) -> Result<Settings> {
        let ip = parse_ip("-a", self.addr.as_deref())?;
        let port = parse_port("-p", self.port)?;
        let bind = SocketAddr::new(ip, port);

        let join = match (&self.join_addr, self.join_port) {
            (None, None) => None,
            (Some(_), None) | (None, Some(_)) => return Err(Error::PartialJoinTarget),
            (Some(addr), Some(port)) => {
                let join = SocketAddr::new(
                    parse_ip("-ja", Some(addr))?,
                    parse_port("-jp", Some(port))?,
                );
                if join == bind {
                    return Err(Error::JoinTargetIsSelf(join));
                }
                Some(join)
            }
        };

        let intervals = StabilizeIntervals {
            stabilize: parse_interval("-ts", self.stabilize_ms)?,
            fix_fingers: parse_interval("-tff", self.fix_fingers_ms)?,
            check_predecessor: parse_interval("-tcp", self.check_predecessor_ms)?,
        };

        let r = self.successors.ok_or(Error::MissingOption("-r"))?;
        let successors = u8::try_from(r)
            .ok()
            .filter(|r| (MIN_SUCCESSORS..=MAX_SUCCESSORS).contains(r))
            .ok_or(Error::InvalidSuccessorLength(r))?;

        let id = self
            .id
            .as_deref()
            .map(Did::from_hex_strict)
            .transpose()
            .map_err(Error::InvalidIdentifier)?;

        let data_dir = expand_home(self.data_dir.as_deref().unwrap_or(DEFAULT_DATA_DIR))?;
        let rpc_timeout =
            Duration::from_millis(self.rpc_timeout_ms.unwrap_or(DEFAULT_RPC_TIMEOUT_MS).max(1));

        Ok(Settings {
            bind,
            join,
            intervals,
            successors,
            id,
            data_dir,
            rpc_timeout,
            log_level: self.log_level.unwrap_or_default(),
        })
    }

    /// Write the configuration as YAML, creating parent directories. Returns the
    /// expanded path.
    pub fn write_fs<P>(&self, path: P) -> Result<String>
    where P: AsRef<std::path::Path> {
        let path = expand_home(path)?;
        ensure_parent_dir(&path)?;
        let f =
            fs::File::create(path.as_path()).map_err(|e| Error::CreateFileError(e.to_string()))?;
        let f_writer = io::BufWriter::new(f);
        serde_yaml::to_writer(f_writer, self)?;
        Ok(path.to_string_lossy().into_owned())
    }

    pub fn read_fs<P>(path: P) -> Result<Config>
    where P: AsRef<std::path::Path> {
        let path = expand_home(path)?;
        tracing::debug!("Read config from: {:?}", path);
        let f = fs::File::open(path).map_err(|e| Error::OpenFileError(e.to_string()))?;
        let f_rdr = io::BufReader::new(f);
        Ok(serde_yaml::from_reader(f_rdr)?)
    }
}

impl Settings {
    /// Identifier of the node: the override if given, otherwise the hash of `ip:port`.
    pub fn did(&self) -> Did {
        self.id.unwrap_or_else(|| {
            Did::from_name(&format!("{}:{}", self.bind.ip(), self.bind.port()))
        })
    }
}

fn parse_ip(flag: &'static str, value: Option<&str>) -> Result<IpAddr> {
    let value = value.ok_or(Error::MissingOption(flag))?;
    value.parse().map_err(|_| Error::InvalidAddress {
        flag,
        value: value.to_string(),
    })
}

fn parse_port(flag: &'static str, value: Option<u32>) -> Result<u16> {
    let value = value.ok_or(Error::MissingOption(flag))?;
    if !(MIN_PORT..=MAX_PORT).contains(&value) {
        return Err(Error::InvalidPort { flag, value });
    }
    u16::try_from(value).map_err(|_| Error::InvalidPort { flag, value })
}

fn parse_interval(flag: &'static str, value: Option<u64>) -> Result<Duration> {
    let value = value.ok_or(Error::MissingOption(flag))?;
    if !(MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&value) {
        return Err(Error::InvalidInterval { flag, value });
    }
    Ok(Duration::from_millis(value))
}

/// Rewrite `-ja 1.2.3.4` style flags to `--ja 1.2.3.4` so they parse as long flags.
/// Everything after a bare `--` is left alone.
pub fn normalize_args<I>(args: I) -> Vec<String>
where I: IntoIterator<Item = String> {
    let mut rest = false;
    args.into_iter()
        .map(|arg| {
            if rest {
                return arg;
            }
            if arg == "--" {
                rest = true;
                return arg;
            }
            match arg.strip_prefix('-') {
                Some(flag) if !flag.starts_with('-') => {
                    let name = flag.split('=').next().unwrap_or(flag);
                    if LONG_FLAGS.contains(&name) {
                        format!("-{arg}")
                    } else {
                        arg
                    }
                }
                _ => arg,
            }
        })
        .collect()
}
