use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "/etc/nss_http.conf";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no HTTPSERVER or APIURL configured")]
    MissingUrl,

    #[error("line {line}: invalid boolean '{value}'")]
    InvalidBool { line: usize, value: String },

    #[error("line {line}: invalid timeout '{value}', expected a positive number of seconds")]
    InvalidTimeout { line: usize, value: String },

    #[error("line {line}: invalid RESOLVE entry '{value}', expected host:port=address:port")]
    InvalidResolve { line: usize, value: String },
}

/// Pins a `host:port` of the directory service to a fixed socket address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOverride {
    pub from : String,
    pub to   : SocketAddr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub url     : String,
    pub debug   : bool,
    pub timeout : Duration,
    pub resolve : Vec<ResolveOverride>,
}

impl Config {
    /// Always `/etc/nss_http.conf`. The module runs inside setuid programs,
    /// so nothing from the caller's environment may pick the directory server.
    pub fn path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parses `KEY = VALUE` lines. Blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut url = None;
        let mut debug = false;
        let mut timeout = DEFAULT_TIMEOUT;
        let mut resolve = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let (key, value) = match trimmed.split_once('=') {
                Some((key, value)) => (key.trim(), value.trim()),
                None => {
                    log::warn!("ignoring config line {line} without '='");
                    continue;
                }
            };

            match key {
                "HTTPSERVER" | "APIURL" => url = Some(value.trim_end_matches('/').to_string()),
                "DEBUG" => debug = parse_bool(value).ok_or_else(|| ConfigError::InvalidBool {
                    line,
                    value: value.to_string(),
                })?,
                "TIMEOUT" | "HTTPTIMEOUT" => timeout = match value.parse::<u64>() {
                    Ok(secs) if secs > 0 => Duration::from_secs(secs),
                    _ => return Err(ConfigError::InvalidTimeout { line, value: value.to_string() }),
                },
                "RESOLVE" => resolve.push(parse_resolve(value).ok_or_else(|| ConfigError::InvalidResolve {
                    line,
                    value: value.to_string(),
                })?),
                other => log::warn!("ignoring unknown config key '{other}' on line {line}"),
            }
        }

        let url = url.filter(|url| !url.is_empty()).ok_or(ConfigError::MissingUrl)?;
        Ok(Config {
            url,
            debug,
            timeout,
            resolve,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "on" => Some(true),
        "0" | "f" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_resolve(value: &str) -> Option<ResolveOverride> {
    let (from, to) = value.split_once('=')?;
    let from = from.trim();
    if from.is_empty() {
        return None;
    }
    Some(ResolveOverride {
        from : from.to_string(),
        to   : to.trim().parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full() {
        let config = Config::parse(
            "# directory\n\
             HTTPSERVER = https://directory.example.com/nss/\n\
             \n\
             DEBUG=true\n\
             HTTPTIMEOUT = 3\n\
             RESOLVE = directory.example.com:443=10.0.0.5:443\n",
        )
        .unwrap();

        assert_eq!(config.url, "https://directory.example.com/nss");
        assert!(config.debug);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.resolve, vec![ResolveOverride {
            from : "directory.example.com:443".to_string(),
            to   : "10.0.0.5:443".parse().unwrap(),
        }]);
    }

    #[test]
    fn test_parse_defaults_and_aliases() {
        let config = Config::parse("APIURL=http://127.0.0.1:8080\nTIMEOUT=1\n").unwrap();
        assert_eq!(config.url, "http://127.0.0.1:8080");
        assert!(!config.debug);
        assert_eq!(config.timeout, Duration::from_secs(1));

        let config = Config::parse("APIURL=http://127.0.0.1:8080\n").unwrap();
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_parse_requires_url() {
        assert!(matches!(Config::parse("DEBUG=1\n"), Err(ConfigError::MissingUrl)));
        assert!(matches!(Config::parse("HTTPSERVER=\n"), Err(ConfigError::MissingUrl)));
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        let err = Config::parse("HTTPSERVER=http://x\nTIMEOUT=soon\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeout { line: 2, .. }));

        let err = Config::parse("HTTPSERVER=http://x\nTIMEOUT=0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeout { line: 2, .. }));

        let err = Config::parse("DEBUG=maybe\nHTTPSERVER=http://x\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBool { line: 1, .. }));

        let err = Config::parse("HTTPSERVER=http://x\nRESOLVE=x:443\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidResolve { line: 2, .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "HTTPSERVER = https://directory.example.com").unwrap();
        writeln!(file, "DEBUG = off").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.url, "https://directory.example.com");
        assert!(!config.debug);
    }

    #[test]
    fn test_path_ignores_environment() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::env::set_var("NSS_HTTP_CONFIG", file.path());
        assert_eq!(Config::path(), PathBuf::from(DEFAULT_CONFIG_FILE));
        std::env::remove_var("NSS_HTTP_CONFIG");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("nss_http.conf")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
