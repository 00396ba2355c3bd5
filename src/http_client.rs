use crate::config::Config;
use crate::database::Database;
use crate::nss_dns_resolver::NssDnsResolver;
use std::io::Read;
use ureq::Agent;

pub const USER_AGENT: &str = concat!("nss_http/", env!("CARGO_PKG_VERSION"));

/// Upper bound on a snapshot payload.
pub const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} answered with HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("cannot read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("response body from {url} exceeds the size limit")]
    BodyTooLarge { url: String },
}

/// Source of raw snapshot payloads.
pub trait Fetcher {
    fn fetch(&self, database: Database, host: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetches `{base_url}/{database}?format=json&hostname={host}` over HTTP(S).
pub struct HttpFetcher {
    base_url : String,
    agent    : Agent,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Self {
        let resolver = NssDnsResolver {
            overrides: config.resolve.clone(),
        };

        // One deadline covers connect, TLS handshake and reading the full body.
        let agent: Agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .resolver(resolver)
            .build();

        Self {
            base_url: config.url.clone(),
            agent,
        }
    }

    pub fn url(&self, database: Database) -> String {
        format!("{}/{database}", self.base_url)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, database: Database, host: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.url(database);
        log::debug!("GET {url} for {host}");

        let http_response = match self.agent.get(&url).query("format", "json").query("hostname", host).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => return Err(FetchError::Status { url, status }),
            Err(ureq::Error::Transport(transport)) => {
                return Err(FetchError::Transport {
                    url,
                    message: transport.to_string(),
                })
            }
        };

        let status = http_response.status();
        if !(200..300).contains(&status) {
            return Err(FetchError::Status { url, status });
        }

        let mut body = Vec::new();
        if let Err(source) = http_response.into_reader().take(MAX_BODY_BYTES + 1).read_to_end(&mut body) {
            return Err(FetchError::Body { url, source });
        }
        if body.len() as u64 > MAX_BODY_BYTES {
            return Err(FetchError::BodyTooLarge { url });
        }
        Ok(body)
    }
}
