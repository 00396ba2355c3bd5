#![allow(dead_code)]

use nss_http::{Database, FetchError, Fetcher};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

/// Replays queued responses and counts fetches.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses : RefCell<VecDeque<Result<String, u16>>>,
    pub calls : Cell<usize>,
}

impl ScriptedFetcher {
    pub fn push_body(&self, body: &str) -> &Self {
        self.responses.borrow_mut().push_back(Ok(body.to_string()));
        self
    }

    pub fn push_status(&self, status: u16) -> &Self {
        self.responses.borrow_mut().push_back(Err(status));
        self
    }
}

impl Fetcher for ScriptedFetcher {
    fn fetch(&self, database: Database, _host: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.set(self.calls.get() + 1);
        let url = format!("http://directory.test/{database}");
        match self.responses.borrow_mut().pop_front() {
            Some(Ok(body)) => Ok(body.into_bytes()),
            Some(Err(status)) => Err(FetchError::Status { url, status }),
            None => Err(FetchError::Transport {
                url,
                message: "no scripted response left".to_string(),
            }),
        }
    }
}

pub const ACCOUNTS: &str = r#"[
    {"pw_name":"alice","pw_passwd":"x","pw_uid":1001,"pw_gid":1001,"pw_gecos":"Alice A","pw_dir":"/home/alice","pw_shell":"/bin/bash"},
    {"pw_name":"bob","pw_passwd":"x","pw_uid":1002,"pw_gid":100,"pw_gecos":"Bob B","pw_dir":"/home/bob","pw_shell":"/bin/zsh"},
    {"pw_name":"carol","pw_passwd":"x","pw_uid":1003,"pw_gid":100,"pw_gecos":"","pw_dir":"/home/carol","pw_shell":"/bin/sh"}
]"#;

pub const GROUPS: &str = r#"[
    {"gr_name":"users","gr_passwd":"x","gr_gid":100,"gr_mem":["bob","carol"]},
    {"gr_name":"alice","gr_passwd":"x","gr_gid":1001,"gr_mem":[]}
]"#;

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}
