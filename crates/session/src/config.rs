use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Server base url, `http(s)://host:port`.
    pub url: String,
    /// Time allowed between `connect` and the server's acknowledgment.
    pub connect_timeout_ms: u64,
    /// Simulation kind requested in the `init` message.
    pub sim_type: String,
    /// Controllers active when the session starts.
    pub initial_controllers: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_owned(),
            connect_timeout_ms: 5000,
            sim_type: "cartpole".to_owned(),
            initial_controllers: vec!["manual".to_owned()],
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
