//! Wire types for the line-delimited JSON command protocol.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;
use universe_core::{Action, Injection, ScheduledInjection, SimEventKind, Uid};

/// Request lines above this size are refused.
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;
/// Response lines above this size are replaced with a capacity error.
pub const MAX_RESPONSE_BYTES: usize = 256 * 1024;

pub const COMMANDS: &[&str] = &[
    "tick", "status", "metrics", "inject", "snapshot", "restore", "config", "save", "load",
    "scan", "scenario", "lineage", "history", "quit",
];

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("capacity exceeded: {0}")]
    Capacity(String),
    #[error("io: {0}")]
    Io(#[from] universe_store::StoreError),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum Request {
    Tick {
        #[serde(default)]
        actions: BTreeMap<String, Action>,
    },
    Status,
    Metrics,
    Inject {
        event: InjectSpec,
    },
    Snapshot {
        tag: String,
    },
    Restore {
        tag: String,
    },
    Config {
        key: String,
        value: serde_json::Value,
    },
    Save,
    Load,
    Scan {
        probe: String,
        #[serde(default = "default_scan_max")]
        max: usize,
    },
    Scenario {
        events: Vec<ScheduleSpec>,
    },
    Lineage,
    History {
        #[serde(default)]
        from: u64,
        to: Option<u64>,
    },
    Quit,
}

fn default_scan_max() -> usize {
    32
}

#[derive(Debug, Clone, Deserialize)]
pub struct InjectSpec {
    #[serde(rename = "type")]
    pub kind: SimEventKind,
    #[serde(default)]
    pub subtype: u8,
    #[serde(default)]
    pub severity: f64,
    #[serde(default)]
    pub description: String,
    /// Omitted or zero targets every probe.
    pub target_probe_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSpec {
    pub at_tick: u64,
    pub event: InjectSpec,
}

impl InjectSpec {
    pub fn into_injection(self) -> Result<Injection, ProtocolError> {
        let target_probe_id = match self.target_probe_id {
            None => Uid::ZERO,
            Some(raw) => raw
                .parse()
                .map_err(|e: String| ProtocolError::InvalidArgument(e))?,
        };
        Ok(Injection {
            kind: self.kind,
            subtype: self.subtype,
            description: self.description,
            severity: self.severity,
            target_probe_id,
            pending: true,
        })
    }
}

impl ScheduleSpec {
    pub fn into_scheduled(self) -> Result<ScheduledInjection, ProtocolError> {
        Ok(ScheduledInjection {
            at_tick: self.at_tick,
            event: self.event.into_injection()?,
        })
    }
}

/// Parse one request line, distinguishing malformed JSON, unknown
/// commands, and bad arguments.
pub fn parse_request(line: &str) -> Result<Request, ProtocolError> {
    if line.len() > MAX_REQUEST_BYTES {
        return Err(ProtocolError::Capacity(format!(
            "request exceeds {MAX_REQUEST_BYTES} bytes"
        )));
    }
    let value: serde_json::Value =
        serde_json::from_str(line).map_err(|e| ProtocolError::Parse(e.to_string()))?;
    let Some(cmd) = value.get("cmd").and_then(serde_json::Value::as_str) else {
        return Err(ProtocolError::Parse("missing 'cmd' field".to_string()));
    };
    if !COMMANDS.contains(&cmd) {
        return Err(ProtocolError::Unknown(cmd.to_string()));
    }
    serde_json::from_value(value).map_err(|e| ProtocolError::InvalidArgument(e.to_string()))
}

/// Parse the per-probe action map keyed by `"<hi>-<lo>"` UID strings.
pub fn parse_actions(
    actions: BTreeMap<String, Action>,
) -> Result<BTreeMap<Uid, Action>, ProtocolError> {
    let mut parsed = BTreeMap::new();
    for (key, action) in actions {
        let uid: Uid = key
            .parse()
            .map_err(|e: String| ProtocolError::InvalidArgument(e))?;
        parsed.insert(uid, action);
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_request_parses_actions() {
        let request = parse_request(
            r#"{"cmd":"tick","actions":{"1-2":{"action":"survey","level":0}}}"#,
        )
        .unwrap();
        let Request::Tick { actions } = request else {
            panic!("expected tick");
        };
        let parsed = parse_actions(actions).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(parsed.contains_key(&Uid { hi: 1, lo: 2 }));
    }

    #[test]
    fn unknown_command_is_distinguished_from_garbage() {
        assert!(matches!(
            parse_request(r#"{"cmd":"warp"}"#),
            Err(ProtocolError::Unknown(_))
        ));
        assert!(matches!(
            parse_request("not json at all"),
            Err(ProtocolError::Parse(_))
        ));
        assert!(matches!(
            parse_request(r#"{"nocmd":1}"#),
            Err(ProtocolError::Parse(_))
        ));
        assert!(matches!(
            parse_request(r#"{"cmd":"snapshot"}"#),
            Err(ProtocolError::InvalidArgument(_))
        ));
    }

    #[test]
    fn oversized_request_is_a_capacity_error() {
        let huge = format!(
            r#"{{"cmd":"inject","event":{{"type":"wonder","description":"{}"}}}}"#,
            "x".repeat(MAX_REQUEST_BYTES)
        );
        assert!(matches!(
            parse_request(&huge),
            Err(ProtocolError::Capacity(_))
        ));
    }

    #[test]
    fn inject_spec_defaults_to_broadcast_target() {
        let request =
            parse_request(r#"{"cmd":"inject","event":{"type":"hazard","severity":0.4}}"#).unwrap();
        let Request::Inject { event } = request else {
            panic!("expected inject");
        };
        let injection = event.into_injection().unwrap();
        assert!(injection.target_probe_id.is_zero());
        assert!(injection.pending);
    }

    #[test]
    fn bad_uid_in_actions_is_invalid_argument() {
        let request =
            parse_request(r#"{"cmd":"tick","actions":{"zzz":{"action":"wait"}}}"#).unwrap();
        let Request::Tick { actions } = request else {
            panic!("expected tick");
        };
        assert!(matches!(
            parse_actions(actions),
            Err(ProtocolError::InvalidArgument(_))
        ));
    }
}
