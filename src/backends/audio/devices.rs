// SPDX-License-Identifier: GPL-3.0-only

//! Audio source enumeration for PipeWire
//!
//! Used by diagnostics to tell whether a node with the virtual microphone's
//! name is already present in the graph.

use serde_json::Value;
use std::process::Command;
use tracing::{debug, warn};

/// Represents an audio source node (microphone or virtual microphone)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Display name (nick, description or node name)
    pub name: String,
    pub serial: String,
    pub node_name: String,
    pub is_default: bool,
}

impl AudioDevice {
    /// Whether this device answers to `name` (node name or display name)
    pub fn matches(&self, name: &str) -> bool {
        self.node_name == name || self.name == name
    }
}

/// Enumerate audio sources using `pw-dump`
///
/// Returns an empty list when PipeWire tooling is not installed.
pub fn enumerate_audio_sources() -> Vec<AudioDevice> {
    let output = match Command::new("pw-dump").output() {
        Ok(output) => output,
        Err(e) => {
            warn!("Failed to run pw-dump: {}", e);
            return Vec::new();
        }
    };

    if !output.status.success() {
        warn!("pw-dump command failed");
        return Vec::new();
    }

    match std::str::from_utf8(&output.stdout) {
        Ok(stdout) => parse_pw_dump(stdout),
        Err(e) => {
            warn!("Failed to parse pw-dump output: {}", e);
            Vec::new()
        }
    }
}

/// Extract the configured default source name from the metadata objects
fn default_source_name(nodes: &[Value]) -> Option<String> {
    let metadata = nodes.iter().find(|node| {
        node.get("type").and_then(|v| v.as_str()) == Some("PipeWire:Interface:Metadata")
            && node
                .pointer("/props/metadata.name")
                .and_then(|v| v.as_str())
                == Some("default")
    })?;

    metadata
        .get("metadata")?
        .as_array()?
        .iter()
        .find(|entry| {
            matches!(
                entry.get("key").and_then(|v| v.as_str()),
                Some("default.audio.source") | Some("default.configured.audio.source")
            )
        })
        .and_then(|entry| entry.pointer("/value/name"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

fn prop_str<'a>(props: &'a Value, key: &str) -> Option<&'a str> {
    props.get(key).and_then(|v| v.as_str())
}

/// Parse the JSON printed by `pw-dump` into audio sources
///
/// The default source sorts first, the rest alphabetically.
pub fn parse_pw_dump(json: &str) -> Vec<AudioDevice> {
    let nodes: Vec<Value> = match serde_json::from_str(json) {
        Ok(nodes) => nodes,
        Err(e) => {
            warn!("Failed to parse JSON from pw-dump: {}", e);
            return Vec::new();
        }
    };

    let default_node_name = default_source_name(&nodes);
    if let Some(name) = &default_node_name {
        debug!(default_source = %name, "Found default audio source from metadata");
    }

    let mut devices: Vec<AudioDevice> = nodes
        .iter()
        .filter_map(|node| node.pointer("/info/props"))
        .filter(|props| props.get("media.class").and_then(|v| v.as_str()) == Some("Audio/Source"))
        .map(|props| {
            let name = prop_str(props, "node.nick")
                .or_else(|| prop_str(props, "node.description"))
                .or_else(|| prop_str(props, "node.name"))
                .unwrap_or("Unknown Audio Device")
                .to_string();
            // object.serial is numeric in newer PipeWire releases
            let serial = props
                .get("object.serial")
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_else(|| "0".to_string());
            let node_name = prop_str(props, "node.name").unwrap_or("").to_string();
            let is_default = default_node_name.as_deref() == Some(node_name.as_str());

            AudioDevice {
                name,
                serial,
                node_name,
                is_default,
            }
        })
        .collect();

    devices.sort_by(|a, b| match (a.is_default, b.is_default) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => a.name.cmp(&b.name),
    });

    devices
}
