use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use svvis_frame::{ChannelKind, Message, Payload};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    channel: u8,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<u8>,
    value: serde_json::Value,
    wire_len: usize,
    peer: &'a str,
    timestamp: String,
}

pub fn print_message(msg: &Message, peer: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                channel: msg.channel(),
                kind: msg.kind().name(),
                index: channel_index(msg.kind()),
                value: json_value(msg.payload()),
                wire_len: msg.wire_len(),
                peer,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHANNEL", "KIND", "PEER", "VALUE"])
                .add_row(vec![
                    msg.channel().to_string(),
                    kind_label(msg.kind()),
                    peer.to_string(),
                    msg.payload().to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "channel={} ({}) peer={} value={}",
                msg.channel(),
                kind_label(msg.kind()),
                peer,
                msg.payload()
            );
        }
        OutputFormat::Raw => {
            let mut payload = Vec::with_capacity(msg.wire_len());
            msg.put_payload(&mut payload);
            print_raw(&payload);
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn kind_label(kind: ChannelKind) -> String {
    match channel_index(kind) {
        Some(index) => format!("{}[{index}]", kind.name()),
        None => kind.name().to_string(),
    }
}

fn channel_index(kind: ChannelKind) -> Option<u8> {
    match kind {
        ChannelKind::Int16(index) | ChannelKind::Float(index) => Some(index),
        ChannelKind::String | ChannelKind::Unknown => None,
    }
}

fn json_value(payload: &Payload) -> serde_json::Value {
    match payload {
        Payload::Text(text) => serde_json::Value::from(String::from_utf8_lossy(text).into_owned()),
        Payload::I16(value) => serde_json::Value::from(*value),
        Payload::F32(value) => serde_json::Value::from(f64::from(*value)),
        Payload::Raw(_) => serde_json::Value::Null,
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_labels_include_index() {
        assert_eq!(kind_label(ChannelKind::Int16(3)), "INT16[3]");
        assert_eq!(kind_label(ChannelKind::String), "STRING");
    }

    #[test]
    fn json_values_follow_payload_type() {
        assert_eq!(
            json_value(Message::string("fw 100").payload()),
            serde_json::json!("fw 100")
        );
        assert_eq!(
            json_value(Message::int16(0, -17).unwrap().payload()),
            serde_json::json!(-17)
        );
        assert_eq!(
            json_value(Message::float(0, 0.5).unwrap().payload()),
            serde_json::json!(0.5)
        );
        assert_eq!(
            json_value(Message::float(0, f32::NAN).unwrap().payload()),
            serde_json::Value::Null
        );
    }
}
