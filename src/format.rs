//! Turns raw file bytes into indented text lines, one normalizer per format.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use quick_xml::events::Event as XmlEvent;
use quick_xml::{Reader, Writer};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_yaml::Value as YamlValue;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Yaml,
    Xml,
    Raw,
}

impl Format {
    pub const ALL: [Format; 4] = [Format::Json, Format::Yaml, Format::Xml, Format::Raw];

    pub fn name(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Xml => "xml",
            Format::Raw => "raw",
        }
    }

    pub fn normalizer(self) -> &'static dyn Normalizer {
        match self {
            Format::Json => &JsonNormalizer,
            Format::Yaml => &YamlNormalizer,
            Format::Xml => &XmlNormalizer,
            Format::Raw => &RawNormalizer,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Format::ALL
            .into_iter()
            .find(|format| format.name() == wanted)
            .ok_or_else(|| anyhow!("unknown format {s:?}"))
    }
}

pub trait Normalizer: Sync {
    /// Parses `content` and re-emits it as lines indented by `tab_width`
    /// spaces per level.
    fn normalize(&self, content: &[u8], tab_width: usize) -> Result<Vec<String>>;
}

pub struct JsonNormalizer;
pub struct YamlNormalizer;
pub struct XmlNormalizer;
pub struct RawNormalizer;

impl Normalizer for JsonNormalizer {
    fn normalize(&self, content: &[u8], tab_width: usize) -> Result<Vec<String>> {
        let value: serde_json::Value = serde_json::from_slice(content).context("unable to parse")?;

        let indent = " ".repeat(tab_width);
        let mut out = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(
            &mut out,
            PrettyFormatter::with_indent(indent.as_bytes()),
        );
        value
            .serialize(&mut serializer)
            .context("unable to format")?;

        Ok(split_lines(&out))
    }
}

impl Normalizer for YamlNormalizer {
    fn normalize(&self, content: &[u8], tab_width: usize) -> Result<Vec<String>> {
        let value: YamlValue = serde_yaml::from_slice(content).context("unable to parse")?;
        if !matches!(value, YamlValue::Mapping(_)) {
            bail!("unable to parse: top level is not a mapping");
        }

        let mut emitter = YamlEmitter {
            indent: tab_width,
            lines: Vec::new(),
        };
        emitter.block(&value, 0)?;
        Ok(emitter.lines)
    }
}

impl Normalizer for XmlNormalizer {
    fn normalize(&self, content: &[u8], tab_width: usize) -> Result<Vec<String>> {
        let source = std::str::from_utf8(content).context("unable to parse")?;
        let mut reader = Reader::from_str(source);
        reader.trim_text(true);

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', tab_width);
        let mut depth = 0usize;
        let mut elements = 0usize;

        loop {
            let event = reader.read_event().context("unable to parse")?;
            match &event {
                XmlEvent::Eof => break,
                XmlEvent::Start(_) => {
                    if depth == 0 && elements > 0 {
                        bail!("unable to parse: multiple root elements");
                    }
                    depth += 1;
                    elements += 1;
                }
                XmlEvent::End(_) => depth = depth.saturating_sub(1),
                XmlEvent::Empty(_) => {
                    if depth == 0 && elements > 0 {
                        bail!("unable to parse: multiple root elements");
                    }
                    elements += 1;
                }
                XmlEvent::Text(_) | XmlEvent::CData(_) if depth == 0 => {
                    bail!("unable to parse: text outside of the root element");
                }
                _ => {}
            }
            writer.write_event(event).context("unable to format")?;
        }

        if depth != 0 {
            bail!("unable to parse: unclosed element");
        }
        if elements == 0 {
            bail!("unable to parse: no elements");
        }

        Ok(split_lines(&writer.into_inner()))
    }
}

impl Normalizer for RawNormalizer {
    fn normalize(&self, content: &[u8], _tab_width: usize) -> Result<Vec<String>> {
        Ok(split_lines(content))
    }
}

struct YamlEmitter {
    indent: usize,
    lines: Vec<String>,
}

impl YamlEmitter {
    fn push(&mut self, depth: usize, text: &str) {
        let pad = " ".repeat(depth * self.indent);
        self.lines.push(format!("{pad}{text}"));
    }

    fn block(&mut self, value: &YamlValue, depth: usize) -> Result<()> {
        match value {
            YamlValue::Mapping(map) if !map.is_empty() => {
                for (key, item) in map {
                    let key = inline_scalar(key)?;
                    self.entry(&format!("{key}:"), item, depth)?;
                }
            }
            YamlValue::Sequence(seq) if !seq.is_empty() => {
                for item in seq {
                    self.entry("-", item, depth)?;
                }
            }
            YamlValue::Tagged(tagged) => {
                self.push(depth, &tagged.tag.to_string());
                self.block(&tagged.value, depth + 1)?;
            }
            scalar => self.scalar(None, scalar, depth)?,
        }
        Ok(())
    }

    /// A `key:` or `-` head followed by its value, inline when the value is a
    /// scalar and nested one level deeper otherwise.
    fn entry(&mut self, head: &str, value: &YamlValue, depth: usize) -> Result<()> {
        match value {
            YamlValue::Mapping(map) if !map.is_empty() => {
                self.push(depth, head);
                self.block(value, depth + 1)
            }
            YamlValue::Sequence(seq) if !seq.is_empty() => {
                self.push(depth, head);
                self.block(value, depth + 1)
            }
            YamlValue::Tagged(tagged) => {
                self.push(depth, &format!("{head} {}", tagged.tag));
                self.block(&tagged.value, depth + 1)
            }
            scalar => self.scalar(Some(head), scalar, depth),
        }
    }

    fn scalar(&mut self, head: Option<&str>, value: &YamlValue, depth: usize) -> Result<()> {
        let rendered = serde_yaml::to_string(value).context("unable to format")?;
        let mut parts = rendered.trim_end_matches('\n').lines();
        let first = parts.next().unwrap_or_default();
        match head {
            Some(head) => self.push(depth, &format!("{head} {first}")),
            None => self.push(depth, first),
        }
        // block scalar bodies come back indented by two spaces
        for rest in parts {
            let body = rest.strip_prefix("  ").unwrap_or(rest);
            self.push(depth + 1, body);
        }
        Ok(())
    }
}

fn inline_scalar(value: &YamlValue) -> Result<String> {
    let rendered = serde_yaml::to_string(value).context("unable to format")?;
    Ok(rendered
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" "))
}

/// Splits on `\n`, dropping a `\r` before it and a trailing empty line.
pub fn split_lines(content: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(content);
    let mut lines: Vec<String> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect();
    if lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub lines: Vec<String>,
    pub format: Format,
}

/// Tries each format in `order` and keeps the first one that parses.
pub fn normalize(content: &[u8], order: &[Format], tab_width: usize) -> Result<Normalized> {
    for &format in order {
        match format.normalizer().normalize(content, tab_width) {
            Ok(lines) => {
                info!(%format, lines = lines.len(), "normalized input");
                return Ok(Normalized { lines, format });
            }
            Err(err) => debug!(%format, error = %format!("{err:#}"), "format rejected input"),
        }
    }
    bail!("unable to parse file")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn format_names_parse_case_insensitively() {
        assert_eq!("JSON".parse::<Format>().unwrap(), Format::Json);
        assert_eq!(" yaml ".parse::<Format>().unwrap(), Format::Yaml);
        assert!("toml".parse::<Format>().is_err());
        assert_eq!(Format::Xml.to_string(), "xml");
    }

    #[test]
    fn split_lines_handles_crlf_and_trailing_newline() {
        assert_eq!(split_lines(b"a\r\nb\nc\n"), lines("a\nb\nc"));
        assert_eq!(split_lines(b"a\n\nb"), vec!["a", "", "b"]);
        assert!(split_lines(b"").is_empty());
    }

    #[test]
    fn json_is_pretty_printed_in_source_order() {
        let out = JsonNormalizer
            .normalize(br#"{"z":{"b":1,"c":[1,2]},"a":[]}"#, 2)
            .unwrap();
        assert_eq!(
            out,
            lines(
                r#"{
  "z": {
    "b": 1,
    "c": [
      1,
      2
    ]
  },
  "a": []
}"#
            )
        );
    }

    #[test]
    fn json_indent_follows_tab_width() {
        let out = JsonNormalizer.normalize(br#"{"a":1}"#, 4).unwrap();
        assert_eq!(out[1], "    \"a\": 1");
    }

    #[test]
    fn json_rejects_invalid_input() {
        assert!(JsonNormalizer.normalize(b"a: 1", 2).is_err());
    }

    #[test]
    fn yaml_nests_sequences_under_keys() {
        let out = YamlNormalizer
            .normalize(b"name: demo\nitems:\n- 1\n- two\nnested:\n  deep:\n    x: true\n", 2)
            .unwrap();
        assert_eq!(
            out,
            lines(
                "name: demo
items:
  - 1
  - two
nested:
  deep:
    x: true"
            )
        );
    }

    #[test]
    fn yaml_sequence_of_mappings() {
        let out = YamlNormalizer
            .normalize(b"list:\n  - a: 1\n    b: 2\n", 2)
            .unwrap();
        assert_eq!(out, lines("list:\n  -\n    a: 1\n    b: 2"));
    }

    #[test]
    fn yaml_requires_top_level_mapping() {
        assert!(YamlNormalizer.normalize(b"just some text", 2).is_err());
        assert!(YamlNormalizer.normalize(b"- 1\n- 2\n", 2).is_err());
    }

    #[test]
    fn xml_is_reindented() {
        let out = XmlNormalizer
            .normalize(b"<root><item id=\"1\">one</item><empty/></root>", 2)
            .unwrap();
        assert_eq!(
            out,
            lines("<root>\n  <item id=\"1\">one</item>\n  <empty/>\n</root>")
        );
    }

    #[test]
    fn xml_rejects_plain_text_and_unbalanced_tags() {
        assert!(XmlNormalizer.normalize(b"hello world", 2).is_err());
        assert!(XmlNormalizer.normalize(b"<a><b></a>", 2).is_err());
        assert!(XmlNormalizer.normalize(b"<a>", 2).is_err());
    }

    #[test]
    fn normalize_falls_through_to_raw() {
        let out = normalize(b"plain text\nmore", &Format::ALL, 2).unwrap();
        assert_eq!(out.format, Format::Raw);
        assert_eq!(out.lines, lines("plain text\nmore"));
    }

    #[test]
    fn normalize_prefers_earliest_format() {
        let out = normalize(br#"{"a": 1}"#, &Format::ALL, 2).unwrap();
        assert_eq!(out.format, Format::Json);

        // valid YAML as well, but YAML comes first here
        let out = normalize(br#"{"a": 1}"#, &[Format::Yaml, Format::Json], 2).unwrap();
        assert_eq!(out.format, Format::Yaml);
        assert_eq!(out.lines, lines("a: 1"));
    }

    #[test]
    fn normalize_reports_exhaustion() {
        let err = normalize(b"not json", &[Format::Json], 2).unwrap_err();
        assert_eq!(err.to_string(), "unable to parse file");
    }
}
