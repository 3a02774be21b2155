//! Header-rule detectors in the clrmamepro XML format.
//!
//! ```xml
//! <detector>
//!     <name>No-Intro NES</name>
//!     <rule start_offset="10" end_offset="EOF" operation="none">
//!         <data offset="0" value="4E45531A" result="true"/>
//!     </rule>
//! </detector>
//! ```
//!
//! A rule whose tests all pass defines the byte range that identifies a
//! file's payload and an optional byte-order transform applied to it.

use std::io::BufRead;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::DatError;

/// Byte-order transform applied to the hashed range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Operation {
    #[default]
    None,
    /// Reverse the bit order of every byte.
    BitSwap,
    /// Swap the bytes of every 16-bit unit.
    ByteSwap,
    /// Reverse the bytes of every 32-bit unit.
    WordSwap,
    /// Swap the 16-bit halves of every 32-bit unit.
    WordByteSwap,
}

impl Operation {
    fn parse(name: &str) -> Result<Self, DatError> {
        Ok(match name.to_ascii_lowercase().as_str() {
            "none" => Self::None,
            "bitswap" => Self::BitSwap,
            "byteswap" => Self::ByteSwap,
            "wordswap" => Self::WordSwap,
            "wordbyteswap" => Self::WordByteSwap,
            other => return Err(DatError::invalid_rule(format!("unknown operation {other:?}"))),
        })
    }

    /// Apply the transform in place. Buffers passed in successive calls
    /// must start on a 4-byte boundary of the hashed range; a trailing
    /// partial unit is reversed as far as it goes.
    pub fn apply(self, buf: &mut [u8]) {
        match self {
            Self::None => {}
            Self::BitSwap => buf.iter_mut().for_each(|b| *b = b.reverse_bits()),
            Self::ByteSwap => buf.chunks_mut(2).for_each(<[u8]>::reverse),
            Self::WordSwap => buf.chunks_mut(4).for_each(<[u8]>::reverse),
            Self::WordByteSwap => buf.chunks_mut(4).for_each(|word| {
                word.reverse();
                word.chunks_mut(2).for_each(<[u8]>::reverse);
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOp {
    And,
    Or,
    Xor,
}

impl BitOp {
    fn eval(self, mask: u8, byte: u8) -> u8 {
        match self {
            Self::And => mask & byte,
            Self::Or => mask | byte,
            Self::Xor => mask ^ byte,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeSpec {
    Bytes(u64),
    PowerOfTwo,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SizeOperator {
    #[default]
    Equal,
    Less,
    Greater,
}

/// One condition of a rule. `result` is the outcome the condition must
/// produce for the test to pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleTest {
    Data {
        offset: u64,
        value: Vec<u8>,
        result: bool,
    },
    Bitwise {
        op: BitOp,
        offset: u64,
        mask: Vec<u8>,
        value: Vec<u8>,
        result: bool,
    },
    FileSize {
        size: SizeSpec,
        operator: SizeOperator,
        result: bool,
    },
}

fn slice_at(head: &[u8], offset: u64, len: usize) -> Option<&[u8]> {
    let start = usize::try_from(offset).ok()?;
    head.get(start..start.checked_add(len)?)
}

impl RuleTest {
    /// Bytes from the start of the file needed to evaluate this test.
    fn probe_len(&self) -> u64 {
        match self {
            Self::Data { offset, value, .. } => offset.saturating_add(value.len() as u64),
            Self::Bitwise { offset, mask, .. } => offset.saturating_add(mask.len() as u64),
            Self::FileSize { .. } => 0,
        }
    }

    fn passes(&self, head: &[u8], file_size: u64) -> bool {
        match self {
            Self::Data {
                offset,
                value,
                result,
            } => {
                let found = slice_at(head, *offset, value.len()) == Some(value.as_slice());
                found == *result
            }
            Self::Bitwise {
                op,
                offset,
                mask,
                value,
                result,
            } => {
                let found = slice_at(head, *offset, mask.len()).is_some_and(|bytes| {
                    bytes
                        .iter()
                        .zip(mask)
                        .map(|(b, m)| op.eval(*m, *b))
                        .eq(value.iter().copied())
                });
                found == *result
            }
            Self::FileSize {
                size,
                operator,
                result,
            } => {
                let found = match (size, operator) {
                    (SizeSpec::PowerOfTwo, _) => file_size.is_power_of_two(),
                    (SizeSpec::Bytes(n), SizeOperator::Equal) => file_size == *n,
                    (SizeSpec::Bytes(n), SizeOperator::Less) => file_size < *n,
                    (SizeSpec::Bytes(n), SizeOperator::Greater) => file_size > *n,
                };
                found == *result
            }
        }
    }
}

/// A header rule: tests plus the range and transform they select.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderRule {
    pub start_offset: u64,
    /// `None` means end of file.
    pub end_offset: Option<u64>,
    pub operation: Operation,
    pub tests: Vec<RuleTest>,
}

impl HeaderRule {
    pub fn matches(&self, head: &[u8], file_size: u64) -> bool {
        self.tests.iter().all(|t| t.passes(head, file_size))
    }

    /// Byte range `[start, end)` of a file of `file_size` bytes to hash.
    pub fn span(&self, file_size: u64) -> (u64, u64) {
        let end = self.end_offset.unwrap_or(file_size).min(file_size);
        (self.start_offset.min(end), end)
    }
}

/// All rules of one detector file, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderRules {
    pub name: String,
    pub rules: Vec<HeaderRule>,
}

impl HeaderRules {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Bytes from the start of a file needed to evaluate every rule.
    pub fn probe_len(&self) -> u64 {
        self.rules
            .iter()
            .flat_map(|r| &r.tests)
            .map(RuleTest::probe_len)
            .max()
            .unwrap_or(0)
    }

    /// First rule whose tests all pass.
    pub fn select(&self, head: &[u8], file_size: u64) -> Option<&HeaderRule> {
        self.rules.iter().find(|r| r.matches(head, file_size))
    }
}

fn parse_hex_u64(field: &str, value: &str) -> Result<u64, DatError> {
    u64::from_str_radix(value.trim(), 16)
        .map_err(|_| DatError::invalid_rule(format!("{field}: {value:?} is not hexadecimal")))
}

fn parse_hex_bytes(field: &str, value: &str) -> Result<Vec<u8>, DatError> {
    let value = value.trim();
    if value.len() % 2 != 0 || !value.is_ascii() {
        return Err(DatError::invalid_rule(format!(
            "{field}: {value:?} must be an even number of hex digits"
        )));
    }
    (0..value.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&value[i..i + 2], 16).map_err(|_| {
                DatError::invalid_rule(format!("{field}: {value:?} is not hexadecimal"))
            })
        })
        .collect()
}

fn parse_bool(field: &str, value: Option<&str>) -> Result<bool, DatError> {
    match value.map(str::to_ascii_lowercase).as_deref() {
        None | Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(DatError::invalid_rule(format!(
            "{field}: {other:?} is not a boolean"
        ))),
    }
}

struct Attrs(Vec<(Vec<u8>, String)>);

impl Attrs {
    fn read(e: &BytesStart<'_>) -> Result<Self, DatError> {
        let mut out = Vec::new();
        for attr in e.attributes() {
            let attr = attr?;
            out.push((attr.key.as_ref().to_vec(), attr.unescape_value()?.to_string()));
        }
        Ok(Self(out))
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key.as_bytes())
            .map(|(_, v)| v.as_str())
    }

    fn require(&self, element: &str, key: &str) -> Result<&str, DatError> {
        self.get(key)
            .ok_or_else(|| DatError::invalid_rule(format!("<{element}> is missing {key}")))
    }
}

fn parse_rule(e: &BytesStart<'_>) -> Result<HeaderRule, DatError> {
    let attrs = Attrs::read(e)?;
    let end_offset = match attrs.get("end_offset") {
        None => None,
        Some(v) if v.eq_ignore_ascii_case("EOF") => None,
        Some(v) => Some(parse_hex_u64("end_offset", v)?),
    };
    Ok(HeaderRule {
        start_offset: attrs
            .get("start_offset")
            .map(|v| parse_hex_u64("start_offset", v))
            .transpose()?
            .unwrap_or(0),
        end_offset,
        operation: attrs
            .get("operation")
            .map(Operation::parse)
            .transpose()?
            .unwrap_or_default(),
        tests: Vec::new(),
    })
}

fn parse_test(e: &BytesStart<'_>) -> Result<Option<RuleTest>, DatError> {
    let tag = e.name().as_ref().to_vec();
    let attrs = Attrs::read(e)?;
    let offset = || {
        attrs
            .get("offset")
            .map(|v| parse_hex_u64("offset", v))
            .transpose()
            .map(|o| o.unwrap_or(0))
    };
    let result = parse_bool("result", attrs.get("result"))?;

    let test = match tag.as_slice() {
        b"data" => RuleTest::Data {
            offset: offset()?,
            value: parse_hex_bytes("value", attrs.require("data", "value")?)?,
            result,
        },
        b"and" | b"or" | b"xor" => {
            let op = match tag.as_slice() {
                b"and" => BitOp::And,
                b"or" => BitOp::Or,
                _ => BitOp::Xor,
            };
            let mask = parse_hex_bytes("mask", attrs.require("bitwise test", "mask")?)?;
            let value = parse_hex_bytes("value", attrs.require("bitwise test", "value")?)?;
            if mask.len() != value.len() {
                return Err(DatError::invalid_rule("mask and value lengths differ"));
            }
            RuleTest::Bitwise {
                op,
                offset: offset()?,
                mask,
                value,
                result,
            }
        }
        b"file" => {
            let size = attrs.require("file", "size")?;
            let size = if size.eq_ignore_ascii_case("PO2") {
                SizeSpec::PowerOfTwo
            } else {
                SizeSpec::Bytes(parse_hex_u64("size", size)?)
            };
            let operator = match attrs.get("operator").map(str::to_ascii_lowercase).as_deref() {
                None | Some("equal") => SizeOperator::Equal,
                Some("less") => SizeOperator::Less,
                Some("greater") => SizeOperator::Greater,
                Some(other) => {
                    return Err(DatError::invalid_rule(format!("unknown operator {other:?}")));
                }
            };
            RuleTest::FileSize {
                size,
                operator,
                result,
            }
        }
        other => {
            log::debug!(
                "Ignoring unknown rule element <{}>",
                String::from_utf8_lossy(other)
            );
            return Ok(None);
        }
    };
    Ok(Some(test))
}

/// Parse a detector document.
pub fn parse_rules<R: BufRead>(reader: R) -> Result<HeaderRules, DatError> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut rules = HeaderRules::default();
    let mut current: Option<HeaderRule> = None;
    let mut in_name = false;

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.name().as_ref() {
                b"rule" => current = Some(parse_rule(e)?),
                b"name" => in_name = current.is_none(),
                _ => {
                    if let Some(rule) = current.as_mut() {
                        rule.tests.extend(parse_test(e)?);
                    }
                }
            },
            Event::Empty(ref e) => match e.name().as_ref() {
                b"rule" => rules.rules.push(parse_rule(e)?),
                _ => {
                    if let Some(rule) = current.as_mut() {
                        rule.tests.extend(parse_test(e)?);
                    }
                }
            },
            Event::Text(ref e) if in_name => rules.name = e.unescape()?.to_string(),
            Event::End(ref e) => match e.name().as_ref() {
                b"rule" => {
                    if let Some(rule) = current.take() {
                        rules.rules.push(rule);
                    }
                }
                b"name" => in_name = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if rules.rules.is_empty() {
        return Err(DatError::invalid_rule("no <rule> elements found"));
    }
    Ok(rules)
}

/// Parse a detector file from a path.
pub fn parse_rules_file(path: &Path) -> Result<HeaderRules, DatError> {
    let file = std::fs::File::open(path)?;
    parse_rules(std::io::BufReader::new(file))
}
