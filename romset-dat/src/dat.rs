use std::io::{BufRead, Read};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use romset_core::{CatalogRecord, DumpQuality, RomEntry};

use crate::error::DatError;

/// A parsed catalog (Logiqx XML or ClrMamePro format).
#[derive(Debug, Clone, Default)]
pub struct DatFile {
    pub name: String,
    pub description: String,
    pub version: String,
    /// Header-rule file referenced by `<clrmamepro header="...">`.
    pub header: Option<String>,
    pub games: Vec<DatGame>,
}

/// A single game entry.
#[derive(Debug, Clone, Default)]
pub struct DatGame {
    pub name: String,
    pub clone_of: Option<String>,
    pub is_bios: Option<bool>,
    pub releases: Vec<DatRelease>,
    pub roms: Vec<DatRom>,
}

/// A `<release>` element: one region (and optionally language) the game
/// was released in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatRelease {
    pub region: String,
    pub language: Option<String>,
}

/// A single ROM entry within a game.
#[derive(Debug, Clone, Default)]
pub struct DatRom {
    pub name: String,
    pub size: u64,
    /// CRC32 checksum (lowercase hex)
    pub crc: Option<String>,
    /// SHA1 checksum (lowercase hex)
    pub sha1: Option<String>,
    /// Dump status, e.g. `baddump`, `verified`
    pub status: Option<String>,
}

impl DatFile {
    /// True when at least one game declares a parent.
    pub fn has_clones(&self) -> bool {
        self.games.iter().any(|g| g.clone_of.is_some())
    }

    /// Number of ROM entries that carry no SHA1.
    pub fn roms_without_sha1(&self) -> usize {
        self.games
            .iter()
            .flat_map(|g| &g.roms)
            .filter(|r| r.sha1.is_none())
            .count()
    }

    /// Catalog records for the selection engine, in catalog order.
    pub fn records(&self) -> Vec<CatalogRecord> {
        self.games.iter().map(CatalogRecord::from).collect()
    }
}

impl DatGame {
    /// Dump status declared on the ROM entries, if any.
    fn declared_quality(&self) -> Option<DumpQuality> {
        let statuses = self.roms.iter().filter_map(|r| r.status.as_deref());
        let mut quality = None;
        for status in statuses {
            match status.to_ascii_lowercase().as_str() {
                "baddump" | "nodump" => return Some(DumpQuality::Bad),
                "good" | "verified" => quality = Some(DumpQuality::Good),
                _ => {}
            }
        }
        quality
    }
}

impl From<&DatGame> for CatalogRecord {
    fn from(game: &DatGame) -> Self {
        CatalogRecord {
            name: game.name.clone(),
            clone_of: game.clone_of.clone(),
            regions: game.releases.iter().map(|r| r.region.clone()).collect(),
            languages: game
                .releases
                .iter()
                .filter_map(|r| r.language.clone())
                .collect(),
            is_bios: game.is_bios,
            quality: game.declared_quality(),
            roms: game
                .roms
                .iter()
                .map(|r| RomEntry {
                    name: r.name.clone(),
                    size: r.size,
                    crc32: r.crc.clone(),
                    sha1: r.sha1.clone(),
                })
                .collect(),
        }
    }
}

/// Parse a DAT file, auto-detecting format (XML or ClrMamePro).
pub fn parse_dat<R: BufRead>(mut reader: R) -> Result<DatFile, DatError> {
    // Peek at the first non-whitespace byte to detect the format
    let mut first_bytes = Vec::new();
    let mut buf = [0u8; 1];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            return Err(DatError::invalid_dat("Empty DAT file"));
        }
        first_bytes.push(buf[0]);
        if !buf[0].is_ascii_whitespace() {
            break;
        }
    }

    let chain = std::io::Cursor::new(first_bytes).chain(reader);
    let buffered = std::io::BufReader::new(chain);

    if buf[0] == b'<' {
        parse_xml(buffered)
    } else {
        parse_clrmamepro(buffered)
    }
}

/// Parse a DAT file from a file path.
pub fn parse_dat_file(path: &Path) -> Result<DatFile, DatError> {
    let file = std::fs::File::open(path)?;
    parse_dat(std::io::BufReader::new(file))
}

// ---------------------------------------------------------------------------
// Logiqx XML parser
// ---------------------------------------------------------------------------

fn attr_map(e: &BytesStart<'_>) -> Result<Vec<(String, String)>, DatError> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        out.push((
            String::from_utf8_lossy(attr.key.as_ref()).to_string(),
            attr.unescape_value()?.to_string(),
        ));
    }
    Ok(out)
}

fn get<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn yes_no(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "true" => Some(true),
        "no" | "false" => Some(false),
        _ => None,
    }
}

fn game_from_attrs(e: &BytesStart<'_>) -> Result<DatGame, DatError> {
    let attrs = attr_map(e)?;
    Ok(DatGame {
        name: get(&attrs, "name").unwrap_or_default().to_string(),
        clone_of: get(&attrs, "cloneof")
            .filter(|v| !v.is_empty())
            .map(str::to_string),
        is_bios: get(&attrs, "isbios").and_then(yes_no),
        ..Default::default()
    })
}

/// Handle a child element of `<game>` or `<header>`.
fn apply_element(
    dat: &mut DatFile,
    game: Option<&mut DatGame>,
    e: &BytesStart<'_>,
) -> Result<(), DatError> {
    match (e.name().as_ref(), game) {
        (b"rom", Some(game)) => game.roms.push(parse_xml_rom_attributes(e)?),
        (b"release", Some(game)) => {
            let attrs = attr_map(e)?;
            if let Some(region) = get(&attrs, "region") {
                game.releases.push(DatRelease {
                    region: region.to_string(),
                    language: get(&attrs, "language").map(str::to_string),
                });
            }
        }
        (b"clrmamepro", None) => {
            let attrs = attr_map(e)?;
            dat.header = get(&attrs, "header")
                .filter(|h| !h.is_empty())
                .map(str::to_string);
        }
        _ => {}
    }
    Ok(())
}

fn parse_xml<R: BufRead>(reader: R) -> Result<DatFile, DatError> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut dat = DatFile::default();

    let mut in_header = false;
    let mut current_tag = String::new();
    let mut current_game: Option<DatGame> = None;

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.name().as_ref() {
                b"header" => in_header = true,
                b"game" | b"machine" => current_game = Some(game_from_attrs(e)?),
                b"rom" | b"release" | b"clrmamepro" => {
                    apply_element(&mut dat, current_game.as_mut(), e)?
                }
                other => current_tag = String::from_utf8_lossy(other).to_string(),
            },
            Event::Empty(ref e) => apply_element(&mut dat, current_game.as_mut(), e)?,
            Event::Text(ref e) => {
                if in_header {
                    let text = e.unescape()?.to_string();
                    match current_tag.as_str() {
                        "name" => dat.name = text,
                        "description" => dat.description = text,
                        "version" => dat.version = text,
                        _ => {}
                    }
                }
            }
            Event::End(ref e) => match e.name().as_ref() {
                b"header" => in_header = false,
                b"game" | b"machine" => {
                    if let Some(game) = current_game.take() {
                        dat.games.push(game);
                    }
                }
                _ => current_tag.clear(),
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if dat.name.is_empty() && dat.games.is_empty() {
        return Err(DatError::invalid_dat(
            "No header or games found in XML DAT file",
        ));
    }

    Ok(dat)
}

fn parse_xml_rom_attributes(e: &BytesStart<'_>) -> Result<DatRom, DatError> {
    let mut rom = DatRom::default();

    for (key, value) in attr_map(e)? {
        match key.as_str() {
            "name" => rom.name = value,
            "size" => {
                rom.size = value
                    .parse()
                    .map_err(|_| DatError::invalid_dat(format!("Invalid ROM size: {value}")))?;
            }
            "crc" => rom.crc = Some(value.to_lowercase()),
            "sha1" => rom.sha1 = Some(value.to_lowercase()),
            "status" => rom.status = Some(value),
            _ => {}
        }
    }

    Ok(rom)
}

// ---------------------------------------------------------------------------
// ClrMamePro DAT parser
// ---------------------------------------------------------------------------

/// Parse a ClrMamePro format DAT file.
///
/// Format:
/// ```text
/// clrmamepro (
///     name "System Name"
///     header "No-Intro_NES.xml"
/// )
///
/// game (
///     name "Game Name (Region)"
///     cloneof "Parent Name (Region)"
///     rom ( name "Game Name (Region).ext" size 12345 crc AABBCCDD sha1 ... )
/// )
/// ```
fn parse_clrmamepro<R: BufRead>(reader: R) -> Result<DatFile, DatError> {
    let mut dat = DatFile::default();

    let mut in_block: Option<String> = None;
    let mut current_game: Option<DatGame> = None;

    for line_result in reader.lines() {
        let line = line_result?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let Some(block_type) = in_block.as_deref() else {
            if let Some(block_type) = detect_block_start(trimmed) {
                if block_type == "game" || block_type == "machine" {
                    current_game = Some(DatGame::default());
                }
                in_block = Some(block_type);
            }
            continue;
        };

        if trimmed == ")" {
            if let Some(game) = current_game.take() {
                dat.games.push(game);
            }
            in_block = None;
            continue;
        }

        let Some((key, value)) = parse_kv(trimmed) else {
            continue;
        };
        match block_type {
            "clrmamepro" => match key.as_str() {
                "name" => dat.name = value,
                "description" => dat.description = value,
                "version" => dat.version = value,
                "header" => dat.header = Some(value).filter(|v| !v.is_empty()),
                _ => {}
            },
            "game" | "machine" => {
                if let Some(ref mut game) = current_game {
                    match key.as_str() {
                        "name" => game.name = value,
                        "cloneof" => game.clone_of = Some(value).filter(|v| !v.is_empty()),
                        "isbios" => game.is_bios = yes_no(&value),
                        "region" => game.releases.push(DatRelease {
                            region: value,
                            language: None,
                        }),
                        "rom" => {
                            if let Some(rom) = parse_clr_rom_inline(&value)? {
                                game.roms.push(rom);
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    if dat.name.is_empty() && dat.games.is_empty() {
        return Err(DatError::invalid_dat(
            "No header or games found in ClrMamePro DAT file",
        ));
    }

    Ok(dat)
}

/// Detect a block start like `clrmamepro (` or `game (`.
fn detect_block_start(line: &str) -> Option<String> {
    let block_type = line.trim_end().strip_suffix('(')?.trim();
    if !block_type.is_empty() && block_type.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Some(block_type.to_lowercase());
    }
    None
}

/// Parse a key-value line like `name "Some Value"` or `version 20240101`.
/// For `rom ( ... )` lines, the value is the content inside outer parens.
fn parse_kv(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim();

    if let Some(rest) = trimmed.strip_prefix("rom") {
        let rest = rest.trim();
        if let Some(inner) = rest.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
            return Some(("rom".to_string(), inner.trim().to_string()));
        }
    }

    let mut parts = trimmed.splitn(2, |c: char| c.is_ascii_whitespace());
    let key = parts.next()?.trim().to_string();
    let raw_value = parts.next()?.trim();

    let value = raw_value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(raw_value)
        .to_string();

    Some((key, value))
}

/// Parse an inline ROM entry like:
/// `name "Game (Region).ext" size 12345 crc AABBCCDD sha1 ... flags baddump`
fn parse_clr_rom_inline(inner: &str) -> Result<Option<DatRom>, DatError> {
    let tokens = tokenize_rom_line(inner);
    let mut rom = DatRom::default();

    let mut pairs = tokens.chunks(2);
    while let Some([key, value]) = pairs.next() {
        match key.as_str() {
            "name" => rom.name = value.clone(),
            "size" => {
                rom.size = value
                    .parse()
                    .map_err(|_| DatError::invalid_dat(format!("Invalid ROM size: {value}")))?;
            }
            "crc" => rom.crc = Some(value.to_lowercase()),
            "sha1" => rom.sha1 = Some(value.to_lowercase()),
            "status" | "flags" => rom.status = Some(value.clone()),
            _ => {}
        }
    }

    if rom.name.is_empty() {
        return Ok(None);
    }
    Ok(Some(rom))
}

/// Tokenize a ROM line, respecting quoted strings.
/// `name "Game (Region).ext" size 12345 crc AB` → ["name", "Game (Region).ext", "size", "12345", "crc", "AB"]
fn tokenize_rom_line(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            chars.next();
        }
        let Some(&first) = chars.peek() else {
            break;
        };

        let mut token = String::new();
        if first == '"' {
            chars.next();
            for c in chars.by_ref() {
                if c == '"' {
                    break;
                }
                token.push(c);
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_ascii_whitespace() {
                    break;
                }
                token.push(c);
                chars.next();
            }
        }
        tokens.push(token);
    }

    tokens
}
