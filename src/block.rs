//! Block data model: typed ids, the closed set of block kinds, the per-kind
//! content payloads and the lenient JSON boundary used by import/initialize.

use std::{collections::BTreeMap, fmt, str::FromStr, sync::LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};

use crate::config::ImportanceRules;

static TAG_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]*>").ok());

/// Opaque block identifier (UUIDv4). Never reused once minted.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(uuid::Uuid);

impl BlockId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// First 8 hex characters, for display only.
    pub fn short(&self) -> String {
        self.0.as_simple().to_string()[..8].to_string()
    }

    pub fn parse(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.short())
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a block is. The store only special-cases a few of these; rendering
/// is left to the content renderer.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumString, Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BlockKind {
    #[default]
    Text,
    Banner,
    Callout,
    Title,
    Table,
    Image,
    Code,
    List,
    Divider,
    Spacer,
    Embed,
    File,
}

impl BlockKind {
    /// Parse from string (case-insensitive).
    pub fn from_name(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s.trim()).ok()
    }

    /// Banner, callout and title share the banner payload.
    pub fn is_banner_family(&self) -> bool {
        matches!(self, BlockKind::Banner | BlockKind::Callout | BlockKind::Title)
    }

    pub fn label(&self) -> &'static str {
        match self {
            BlockKind::Text => "Text",
            BlockKind::Banner => "Banner",
            BlockKind::Callout => "Callout",
            BlockKind::Title => "Title",
            BlockKind::Table => "Table",
            BlockKind::Image => "Image",
            BlockKind::Code => "Code",
            BlockKind::List => "List",
            BlockKind::Divider => "Divider",
            BlockKind::Spacer => "Spacer",
            BlockKind::Embed => "Embed",
            BlockKind::File => "File",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BannerContent {
    pub text: String,
    pub color: String,
    pub is_title: bool,
    pub is_callout: bool,
    pub new_line: bool,
}

impl Default for BannerContent {
    fn default() -> Self {
        Self {
            text: String::new(),
            color: "blue".to_string(),
            is_title: false,
            is_callout: false,
            new_line: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableContent {
    pub data: Vec<Vec<String>>,
    pub rows: usize,
    pub columns: usize,
    pub has_headers: bool,
}

const DEFAULT_TABLE_SIZE: usize = 3;

impl Default for TableContent {
    fn default() -> Self {
        Self::blank(DEFAULT_TABLE_SIZE, DEFAULT_TABLE_SIZE)
    }
}

impl TableContent {
    pub fn blank(rows: usize, columns: usize) -> Self {
        Self {
            data: vec![vec![String::new(); columns]; rows],
            rows,
            columns,
            has_headers: false,
        }
    }

    pub fn from_rows<S: AsRef<str>>(rows: &[Vec<S>]) -> Self {
        let data = rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.as_ref().to_string()).collect())
            .collect();
        let mut table = Self {
            data,
            rows: 0,
            columns: 0,
            has_headers: false,
        };
        table.normalize();
        table
    }

    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }

    /// Re-derive `rows`/`columns` from `data` and pad ragged rows. An empty
    /// grid is rebuilt from the declared dimensions (3x3 when those are zero).
    pub fn normalize(&mut self) {
        if self.data.is_empty() {
            let rows = if self.rows == 0 { DEFAULT_TABLE_SIZE } else { self.rows };
            let columns = if self.columns == 0 {
                DEFAULT_TABLE_SIZE
            } else {
                self.columns
            };
            self.data = vec![vec![String::new(); columns]; rows];
        }
        let columns = self.data.iter().map(Vec::len).max().unwrap_or(0).max(1);
        for row in &mut self.data {
            row.resize(columns, String::new());
        }
        self.rows = self.data.len();
        self.columns = columns;
    }

    /// Rows after the header row that hold at least one non-blank cell.
    pub fn data_rows(&self) -> usize {
        let skip = usize::from(self.has_headers);
        self.data
            .iter()
            .skip(skip)
            .filter(|row| row.iter().any(|cell| !strip_tags(cell).trim().is_empty()))
            .count()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.data.get(row)?.get(column).map(String::as_str)
    }

    pub fn cell_mut(&mut self, row: usize, column: usize) -> Option<&mut String> {
        self.data.get_mut(row)?.get_mut(column)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageContent {
    pub src: String,
    pub alt: String,
    pub caption: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeContent {
    pub code: String,
    pub language: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListContent {
    pub items: Vec<String>,
    pub ordered: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacerContent {
    pub height: u16,
}

impl Default for SpacerContent {
    fn default() -> Self {
        Self { height: 1 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedContent {
    pub url: String,
    pub title: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileContent {
    pub name: String,
    pub url: String,
    pub size: u64,
}

/// Kind-dependent payload. Serialized without a tag: the block's `type`
/// field says which shape to expect.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BlockContent {
    Text(String),
    Banner(BannerContent),
    Table(TableContent),
    Image(ImageContent),
    Code(CodeContent),
    List(ListContent),
    Spacer(SpacerContent),
    Embed(EmbedContent),
    File(FileContent),
    Empty,
}

impl BlockContent {
    pub fn default_for(kind: BlockKind) -> Self {
        Self::from_value(kind, Value::Null)
    }

    /// Shape an arbitrary JSON payload into the content for `kind`, filling
    /// defaults for anything missing or malformed.
    pub fn from_value(kind: BlockKind, value: Value) -> Self {
        match kind {
            BlockKind::Text => BlockContent::Text(text_from_value(&value)),
            BlockKind::Banner | BlockKind::Callout | BlockKind::Title => {
                let mut banner = match value {
                    Value::String(text) => BannerContent {
                        text,
                        ..BannerContent::default()
                    },
                    other => serde_json::from_value(other).unwrap_or_default(),
                };
                if banner.color.trim().is_empty() {
                    banner.color = BannerContent::default().color;
                }
                banner.is_title |= kind == BlockKind::Title;
                banner.is_callout |= kind == BlockKind::Callout;
                BlockContent::Banner(banner)
            }
            BlockKind::Table => {
                let mut table: TableContent = serde_json::from_value(value).unwrap_or_default();
                table.normalize();
                BlockContent::Table(table)
            }
            BlockKind::Image => BlockContent::Image(match value {
                Value::String(src) => ImageContent {
                    src,
                    ..ImageContent::default()
                },
                other => serde_json::from_value(other).unwrap_or_default(),
            }),
            BlockKind::Code => BlockContent::Code(match value {
                Value::String(code) => CodeContent {
                    code,
                    ..CodeContent::default()
                },
                other => serde_json::from_value(other).unwrap_or_default(),
            }),
            BlockKind::List => BlockContent::List(match value {
                Value::Array(items) => ListContent {
                    items: items.iter().map(text_from_value).collect(),
                    ordered: false,
                },
                other => serde_json::from_value(other).unwrap_or_default(),
            }),
            BlockKind::Divider => BlockContent::Empty,
            BlockKind::Spacer => {
                BlockContent::Spacer(serde_json::from_value(value).unwrap_or_default())
            }
            BlockKind::Embed => BlockContent::Embed(match value {
                Value::String(url) => EmbedContent {
                    url,
                    ..EmbedContent::default()
                },
                other => serde_json::from_value(other).unwrap_or_default(),
            }),
            BlockKind::File => {
                BlockContent::File(serde_json::from_value(value).unwrap_or_default())
            }
        }
    }

    /// Re-shape this payload for `kind`. Matching payloads only get their
    /// kind-specific defaults applied; mismatched ones go through JSON.
    pub fn normalized_for(self, kind: BlockKind) -> Self {
        let value = serde_json::to_value(&self).unwrap_or_default();
        Self::from_value(kind, value)
    }

    /// Plain text of the payload with markup removed.
    pub fn plain_text(&self) -> String {
        match self {
            BlockContent::Text(text) => strip_tags(text),
            BlockContent::Banner(banner) => strip_tags(&banner.text),
            BlockContent::Table(table) => table
                .data
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| strip_tags(cell))
                        .collect::<Vec<_>>()
                        .join(" | ")
                })
                .collect::<Vec<_>>()
                .join("\n"),
            BlockContent::Image(image) => image.caption.clone(),
            BlockContent::Code(code) => code.code.clone(),
            BlockContent::List(list) => list
                .items
                .iter()
                .map(|item| strip_tags(item))
                .collect::<Vec<_>>()
                .join("\n"),
            BlockContent::Embed(embed) => embed.url.clone(),
            BlockContent::File(file) => file.name.clone(),
            BlockContent::Spacer(_) | BlockContent::Empty => String::new(),
        }
    }
}

fn text_from_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Object(map) => ["text", "html", "content"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string(),
        Value::Number(number) => number.to_string(),
        _ => String::new(),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockMetadata {
    pub editable: bool,
    pub deletable: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for BlockMetadata {
    fn default() -> Self {
        Self {
            editable: true,
            deletable: true,
            extra: BTreeMap::new(),
        }
    }
}

/// One addressable unit of document content.
///
/// Deserialization is lenient: any JSON value becomes a block, with missing
/// or malformed fields replaced by defaults. A missing `order` deserializes as
/// NaN so the store can place it by position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Value")]
pub struct Block {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub content: BlockContent,
    pub order: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: BlockMetadata,
}

impl Block {
    pub fn new(data: BlockData, order: f64) -> Self {
        let now = Utc::now();
        Self {
            id: BlockId::new(),
            kind: data.kind,
            content: data.content.normalized_for(data.kind),
            order,
            created_at: now,
            updated_at: now,
            metadata: data.metadata.unwrap_or_default(),
        }
    }

    /// Value copy with a freshly minted id and timestamps.
    pub fn fresh_copy(&self) -> Self {
        let now = Utc::now();
        Self {
            id: BlockId::new(),
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    pub fn data(&self) -> BlockData {
        BlockData {
            kind: self.kind,
            content: self.content.clone(),
            metadata: Some(self.metadata.clone()),
        }
    }

    pub fn apply_update(&mut self, update: BlockUpdate) {
        let BlockUpdate {
            kind,
            content,
            metadata,
        } = update;
        let previous = self.kind;
        if let Some(kind) = kind {
            self.kind = kind;
        }
        let content = content.unwrap_or_else(|| self.content.clone());
        self.content = content.normalized_for(self.kind);
        if self.kind != previous {
            if let BlockContent::Banner(banner) = &mut self.content {
                banner.is_title = self.kind == BlockKind::Title;
                banner.is_callout = self.kind == BlockKind::Callout;
            }
        }
        if let Some(metadata) = metadata {
            self.metadata = metadata;
        }
        self.updated_at = Utc::now();
    }

    pub fn plain_text(&self) -> String {
        self.content.plain_text()
    }

    /// Kind-specific emptiness, used by callers deciding whether to drop a
    /// block on blur.
    pub fn is_empty(&self) -> bool {
        match &self.content {
            BlockContent::Text(text) => strip_tags(text).trim().is_empty(),
            BlockContent::Banner(banner) => strip_tags(&banner.text).trim().is_empty(),
            BlockContent::Table(table) => table.data_rows() == 0,
            BlockContent::Image(image) => image.src.trim().is_empty(),
            BlockContent::Code(code) => code.code.trim().is_empty(),
            BlockContent::List(list) => list.items.iter().all(|item| strip_tags(item).trim().is_empty()),
            BlockContent::Embed(embed) => embed.url.trim().is_empty(),
            BlockContent::File(file) => file.url.trim().is_empty() && file.name.trim().is_empty(),
            BlockContent::Spacer(_) | BlockContent::Empty => false,
        }
    }

    /// Whether deleting this block warrants a confirmation prompt.
    pub fn is_important(&self, rules: &ImportanceRules) -> bool {
        match (&self.kind, &self.content) {
            (BlockKind::Table, BlockContent::Table(table)) => table.data_rows() > 0,
            (BlockKind::Image, _) => true,
            (BlockKind::Text, BlockContent::Text(text)) => {
                strip_tags(text).chars().count() > rules.text_chars
            }
            (kind, BlockContent::Banner(banner)) if kind.is_banner_family() => {
                strip_tags(&banner.text).chars().count() > rules.banner_chars
            }
            _ => false,
        }
    }

    pub fn table(&self) -> Option<&TableContent> {
        match &self.content {
            BlockContent::Table(table) => Some(table),
            _ => None,
        }
    }
}

impl From<Value> for Block {
    fn from(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Block::new(BlockData::of(BlockKind::Text), f64::NAN);
        };
        let kind = map
            .get("type")
            .and_then(Value::as_str)
            .and_then(BlockKind::from_name)
            .unwrap_or_default();
        let id = map
            .get("id")
            .and_then(Value::as_str)
            .and_then(BlockId::parse)
            .unwrap_or_default();
        let order = match map.get("order") {
            Some(Value::Number(number)) => number.as_f64().unwrap_or(f64::NAN),
            Some(Value::String(text)) => text.trim().parse().unwrap_or(f64::NAN),
            _ => f64::NAN,
        };
        let created_at = map.get("createdAt").and_then(timestamp_from_value);
        let updated_at = map.get("updatedAt").and_then(timestamp_from_value);
        let content = BlockContent::from_value(kind, map.remove("content").unwrap_or_default());
        let metadata = map
            .remove("metadata")
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default();
        let created_at = created_at.unwrap_or_else(Utc::now);
        Self {
            id,
            kind,
            content,
            order,
            created_at,
            updated_at: updated_at.unwrap_or(created_at),
            metadata,
        }
    }
}

fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|stamp| stamp.with_timezone(&Utc)),
        Value::Number(number) => number.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Payload for creating a block: kind, content and optional capabilities.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockData {
    pub kind: BlockKind,
    pub content: BlockContent,
    pub metadata: Option<BlockMetadata>,
}

impl BlockData {
    pub fn new(kind: BlockKind, content: BlockContent) -> Self {
        Self {
            kind,
            content,
            metadata: None,
        }
    }

    /// Default content for `kind`.
    pub fn of(kind: BlockKind) -> Self {
        Self::new(kind, BlockContent::default_for(kind))
    }

    pub fn from_json(kind: BlockKind, content: Value) -> Self {
        Self::new(kind, BlockContent::from_value(kind, content))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(BlockKind::Text, BlockContent::Text(text.into()))
    }

    pub fn banner(text: impl Into<String>) -> Self {
        Self::new(
            BlockKind::Banner,
            BlockContent::Banner(BannerContent {
                text: text.into(),
                ..BannerContent::default()
            }),
        )
    }

    pub fn table(table: TableContent) -> Self {
        Self::new(BlockKind::Table, BlockContent::Table(table))
    }

    pub fn image(src: impl Into<String>) -> Self {
        Self::new(
            BlockKind::Image,
            BlockContent::Image(ImageContent {
                src: src.into(),
                ..ImageContent::default()
            }),
        )
    }

    pub fn with_metadata(mut self, metadata: BlockMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Shallow update merged into a block by `BlockStore::update_block`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockUpdate {
    pub kind: Option<BlockKind>,
    pub content: Option<BlockContent>,
    pub metadata: Option<BlockMetadata>,
}

impl BlockUpdate {
    pub fn content(content: BlockContent) -> Self {
        Self {
            content: Some(content),
            ..Self::default()
        }
    }

    pub fn kind(kind: BlockKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn metadata(metadata: BlockMetadata) -> Self {
        Self {
            metadata: Some(metadata),
            ..Self::default()
        }
    }
}

/// Remove markup tags and decode the handful of entities rich-text surfaces
/// emit.
pub fn strip_tags(text: &str) -> String {
    let stripped = match TAG_PATTERN.as_ref() {
        Some(pattern) => pattern.replace_all(text, "").into_owned(),
        None => text.to_string(),
    };
    stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

#[cfg(test)]
#[path = "block_tests.rs"]
mod block_tests;
