//! Section and continuation-token model
//!
//! A scraped page boils down to one item section: a list of renderer
//! objects plus whatever continuation data the payload carried. The
//! frontend has gone through three generations of continuation shapes and
//! old payloads still show up, so token extraction understands all of
//! them:
//!
//! - a `continuations` list with `nextContinuationData` (oldest; resumes
//!   through the legacy form-encoded request)
//! - a `continuations` object holding a `continuationEndpoint` command
//! - a trailing `continuationItemRenderer` in the item list itself
//!   (current; stripped from the visible items on assembly)

use serde_json::Value;

use crate::feed::PageToken;
use crate::types::OptionStringExt;

/// Continuation token carried between scraped pages
///
/// `endpoint` is the API path advertised by the payload; tokens without
/// one predate the endpoint-command shape and resume through the legacy
/// request instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeToken {
    /// Click tracking blob the backend wants echoed back
    pub click_tracking: String,
    /// Opaque resume position
    pub continuation: String,
    /// API path to POST the continuation to, when advertised
    pub endpoint: Option<String>,
}

impl ScrapeToken {
    /// Create a bare token with no click tracking or endpoint
    pub fn new(continuation: impl Into<String>) -> Self {
        Self {
            click_tracking: String::new(),
            continuation: continuation.into(),
            endpoint: None,
        }
    }
}

impl PageToken for ScrapeToken {
    /// An empty continuation cannot resume anything; some payloads use it
    /// as their end-of-collection marker
    fn is_terminal(&self) -> bool {
        self.continuation.is_empty()
    }
}

/// One item section extracted from a scraped payload
///
/// `contents` holds the visible renderer objects in server order;
/// pagination state lives separately and is read through
/// [`SectionNode::next_token`].
#[derive(Debug, Clone, PartialEq)]
pub struct SectionNode {
    /// Renderer objects, one per visible item
    pub contents: Vec<Value>,
    continuations: Option<Value>,
}

impl SectionNode {
    /// Assemble a section, stripping trailing `continuationItemRenderer`
    /// entries out of the visible items
    fn assemble(mut contents: Vec<Value>, mut continuations: Option<Value>) -> Self {
        while let Some(renderer) = contents
            .last()
            .and_then(|item| item.get("continuationItemRenderer"))
        {
            let renderer = renderer.clone();
            contents.pop();
            // Explicit continuation data outranks the trailing item
            if continuations.is_none() {
                continuations = Some(renderer);
            }
        }
        Self {
            contents,
            continuations,
        }
    }

    /// Read a section out of an object carrying `contents` (and possibly
    /// `continuations`) keys
    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        let contents = value.get("contents")?.as_array()?.clone();
        Some(Self::assemble(contents, value.get("continuations").cloned()))
    }

    /// Walk an initial browse payload to the selected tab's item section
    pub(crate) fn from_browse(payload: &Value) -> Option<Self> {
        let tabs = payload
            .get("contents")?
            .get("twoColumnBrowseResultsRenderer")?
            .get("tabs")?
            .as_array()?;
        let tab = tabs.iter().find(|tab| {
            tab.get("tabRenderer")
                .and_then(|tab| tab.get("selected"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        })?;
        let sections = tab
            .get("tabRenderer")?
            .get("content")?
            .get("sectionListRenderer")?
            .get("contents")?
            .as_array()?;
        Self::merge_sections(sections)
    }

    /// Read a section out of a continuation response
    ///
    /// Older payloads answer under `continuationContents`, keyed by a
    /// renderer kind that varies; newer ones append items through an
    /// `onResponseReceivedActions` command.
    pub(crate) fn from_continuation(payload: &Value) -> Option<Self> {
        let continued = payload
            .get("continuationContents")
            .and_then(Value::as_object)
            .and_then(|continued| {
                continued
                    .iter()
                    .find(|(key, _)| key.ends_with("Continuation"))
                    .map(|(_, value)| value)
            });
        if let Some(section) = continued {
            return Self::from_value(section);
        }

        let appended = payload
            .get("onResponseReceivedActions")?
            .as_array()?
            .iter()
            .find_map(|action| action.get("appendContinuationItemsAction"))?
            .get("continuationItems")?
            .as_array()?;
        // Appended items are usually wrapped in item sections, but some
        // payloads hand back the raw renderer list
        Self::merge_sections(appended).or_else(|| Some(Self::assemble(appended.clone(), None)))
    }

    /// Merge a section list into one section
    ///
    /// The first entry must be an `itemSectionRenderer`; later item
    /// sections contribute their items (and, when present, replace the
    /// continuation data, since they sit further down the list). A sibling
    /// `continuationItemRenderer` only fills in missing continuation data.
    fn merge_sections(sections: &[Value]) -> Option<Self> {
        let mut iter = sections.iter();
        let first = iter.next()?.get("itemSectionRenderer")?;
        let mut contents = first
            .get("contents")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let mut continuations = first.get("continuations").cloned();

        for sibling in iter {
            if let Some(section) = sibling.get("itemSectionRenderer") {
                if let Some(more) = section.get("contents").and_then(Value::as_array) {
                    contents.extend(more.iter().cloned());
                }
                if let Some(next) = section.get("continuations") {
                    continuations = Some(next.clone());
                }
            } else if let Some(renderer) = sibling.get("continuationItemRenderer") {
                if continuations.is_none() {
                    continuations = Some(renderer.clone());
                }
            }
        }

        Some(Self::assemble(contents, continuations))
    }

    /// Extract the token resuming after this section, if it carries one
    pub fn next_token(&self) -> Option<ScrapeToken> {
        let continuations = self.continuations.as_ref()?;

        // Oldest shape: a list of continuation descriptors
        if let Some(first) = continuations.as_array().and_then(|list| list.first()) {
            let data = first.get("nextContinuationData")?;
            return Some(ScrapeToken {
                click_tracking: string_at(data, "clickTrackingParams").unwrap_or_default(),
                continuation: string_at(data, "continuation")?,
                endpoint: None,
            });
        }

        // Both newer shapes wrap a continuationEndpoint command
        let endpoint = continuations.get("continuationEndpoint")?;
        Some(ScrapeToken {
            click_tracking: string_at(endpoint, "clickTrackingParams").unwrap_or_default(),
            continuation: string_at(endpoint.get("continuationCommand")?, "token")?,
            endpoint: endpoint
                .get("commandMetadata")
                .and_then(|meta| meta.get("webCommandMetadata"))
                .and_then(|meta| string_at(meta, "apiUrl"))
                .none_if_empty(),
        })
    }
}

fn string_at(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Render a text node (`runs` list or `simpleText`) to a plain string
///
/// Missing nodes and unknown shapes render as the empty string.
pub fn text_from_node(node: Option<&Value>) -> String {
    let Some(node) = node else {
        return String::new();
    };
    if let Some(runs) = node.get("runs").and_then(Value::as_array) {
        return runs
            .iter()
            .filter_map(|run| run.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" ");
    }
    node.get("simpleText")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
