//! Typed message content.

use influence_graph::AgentId;
use serde::{Deserialize, Serialize};

/// One key-value record in a message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentRecord {
    /// Free text.
    Text { text: String },

    /// Something that happened, and who took part.
    Event {
        description: String,
        #[serde(default)]
        participants: Vec<AgentId>,
    },

    /// A recurring narrative theme.
    Motif { motif: String },

    /// Arbitrary labelled value.
    Field { key: String, value: String },

    /// Score written back by evaluation.
    Importance { importance: f32 },
}

impl ContentRecord {
    /// Create a text record.
    pub fn text(text: impl Into<String>) -> Self {
        ContentRecord::Text { text: text.into() }
    }

    /// Create an event record without participants.
    pub fn event(description: impl Into<String>) -> Self {
        ContentRecord::Event {
            description: description.into(),
            participants: Vec::new(),
        }
    }

    /// Create a motif record.
    pub fn motif(motif: impl Into<String>) -> Self {
        ContentRecord::Motif {
            motif: motif.into(),
        }
    }

    /// Create a labelled field record.
    pub fn field(key: impl Into<String>, value: impl Into<String>) -> Self {
        ContentRecord::Field {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Text carried by this record, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentRecord::Text { text } => Some(text),
            ContentRecord::Event { description, .. } => Some(description),
            ContentRecord::Motif { motif } => Some(motif),
            ContentRecord::Field { value, .. } => Some(value),
            ContentRecord::Importance { .. } => None,
        }
    }
}

/// Ordered list of records making up a message body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageContent(Vec<ContentRecord>);

impl MessageContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content holding a single text record.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self(vec![ContentRecord::text(text)])
    }

    pub fn with_record(mut self, record: ContentRecord) -> Self {
        self.0.push(record);
        self
    }

    pub fn push(&mut self, record: ContentRecord) {
        self.0.push(record);
    }

    pub fn records(&self) -> &[ContentRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All text fragments in record order.
    pub fn text_fragments(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(ContentRecord::as_text)
    }

    /// Value of a labelled field.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.0.iter().find_map(|record| match record {
            ContentRecord::Field { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// The importance written by the last evaluation, if any.
    pub fn importance(&self) -> Option<f32> {
        self.0.iter().find_map(|record| match record {
            ContentRecord::Importance { importance } => Some(*importance),
            _ => None,
        })
    }

    /// Write the importance record, replacing a previous one in place.
    pub fn set_importance(&mut self, importance: f32) {
        let existing = self.0.iter_mut().find_map(|record| match record {
            ContentRecord::Importance { importance: slot } => Some(slot),
            _ => None,
        });
        match existing {
            Some(slot) => *slot = importance,
            None => self.0.push(ContentRecord::Importance { importance }),
        }
    }
}

impl FromIterator<ContentRecord> for MessageContent {
    fn from_iter<T: IntoIterator<Item = ContentRecord>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
