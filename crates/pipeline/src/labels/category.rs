use serde::Serialize;

pub(crate) const NUM_VALID_CATEGORIES: usize = 3;

/// Where a label came from.
///
/// Precedence when the same name shows up in more than one category:
/// `Parsed > StructuredMetadata > Stream`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelCategory {
    /// Attached to the stream at ingestion time
    Stream = 0,
    /// Attached to the entry out-of-band
    StructuredMetadata = 1,
    /// Extracted from the line by a pipeline stage
    Parsed = 2,
    /// Not found
    Invalid = 3,
}

impl LabelCategory {
    /// The three valid categories, lowest precedence first.
    pub const ALL: [LabelCategory; NUM_VALID_CATEGORIES] = [
        LabelCategory::Stream,
        LabelCategory::StructuredMetadata,
        LabelCategory::Parsed,
    ];

    /// Slot in the pending-addition array.
    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    pub fn is_valid(self) -> bool {
        self != LabelCategory::Invalid
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LabelCategory::Stream => "stream",
            LabelCategory::StructuredMetadata => "structured_metadata",
            LabelCategory::Parsed => "parsed",
            LabelCategory::Invalid => "invalid",
        }
    }
}

/// An empty selection means every category.
#[inline]
pub(crate) fn categories_contain(categories: &[LabelCategory], category: LabelCategory) -> bool {
    categories.is_empty() || categories.contains(&category)
}
