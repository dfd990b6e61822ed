//! Retrieved context: dedup, ordering, and rendering for the synthesis prompt.

use std::collections::HashSet;
use std::fmt::Write as _;

use sage_memory::{FaqHit, KnowledgeHit};

#[derive(Debug, Clone, PartialEq)]
pub enum ContextItem {
    Knowledge(KnowledgeHit),
    Faq(FaqHit),
}

impl ContextItem {
    /// Dedup key: `faq:<question>` or `knowledge:<first key_chars chars>`.
    #[must_use]
    pub fn dedup_key(&self, key_chars: usize) -> String {
        match self {
            Self::Faq(hit) => format!("faq:{}", hit.question),
            Self::Knowledge(hit) => {
                let prefix: String = hit.content.chars().take(key_chars).collect();
                format!("knowledge:{prefix}")
            }
        }
    }

    #[must_use]
    pub fn is_faq(&self) -> bool {
        matches!(self, Self::Faq(_))
    }
}

/// FAQ items first, then knowledge items; first occurrence of each key wins;
/// at most `max_items` survive.
#[must_use]
pub fn filter_context(items: Vec<ContextItem>, max_items: usize, key_chars: usize) -> Vec<ContextItem> {
    let (faqs, knowledge): (Vec<_>, Vec<_>) = items.into_iter().partition(ContextItem::is_faq);
    let mut seen = HashSet::new();
    faqs.into_iter()
        .chain(knowledge)
        .filter(|item| seen.insert(item.dedup_key(key_chars)))
        .take(max_items)
        .collect()
}

/// Render a "Knowledge" block followed by a numbered "FAQ" block.
///
/// Returns an empty string when there is nothing to render.
#[must_use]
pub fn assemble_context(items: &[ContextItem]) -> String {
    let mut out = String::new();

    let knowledge: Vec<&KnowledgeHit> = items
        .iter()
        .filter_map(|i| match i {
            ContextItem::Knowledge(hit) => Some(hit),
            ContextItem::Faq(_) => None,
        })
        .collect();
    if !knowledge.is_empty() {
        out.push_str("[Knowledge]\n");
        for (n, hit) in knowledge.iter().enumerate() {
            let _ = write!(out, "{}. {}\n\n", n + 1, hit.content);
        }
    }

    let faqs: Vec<&FaqHit> = items
        .iter()
        .filter_map(|i| match i {
            ContextItem::Faq(hit) => Some(hit),
            ContextItem::Knowledge(_) => None,
        })
        .collect();
    if !faqs.is_empty() {
        out.push_str("[FAQ]\n");
        for (n, hit) in faqs.iter().enumerate() {
            let _ = write!(out, "{}. Q: {}\n   A: {}\n\n", n + 1, hit.question, hit.answer);
        }
    }

    out
}
