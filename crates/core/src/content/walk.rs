#![forbid(unsafe_code)]

use super::{BlockContent, Inline};
use crate::ids::{BlockId, ObjectId};

/// One `ref` node found in a block's content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentRef {
    pub target_object_id: ObjectId,
    pub target_block_id: Option<BlockId>,
}

impl BlockContent {
    /// Every reference node in document order, duplicates included.
    pub fn references(&self) -> Vec<ContentRef> {
        let mut out = Vec::new();
        for runs in self.inline_sections() {
            collect_refs(runs, &mut out);
        }
        out
    }

    /// Textual runs flattened for the search index.
    pub fn plain_text(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        match self {
            Self::Callout(callout) => {
                if let Some(title) = callout.title.as_deref() {
                    parts.push(title.to_string());
                }
            }
            Self::CodeBlock(code) => parts.push(code.code.clone()),
            _ => {}
        }
        for runs in self.inline_sections() {
            let mut section = String::new();
            collect_text(runs, &mut section);
            let section = section.trim();
            if !section.is_empty() {
                parts.push(section.to_string());
            }
        }
        parts.join(" ")
    }

    fn inline_sections(&self) -> Vec<&[Inline]> {
        match self {
            Self::Paragraph(p) => vec![p.inline.as_slice()],
            Self::Heading(h) => vec![h.inline.as_slice()],
            Self::ListItem(item) => vec![item.inline.as_slice()],
            Self::Table(table) => table
                .rows
                .iter()
                .flat_map(|row| row.cells.iter().map(Vec::as_slice))
                .collect(),
            Self::FootnoteDef(footnote) => footnote.inline.as_deref().into_iter().collect(),
            Self::List(_)
            | Self::Blockquote(_)
            | Self::Callout(_)
            | Self::CodeBlock(_)
            | Self::ThematicBreak(_)
            | Self::MathBlock(_) => Vec::new(),
        }
    }
}

fn collect_refs(runs: &[Inline], out: &mut Vec<ContentRef>) {
    for run in runs {
        match run {
            Inline::Ref { target, .. } => out.push(ContentRef {
                target_object_id: target.object_id().clone(),
                target_block_id: target.block_id().cloned(),
            }),
            Inline::Link { children, .. } => collect_refs(children, out),
            Inline::Text { .. }
            | Inline::HardBreak
            | Inline::Tag { .. }
            | Inline::MathInline { .. }
            | Inline::FootnoteRef { .. } => {}
        }
    }
}

fn collect_text(runs: &[Inline], out: &mut String) {
    for run in runs {
        match run {
            Inline::Text { text, .. } => out.push_str(text),
            Inline::HardBreak => out.push(' '),
            Inline::Link { children, .. } => collect_text(children, out),
            Inline::Ref { alias, .. } => {
                if let Some(alias) = alias {
                    out.push_str(alias);
                }
            }
            Inline::Tag { value } => {
                out.push('#');
                out.push_str(value);
            }
            Inline::MathInline { .. } | Inline::FootnoteRef { .. } => {}
        }
    }
}
