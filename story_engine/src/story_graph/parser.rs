//! Story template parser - authored markdown into a validated graph.
//!
//! The format, in full:
//!
//! ```text
//! ## Title (node_id)
//! "An optional quoted line; in the start node it becomes the blurb."
//! Plain prose lines. (REWARD: item_id) (FLAG: flag_id) on terminals only.
//! Choices:
//! - [Label] -> target_id
//! ```
//!
//! Both `->` and `→` arrows are accepted. Text before the first heading is
//! ignored, as are `Terminal:` metadata lines left behind by the older
//! template converter. Everything else that fails to parse is a
//! [`StructuralError`] carrying the offending line number.

use game_state::{FlagId, ItemId};
use std::collections::HashSet;

use super::{Choice, GraphId, NodeId, StoryGraph, StoryNode, StructuralError};

/// Parse an authored template into a validated [`StoryGraph`].
///
/// Pure with respect to game state: the only output is the graph or the
/// first structural defect found.
pub fn parse_template(
    id: impl Into<GraphId>,
    text: &str,
) -> Result<StoryGraph, StructuralError> {
    let id = id.into();
    let mut nodes: Vec<StoryNode> = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut current: Option<StoryNode> = None;
    let mut in_choices = false;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();

        if let Some(heading) = line.strip_prefix("## ") {
            if let Some(node) = current.take() {
                nodes.push(node);
            }
            in_choices = false;

            let (title, node_id) =
                split_heading(heading).ok_or_else(|| StructuralError::MalformedHeading {
                    line: line_no,
                    text: line.to_string(),
                })?;
            if !NodeId::is_valid(node_id) {
                return Err(StructuralError::InvalidNodeId {
                    line: line_no,
                    id: node_id.to_string(),
                });
            }
            if !seen_ids.insert(node_id.to_string()) {
                return Err(StructuralError::DuplicateNode {
                    line: line_no,
                    id: node_id.to_string(),
                });
            }
            current = Some(StoryNode::new(node_id, title));
            continue;
        }

        let node = match current.as_mut() {
            Some(node) => node,
            None => {
                // Prologue text before the first heading is ignored, but a
                // stray choice line there is an authoring mistake.
                if line.starts_with("- [") {
                    return Err(StructuralError::ChoiceOutsideNode { line: line_no });
                }
                continue;
            }
        };

        if line.is_empty() {
            continue;
        }
        if line == "Choices:" {
            in_choices = true;
            continue;
        }
        // Metadata emitted by the older md-to-json converter; terminality
        // is derived from the absence of choices, not declared.
        if line.starts_with("Terminal:") {
            continue;
        }

        if in_choices {
            parse_choice_line(line, line_no, node)?;
        } else {
            push_prose_line(line, line_no, node)?;
        }
    }
    if let Some(node) = current.take() {
        nodes.push(node);
    }

    if nodes.is_empty() {
        return Err(StructuralError::EmptyTemplate { graph: id });
    }

    // An explicit `start` id wins over heading order, so authors can move
    // sections around freely.
    let start = if seen_ids.contains("start") {
        NodeId::new("start")
    } else {
        nodes[0].id.clone()
    };

    let description = nodes
        .iter()
        .find(|node| node.id == start)
        .and_then(|node| node.prose.iter().find_map(|line| quoted_inner(line)));

    let graph = StoryGraph::build(id, start, nodes)?;
    Ok(match description {
        Some(blurb) => graph.with_description(blurb),
        None => graph,
    })
}

/// Split `Title (node_id)` into its parts.
fn split_heading(heading: &str) -> Option<(&str, &str)> {
    let heading = heading.trim();
    let open = heading.rfind('(')?;
    if !heading.ends_with(')') {
        return None;
    }
    let title = heading[..open].trim();
    let id = heading[open + 1..heading.len() - 1].trim();
    if title.is_empty() {
        return None;
    }
    Some((title, id))
}

/// Parse one `- [Label] -> target_id` line into the current node.
fn parse_choice_line(
    line: &str,
    line_no: usize,
    node: &mut StoryNode,
) -> Result<(), StructuralError> {
    let malformed = || StructuralError::MalformedChoice {
        line: line_no,
        text: line.to_string(),
    };

    // The older template variant put annotations on choice lines; terminal
    // prose is canonical, so that shape is rejected rather than guessed at.
    if keyword_present(line, "REWARD") || keyword_present(line, "FLAG") {
        return Err(StructuralError::AnnotationOnChoice {
            line: line_no,
            node: node.id.clone(),
        });
    }

    let rest = line.strip_prefix("- ").ok_or_else(malformed)?.trim_start();
    let rest = rest.strip_prefix('[').ok_or_else(malformed)?;
    let (label, rest) = rest.split_once(']').ok_or_else(malformed)?;
    let label = label.trim();
    if label.is_empty() {
        return Err(malformed());
    }

    let rest = rest.trim_start();
    let target = rest
        .strip_prefix("->")
        .or_else(|| rest.strip_prefix('→'))
        .ok_or_else(malformed)?
        .trim();
    if !NodeId::is_valid(target) {
        return Err(StructuralError::InvalidNodeId {
            line: line_no,
            id: target.to_string(),
        });
    }

    if node.find_choice(label).is_some() {
        return Err(StructuralError::DuplicateChoiceLabel {
            line: line_no,
            node: node.id.clone(),
            label: label.to_string(),
        });
    }
    node.choices.push(Choice::new(label, target));
    Ok(())
}

/// Add a prose line to the current node, lifting off any annotations.
fn push_prose_line(
    line: &str,
    line_no: usize,
    node: &mut StoryNode,
) -> Result<(), StructuralError> {
    let mut text = line.to_string();

    if let Some(id) = take_annotation(&mut text, "REWARD", line_no)? {
        if node.reward.is_some() {
            return Err(StructuralError::DuplicateAnnotation {
                line: line_no,
                node: node.id.clone(),
                kind: "reward",
            });
        }
        node.reward = Some(ItemId::new(id));
    }
    if let Some(id) = take_annotation(&mut text, "FLAG", line_no)? {
        if node.flag.is_some() {
            return Err(StructuralError::DuplicateAnnotation {
                line: line_no,
                node: node.id.clone(),
                kind: "flag",
            });
        }
        node.flag = Some(FlagId::new(id));
    }

    let text = text.trim();
    if !text.is_empty() {
        node.prose.push(text.to_string());
    }
    Ok(())
}

/// Case-insensitive check for an opening `(KEYWORD:` marker.
fn keyword_present(line: &str, keyword: &str) -> bool {
    line.to_ascii_uppercase().contains(&format!("({keyword}:"))
}

/// Remove a `(KEYWORD: id)` annotation from the line and return the id.
///
/// The keyword match is case-insensitive, as the original templates mixed
/// `REWARD:` and `reward:`. An opening marker without a closing paren or
/// with an invalid id is a structural defect.
fn take_annotation(
    text: &mut String,
    keyword: &str,
    line_no: usize,
) -> Result<Option<String>, StructuralError> {
    // ASCII uppercasing preserves byte offsets.
    let upper = text.to_ascii_uppercase();
    let needle = format!("({keyword}:");
    let start = match upper.find(&needle) {
        Some(start) => start,
        None => return Ok(None),
    };
    let malformed = || StructuralError::MalformedAnnotation {
        line: line_no,
        text: text.clone(),
    };

    let after = start + needle.len();
    let close = text[after..].find(')').ok_or_else(malformed)?;
    let id = text[after..after + close].trim().to_string();
    if !NodeId::is_valid(&id) {
        return Err(malformed());
    }
    text.replace_range(start..after + close + 1, "");
    Ok(Some(id))
}

/// The inner text of a fully quoted line, straight or curly quotes.
fn quoted_inner(line: &str) -> Option<String> {
    let line = line.trim();
    for (open, close) in [('"', '"'), ('“', '”')] {
        if let Some(inner) = line
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            if !inner.is_empty() {
                return Some(inner.to_string());
            }
        }
    }
    None
}
