//! Threaded comments: turns the flat list from the data layer into a reply
//! forest and validates new comments before they are sent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Result, SessionError};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    #[serde(default, alias = "parent_id")]
    pub parent_id: Option<i64>,
    #[serde(alias = "user_id")]
    pub user_id: i64,
    #[serde(default)]
    pub username: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

// Reply chains can be arbitrarily deep, so clone and drop walk the tree with
// an explicit stack instead of recursing.
impl Clone for CommentNode {
    fn clone(&self) -> Self {
        let mut stack: Vec<(&CommentNode, Vec<CommentNode>)> =
            vec![(self, Vec::with_capacity(self.replies.len()))];

        loop {
            let (node, done) = match stack.last() {
                Some((node, done)) => (*node, done.len()),
                None => unreachable!("stack holds at least the root until it returns"),
            };

            if done < node.replies.len() {
                let child = &node.replies[done];
                stack.push((child, Vec::with_capacity(child.replies.len())));
                continue;
            }

            let Some((node, replies)) = stack.pop() else {
                unreachable!("checked above");
            };
            let cloned = CommentNode {
                comment: node.comment.clone(),
                replies,
            };
            match stack.last_mut() {
                Some((_, siblings)) => siblings.push(cloned),
                None => return cloned,
            }
        }
    }
}

impl Drop for CommentNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.replies);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.replies);
        }
    }
}

/// What to do with a reply whose parent is not in the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrphanPolicy {
    /// Leave it out of the forest.
    #[default]
    Drop,
    PromoteToRoot,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentForest {
    pub roots: Vec<CommentNode>,
    /// Ids whose parent was missing, in input order
    pub orphans: Vec<i64>,
}

impl CommentForest {
    pub fn len(&self) -> usize {
        let mut pending: Vec<&CommentNode> = self.roots.iter().collect();
        let mut count = 0;
        while let Some(node) = pending.pop() {
            count += 1;
            pending.extend(node.replies.iter());
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Depth-first, pre-order listing for an indenting renderer. Roots are depth 0.
    pub fn flatten(&self) -> Vec<(usize, &Comment)> {
        let mut out = Vec::new();
        let mut pending: Vec<(usize, &CommentNode)> =
            self.roots.iter().rev().map(|node| (0, node)).collect();
        while let Some((depth, node)) = pending.pop() {
            out.push((depth, &node.comment));
            pending.extend(node.replies.iter().rev().map(|reply| (depth + 1, reply)));
        }
        out
    }
}

/// Builds the reply forest in linear time.
///
/// Root and reply order follow input order. Duplicate ids keep their first
/// occurrence. Comments caught in a parent cycle are never reachable from a
/// root, so they are left out instead of looping.
pub fn build_tree(comments: &[Comment], policy: OrphanPolicy) -> CommentForest {
    let mut index: HashMap<i64, usize> = HashMap::with_capacity(comments.len());
    let mut duplicate = vec![false; comments.len()];
    for (pos, comment) in comments.iter().enumerate() {
        if index.contains_key(&comment.id) {
            log_warn!("duplicate comment id {} ignored", comment.id);
            duplicate[pos] = true;
        } else {
            index.insert(comment.id, pos);
        }
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); comments.len()];
    let mut roots = Vec::new();
    let mut orphans = Vec::new();

    for (pos, comment) in comments.iter().enumerate() {
        if duplicate[pos] {
            continue;
        }
        match comment.parent_id {
            None => roots.push(pos),
            Some(parent) => match index.get(&parent) {
                Some(&parent_pos) => children[parent_pos].push(pos),
                None => {
                    orphans.push(comment.id);
                    if policy == OrphanPolicy::PromoteToRoot {
                        roots.push(pos);
                    }
                }
            },
        }
    }

    if !orphans.is_empty() {
        log_warn!(
            "{} comment(s) reference a missing parent ({:?}), policy {:?}",
            orphans.len(),
            orphans,
            policy
        );
    }

    // Breadth-first order from the roots; children always come after their parent.
    let mut order = Vec::with_capacity(comments.len());
    let mut visited = vec![false; comments.len()];
    order.extend(roots.iter().copied());
    for &root in &roots {
        visited[root] = true;
    }
    let mut cursor = 0;
    while cursor < order.len() {
        let pos = order[cursor];
        cursor += 1;
        for &child in &children[pos] {
            if !visited[child] {
                visited[child] = true;
                order.push(child);
            }
        }
    }

    // Assemble bottom-up so every node owns its finished replies.
    let mut built: Vec<Option<CommentNode>> = vec![None; comments.len()];
    for &pos in order.iter().rev() {
        let replies = children[pos]
            .iter()
            .filter_map(|child| built[*child].take())
            .collect();
        built[pos] = Some(CommentNode {
            comment: comments[pos].clone(),
            replies,
        });
    }

    CommentForest {
        roots: roots.iter().filter_map(|pos| built[*pos].take()).collect(),
        orphans,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentAuthor {
    pub user_id: i64,
    pub username: String,
}

/// Payload for the data layer's "add comment" call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRequest {
    pub user_id: i64,
    pub username: String,
    pub content: String,
    pub parent_id: Option<i64>,
}

/// Validates a new comment or reply against the current flat list.
pub fn prepare_comment(
    author: &CommentAuthor,
    content: &str,
    parent_id: Option<i64>,
    existing: &[Comment],
) -> Result<CommentRequest> {
    let content = content.trim();
    if content.is_empty() {
        return Err(SessionError::EmptyComment);
    }

    if let Some(parent) = parent_id {
        if !existing.iter().any(|c| c.id == parent) {
            return Err(SessionError::UnknownComment(parent));
        }
    }

    Ok(CommentRequest {
        user_id: author.user_id,
        username: author.username.clone(),
        content: content.to_string(),
        parent_id,
    })
}
