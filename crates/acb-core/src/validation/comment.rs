//! Comment thread shape.
//!
//! Threads are validated iteratively: the input tree is flattened into an
//! arena in pre-order, each node is checked on its own, and the surviving
//! nodes are reassembled. Nesting depth never drives recursion on the
//! async path.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collection::{Collection, VersionFamily};
use crate::error::{AcbResult, FieldErrorKind};
use crate::id::DocId;
use crate::models::review::{Comment, TargetElement};
use crate::validation::chain::check_version_owner;
use crate::validation::{ReferenceLookup, Validator, field_path, indexed_path};

/// Deepest level a reply may sit at; a top-level comment is level 1.
pub const MAX_THREAD_DEPTH: usize = 32;

/// A comment as supplied by a client, replies included.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentCreate {
    pub comment_id: Option<String>,
    pub bulletin_version_id: String,
    pub text: String,
    pub author_id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub target_element: Option<TargetElement>,
    pub replies: Vec<CommentCreate>,
}

/// Containment check: a field lives in a block, a block in a section.
pub fn check_target_element(target: &TargetElement) -> Result<(), FieldErrorKind> {
    if target.field_id.is_some() && (target.block_id.is_none() || target.section_id.is_none()) {
        return Err(FieldErrorKind::InvalidTargetElement {
            reason: "field_id requires block_id and section_id".into(),
        });
    }
    if target.block_id.is_some() && target.section_id.is_none() {
        return Err(FieldErrorKind::InvalidTargetElement {
            reason: "block_id requires section_id".into(),
        });
    }
    Ok(())
}

/// Options shared by every comment in one validation pass.
pub struct ThreadContext<'t> {
    /// Level of the first comments in the batch (1 for top-level ones,
    /// parent level + 1 for replies).
    pub base_depth: usize,
    /// When set, every `bulletin_version_id` must be a version of this
    /// bulletin.
    pub bulletin_master: Option<&'t DocId>,
    /// Comment ids already taken; new ids are added as they are accepted.
    pub taken_ids: &'t mut HashSet<String>,
}

struct Node {
    path: String,
    parent: Option<usize>,
    input: CommentCreate,
}

/// Validate a batch of comment threads rooted at `field`.
pub async fn validate_threads<L: ReferenceLookup>(
    v: &mut Validator<'_, L>,
    field: &str,
    threads: Vec<CommentCreate>,
    ctx: ThreadContext<'_>,
) -> AcbResult<Vec<Comment>> {
    let roots = threads
        .into_iter()
        .enumerate()
        .map(|(i, input)| (indexed_path(field, i), input))
        .collect();
    validate_forest(v, roots, ctx).await
}

/// Validate a single comment thread sitting at `field`.
pub async fn validate_thread<L: ReferenceLookup>(
    v: &mut Validator<'_, L>,
    field: &str,
    thread: CommentCreate,
    ctx: ThreadContext<'_>,
) -> AcbResult<Option<Comment>> {
    let mut comments = validate_forest(v, vec![(field.to_owned(), thread)], ctx).await?;
    Ok(comments.pop())
}

async fn validate_forest<L: ReferenceLookup>(
    v: &mut Validator<'_, L>,
    roots: Vec<(String, CommentCreate)>,
    mut ctx: ThreadContext<'_>,
) -> AcbResult<Vec<Comment>> {
    let nodes = flatten(v, roots, ctx.base_depth);

    let mut parents = Vec::with_capacity(nodes.len());
    let mut slots = Vec::with_capacity(nodes.len());
    for node in nodes {
        parents.push(node.parent);
        slots.push(
            validate_node(v, &node.path, node.input, ctx.bulletin_master, &mut *ctx.taken_ids)
                .await?,
        );
    }

    let mut children = vec![Vec::new(); slots.len()];
    let mut top = Vec::new();
    for (i, parent) in parents.into_iter().enumerate() {
        match parent {
            Some(p) => children[p].push(i),
            None => top.push(i),
        }
    }

    Ok(top
        .into_iter()
        .filter_map(|root| assemble(root, &mut slots, &children))
        .collect())
}

/// Pre-order arena; a parent always precedes its replies.
fn flatten<L: ReferenceLookup>(
    v: &mut Validator<'_, L>,
    roots: Vec<(String, CommentCreate)>,
    base_depth: usize,
) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut stack: Vec<(String, usize, Option<usize>, CommentCreate)> = roots
        .into_iter()
        .rev()
        .map(|(path, input)| (path, base_depth, None, input))
        .collect();

    while let Some((path, depth, parent, mut input)) = stack.pop() {
        if depth > MAX_THREAD_DEPTH {
            v.push(
                path,
                FieldErrorKind::NestingTooDeep {
                    max: MAX_THREAD_DEPTH,
                },
            );
            continue;
        }

        let index = nodes.len();
        let replies_path = field_path(&path, "replies");
        let replies = std::mem::take(&mut input.replies);
        for (i, reply) in replies.into_iter().enumerate().rev() {
            stack.push((indexed_path(&replies_path, i), depth + 1, Some(index), reply));
        }
        nodes.push(Node {
            path,
            parent,
            input,
        });
    }

    nodes
}

async fn validate_node<L: ReferenceLookup>(
    v: &mut Validator<'_, L>,
    path: &str,
    input: CommentCreate,
    bulletin_master: Option<&DocId>,
    taken_ids: &mut HashSet<String>,
) -> AcbResult<Option<Comment>> {
    let id_path = field_path(path, "comment_id");
    let comment_id = v.non_blank(&id_path, input.comment_id);
    if let Some(id) = &comment_id
        && !taken_ids.insert(id.clone())
    {
        v.push(
            id_path,
            FieldErrorKind::InvalidValue {
                reason: format!("duplicate comment_id '{id}'"),
            },
        );
    }

    let text = v.require_text(&field_path(path, "text"), input.text);
    let author_id = v
        .reference(&field_path(path, "author_id"), Collection::Users, &input.author_id)
        .await?;

    let version_path = field_path(path, "bulletin_version_id");
    let mut bulletin_version_id = v
        .reference(
            &version_path,
            Collection::BulletinsVersions,
            &input.bulletin_version_id,
        )
        .await?;
    if let (Some(version), Some(master)) = (&bulletin_version_id, bulletin_master)
        && !check_version_owner(v, &version_path, VersionFamily::Bulletins, version, master).await?
    {
        bulletin_version_id = None;
    }

    if let Some(target) = &input.target_element
        && let Err(kind) = check_target_element(target)
    {
        v.push(field_path(path, "target_element"), kind);
    }

    Ok(match (text, author_id, bulletin_version_id) {
        (Some(text), Some(author_id), Some(bulletin_version_id)) => Some(Comment {
            comment_id,
            bulletin_version_id,
            text,
            author_id,
            created_at: input.created_at.unwrap_or_else(Utc::now),
            target_element: input.target_element,
            replies: Vec::new(),
        }),
        _ => None,
    })
}

fn assemble(index: usize, slots: &mut [Option<Comment>], children: &[Vec<usize>]) -> Option<Comment> {
    let mut comment = slots[index].take()?;
    comment.replies = children[index]
        .iter()
        .filter_map(|&child| assemble(child, slots, children))
        .collect();
    Some(comment)
}
