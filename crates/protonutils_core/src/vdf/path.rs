use tracing::debug;

use super::{NodeRef, Tree};
use crate::core_api::CoreError;

/// Walks `path` from the root of `tree`. The first segment names the root.
pub fn lookup<'a, S: AsRef<str>>(tree: &'a Tree, path: &[S]) -> Result<NodeRef<'a>, CoreError> {
    lookup_from(tree.root(), path)
}

/// Walks `path` from `start`, whose own name must be the first segment.
///
/// Each later segment selects the first direct child with that name. The
/// error names exactly the segment that could not be found.
pub fn lookup_from<'a, S: AsRef<str>>(
    start: NodeRef<'a>,
    path: &[S],
) -> Result<NodeRef<'a>, CoreError> {
    let Some((first, rest)) = path.split_first() else {
        return Err(CoreError::key_not_found(""));
    };
    if start.name() != first.as_ref() {
        debug!(expected = first.as_ref(), found = start.name(), "lookup root mismatch");
        return Err(CoreError::key_not_found(first.as_ref()));
    }

    let mut node = start;
    for segment in rest {
        let segment = segment.as_ref();
        node = node.child(segment).ok_or_else(|| {
            debug!(segment, parent = %node.path(), "lookup segment missing");
            CoreError::key_not_found(segment)
        })?;
    }
    Ok(node)
}
